//! Pipeline controller: stage ordering, toggles and the run report

use crate::calibrate::calibrate;
use crate::config::PipelineConfig;
use crate::extract::{extraction_stages, plan_products, validate_mask, ExtractionRequest};
use crate::merge::{merge_products, MergePlan};
use crate::models::{PipelineProgress, PipelineResult, RunProducts, RunStatus, RunWarning};
use crate::scenes::{discover_scenes, intake_archives, Scene};
use crate::stage::{run_stage, StageDescriptor};
use crate::vegetation::{
    analysis_polarization, classify_vegetation, combine_vegetation, prepare_decibels,
    VegetationPaths,
};
use chrono::Utc;
use floodmap_core::error::{FloodError, Result};
use floodmap_core::models::{
    sieve_pixel_count, CalibrationOutcome, FloodVectorProduct, ImageProduct, MergedVectorProduct,
    Polarization, StageDir, StageError, StageKind, StageResult, StageStatus, ThresholdRange,
    ThresholdSet,
};
use floodmap_core::ports::{ExportOptions, MosaicOptions, OrthoParams, RasterToolkit};
use floodmap_core::workspace::output_present;
use floodmap_core::RunWorkspace;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::path::PathBuf;

const MEDIAN_WINDOW: usize = 3;

/// Whether a unit's outputs exist now or will once the run reaches it
fn produced(status: Option<Option<StageStatus>>) -> bool {
    matches!(
        status,
        Some(None) | Some(Some(StageStatus::Completed)) | Some(Some(StageStatus::SkippedAlreadyDone))
    )
}

/// A stage unit as the idempotence check sees it right now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedStage {
    pub stage: StageKind,
    pub label: String,
    pub outputs: Vec<PathBuf>,
    /// Status the executor would report without running, `None` if it would run
    pub skip: Option<StageStatus>,
}

/// The per-date mosaic and its exported channels
#[derive(Debug, Clone, PartialEq)]
struct MosaicPlan {
    stem: String,
    path: PathBuf,
    /// Channel product and its band index in the mosaic
    channels: Vec<(ImageProduct, usize)>,
}

impl MosaicPlan {
    fn polarizations(&self) -> Vec<Polarization> {
        self.channels.iter().filter_map(|(c, _)| c.polarization).collect()
    }

    fn channel(&self, polarization: Polarization) -> Option<&ImageProduct> {
        self.channels
            .iter()
            .map(|(c, _)| c)
            .find(|c| c.polarization == Some(polarization))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Execute,
    Plan,
}

struct RunState<'p> {
    mode: Mode,
    progress: &'p mut dyn FnMut(PipelineProgress),
    stages: Vec<StageResult>,
    planned: Vec<PlannedStage>,
    warnings: Vec<RunWarning>,
    products: RunProducts,
    calibration: Option<CalibrationOutcome>,
    failed: bool,
}

impl<'p> RunState<'p> {
    fn new(mode: Mode, progress: &'p mut dyn FnMut(PipelineProgress)) -> Self {
        Self {
            mode,
            progress,
            stages: Vec::new(),
            planned: Vec::new(),
            warnings: Vec::new(),
            products: RunProducts::default(),
            calibration: None,
            failed: false,
        }
    }

    /// Run or plan one descriptor; `None` once an earlier unit has failed
    ///
    /// In plan mode the returned status is the would-skip status, `None`
    /// meaning the unit would run.
    fn execute(&mut self, descriptor: StageDescriptor<'_>) -> Option<Option<StageStatus>> {
        if self.failed {
            return None;
        }

        if self.mode == Mode::Plan {
            let skip = descriptor.pending_skip();
            self.planned.push(PlannedStage {
                stage: descriptor.stage,
                label: descriptor.label.clone(),
                outputs: descriptor.outputs.clone(),
                skip,
            });
            return Some(skip);
        }

        let (stage, label) = (descriptor.stage, descriptor.label.clone());
        (self.progress)(PipelineProgress { stage, label: label.clone(), status: None });
        let result = run_stage(descriptor);
        let status = result.status;
        (self.progress)(PipelineProgress { stage, label, status: Some(status) });

        self.failed = result.is_failed();
        self.stages.push(result);
        Some(Some(status))
    }

    /// Record a unit that never reaches the executor
    fn record(&mut self, stage: StageKind, label: impl Into<String>, status: StageStatus) {
        let label = label.into();
        match self.mode {
            Mode::Plan => self.planned.push(PlannedStage {
                stage,
                label,
                outputs: Vec::new(),
                skip: Some(status),
            }),
            Mode::Execute => {
                tracing::info!(stage = %label, status = %status, "Stage not run");
                (self.progress)(PipelineProgress { stage, label: label.clone(), status: Some(status) });
                self.stages.push(StageResult::new(stage, label, status));
            }
        }
    }

    /// Record a unit that failed before reaching the executor
    fn fail(&mut self, stage: StageKind, label: impl Into<String>, error: &FloodError) {
        let label = label.into();
        match self.mode {
            Mode::Plan => self.planned.push(PlannedStage {
                stage,
                label,
                outputs: Vec::new(),
                skip: Some(StageStatus::Failed),
            }),
            Mode::Execute => {
                tracing::error!(stage = %label, error = %error, "Stage failed");
                (self.progress)(PipelineProgress {
                    stage,
                    label: label.clone(),
                    status: Some(StageStatus::Failed),
                });
                self.stages.push(
                    StageResult::new(stage, label, StageStatus::Failed)
                        .with_error(StageError::Producer { message: error.to_string() }),
                );
            }
        }
        self.failed = true;
    }

    fn warn(&mut self, warning: RunWarning) {
        tracing::warn!(parameter = %warning.parameter, "{}", warning.message);
        self.warnings.push(warning);
    }
}

/// Sequential flood-mapping pipeline over one run workspace
pub struct Pipeline<T: RasterToolkit> {
    toolkit: T,
    config: PipelineConfig,
    workspace: RunWorkspace,
}

impl<T: RasterToolkit> Pipeline<T> {
    pub fn new(toolkit: T, config: PipelineConfig) -> Result<Self> {
        let workspace = RunWorkspace::open(&config.workspace)?;
        Ok(Self { toolkit, config, workspace })
    }

    pub fn workspace(&self) -> &RunWorkspace {
        &self.workspace
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every enabled stage
    pub fn run(&self) -> Result<PipelineResult> {
        self.run_with_progress(|_| {})
    }

    /// Run every enabled stage, reporting each unit to `progress`
    ///
    /// Returns `Err` only for problems found before any stage runs: workspace
    /// access, configuration and mask validation. Stage failures are reported
    /// in the result.
    pub fn run_with_progress<F>(&self, mut progress: F) -> Result<PipelineResult>
    where
        F: FnMut(PipelineProgress),
    {
        let started_at = Utc::now();

        for stage in StageDir::ALL {
            self.workspace.ensure_stage(stage)?;
        }
        self.workspace.reset_scratch()?;
        if let Some(mask) = &self.config.extract.mask {
            validate_mask(&self.toolkit, mask)?;
        }

        if self.config.is_enabled(StageKind::Import) {
            let intake = intake_archives(&self.workspace)?;
            if !intake.extracted.is_empty() {
                tracing::info!(archives = intake.extracted.len(), "Unpacked scene archives");
            }
        }

        let mut state = RunState::new(Mode::Execute, &mut progress);
        let status = self.drive(&mut state)?;

        let mut result = PipelineResult {
            status,
            stages: state.stages,
            calibration: state.calibration,
            warnings: state.warnings,
            products: state.products,
            started_at,
            finished_at: Utc::now(),
            report: None,
        };

        if result.status == RunStatus::NothingToProcess {
            tracing::info!("No scenes to process");
        }
        result.report = Some(result.write_report(&self.workspace.stage_path(StageDir::Logs))?);
        Ok(result)
    }

    /// Units a run would execute, with their current skip status; writes nothing
    pub fn plan(&self) -> Result<Vec<PlannedStage>> {
        if let Some(mask) = &self.config.extract.mask {
            validate_mask(&self.toolkit, mask)?;
        }

        let mut ignore = |_: PipelineProgress| {};
        let mut state = RunState::new(Mode::Plan, &mut ignore);
        self.drive(&mut state)?;
        Ok(state.planned)
    }

    fn drive(&self, state: &mut RunState<'_>) -> Result<RunStatus> {
        let scenes = discover_scenes(&self.workspace, self.toolkit.raster_extension())?;
        let mosaic = match scenes.first() {
            Some(first) => Some(self.mosaic_from_scene(first)),
            None => self.existing_mosaic()?,
        };

        let Some(mosaic) = mosaic else {
            for stage in StageKind::ALL {
                let status = if self.config.is_enabled(stage) {
                    StageStatus::SkippedMissingInput
                } else {
                    StageStatus::SkippedDisabled
                };
                state.record(stage, stage.as_str(), status);
            }
            return Ok(RunStatus::NothingToProcess);
        };
        state.products.mosaic = Some(mosaic.path.clone());

        let polarizations = mosaic.polarizations();
        let (thresholds, config_warnings) =
            ThresholdSet::reconcile(&self.config.extract.thresholds, &polarizations)?;
        for warning in config_warnings {
            state.warn(RunWarning::from_configuration(warning));
        }

        for stage in StageKind::ALL {
            if state.failed {
                break;
            }
            if !self.config.is_enabled(stage) {
                state.record(stage, stage.as_str(), StageStatus::SkippedDisabled);
                continue;
            }

            match stage {
                StageKind::Import => self.import(state, &scenes),
                StageKind::Ortho => self.ortho(state, &scenes),
                StageKind::Mosaic => self.mosaic(state, &scenes, &mosaic),
                StageKind::Scale => self.scale(state, &mosaic),
                StageKind::Filter => self.filter(state, &mosaic),
                StageKind::Threshold => self.threshold(state, &mosaic),
                StageKind::Vectorize => self.vectorize(state, &mosaic, &thresholds),
                StageKind::CombineVegetation => self.combine(state, &mosaic),
                StageKind::Merge => self.merge(state, &mosaic, &thresholds),
            }
        }

        Ok(if state.failed { RunStatus::Failed } else { RunStatus::Success })
    }

    fn mosaic_from_scene(&self, first: &Scene) -> MosaicPlan {
        let code = &self.config.ortho.projection_code;
        let stem = format!("{}_{}_{}_mos", first.id.date, first.id.time, code);
        let dir = self.workspace.stage_path(StageDir::Mosaic);
        let ext = self.toolkit.raster_extension();

        let channels = first
            .id
            .polarizations
            .iter()
            .enumerate()
            .map(|(band, pol)| {
                let product = ImageProduct {
                    path: dir.join(format!("{}_{}.{}", stem, pol, ext)),
                    polarization: Some(*pol),
                    date: first.id.date.clone(),
                    time: first.id.time.clone(),
                    projection_code: code.clone(),
                    pixel_spacing: self.config.ortho.pixel_spacing,
                };
                (product, band)
            })
            .collect();

        MosaicPlan { path: dir.join(format!("{}.{}", stem, ext)), stem, channels }
    }

    /// Continue from a mosaic left by an earlier run when `Raw/` has no scenes
    fn existing_mosaic(&self) -> Result<Option<MosaicPlan>> {
        let ext = self.toolkit.raster_extension();
        let found = self.workspace.list_stage_files(StageDir::Mosaic, &format!("_mos.{}", ext))?;
        let Some(path) = found.into_iter().next() else {
            return Ok(None);
        };
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            return Ok(None);
        };

        let parts: Vec<&str> = stem.split('_').collect();
        let (date, time) = match parts.as_slice() {
            [date, time, ..] => (date.to_string(), time.to_string()),
            _ => (String::new(), String::new()),
        };

        let dir = self.workspace.stage_path(StageDir::Mosaic);
        let channels = Polarization::ALL
            .iter()
            .map(|pol| (pol, dir.join(format!("{}_{}.{}", stem, pol, ext))))
            .filter(|(_, channel)| output_present(channel))
            .enumerate()
            .map(|(band, (pol, channel))| {
                let product = ImageProduct {
                    path: channel,
                    polarization: Some(*pol),
                    date: date.clone(),
                    time: time.clone(),
                    projection_code: self.config.ortho.projection_code.clone(),
                    pixel_spacing: self.config.ortho.pixel_spacing,
                };
                (product, band)
            })
            .collect();

        tracing::info!(mosaic = %path.display(), "No scenes in Raw; continuing from existing mosaic");
        Ok(Some(MosaicPlan { stem, path, channels }))
    }

    fn import(&self, state: &mut RunState<'_>, scenes: &[Scene]) {
        if scenes.is_empty() {
            state.record(StageKind::Import, "import", StageStatus::SkippedMissingInput);
        }
        for scene in scenes {
            state.execute(
                StageDescriptor::new(
                    StageKind::Import,
                    format!("import {}", scene.id.product_stem()),
                    || self.toolkit.import(&scene.metadata, &scene.raw),
                )
                .with_inputs(vec![scene.metadata.clone()])
                .with_outputs(vec![scene.raw.clone()]),
            );
        }
    }

    fn ortho(&self, state: &mut RunState<'_>, scenes: &[Scene]) {
        if scenes.is_empty() {
            state.record(StageKind::Ortho, "ortho", StageStatus::SkippedMissingInput);
        }
        for scene in scenes {
            state.execute(
                StageDescriptor::new(
                    StageKind::Ortho,
                    format!("ortho {}", scene.id.product_stem()),
                    || {
                        let dem = self
                            .config
                            .ortho
                            .dem
                            .clone()
                            .ok_or_else(|| FloodError::ConfigMissing { key: "dem".to_string() })?;
                        let params = OrthoParams {
                            dem,
                            pixel_spacing: self.config.ortho.pixel_spacing,
                            projection: self.config.ortho.projection.clone(),
                        };
                        self.toolkit.orthorectify(&scene.raw, &scene.ortho, &params)
                    },
                )
                .with_inputs(vec![scene.raw.clone()])
                .with_outputs(vec![scene.ortho.clone()]),
            );
        }
    }

    fn mosaic(&self, state: &mut RunState<'_>, scenes: &[Scene], mosaic: &MosaicPlan) {
        let segments: Vec<PathBuf> = scenes.iter().map(|s| s.ortho.clone()).collect();

        state.execute(
            StageDescriptor::new(StageKind::Mosaic, format!("mosaic {}", mosaic.stem), || {
                match segments.as_slice() {
                    [] => Err(FloodError::StageFailed {
                        stage: "mosaic".to_string(),
                        reason: "no orthorectified segments".to_string(),
                    }),
                    [single] => self.toolkit.export(single, &mosaic.path, &ExportOptions::default()),
                    many => self.toolkit.mosaic(many, &mosaic.path, &MosaicOptions::default()),
                }
            })
            .with_inputs(segments.clone())
            .with_outputs(vec![mosaic.path.clone()]),
        );

        for (channel, band) in &mosaic.channels {
            let band = *band;
            state.execute(
                StageDescriptor::new(
                    StageKind::Mosaic,
                    format!("export {} band {}", mosaic.stem, band),
                    move || {
                        let options = ExportOptions { band: Some(band), compress: false };
                        self.toolkit.export(&mosaic.path, &channel.path, &options)
                    },
                )
                .with_inputs(vec![mosaic.path.clone()])
                .with_outputs(vec![channel.path.clone()]),
            );
        }
    }

    fn scaled_path(&self, mosaic: &MosaicPlan, polarization: Polarization) -> PathBuf {
        self.workspace.stage_path(StageDir::Scaled).join(format!(
            "{}_{}_8bit.{}",
            mosaic.stem,
            polarization,
            self.toolkit.raster_extension()
        ))
    }

    fn filtered_path(&self, mosaic: &MosaicPlan, polarization: Polarization) -> PathBuf {
        self.workspace.stage_path(StageDir::Scaled).join(format!(
            "{}_{}_8bit_MED3x3.{}",
            mosaic.stem,
            polarization,
            self.toolkit.raster_extension()
        ))
    }

    fn scale(&self, state: &mut RunState<'_>, mosaic: &MosaicPlan) {
        for (channel, _) in &mosaic.channels {
            let Some(pol) = channel.polarization else {
                continue;
            };
            let output = self.scaled_path(mosaic, pol);
            state.execute(
                StageDescriptor::new(StageKind::Scale, format!("scale {}", pol), || {
                    self.toolkit.scale_to_byte(&channel.path, 0, &output)
                })
                .with_inputs(vec![channel.path.clone()])
                .with_outputs(vec![output.clone()]),
            );
        }
    }

    fn filter(&self, state: &mut RunState<'_>, mosaic: &MosaicPlan) {
        for pol in mosaic.polarizations() {
            let input = self.scaled_path(mosaic, pol);
            let output = self.filtered_path(mosaic, pol);
            state.execute(
                StageDescriptor::new(StageKind::Filter, format!("filter {}", pol), || {
                    self.toolkit.filter_median(&input, &output, MEDIAN_WINDOW)
                })
                .with_inputs(vec![input.clone()])
                .with_outputs(vec![output.clone()]),
            );
        }
    }

    fn vegetation_paths(
        &self,
        mosaic: &MosaicPlan,
        outcome: &CalibrationOutcome,
    ) -> Option<VegetationPaths> {
        let vegetation = &self.config.vegetation;
        let pol = analysis_polarization(vegetation.analysis_polarization, &mosaic.polarizations())?;
        let channel = mosaic.channel(pol)?;
        Some(VegetationPaths::new(
            &self.toolkit,
            &self.workspace,
            &mosaic.stem,
            pol,
            channel.path.clone(),
            &outcome.thresholds,
        ))
    }

    /// Outcome used when calibration is off, not yet possible, or in plan mode
    fn fallback_outcome(&self) -> CalibrationOutcome {
        CalibrationOutcome::fallback(&self.config.vegetation.fallback, None)
    }

    fn threshold(&self, state: &mut RunState<'_>, mosaic: &MosaicPlan) {
        let fallback = self.fallback_outcome();
        let Some(paths) = self.vegetation_paths(mosaic, &fallback) else {
            state.record(StageKind::Threshold, "threshold", StageStatus::SkippedMissingInput);
            return;
        };
        let pol = paths.polarization;

        state.execute(
            StageDescriptor::new(StageKind::Threshold, format!("decibels {}", pol), || {
                prepare_decibels(&self.toolkit, &paths)
            })
            .with_inputs(vec![paths.channel.clone()])
            .with_outputs(vec![paths.gamma.clone(), paths.decibels.clone()]),
        );
        if state.failed {
            return;
        }

        let vegetation = &self.config.vegetation;
        let outcome = if vegetation.calibrate
            && state.mode == Mode::Execute
            && output_present(&paths.decibels)
        {
            calibrate(
                &self.toolkit,
                &paths.decibels,
                0,
                &vegetation.seeds,
                &vegetation.fallback,
                &self.workspace.stage_path(StageDir::Scratch),
            )
        } else {
            fallback
        };
        if let Some(warning) = &outcome.warning {
            state.warn(RunWarning::from_calibration(warning));
        }

        let Some(paths) = self.vegetation_paths(mosaic, &outcome) else {
            return;
        };
        let thresholds = outcome.thresholds;
        state.calibration = Some(outcome);

        state.execute(
            StageDescriptor::new(StageKind::Threshold, format!("classify {}", pol), || {
                classify_vegetation(&self.toolkit, &paths, &thresholds)
            })
            .with_inputs(vec![paths.decibels.clone()])
            .with_outputs(vec![paths.vegetation.clone(), paths.water.clone()]),
        );
    }

    fn vectorize(&self, state: &mut RunState<'_>, mosaic: &MosaicPlan, thresholds: &ThresholdSet) {
        for (pol, range) in thresholds.iter() {
            let request = self.extraction_request(mosaic, pol, range);
            let plans = plan_products(&self.toolkit, &self.workspace, &request);
            let counts: Vec<Cell<Option<usize>>> = plans.iter().map(|_| Cell::new(None)).collect();

            let descriptors = extraction_stages(&self.toolkit, &request, &plans, &counts);
            for (descriptor, (planned, count)) in descriptors.into_iter().zip(plans.iter().zip(&counts)) {
                if produced(state.execute(descriptor)) {
                    state.products.flood_vectors.push(FloodVectorProduct {
                        polygon_count: count.get(),
                        ..planned.product.clone()
                    });
                }
            }
        }
    }

    fn extraction_request(
        &self,
        mosaic: &MosaicPlan,
        polarization: Polarization,
        range: ThresholdRange,
    ) -> ExtractionRequest {
        ExtractionRequest {
            image: self.filtered_path(mosaic, polarization),
            polarization,
            range,
            min_polygon_ha: self.config.extract.min_polygon_ha,
            mask: self.config.extract.mask.clone(),
        }
    }

    fn combine(&self, state: &mut RunState<'_>, mosaic: &MosaicPlan) {
        let outcome = state.calibration.clone().unwrap_or_else(|| self.fallback_outcome());
        let Some(paths) = self.vegetation_paths(mosaic, &outcome) else {
            state.record(StageKind::CombineVegetation, "combine vegetation", StageStatus::SkippedMissingInput);
            return;
        };
        let land_cover = self.config.vegetation.land_cover.clone();

        let mut inputs = vec![paths.decibels.clone(), paths.vegetation.clone(), paths.water.clone()];
        inputs.extend(land_cover.iter().cloned());

        let status = state.execute(
            StageDescriptor::new(
                StageKind::CombineVegetation,
                format!("combine vegetation {}", paths.polarization),
                || match &land_cover {
                    Some(land_cover) => combine_vegetation(&self.toolkit, &paths, land_cover),
                    None => Err(FloodError::ConfigMissing { key: "land_cover".to_string() }),
                },
            )
            .with_inputs(inputs)
            .with_outputs(vec![paths.combined.clone()])
            .with_precondition(|| land_cover.is_some()),
        );

        if produced(status) {
            state.products.vegetation.push(paths.combined.clone());
        }
    }

    /// Open-water vector merged with the vegetation rasters
    fn open_water_input(&self, mosaic: &MosaicPlan, thresholds: &ThresholdSet) -> Option<PathBuf> {
        if let Some(explicit) = &self.config.merge.open_water {
            return Some(explicit.clone());
        }

        let (pol, range) = match self.config.merge.polarization {
            Some(pol) => (pol, thresholds.get(pol)?),
            None => thresholds.iter().next()?,
        };
        let t = self.config.merge.threshold.unwrap_or(range.max);
        let single = ThresholdRange { min: t, max: t };
        let request = self.extraction_request(mosaic, pol, single);
        plan_products(&self.toolkit, &self.workspace, &request)
            .into_iter()
            .next()
            .map(|p| p.product.path)
    }

    fn merge(
        &self,
        state: &mut RunState<'_>,
        mosaic: &MosaicPlan,
        thresholds: &ThresholdSet,
    ) {
        let Some(open_water) = self.open_water_input(mosaic, thresholds) else {
            state.record(StageKind::Merge, "merge", StageStatus::SkippedMissingInput);
            return;
        };

        let ext = self.toolkit.raster_extension();
        let listed =
            self.workspace.list_stage_files(StageDir::VectorVeg, &format!("_vegflood.{}", ext));
        let mut vegetation = match listed {
            Ok(files) => files,
            Err(e) => {
                state.fail(StageKind::Merge, "merge", &e);
                return;
            }
        };
        for planned in &state.products.vegetation {
            if !vegetation.contains(planned) {
                vegetation.push(planned.clone());
            }
        }
        vegetation.sort();

        let plan = MergePlan::new(
            &self.toolkit,
            &self.workspace,
            &open_water,
            vegetation.clone(),
            self.config.merge.hole_size_ha,
        );
        let merged: RefCell<Option<MergedVectorProduct>> = RefCell::new(None);

        let mut inputs = vec![open_water.clone()];
        inputs.extend(vegetation.iter().cloned());

        let status = state.execute(
            StageDescriptor::new(StageKind::Merge, format!("merge {}", plan.raster.display()), || {
                *merged.borrow_mut() = Some(merge_products(&self.toolkit, &plan)?);
                Ok(())
            })
            .with_inputs(inputs)
            .with_outputs(plan.outputs())
            .with_precondition(|| !vegetation.is_empty()),
        );

        state.products.merged = match status {
            Some(Some(StageStatus::SkippedAlreadyDone)) => self.existing_merge(&plan),
            _ => merged.into_inner(),
        };
    }

    fn existing_merge(&self, plan: &MergePlan) -> Option<MergedVectorProduct> {
        let info = self.toolkit.raster_info(&plan.raster).ok()?;
        let sieve_pixels =
            sieve_pixel_count(plan.hole_size_ha, info.pixel_width, info.pixel_height).ok()?;
        Some(MergedVectorProduct {
            raster: plan.raster.clone(),
            vector: plan.vector.clone(),
            sieve_pixels,
        })
    }
}
