//! Run command implementation

use crate::cli::RunArgs;
use crate::config_loader::{load_workspace_config_with_overrides, open_workspace};
use crate::dry_run::{display_planned_actions, PlannedAction};
use crate::errors::from_flood_error;
use crate::output::OutputWriter;
use crate::output_types::{ProductSummary, RunOutput, StageCounts};
use crate::progress::RunProgress;
use anyhow::{Context, Result};
use floodmap_core::config::{parse_hectares, parse_stage, CliConfigOverrides};
use floodmap_core::models::{PixelSpacing, Polarization, SeedSet, StageStatus, ThresholdEntry};
use floodmap_pipeline::{Pipeline, PipelineConfig, PipelineResult, RunStatus};
use floodmap_toolkit::LocalToolkit;

pub fn execute(args: RunArgs, output: &OutputWriter, dry_run: bool) -> Result<()> {
    let workspace = open_workspace(&args.workspace)?;
    let overrides = overrides_from_args(&args)?;
    let layered = load_workspace_config_with_overrides(&workspace, overrides)?;
    let config =
        PipelineConfig::from_layered(workspace.root(), &layered).map_err(from_flood_error)?;
    let pipeline = Pipeline::new(LocalToolkit, config).map_err(from_flood_error)?;

    if dry_run {
        let planned = pipeline.plan().map_err(from_flood_error)?;
        let actions: Vec<PlannedAction> = planned.iter().map(PlannedAction::from_stage).collect();
        display_planned_actions(output, &actions);
        return Ok(());
    }

    let result = if output.is_json() {
        pipeline.run()
    } else {
        let mut progress = RunProgress::new();
        let result = pipeline.run_with_progress(|event| progress.update(&event));
        progress.finish();
        result
    }
    .map_err(from_flood_error)?;

    report(output, &result)?;

    if let Some(failure) = result.first_failure() {
        return Err(anyhow::Error::new(failure).context("Pipeline run failed"));
    }
    Ok(())
}

/// Translate command-line flags into configuration overrides
fn overrides_from_args(args: &RunArgs) -> Result<CliConfigOverrides> {
    let pixel_spacing = args
        .pixel_spacing
        .as_deref()
        .map(str::parse::<PixelSpacing>)
        .transpose()
        .context("Invalid --pixel-spacing")?;
    let min_polygon_ha = args
        .min_polygon_size
        .as_deref()
        .map(|v| parse_hectares("min_polygon_size", v))
        .transpose()?;
    let hole_size_ha = args
        .hole_size
        .as_deref()
        .map(|v| parse_hectares("hole_size", v))
        .transpose()?;
    let thresholds = args
        .thresholds
        .iter()
        .map(|t| t.parse::<ThresholdEntry>())
        .collect::<floodmap_core::Result<Vec<_>>>()?;
    let disabled_stages = args
        .skip
        .iter()
        .map(|s| parse_stage(s))
        .collect::<floodmap_core::Result<Vec<_>>>()?;
    let analysis_polarization = args
        .analysis_polarization
        .as_deref()
        .map(str::parse::<Polarization>)
        .transpose()
        .context("Invalid --analysis-polarization")?;
    let merge_polarization = args
        .merge_polarization
        .as_deref()
        .map(str::parse::<Polarization>)
        .transpose()
        .context("Invalid --merge-polarization")?;

    Ok(CliConfigOverrides {
        projection: args.projection.clone(),
        pixel_spacing,
        dem: args.dem.clone(),
        min_polygon_ha,
        hole_size_ha,
        mask: args.mask.clone(),
        land_cover: args.land_cover.clone(),
        calibrate: args.calibrate.then_some(true),
        open_water_threshold: args.open_water_threshold,
        veg_flood_threshold: args.veg_flood_threshold,
        analysis_polarization,
        seeds: SeedSet {
            open_water: args.seed_water.clone(),
            non_flood_vegetation: args.seed_non_flood.clone(),
            flood_vegetation: args.seed_flood.clone(),
        },
        thresholds,
        disabled_stages,
        merge_open_water: args.merge_open_water.clone(),
        merge_polarization,
        merge_threshold: args.merge_threshold,
        ..Default::default()
    })
}

fn report(output: &OutputWriter, result: &PipelineResult) -> Result<()> {
    let counts = StageCounts {
        completed: result.count(StageStatus::Completed),
        skipped: result.stages.iter().filter(|s| s.status.is_skipped()).count(),
        failed: result.count(StageStatus::Failed),
    };

    if output.is_json() {
        let products = &result.products;
        let json_output = RunOutput {
            status: result.status.as_str().to_string(),
            report: result.report.as_ref().map(|p| p.display().to_string()),
            stages: counts,
            products: ProductSummary {
                mosaic: products.mosaic.as_ref().map(|p| p.display().to_string()),
                flood_vectors: products
                    .flood_vectors
                    .iter()
                    .map(|v| v.path.display().to_string())
                    .collect(),
                vegetation: products.vegetation.iter().map(|p| p.display().to_string()).collect(),
                merged_raster: products.merged.as_ref().map(|m| m.raster.display().to_string()),
                merged_vector: products.merged.as_ref().map(|m| m.vector.display().to_string()),
            },
            warnings: result.warnings.iter().map(|w| w.message.clone()).collect(),
        };
        return output.result(json_output);
    }

    for warning in &result.warnings {
        output.warning(format!("{}: {}", warning.parameter, warning.message));
    }

    match result.status {
        RunStatus::NothingToProcess => output.info("No scenes to process"),
        RunStatus::Success => output.success(format!(
            "Run finished: {} completed, {} skipped",
            counts.completed, counts.skipped
        )),
        RunStatus::Failed => output.warning(format!(
            "Run stopped: {} completed, {} skipped, {} failed",
            counts.completed, counts.skipped, counts.failed
        )),
    }

    if let Some(calibration) = &result.calibration {
        output.section("Vegetation Thresholds");
        output.kv("Open water", format!("{} dB", calibration.thresholds.open_water));
        output.kv("Flooded vegetation", format!("{} dB", calibration.thresholds.veg_flood));
        output.kv("Source", format!("{:?}", calibration.source));
    }

    let products = &result.products;
    if products.mosaic.is_some() {
        output.section("Products");
        if let Some(mosaic) = &products.mosaic {
            output.kv("Mosaic", mosaic.display());
        }
        output.kv("Flood vectors", products.flood_vectors.len());
        output.kv("Vegetation rasters", products.vegetation.len());
        if let Some(merged) = &products.merged {
            output.kv("Merged raster", merged.raster.display());
            output.kv("Merged vector", merged.vector.display());
        }
    }

    if let Some(report) = &result.report {
        output.kv("Report", report.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use floodmap_core::models::StageKind;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["floodmap", "run"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Run(args) => args,
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_flags_become_overrides() {
        let args = run_args(&[
            "--pixel-spacing",
            "10,10",
            "--threshold",
            "HH:9:11",
            "--threshold",
            "VV:3:5",
            "--skip",
            "ortho",
            "--open-water-threshold",
            "-13",
            "--calibrate",
            "--seed-water",
            "water.geojson",
        ]);

        let overrides = overrides_from_args(&args).unwrap();

        assert_eq!(overrides.pixel_spacing, Some(PixelSpacing { x: 10.0, y: 10.0 }));
        assert_eq!(overrides.thresholds, vec![ThresholdEntry::new("HH", 9, 11), ThresholdEntry::new("VV", 3, 5)]);
        assert_eq!(overrides.disabled_stages, vec![StageKind::Ortho]);
        assert_eq!(overrides.open_water_threshold, Some(-13.0));
        assert_eq!(overrides.calibrate, Some(true));
        assert!(overrides.seeds.open_water.is_some());
        assert!(overrides.seeds.flood_vegetation.is_none());
    }

    #[test]
    fn test_merge_flags_select_open_water_product() {
        let args = run_args(&["--merge-polarization", "HV", "--merge-threshold", "5"]);

        let overrides = overrides_from_args(&args).unwrap();

        assert_eq!(overrides.merge_polarization, Some(Polarization::HV));
        assert_eq!(overrides.merge_threshold, Some(5));
        assert!(overrides.merge_open_water.is_none());
        assert!(overrides_from_args(&run_args(&["--merge-polarization", "XX"])).is_err());
    }

    #[test]
    fn test_unset_flags_leave_lower_layers_alone() {
        let overrides = overrides_from_args(&run_args(&[])).unwrap();

        assert!(overrides.calibrate.is_none());
        assert!(overrides.thresholds.is_empty());
        assert_eq!(overrides.seeds, SeedSet::default());
    }

    #[test]
    fn test_bad_values_are_rejected() {
        assert!(overrides_from_args(&run_args(&["--skip", "mosaik"])).is_err());
        assert!(overrides_from_args(&run_args(&["--threshold", "HH:10"])).is_err());
        assert!(overrides_from_args(&run_args(&["--min-polygon-size", "0"])).is_err());
    }
}
