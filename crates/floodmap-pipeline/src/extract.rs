//! Multi-threshold flood vector extraction

use crate::stage::{run_stage, StageDescriptor};
use floodmap_core::error::{FloodError, Result};
use floodmap_core::models::{
    value_token, FloodVectorProduct, Polarization, StageDir, StageKind, ThresholdRange,
};
use floodmap_core::ports::{ClassRange, RasterToolkit};
use floodmap_core::RunWorkspace;
use floodmap_geo::polygon::filter_flood_polygons;
use std::cell::Cell;
use std::path::{Path, PathBuf};

/// Suffix of scaled and median-filtered images, dropped from vector names
pub const FILTERED_SUFFIX: &str = "_8bit_MED3x3";

const MAJORITY_WINDOW: usize = 5;

/// One image swept over a threshold range
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    pub image: PathBuf,
    pub polarization: Polarization,
    pub range: ThresholdRange,
    pub min_polygon_ha: f64,
    pub mask: Option<PathBuf>,
}

/// Paths involved in producing one flood vector
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedProduct {
    pub threshold: u32,
    pub classified: PathBuf,
    pub majority: PathBuf,
    pub polygons: PathBuf,
    pub product: FloodVectorProduct,
}

/// Name stem shared by every product derived from `image`
pub fn product_stem(image: &Path) -> String {
    let stem = image.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    stem.strip_suffix(FILTERED_SUFFIX).unwrap_or(stem).to_string()
}

/// Deterministic product list for a request; nothing is written
pub fn plan_products<T: RasterToolkit + ?Sized>(
    toolkit: &T,
    workspace: &RunWorkspace,
    request: &ExtractionRequest,
) -> Vec<PlannedProduct> {
    let stem = product_stem(&request.image);
    let scratch = workspace.stage_path(StageDir::Scratch);
    let vectors = workspace.stage_path(StageDir::VectorWater);
    let (rext, vext) = (toolkit.raster_extension(), toolkit.vector_extension());
    let mask_suffix = if request.mask.is_some() { "_m" } else { "" };

    request
        .range
        .values()
        .map(|t| {
            let path = vectors.join(format!(
                "{}_thr_{}_{}ha{}.{}",
                stem,
                t,
                value_token(request.min_polygon_ha),
                mask_suffix,
                vext
            ));
            PlannedProduct {
                threshold: t,
                classified: scratch.join(format!("{}_thr_{}_class.{}", stem, t, rext)),
                majority: scratch.join(format!("{}_thr_{}_maj.{}", stem, t, rext)),
                polygons: scratch.join(format!("{}_thr_{}_poly.{}", stem, t, vext)),
                product: FloodVectorProduct {
                    path,
                    source: request.image.clone(),
                    threshold: t,
                    min_polygon_ha: request.min_polygon_ha,
                    masked: request.mask.is_some(),
                    polygon_count: None,
                },
            }
        })
        .collect()
}

/// Produce one flood vector; returns the number of polygons kept
pub fn extract_threshold<T: RasterToolkit + ?Sized>(
    toolkit: &T,
    request: &ExtractionRequest,
    planned: &PlannedProduct,
) -> Result<usize> {
    let range = ClassRange::flood_band(f64::from(planned.threshold));
    toolkit.classify(&request.image, 0, &range, request.mask.as_deref(), &planned.classified)?;
    toolkit.filter_majority(&planned.classified, &planned.majority, MAJORITY_WINDOW)?;
    toolkit.raster_to_polygon(&planned.majority, &planned.polygons)?;

    let polygons = toolkit.read_polygons(&planned.polygons)?;
    let outcome = filter_flood_polygons(polygons, request.min_polygon_ha);
    tracing::debug!(
        threshold = planned.threshold,
        kept = outcome.kept.len(),
        dropped_small = outcome.dropped_small,
        "Filtered flood polygons"
    );

    toolkit.write_polygons(&outcome.kept, &planned.product.path)?;
    Ok(outcome.kept.len())
}

/// Stage descriptors for every planned product, recording polygon counts into `counts`
pub fn extraction_stages<'a, T: RasterToolkit + ?Sized>(
    toolkit: &'a T,
    request: &'a ExtractionRequest,
    plans: &'a [PlannedProduct],
    counts: &'a [Cell<Option<usize>>],
) -> Vec<StageDescriptor<'a>> {
    let mut inputs = vec![request.image.clone()];
    inputs.extend(request.mask.iter().cloned());

    plans
        .iter()
        .zip(counts)
        .map(|(planned, count)| {
            let label = format!(
                "vectorize {} thr {}",
                product_stem(&request.image),
                planned.threshold
            );
            StageDescriptor::new(StageKind::Vectorize, label, move || {
                count.set(Some(extract_threshold(toolkit, request, planned)?));
                Ok(())
            })
            .with_inputs(inputs.clone())
            .with_outputs(vec![planned.product.path.clone()])
        })
        .collect()
}

/// Sweep the request's threshold range, one product per threshold
///
/// Existing products are kept as they are. Fails on the first threshold
/// whose product cannot be produced.
pub fn extract_flood_vectors<T: RasterToolkit + ?Sized>(
    toolkit: &T,
    workspace: &RunWorkspace,
    request: &ExtractionRequest,
) -> Result<Vec<FloodVectorProduct>> {
    if let Some(mask) = &request.mask {
        validate_mask(toolkit, mask)?;
    }
    workspace.ensure_stage(StageDir::VectorWater)?;
    workspace.ensure_stage(StageDir::Scratch)?;

    let plans = plan_products(toolkit, workspace, request);
    let counts: Vec<Cell<Option<usize>>> = plans.iter().map(|_| Cell::new(None)).collect();

    for descriptor in extraction_stages(toolkit, request, &plans, &counts) {
        let result = run_stage(descriptor);
        if let Some(error) = result.error {
            return Err(FloodError::StageFailed { stage: result.label, reason: error.to_string() });
        }
    }

    Ok(plans
        .into_iter()
        .zip(counts)
        .map(|(planned, count)| FloodVectorProduct { polygon_count: count.get(), ..planned.product })
        .collect())
}

/// Reject a processing mask that is unreadable or has no pixel equal to 1
pub fn validate_mask<T: RasterToolkit + ?Sized>(toolkit: &T, mask: &Path) -> Result<()> {
    toolkit.raster_info(mask).map_err(|e| {
        FloodError::validation("mask", format!("{} could not be read: {}", mask.display(), e))
    })?;

    // Masking the mask by itself leaves only the pixels selected for processing
    if toolkit.raster_statistics(mask, 0, Some(mask)).is_err() {
        return Err(FloodError::validation(
            "mask",
            format!("{} selects no pixels (no value equals 1)", mask.display()),
        ));
    }
    Ok(())
}
