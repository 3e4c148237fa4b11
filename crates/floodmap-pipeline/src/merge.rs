//! Merge of open-water vectors and flooded-vegetation rasters

use floodmap_core::error::{FloodError, Result};
use floodmap_core::models::{sieve_pixel_count, value_token, MergedVectorProduct, StageDir};
use floodmap_core::ports::{ExportOptions, MosaicOptions, OverlayMethod, RasterToolkit};
use floodmap_core::RunWorkspace;
use std::path::{Path, PathBuf};

/// Sentinel no-data value of flooded-vegetation rasters
pub const VEGETATION_NODATA: f64 = 255.0;

/// Every path touched by one merge
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    pub open_water: PathBuf,
    pub vegetation: Vec<PathBuf>,
    pub hole_size_ha: f64,
    pub vegetation_mosaic: PathBuf,
    pub vegetation_normalized: PathBuf,
    pub open_water_raster: PathBuf,
    pub combined: PathBuf,
    pub sieved: PathBuf,
    pub polygons: PathBuf,
    pub raster: PathBuf,
    pub vector: PathBuf,
}

impl MergePlan {
    pub fn new<T: RasterToolkit + ?Sized>(
        toolkit: &T,
        workspace: &RunWorkspace,
        open_water: &Path,
        vegetation: Vec<PathBuf>,
        hole_size_ha: f64,
    ) -> Self {
        let (rext, vext) = (toolkit.raster_extension(), toolkit.vector_extension());
        let scratch = workspace.stage_path(StageDir::Scratch);
        let merged = workspace.stage_path(StageDir::Merged);
        let stem = open_water.file_stem().and_then(|s| s.to_str()).unwrap_or("open_water");
        let product = format!("{}_{}ha_MergeFEP", stem, value_token(hole_size_ha));

        Self {
            open_water: open_water.to_path_buf(),
            vegetation,
            hole_size_ha,
            vegetation_mosaic: scratch.join(format!("floodveg_mos.{}", rext)),
            vegetation_normalized: scratch.join(format!("floodveg_norm.{}", rext)),
            open_water_raster: scratch.join(format!("{}.{}", stem, rext)),
            combined: scratch.join(format!("combined.{}", rext)),
            sieved: scratch.join(format!("combined_sieve.{}", rext)),
            polygons: scratch.join(format!("combined_poly.{}", vext)),
            raster: merged.join(format!("{}.{}.gz", product, rext)),
            vector: merged.join(format!("{}.{}", product, vext)),
        }
    }

    pub fn outputs(&self) -> Vec<PathBuf> {
        vec![self.raster.clone(), self.vector.clone()]
    }
}

/// Combine open water and flooded vegetation into one sieved flood extent
pub fn merge_products<T: RasterToolkit + ?Sized>(toolkit: &T, plan: &MergePlan) -> Result<MergedVectorProduct> {
    if plan.vegetation.is_empty() {
        return Err(FloodError::StageFailed {
            stage: "merge".to_string(),
            reason: "no flooded-vegetation rasters to merge".to_string(),
        });
    }

    toolkit.mosaic(&plan.vegetation, &plan.vegetation_mosaic, &MosaicOptions::default())?;
    toolkit.replace_value(&plan.vegetation_mosaic, VEGETATION_NODATA, 0.0, &plan.vegetation_normalized)?;
    toolkit.rasterize(&plan.open_water, &plan.vegetation_normalized, 1.0, &plan.open_water_raster)?;
    toolkit.overlay(
        &[plan.vegetation_normalized.clone(), plan.open_water_raster.clone()],
        OverlayMethod::Union,
        &plan.combined,
    )?;

    let info = toolkit.raster_info(&plan.combined)?;
    let sieve_pixels = sieve_pixel_count(plan.hole_size_ha, info.pixel_width, info.pixel_height)?;
    tracing::info!(hole_size_ha = plan.hole_size_ha, sieve_pixels, "Sieving merged flood extent");
    toolkit.sieve(&plan.combined, &plan.sieved, sieve_pixels)?;

    toolkit.export(&plan.sieved, &plan.raster, &ExportOptions { band: None, compress: true })?;

    toolkit.raster_to_polygon(&plan.sieved, &plan.polygons)?;
    let flood: Vec<_> =
        toolkit.read_polygons(&plan.polygons)?.into_iter().filter(|p| p.is_flood()).collect();
    toolkit.write_polygons(&flood, &plan.vector)?;

    Ok(MergedVectorProduct {
        raster: plan.raster.clone(),
        vector: plan.vector.clone(),
        sieve_pixels,
    })
}
