//! Flooded-vegetation branch: speckle filtering, decibel conversion,
//! classification and land-cover combination

use floodmap_core::error::Result;
use floodmap_core::models::{value_token, Polarization, StageDir, VegetationThresholds};
use floodmap_core::ports::{ClassRange, OverlayMethod, RasterToolkit};
use floodmap_core::RunWorkspace;
use std::path::{Path, PathBuf};

const SPECKLE_WINDOW: usize = 5;
const SPECKLE_LOOKS: f32 = 4.0;

/// Choose the channel analysed for flooded vegetation
///
/// A configured polarization wins when it is available, otherwise HH, otherwise
/// the first available channel.
pub fn analysis_polarization(
    configured: Option<Polarization>,
    available: &[Polarization],
) -> Option<Polarization> {
    if let Some(p) = configured.filter(|p| available.contains(p)) {
        return Some(p);
    }
    if available.contains(&Polarization::HH) {
        return Some(Polarization::HH);
    }
    available.first().copied()
}

/// Products of the vegetation branch for one mosaic channel
#[derive(Debug, Clone, PartialEq)]
pub struct VegetationPaths {
    pub polarization: Polarization,
    pub channel: PathBuf,
    pub gamma: PathBuf,
    pub decibels: PathBuf,
    pub vegetation: PathBuf,
    pub water: PathBuf,
    pub land_cover: PathBuf,
    pub union: PathBuf,
    pub combined: PathBuf,
}

impl VegetationPaths {
    pub fn new<T: RasterToolkit + ?Sized>(
        toolkit: &T,
        workspace: &RunWorkspace,
        mosaic_stem: &str,
        polarization: Polarization,
        channel: PathBuf,
        thresholds: &VegetationThresholds,
    ) -> Self {
        let ext = toolkit.raster_extension();
        let scaled = workspace.stage_path(StageDir::Scaled);
        let scratch = workspace.stage_path(StageDir::Scratch);
        let base = format!("{}_{}", mosaic_stem, polarization);
        let veg = value_token(thresholds.veg_flood);
        let water = value_token(thresholds.open_water);

        Self {
            polarization,
            channel,
            gamma: scaled.join(format!("{}_gamma.{}", base, ext)),
            decibels: scaled.join(format!("{}_db.{}", base, ext)),
            vegetation: scaled.join(format!("{}_veg_{}.{}", base, veg, ext)),
            water: scaled.join(format!("{}_water_{}.{}", base, water, ext)),
            land_cover: scratch.join(format!("{}_landcover.{}", base, ext)),
            union: scratch.join(format!("{}_vegwater.{}", base, ext)),
            combined: workspace
                .stage_path(StageDir::VectorVeg)
                .join(format!("{}_{}_{}_vegflood.{}", base, veg, water, ext)),
        }
    }
}

/// Gamma-MAP speckle filter followed by decibel conversion
pub fn prepare_decibels<T: RasterToolkit + ?Sized>(toolkit: &T, paths: &VegetationPaths) -> Result<()> {
    toolkit.filter_speckle(&paths.channel, &paths.gamma, SPECKLE_WINDOW, SPECKLE_LOOKS)?;
    toolkit.to_decibels(&paths.gamma, 0, &paths.decibels)
}

/// Vegetation-flood and open-water bitmaps from the decibel image
pub fn classify_vegetation<T: RasterToolkit + ?Sized>(
    toolkit: &T,
    paths: &VegetationPaths,
    thresholds: &VegetationThresholds,
) -> Result<()> {
    toolkit.classify(
        &paths.decibels,
        0,
        &ClassRange::at_least(thresholds.veg_flood),
        None,
        &paths.vegetation,
    )?;

    let stats = toolkit.raster_statistics(&paths.decibels, 0, None)?;
    toolkit.classify(
        &paths.decibels,
        0,
        &ClassRange::above_up_to(stats.min, thresholds.open_water),
        None,
        &paths.water,
    )
}

/// `(vegetation ∪ water) ∩ land cover`, written to `VEGFEP/`
pub fn combine_vegetation<T: RasterToolkit + ?Sized>(
    toolkit: &T,
    paths: &VegetationPaths,
    land_cover: &Path,
) -> Result<()> {
    toolkit.rasterize(land_cover, &paths.decibels, 1.0, &paths.land_cover)?;
    toolkit.overlay(
        &[paths.vegetation.clone(), paths.water.clone()],
        OverlayMethod::Union,
        &paths.union,
    )?;
    toolkit.overlay(
        &[paths.union.clone(), paths.land_cover.clone()],
        OverlayMethod::Intersection,
        &paths.combined,
    )?;
    tracing::info!(output = %paths.combined.display(), "Combined flooded vegetation with land cover");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_analysis_polarization_prefers_configured_then_hh() {
        use Polarization::*;
        assert_eq!(analysis_polarization(Some(HV), &[HH, HV]), Some(HV));
        assert_eq!(analysis_polarization(Some(VV), &[HH, HV]), Some(HH));
        assert_eq!(analysis_polarization(None, &[VV, VH]), Some(VV));
        assert_eq!(analysis_polarization(None, &[]), None);
    }

    #[test]
    fn test_paths_encode_thresholds() {
        let dir = TempDir::new().unwrap();
        let workspace = RunWorkspace::init(dir.path()).unwrap();
        let toolkit = floodmap_toolkit::LocalToolkit;

        let paths = VegetationPaths::new(
            &toolkit,
            &workspace,
            "20110507_225921_UTM18_mos",
            Polarization::HH,
            dir.path().join("Mosaic/20110507_225921_UTM18_mos_HH.grd"),
            &VegetationThresholds { open_water: -13.0, veg_flood: -4.5 },
        );

        assert!(paths.vegetation.ends_with("Scaled/20110507_225921_UTM18_mos_HH_veg_m4p5.grd"));
        assert!(paths.water.ends_with("Scaled/20110507_225921_UTM18_mos_HH_water_m13.grd"));
        assert!(paths
            .combined
            .ends_with("VEGFEP/20110507_225921_UTM18_mos_HH_m4p5_m13_vegflood.grd"));
    }
}
