//! Per-stage pipeline configuration, validated once at entry

use floodmap_core::config::LayeredConfig;
use floodmap_core::error::{FloodError, Result};
use floodmap_core::models::{
    projection_code, validate_entries, FallbackThresholds, PixelSpacing, Polarization, SeedSet,
    StageKind, ThresholdEntry,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Terrain correction and naming parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrthoConfig {
    pub projection: String,
    /// Short code derived from `projection`, used in product names
    pub projection_code: String,
    pub pixel_spacing: PixelSpacing,
    pub dem: Option<PathBuf>,
}

/// Multi-threshold vector extraction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub thresholds: Vec<ThresholdEntry>,
    pub min_polygon_ha: f64,
    pub mask: Option<PathBuf>,
}

/// Vegetation branch parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VegetationConfig {
    pub calibrate: bool,
    pub seeds: SeedSet,
    pub fallback: FallbackThresholds,
    pub analysis_polarization: Option<Polarization>,
    pub land_cover: Option<PathBuf>,
}

/// Merge stage parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    pub hole_size_ha: f64,
    pub open_water: Option<PathBuf>,
    pub polarization: Option<Polarization>,
    pub threshold: Option<u32>,
}

/// Complete, validated pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub workspace: PathBuf,
    pub disabled_stages: Vec<StageKind>,
    pub ortho: OrthoConfig,
    pub extract: ExtractConfig,
    pub vegetation: VegetationConfig,
    pub merge: MergeConfig,
}

impl PipelineConfig {
    /// Build from resolved layered configuration and validate
    pub fn from_layered(workspace: impl Into<PathBuf>, layered: &LayeredConfig) -> Result<Self> {
        let projection = layered
            .projection
            .value
            .clone()
            .ok_or_else(|| FloodError::ConfigMissing { key: "projection".to_string() })?;

        let config = Self {
            workspace: workspace.into(),
            disabled_stages: layered.disabled_stages.value.clone(),
            ortho: OrthoConfig {
                projection_code: projection_code(&projection)?,
                projection,
                pixel_spacing: layered.pixel_spacing.value,
                dem: layered.dem.value.clone(),
            },
            extract: ExtractConfig {
                thresholds: layered.thresholds.value.clone(),
                min_polygon_ha: layered.min_polygon_ha.value,
                mask: layered.mask.value.clone(),
            },
            vegetation: VegetationConfig {
                calibrate: layered.calibrate.value,
                seeds: layered.seeds.value.clone(),
                fallback: FallbackThresholds {
                    open_water: layered.open_water_threshold.value,
                    veg_flood: layered.veg_flood_threshold.value,
                },
                analysis_polarization: layered.analysis_polarization.value,
                land_cover: layered.land_cover.value.clone(),
            },
            merge: MergeConfig {
                hole_size_ha: layered.hole_size_ha.value,
                open_water: layered.merge_open_water.value.clone(),
                polarization: layered.merge_polarization.value,
                threshold: layered.merge_threshold.value,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn is_enabled(&self, stage: StageKind) -> bool {
        !self.disabled_stages.contains(&stage)
    }

    /// Checks that need no toolkit access
    ///
    /// The all-zero mask check needs raster statistics and runs in the controller.
    pub fn validate(&self) -> Result<()> {
        let spacing = self.ortho.pixel_spacing;
        if !(spacing.x.is_finite() && spacing.y.is_finite() && spacing.x > 0.0 && spacing.y > 0.0) {
            return Err(FloodError::validation(
                "pixel_spacing",
                format!("{} must contain positive spacings", spacing),
            ));
        }

        if self.is_enabled(StageKind::Ortho) {
            match &self.ortho.dem {
                None => {
                    return Err(FloodError::ConfigMissing { key: "dem".to_string() });
                }
                Some(dem) if !dem.exists() => {
                    return Err(FloodError::validation(
                        "dem",
                        format!("{} does not exist", dem.display()),
                    ));
                }
                Some(_) => {}
            }
        }

        if let Some(mask) = &self.extract.mask {
            if !mask.is_file() {
                return Err(FloodError::validation(
                    "mask",
                    format!("{} does not exist", mask.display()),
                ));
            }
        }

        if let Some(land_cover) = &self.vegetation.land_cover {
            if !land_cover.is_file() {
                return Err(FloodError::validation(
                    "land_cover",
                    format!("{} does not exist", land_cover.display()),
                ));
            }
        }

        positive("min_polygon_size", self.extract.min_polygon_ha)?;
        positive("hole_size", self.merge.hole_size_ha)?;
        validate_entries(&self.extract.thresholds)?;

        Ok(())
    }
}

fn positive(parameter: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FloodError::validation(parameter, format!("{} must be a positive number of hectares", value)))
    }
}
