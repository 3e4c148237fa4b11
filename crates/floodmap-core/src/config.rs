use crate::error::{FloodError, Result};
use crate::models::{
    PixelSpacing, Polarization, SeedSet, StageKind, ThresholdEntry, ThresholdSet,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default minimum flood polygon area (hectares)
pub const DEFAULT_MIN_POLYGON_HA: f64 = 2.5;

/// Default sieve hole size for the merge stage (hectares)
pub const DEFAULT_HOLE_SIZE_HA: f64 = 2.5;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for a flood mapping run
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub projection: ConfigValue<Option<String>>,
    pub pixel_spacing: ConfigValue<PixelSpacing>,
    pub dem: ConfigValue<Option<PathBuf>>,
    pub min_polygon_ha: ConfigValue<f64>,
    pub hole_size_ha: ConfigValue<f64>,
    pub mask: ConfigValue<Option<PathBuf>>,
    pub land_cover: ConfigValue<Option<PathBuf>>,
    pub calibrate: ConfigValue<bool>,
    pub open_water_threshold: ConfigValue<Option<f64>>,
    pub veg_flood_threshold: ConfigValue<Option<f64>>,
    pub analysis_polarization: ConfigValue<Option<Polarization>>,
    pub seeds: ConfigValue<SeedSet>,
    pub thresholds: ConfigValue<Vec<ThresholdEntry>>,
    pub disabled_stages: ConfigValue<Vec<StageKind>>,
    pub merge_open_water: ConfigValue<Option<PathBuf>>,
    pub merge_polarization: ConfigValue<Option<Polarization>>,
    pub merge_threshold: ConfigValue<Option<u32>>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        let default_thresholds = ThresholdSet::defaults()
            .iter()
            .map(|(p, r)| ThresholdEntry::new(p.as_str(), r.min as i64, r.max as i64))
            .collect();

        Self {
            projection: ConfigValue::new(None, ConfigSource::Default),
            pixel_spacing: ConfigValue::new(PixelSpacing::default(), ConfigSource::Default),
            dem: ConfigValue::new(None, ConfigSource::Default),
            min_polygon_ha: ConfigValue::new(DEFAULT_MIN_POLYGON_HA, ConfigSource::Default),
            hole_size_ha: ConfigValue::new(DEFAULT_HOLE_SIZE_HA, ConfigSource::Default),
            mask: ConfigValue::new(None, ConfigSource::Default),
            land_cover: ConfigValue::new(None, ConfigSource::Default),
            calibrate: ConfigValue::new(false, ConfigSource::Default),
            open_water_threshold: ConfigValue::new(None, ConfigSource::Default),
            veg_flood_threshold: ConfigValue::new(None, ConfigSource::Default),
            analysis_polarization: ConfigValue::new(None, ConfigSource::Default),
            seeds: ConfigValue::new(SeedSet::default(), ConfigSource::Default),
            thresholds: ConfigValue::new(default_thresholds, ConfigSource::Default),
            disabled_stages: ConfigValue::new(Vec::new(), ConfigSource::Default),
            merge_open_water: ConfigValue::new(None, ConfigSource::Default),
            merge_polarization: ConfigValue::new(None, ConfigSource::Default),
            merge_threshold: ConfigValue::new(None, ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    ///
    /// Relative paths in the file are resolved against the file's directory.
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| FloodError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| FloodError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        let base = path.as_ref().parent().map(Path::to_path_buf).unwrap_or_default();
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };

        if let Some(projection) = file_config.projection {
            self.projection.update(Some(projection), ConfigSource::File);
        }

        if let Some(spacing) = file_config.pixel_spacing {
            let spacing = spacing.parse::<PixelSpacing>().map_err(|e| FloodError::ConfigInvalid {
                key: "pixel_spacing".to_string(),
                reason: e.to_string(),
            })?;
            self.pixel_spacing.update(spacing, ConfigSource::File);
        }

        if let Some(dem) = file_config.dem {
            self.dem.update(Some(resolve(dem)), ConfigSource::File);
        }

        if let Some(min_polygon) = file_config.min_polygon_size {
            self.min_polygon_ha.update(min_polygon, ConfigSource::File);
        }

        if let Some(hole_size) = file_config.hole_size {
            self.hole_size_ha.update(hole_size, ConfigSource::File);
        }

        if let Some(mask) = file_config.mask {
            self.mask.update(Some(resolve(mask)), ConfigSource::File);
        }

        if let Some(land_cover) = file_config.land_cover {
            self.land_cover.update(Some(resolve(land_cover)), ConfigSource::File);
        }

        if let Some(calibrate) = file_config.calibrate {
            self.calibrate.update(calibrate, ConfigSource::File);
        }

        if let Some(threshold) = file_config.open_water_threshold {
            self.open_water_threshold.update(Some(threshold), ConfigSource::File);
        }

        if let Some(threshold) = file_config.veg_flood_threshold {
            self.veg_flood_threshold.update(Some(threshold), ConfigSource::File);
        }

        if let Some(polarization) = file_config.analysis_polarization {
            self.analysis_polarization.update(Some(polarization), ConfigSource::File);
        }

        if let Some(seeds) = file_config.seeds {
            let seeds = SeedSet {
                open_water: seeds.open_water.map(&resolve),
                non_flood_vegetation: seeds.non_flood_vegetation.map(&resolve),
                flood_vegetation: seeds.flood_vegetation.map(&resolve),
            };
            self.seeds.update(seeds, ConfigSource::File);
        }

        if let Some(thresholds) = file_config.thresholds {
            self.thresholds.update(thresholds, ConfigSource::File);
        }

        if let Some(skip) = file_config.skip {
            self.disabled_stages.update(skip, ConfigSource::File);
        }

        if let Some(merge) = file_config.merge {
            if let Some(open_water) = merge.open_water {
                self.merge_open_water.update(Some(resolve(open_water)), ConfigSource::File);
            }
            if let Some(polarization) = merge.polarization {
                self.merge_polarization.update(Some(polarization), ConfigSource::File);
            }
            if let Some(threshold) = merge.threshold {
                self.merge_threshold.update(Some(threshold), ConfigSource::File);
            }
        }

        Ok(self)
    }

    /// Load the workspace file if it exists
    pub fn load_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        if path.as_ref().is_file() {
            self.load_from_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // FLOODMAP_PROJECTION
        if let Ok(projection) = env::var("FLOODMAP_PROJECTION") {
            self.projection.update(Some(projection), ConfigSource::Environment);
        }

        // FLOODMAP_PIXEL_SPACING
        if let Ok(spacing_str) = env::var("FLOODMAP_PIXEL_SPACING") {
            match spacing_str.parse::<PixelSpacing>() {
                Ok(spacing) => self.pixel_spacing.update(spacing, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid FLOODMAP_PIXEL_SPACING value '{}': expected x,y e.g. 12.5,12.5",
                    spacing_str
                ),
            }
        }

        // FLOODMAP_DEM
        if let Ok(dem) = env::var("FLOODMAP_DEM") {
            self.dem.update(Some(PathBuf::from(dem)), ConfigSource::Environment);
        }

        // FLOODMAP_MIN_POLYGON_HA
        if let Ok(value) = env::var("FLOODMAP_MIN_POLYGON_HA") {
            match parse_hectares("min_polygon_size", &value) {
                Ok(ha) => self.min_polygon_ha.update(ha, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid FLOODMAP_MIN_POLYGON_HA value '{}': expected positive hectares",
                    value
                ),
            }
        }

        // FLOODMAP_HOLE_SIZE_HA
        if let Ok(value) = env::var("FLOODMAP_HOLE_SIZE_HA") {
            match parse_hectares("hole_size", &value) {
                Ok(ha) => self.hole_size_ha.update(ha, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid FLOODMAP_HOLE_SIZE_HA value '{}': expected positive hectares",
                    value
                ),
            }
        }

        // FLOODMAP_MASK
        if let Ok(mask) = env::var("FLOODMAP_MASK") {
            self.mask.update(Some(PathBuf::from(mask)), ConfigSource::Environment);
        }

        // FLOODMAP_LAND_COVER
        if let Ok(land_cover) = env::var("FLOODMAP_LAND_COVER") {
            self.land_cover.update(Some(PathBuf::from(land_cover)), ConfigSource::Environment);
        }

        // FLOODMAP_CALIBRATE
        if let Ok(value) = env::var("FLOODMAP_CALIBRATE") {
            match parse_bool(&value) {
                Some(calibrate) => self.calibrate.update(calibrate, ConfigSource::Environment),
                None => tracing::warn!(
                    "Invalid FLOODMAP_CALIBRATE value '{}': expected true or false",
                    value
                ),
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(projection) = overrides.projection {
            self.projection.update(Some(projection), ConfigSource::Cli);
        }

        if let Some(spacing) = overrides.pixel_spacing {
            self.pixel_spacing.update(spacing, ConfigSource::Cli);
        }

        if let Some(dem) = overrides.dem {
            self.dem.update(Some(dem), ConfigSource::Cli);
        }

        if let Some(min_polygon) = overrides.min_polygon_ha {
            self.min_polygon_ha.update(min_polygon, ConfigSource::Cli);
        }

        if let Some(hole_size) = overrides.hole_size_ha {
            self.hole_size_ha.update(hole_size, ConfigSource::Cli);
        }

        if let Some(mask) = overrides.mask {
            self.mask.update(Some(mask), ConfigSource::Cli);
        }

        if let Some(land_cover) = overrides.land_cover {
            self.land_cover.update(Some(land_cover), ConfigSource::Cli);
        }

        if let Some(calibrate) = overrides.calibrate {
            self.calibrate.update(calibrate, ConfigSource::Cli);
        }

        if let Some(threshold) = overrides.open_water_threshold {
            self.open_water_threshold.update(Some(threshold), ConfigSource::Cli);
        }

        if let Some(threshold) = overrides.veg_flood_threshold {
            self.veg_flood_threshold.update(Some(threshold), ConfigSource::Cli);
        }

        if let Some(polarization) = overrides.analysis_polarization {
            self.analysis_polarization.update(Some(polarization), ConfigSource::Cli);
        }

        let seeds = overrides.seeds;
        if seeds != SeedSet::default() {
            let mut merged = self.seeds.value.clone();
            if seeds.open_water.is_some() {
                merged.open_water = seeds.open_water;
            }
            if seeds.non_flood_vegetation.is_some() {
                merged.non_flood_vegetation = seeds.non_flood_vegetation;
            }
            if seeds.flood_vegetation.is_some() {
                merged.flood_vegetation = seeds.flood_vegetation;
            }
            self.seeds.update(merged, ConfigSource::Cli);
        }

        if !overrides.thresholds.is_empty() {
            self.thresholds.update(overrides.thresholds, ConfigSource::Cli);
        }

        if !overrides.disabled_stages.is_empty() {
            self.disabled_stages.update(overrides.disabled_stages, ConfigSource::Cli);
        }

        if let Some(open_water) = overrides.merge_open_water {
            self.merge_open_water.update(Some(open_water), ConfigSource::Cli);
        }

        if let Some(polarization) = overrides.merge_polarization {
            self.merge_polarization.update(Some(polarization), ConfigSource::Cli);
        }

        if let Some(threshold) = overrides.merge_threshold {
            self.merge_threshold.update(Some(threshold), ConfigSource::Cli);
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();
        let path_or_unset = |p: &Option<PathBuf>| {
            p.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "(unset)".to_string())
        };
        let number_or_unset =
            |v: &Option<f64>| v.map(|v| v.to_string()).unwrap_or_else(|| "(unset)".to_string());

        map.insert(
            "projection".to_string(),
            (
                self.projection.value.clone().unwrap_or_else(|| "(unset)".to_string()),
                self.projection.source,
            ),
        );
        map.insert(
            "pixel_spacing".to_string(),
            (self.pixel_spacing.value.to_string(), self.pixel_spacing.source),
        );
        map.insert("dem".to_string(), (path_or_unset(&self.dem.value), self.dem.source));
        map.insert(
            "min_polygon_size".to_string(),
            (format!("{} ha", self.min_polygon_ha.value), self.min_polygon_ha.source),
        );
        map.insert(
            "hole_size".to_string(),
            (format!("{} ha", self.hole_size_ha.value), self.hole_size_ha.source),
        );
        map.insert("mask".to_string(), (path_or_unset(&self.mask.value), self.mask.source));
        map.insert(
            "land_cover".to_string(),
            (path_or_unset(&self.land_cover.value), self.land_cover.source),
        );
        map.insert(
            "calibrate".to_string(),
            (self.calibrate.value.to_string(), self.calibrate.source),
        );
        map.insert(
            "open_water_threshold".to_string(),
            (number_or_unset(&self.open_water_threshold.value), self.open_water_threshold.source),
        );
        map.insert(
            "veg_flood_threshold".to_string(),
            (number_or_unset(&self.veg_flood_threshold.value), self.veg_flood_threshold.source),
        );
        map.insert(
            "thresholds".to_string(),
            (
                self.thresholds
                    .value
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join(" "),
                self.thresholds.source,
            ),
        );
        map.insert(
            "skip".to_string(),
            (
                self.disabled_stages
                    .value
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                self.disabled_stages.source,
            ),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    projection: Option<String>,
    pixel_spacing: Option<String>,
    dem: Option<PathBuf>,
    min_polygon_size: Option<f64>,
    hole_size: Option<f64>,
    mask: Option<PathBuf>,
    land_cover: Option<PathBuf>,
    calibrate: Option<bool>,
    open_water_threshold: Option<f64>,
    veg_flood_threshold: Option<f64>,
    analysis_polarization: Option<Polarization>,
    skip: Option<Vec<StageKind>>,
    thresholds: Option<Vec<ThresholdEntry>>,
    seeds: Option<FileSeeds>,
    merge: Option<FileMerge>,
}

#[derive(Debug, Deserialize, Serialize)]
struct FileSeeds {
    open_water: Option<PathBuf>,
    non_flood_vegetation: Option<PathBuf>,
    flood_vegetation: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize)]
struct FileMerge {
    open_water: Option<PathBuf>,
    polarization: Option<Polarization>,
    threshold: Option<u32>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub projection: Option<String>,
    pub pixel_spacing: Option<PixelSpacing>,
    pub dem: Option<PathBuf>,
    pub min_polygon_ha: Option<f64>,
    pub hole_size_ha: Option<f64>,
    pub mask: Option<PathBuf>,
    pub land_cover: Option<PathBuf>,
    pub calibrate: Option<bool>,
    pub open_water_threshold: Option<f64>,
    pub veg_flood_threshold: Option<f64>,
    pub analysis_polarization: Option<Polarization>,
    pub seeds: SeedSet,
    pub thresholds: Vec<ThresholdEntry>,
    pub disabled_stages: Vec<StageKind>,
    pub merge_open_water: Option<PathBuf>,
    pub merge_polarization: Option<Polarization>,
    pub merge_threshold: Option<u32>,
}

/// Parse a positive area in hectares
pub fn parse_hectares(key: &str, s: &str) -> Result<f64> {
    let value: f64 = s.trim().parse().map_err(|_| FloodError::ConfigInvalid {
        key: key.to_string(),
        reason: format!("'{}' is not a number", s),
    })?;
    if !(value.is_finite() && value > 0.0) {
        return Err(FloodError::ConfigInvalid {
            key: key.to_string(),
            reason: format!("{} must be greater than 0 hectares", value),
        });
    }
    Ok(value)
}

/// Parse a stage name as accepted by `skip`
pub fn parse_stage(s: &str) -> Result<StageKind> {
    StageKind::parse(s).ok_or_else(|| FloodError::ConfigInvalid {
        key: "skip".to_string(),
        reason: format!(
            "Unknown stage '{}'. Use one of: {}",
            s,
            StageKind::ALL.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
        ),
    })
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
