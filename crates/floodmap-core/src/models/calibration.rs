//! Seed-region statistics and the separability test used to calibrate
//! decibel-domain thresholds

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Width of each class interval, in standard deviations either side of the mean.
///
/// Arbitrary but kept for compatibility with existing products; it is not a
/// validated statistical threshold.
pub const SEPARABILITY_MARGIN: f64 = 2.0;

/// Open-water threshold used when nothing better is available (dB)
pub const DEFAULT_OPEN_WATER_THRESHOLD: f64 = -3.5;

/// Flooded-vegetation threshold used when nothing better is available (dB)
pub const DEFAULT_VEG_FLOOD_THRESHOLD: f64 = -12.5;

/// Training class of a seed region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedClass {
    OpenWater,
    NonFloodVegetation,
    FloodVegetation,
}

impl SeedClass {
    pub const ALL: [SeedClass; 3] =
        [SeedClass::OpenWater, SeedClass::NonFloodVegetation, SeedClass::FloodVegetation];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeedClass::OpenWater => "open_water",
            SeedClass::NonFloodVegetation => "non_flood_vegetation",
            SeedClass::FloodVegetation => "flood_vegetation",
        }
    }
}

impl fmt::Display for SeedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labelled training polygons for one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedRegion {
    pub class: SeedClass,
    pub path: PathBuf,
}

impl SeedRegion {
    pub fn new(class: SeedClass, path: impl Into<PathBuf>) -> Self {
        Self { class, path: path.into() }
    }

    /// Seed files are optional; a missing file is not an error
    pub fn is_present(&self) -> bool {
        self.path.is_file()
    }
}

/// The three optional seed regions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedSet {
    pub open_water: Option<PathBuf>,
    pub non_flood_vegetation: Option<PathBuf>,
    pub flood_vegetation: Option<PathBuf>,
}

impl SeedSet {
    pub fn region(&self, class: SeedClass) -> Option<SeedRegion> {
        let path = match class {
            SeedClass::OpenWater => self.open_water.as_ref(),
            SeedClass::NonFloodVegetation => self.non_flood_vegetation.as_ref(),
            SeedClass::FloodVegetation => self.flood_vegetation.as_ref(),
        };
        path.map(|p| SeedRegion::new(class, p.clone()))
    }

    /// Classes whose seed file is unset or absent on disk
    pub fn missing_classes(&self) -> Vec<SeedClass> {
        SeedClass::ALL
            .iter()
            .copied()
            .filter(|class| !self.region(*class).map(|r| r.is_present()).unwrap_or(false))
            .collect()
    }
}

/// Per-class pixel statistics under a seed mask
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassStatistics {
    pub mean: f64,
    pub std_dev: f64,
}

impl ClassStatistics {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }

    pub fn lower_bound(&self) -> f64 {
        self.mean - SEPARABILITY_MARGIN * self.std_dev
    }

    pub fn upper_bound(&self) -> f64 {
        self.mean + SEPARABILITY_MARGIN * self.std_dev
    }
}

/// Statistics for all three classes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeedStatistics {
    pub water: ClassStatistics,
    pub non_flood: ClassStatistics,
    pub flood: ClassStatistics,
}

/// Class interval bounds derived from seed statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeparabilityBounds {
    pub water_max: f64,
    pub non_flood_min: f64,
    pub non_flood_max: f64,
    pub flood_min: f64,
}

impl SeparabilityBounds {
    pub fn from_statistics(stats: &SeedStatistics) -> Self {
        Self {
            water_max: stats.water.upper_bound(),
            non_flood_min: stats.non_flood.lower_bound(),
            non_flood_max: stats.non_flood.upper_bound(),
            flood_min: stats.flood.lower_bound(),
        }
    }

    /// Water lies wholly below non-flooded vegetation, which lies wholly below
    /// flooded vegetation
    pub fn is_separable(&self) -> bool {
        self.water_max < self.non_flood_min && self.flood_min > self.non_flood_max
    }
}

/// Decibel thresholds for the vegetation branch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VegetationThresholds {
    pub open_water: f64,
    pub veg_flood: f64,
}

impl Default for VegetationThresholds {
    fn default() -> Self {
        Self { open_water: DEFAULT_OPEN_WATER_THRESHOLD, veg_flood: DEFAULT_VEG_FLOOD_THRESHOLD }
    }
}

/// Caller-supplied thresholds consulted before the built-in defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FallbackThresholds {
    pub open_water: Option<f64>,
    pub veg_flood: Option<f64>,
}

impl FallbackThresholds {
    pub fn resolve(&self) -> VegetationThresholds {
        let defaults = VegetationThresholds::default();
        VegetationThresholds {
            open_water: self.open_water.unwrap_or(defaults.open_water),
            veg_flood: self.veg_flood.unwrap_or(defaults.veg_flood),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.open_water.is_none() && self.veg_flood.is_none()
    }
}

/// Why calibrated thresholds were not used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalibrationWarning {
    NotSeparable {
        water_max: f64,
        non_flood_min: f64,
        non_flood_max: f64,
        flood_min: f64,
    },
    SeedsMissing {
        classes: Vec<SeedClass>,
    },
    StatisticsUnavailable {
        class: SeedClass,
        reason: String,
    },
}

impl fmt::Display for CalibrationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationWarning::NotSeparable { water_max, non_flood_min, non_flood_max, flood_min } => {
                write!(
                    f,
                    "seed classes are not separable: water max {:.3}, non-flood vegetation {:.3}..{:.3}, flood vegetation min {:.3}",
                    water_max, non_flood_min, non_flood_max, flood_min
                )
            }
            CalibrationWarning::SeedsMissing { classes } => {
                let names: Vec<&str> = classes.iter().map(|c| c.as_str()).collect();
                write!(f, "seed regions missing for {}", names.join(", "))
            }
            CalibrationWarning::StatisticsUnavailable { class, reason } => {
                write!(f, "statistics for {} seed could not be computed: {}", class, reason)
            }
        }
    }
}

/// Where the thresholds in a [`CalibrationOutcome`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSource {
    Calibrated,
    UserSupplied,
    Default,
}

/// Result of threshold calibration; never an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    pub thresholds: VegetationThresholds,
    pub source: ThresholdSource,
    pub bounds: Option<SeparabilityBounds>,
    pub warning: Option<CalibrationWarning>,
}

impl CalibrationOutcome {
    /// Outcome when calibration is not attempted or cannot be trusted
    pub fn fallback(fallback: &FallbackThresholds, warning: Option<CalibrationWarning>) -> Self {
        Self {
            thresholds: fallback.resolve(),
            source: if fallback.is_empty() {
                ThresholdSource::Default
            } else {
                ThresholdSource::UserSupplied
            },
            bounds: None,
            warning,
        }
    }
}

/// Derive thresholds from seed statistics, falling back when the classes overlap
pub fn derive_thresholds(stats: &SeedStatistics, fallback: &FallbackThresholds) -> CalibrationOutcome {
    let bounds = SeparabilityBounds::from_statistics(stats);

    if bounds.is_separable() {
        return CalibrationOutcome {
            thresholds: VegetationThresholds {
                open_water: bounds.water_max,
                veg_flood: bounds.flood_min,
            },
            source: ThresholdSource::Calibrated,
            bounds: Some(bounds),
            warning: None,
        };
    }

    let warning = CalibrationWarning::NotSeparable {
        water_max: bounds.water_max,
        non_flood_min: bounds.non_flood_min,
        non_flood_max: bounds.non_flood_max,
        flood_min: bounds.flood_min,
    };
    CalibrationOutcome { bounds: Some(bounds), ..CalibrationOutcome::fallback(fallback, Some(warning)) }
}
