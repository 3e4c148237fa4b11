pub mod calibration;
pub mod product;
pub mod stage;
pub mod threshold;
pub mod vector;
pub mod workspace;

pub use calibration::{
    derive_thresholds, CalibrationOutcome, CalibrationWarning, ClassStatistics, FallbackThresholds,
    SeedClass, SeedRegion, SeedSet, SeedStatistics, SeparabilityBounds, ThresholdSource,
    VegetationThresholds,
};
pub use product::{
    projection_code, sieve_pixel_count, value_token, ImageProduct, PixelSpacing, Polarization,
    RasterInfo, SceneId, SQUARE_METRES_PER_HECTARE,
};
pub use stage::{StageError, StageKind, StageResult, StageStatus};
pub use threshold::{
    default_range, validate_entries, ConfigurationWarning, ThresholdEntry, ThresholdRange,
    ThresholdSet,
};
pub use vector::{FloodPolygon, FloodVectorProduct, MergedVectorProduct};
pub use workspace::StageDir;
