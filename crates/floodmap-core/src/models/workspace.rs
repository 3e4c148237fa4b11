use serde::{Deserialize, Serialize};
use std::fmt;

/// Staging directories of a run workspace
///
/// Directory names are a stable contract other tools rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageDir {
    /// Unpacked source scenes and imported rasters
    Raw,
    /// Orthorectified per-scene rasters
    Ortho,
    /// Per-date mosaic and its per-polarization exports
    Mosaic,
    /// Scaled, filtered and thresholded rasters
    Scaled,
    /// Open-water flood extent vectors
    VectorWater,
    /// Flooded-vegetation rasters
    VectorVeg,
    /// Merged flood extent products
    Merged,
    /// Temporary files, wiped once per run
    Scratch,
    /// Run reports
    Logs,
}

impl StageDir {
    pub const ALL: [StageDir; 9] = [
        StageDir::Raw,
        StageDir::Ortho,
        StageDir::Mosaic,
        StageDir::Scaled,
        StageDir::VectorWater,
        StageDir::VectorVeg,
        StageDir::Merged,
        StageDir::Scratch,
        StageDir::Logs,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            StageDir::Raw => "Raw",
            StageDir::Ortho => "Ortho",
            StageDir::Mosaic => "Mosaic",
            StageDir::Scaled => "Scaled",
            StageDir::VectorWater => "OWFEP",
            StageDir::VectorVeg => "VEGFEP",
            StageDir::Merged => "MERGEFEP",
            StageDir::Scratch => "Scratch",
            StageDir::Logs => "Logs",
        }
    }

    /// Whether the directory survives across runs
    pub fn is_persistent(&self) -> bool {
        !matches!(self, StageDir::Scratch)
    }
}

impl fmt::Display for StageDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}
