use chrono::{DateTime, Utc};
use floodmap_core::models::{SeparabilityBounds, ThresholdSource};
use serde::Serialize;
use tabled::Tabled;

/// Output for init command
#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub workspace_path: String,
    pub config_file: String,
    pub stage_dirs: Vec<String>,
}

/// Output for run command
#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub status: String,
    pub report: Option<String>,
    pub stages: StageCounts,
    pub products: ProductSummary,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StageCounts {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
pub struct ProductSummary {
    pub mosaic: Option<String>,
    pub flood_vectors: Vec<String>,
    pub vegetation: Vec<String>,
    pub merged_raster: Option<String>,
    pub merged_vector: Option<String>,
}

/// Output for calibrate command
#[derive(Debug, Serialize)]
pub struct CalibrateOutput {
    pub image: String,
    pub source: ThresholdSource,
    pub open_water: f64,
    pub veg_flood: f64,
    pub bounds: Option<SeparabilityBounds>,
    pub warning: Option<String>,
}

/// Output for status command
#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub workspace_path: String,
    pub stage_dirs: Vec<StageDirRow>,
    pub last_run: Option<LastRunStatus>,
    pub config: Option<Vec<ConfigRow>>,
}

/// One staging directory and how many files it holds
#[derive(Debug, Serialize, Tabled)]
pub struct StageDirRow {
    #[tabled(rename = "Directory")]
    pub name: String,
    #[tabled(rename = "Present")]
    pub present: bool,
    #[tabled(rename = "Files")]
    pub files: usize,
}

#[derive(Debug, Serialize)]
pub struct LastRunStatus {
    pub status: String,
    pub finished_at: DateTime<Utc>,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub warnings: usize,
    pub stages: Option<Vec<StageRow>>,
}

#[derive(Debug, Serialize, Tabled)]
pub struct StageRow {
    #[tabled(rename = "Stage")]
    pub stage: String,
    #[tabled(rename = "Unit")]
    pub label: String,
    #[tabled(rename = "Status")]
    pub status: String,
}

/// A resolved configuration value and the layer it came from
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}
