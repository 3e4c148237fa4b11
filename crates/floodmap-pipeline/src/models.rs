use chrono::{DateTime, Utc};
use floodmap_core::error::{FloodError, Result};
use floodmap_core::models::{
    CalibrationOutcome, CalibrationWarning, ConfigurationWarning, FloodVectorProduct,
    MergedVectorProduct, StageError, StageKind, StageResult, StageStatus,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix of run report files in `Logs/`
pub const REPORT_PREFIX: &str = "run_";

/// Overall outcome of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
    /// No scenes in `Raw/` and no mosaic to continue from
    NothingToProcess,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
            RunStatus::NothingToProcess => "nothing_to_process",
        }
    }
}

/// A non-fatal problem recorded during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunWarning {
    pub stage: Option<StageKind>,
    pub parameter: String,
    pub message: String,
}

impl RunWarning {
    pub fn from_configuration(warning: ConfigurationWarning) -> Self {
        Self { stage: None, parameter: warning.parameter, message: warning.message }
    }

    pub fn from_calibration(warning: &CalibrationWarning) -> Self {
        Self {
            stage: Some(StageKind::Threshold),
            parameter: "calibration".to_string(),
            message: warning.to_string(),
        }
    }
}

/// Progress event, emitted before and after each stage unit
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineProgress {
    pub stage: StageKind,
    pub label: String,
    /// `None` when the unit is about to run
    pub status: Option<StageStatus>,
}

/// Products created or found during a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunProducts {
    pub mosaic: Option<PathBuf>,
    pub flood_vectors: Vec<FloodVectorProduct>,
    pub vegetation: Vec<PathBuf>,
    pub merged: Option<MergedVectorProduct>,
}

/// Typed result of one pipeline run, also written as the run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub status: RunStatus,
    pub stages: Vec<StageResult>,
    pub calibration: Option<CalibrationOutcome>,
    pub warnings: Vec<RunWarning>,
    pub products: RunProducts,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Set once the report has been written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<PathBuf>,
}

impl PipelineResult {
    pub fn count(&self, status: StageStatus) -> usize {
        self.stages.iter().filter(|s| s.status == status).count()
    }

    /// First failed stage as an error, for callers that bail on failure
    pub fn first_failure(&self) -> Option<FloodError> {
        let failed = self.stages.iter().find(|s| s.is_failed())?;
        Some(match &failed.error {
            Some(StageError::IncompleteOutput { missing }) => FloodError::IncompleteOutput {
                stage: failed.label.clone(),
                missing: missing.clone(),
            },
            Some(StageError::Producer { message }) => FloodError::StageFailed {
                stage: failed.label.clone(),
                reason: message.clone(),
            },
            None => FloodError::StageFailed {
                stage: failed.label.clone(),
                reason: "unknown failure".to_string(),
            },
        })
    }

    /// Write the report as `Logs/run_<timestamp>.json`
    pub fn write_report(&self, logs: &Path) -> Result<PathBuf> {
        fs::create_dir_all(logs)?;
        let path = logs.join(format!(
            "{}{}.json",
            REPORT_PREFIX,
            self.finished_at.format("%Y%m%dT%H%M%S%.3fZ")
        ));
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| FloodError::Serialization(e.to_string()))?;
        fs::write(&path, json)?;
        tracing::info!(report = %path.display(), status = self.status.as_str(), "Run report written");
        Ok(path)
    }
}

/// Most recent run report in `logs`, if any
pub fn latest_report(logs: &Path) -> Result<Option<PipelineResult>> {
    if !logs.is_dir() {
        return Ok(None);
    }

    let mut reports: Vec<PathBuf> = fs::read_dir(logs)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(REPORT_PREFIX) && n.ends_with(".json"))
                .unwrap_or(false)
        })
        .collect();
    reports.sort();

    let Some(latest) = reports.pop() else {
        return Ok(None);
    };
    let content = fs::read_to_string(&latest)?;
    let mut result: PipelineResult =
        serde_json::from_str(&content).map_err(|e| FloodError::Serialization(e.to_string()))?;
    result.report = Some(latest);
    Ok(Some(result))
}
