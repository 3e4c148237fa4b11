use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Named pipeline stages, in dependency order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Import,
    Ortho,
    Mosaic,
    Scale,
    Filter,
    Threshold,
    Vectorize,
    CombineVegetation,
    Merge,
}

impl StageKind {
    pub const ALL: [StageKind; 9] = [
        StageKind::Import,
        StageKind::Ortho,
        StageKind::Mosaic,
        StageKind::Scale,
        StageKind::Filter,
        StageKind::Threshold,
        StageKind::Vectorize,
        StageKind::CombineVegetation,
        StageKind::Merge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Import => "import",
            StageKind::Ortho => "ortho",
            StageKind::Mosaic => "mosaic",
            StageKind::Scale => "scale",
            StageKind::Filter => "filter",
            StageKind::Threshold => "threshold",
            StageKind::Vectorize => "vectorize",
            StageKind::CombineVegetation => "combine_vegetation",
            StageKind::Merge => "merge",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        StageKind::ALL.iter().copied().find(|k| k.as_str() == normalized)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one stage invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    SkippedAlreadyDone,
    SkippedMissingInput,
    SkippedDisabled,
    Failed,
}

impl StageStatus {
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            StageStatus::SkippedAlreadyDone
                | StageStatus::SkippedMissingInput
                | StageStatus::SkippedDisabled
        )
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageStatus::Completed => "completed",
            StageStatus::SkippedAlreadyDone => "skipped (already done)",
            StageStatus::SkippedMissingInput => "skipped (missing input)",
            StageStatus::SkippedDisabled => "skipped (disabled)",
            StageStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why a stage failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageError {
    /// The producer returned an error
    Producer { message: String },
    /// The producer returned but declared outputs are absent or empty
    IncompleteOutput { missing: Vec<PathBuf> },
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::Producer { message } => f.write_str(message),
            StageError::IncompleteOutput { missing } => {
                let paths: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
                write!(f, "declared outputs missing after run: {}", paths.join(", "))
            }
        }
    }
}

/// Result of running one stage descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: StageKind,
    /// Stage name plus the scene or product it ran for
    pub label: String,
    pub status: StageStatus,
    pub outputs: Vec<PathBuf>,
    pub error: Option<StageError>,
    pub elapsed_ms: u64,
}

impl StageResult {
    pub fn new(stage: StageKind, label: impl Into<String>, status: StageStatus) -> Self {
        Self {
            stage,
            label: label.into(),
            status,
            outputs: Vec::new(),
            error: None,
            elapsed_ms: 0,
        }
    }

    /// Result for a stage turned off by configuration
    pub fn disabled(stage: StageKind) -> Self {
        Self::new(stage, stage.as_str(), StageStatus::SkippedDisabled)
    }

    pub fn with_outputs(mut self, outputs: Vec<PathBuf>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_error(mut self, error: StageError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == StageStatus::Failed
    }
}
