//! Error types for floodmap

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FloodError {
    // Validation errors
    #[error("Invalid value for {parameter}: {reason}")]
    Validation { parameter: String, reason: String },

    // Workspace errors
    #[error("Workspace error at {path}: {reason}")]
    Workspace { path: PathBuf, reason: String },

    // Stage errors
    #[error("Stage '{stage}' failed: {reason}")]
    StageFailed { stage: String, reason: String },

    #[error("Stage '{stage}' reported success but left {} declared output(s) missing", missing.len())]
    IncompleteOutput { stage: String, missing: Vec<PathBuf> },

    // Toolkit errors
    #[error("Toolkit operation '{operation}' failed: {reason}")]
    Toolkit { operation: String, reason: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FloodError {
    /// Shorthand for a validation error on a named parameter
    pub fn validation(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        FloodError::Validation { parameter: parameter.into(), reason: reason.into() }
    }

    /// Shorthand for a toolkit failure
    pub fn toolkit(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        FloodError::Toolkit { operation: operation.into(), reason: reason.into() }
    }

    /// Whether this error must stop the run before any stage executes
    pub fn is_fatal_before_stages(&self) -> bool {
        matches!(
            self,
            FloodError::Validation { .. }
                | FloodError::Workspace { .. }
                | FloodError::ConfigMissing { .. }
                | FloodError::ConfigInvalid { .. }
        )
    }
}

impl From<serde_json::Error> for FloodError {
    fn from(err: serde_json::Error) -> Self {
        FloodError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FloodError>;
