//! floodmap Core - Domain models, workspace layout, and configuration
//!
//! This crate contains the core domain logic and port definitions for the
//! flood mapping pipeline.

pub mod config;
pub mod error;
pub mod models;
pub mod ports;
pub mod workspace;

pub use error::{FloodError, Result};
pub use workspace::RunWorkspace;
