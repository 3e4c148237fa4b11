//! Flood mapping pipeline - staged, resumable SAR flood extent processing
//!
//! This crate implements the pipeline use cases on top of the toolkit port:
//! stage execution with idempotence checks, threshold calibration,
//! multi-threshold vector extraction, the vegetation branch and the merge.

pub mod calibrate;
pub mod config;
pub mod controller;
pub mod extract;
pub mod merge;
pub mod models;
pub mod scenes;
pub mod stage;
pub mod vegetation;

pub use calibrate::calibrate;
pub use config::{ExtractConfig, MergeConfig, OrthoConfig, PipelineConfig, VegetationConfig};
pub use controller::{Pipeline, PlannedStage};
pub use extract::{extract_flood_vectors, plan_products, validate_mask, ExtractionRequest, PlannedProduct};
pub use merge::{merge_products, MergePlan};
pub use models::{
    latest_report, PipelineProgress, PipelineResult, RunProducts, RunStatus, RunWarning,
};
pub use scenes::{discover_scenes, intake_archives, IntakeReport, Scene};
pub use stage::{run_stage, StageDescriptor};
