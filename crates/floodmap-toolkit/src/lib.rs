//! floodmap Toolkit - Raster toolkit adapters
//!
//! This crate provides implementations of the `RasterToolkit` port defined in
//! `floodmap-core`.

pub mod local;

pub use local::LocalToolkit;
