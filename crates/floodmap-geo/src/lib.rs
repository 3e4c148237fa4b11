//! floodmap Geo - Raster grids, filters, and polygon conversion
//!
//! This crate holds the in-memory raster model and the pixel and polygon
//! algorithms behind the local toolkit.

pub mod morphology;
pub mod mosaic;
pub mod polygon;
pub mod raster;
pub mod validation;
pub mod vector;
pub mod vectorize;

pub use raster::{GeoTransform, RasterGrid};
