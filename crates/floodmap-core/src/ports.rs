//! Port trait definitions
//!
//! These traits define the interfaces that adapters must implement.

pub mod toolkit;

pub use toolkit::{
    BalanceMethod, ClassRange, CutMethod, ExportOptions, MosaicOptions, OrthoParams,
    OverlayMethod, RasterStatistics, RasterToolkit,
};
