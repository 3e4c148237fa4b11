use geo::MultiPolygon;
use std::path::PathBuf;

/// One vectorized region of a classified raster
#[derive(Debug, Clone, PartialEq)]
pub struct FloodPolygon {
    pub geometry: MultiPolygon<f64>,
    /// Class value of the source pixels
    pub value: i64,
    /// Area in hectares, once computed
    pub area_ha: Option<f64>,
}

impl FloodPolygon {
    pub fn new(geometry: MultiPolygon<f64>, value: i64) -> Self {
        Self { geometry, value, area_ha: None }
    }

    /// Whether the source pixels were classified as flood
    pub fn is_flood(&self) -> bool {
        self.value > 0
    }
}

/// A flood extent vector file for one `(image, threshold)` pair
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FloodVectorProduct {
    pub path: PathBuf,
    pub source: PathBuf,
    pub threshold: u32,
    pub min_polygon_ha: f64,
    pub masked: bool,
    /// Number of polygons kept, when known
    pub polygon_count: Option<usize>,
}

/// Final merged flood extent
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MergedVectorProduct {
    pub raster: PathBuf,
    pub vector: PathBuf,
    pub sieve_pixels: u64,
}
