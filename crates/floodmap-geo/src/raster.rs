//! In-memory raster grids and their on-disk encoding

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use floodmap_core::error::{FloodError, Result};
use floodmap_core::models::RasterInfo;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Affine georeferencing of a north-up grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    /// Negative for north-up rasters
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self { origin_x, origin_y, pixel_width, pixel_height }
    }

    /// Map coordinates of a pixel centre
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Map coordinates of a pixel's upper-left corner
    pub fn pixel_corner(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + col as f64 * self.pixel_width,
            self.origin_y + row as f64 * self.pixel_height,
        )
    }

    /// Fractional (row, col) of a map coordinate
    pub fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        ((y - self.origin_y) / self.pixel_height, (x - self.origin_x) / self.pixel_width)
    }
}

/// Multi-band raster held in memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterGrid {
    pub transform: GeoTransform,
    pub projection: Option<String>,
    pub nodata: Option<f32>,
    pub bands: Vec<Array2<f32>>,
}

impl RasterGrid {
    /// Build a grid, checking that every band has the same shape
    pub fn new(transform: GeoTransform, bands: Vec<Array2<f32>>) -> Result<Self> {
        let first = bands.first().ok_or_else(|| FloodError::toolkit("raster", "grid has no bands"))?;
        let shape = first.dim();
        if bands.iter().any(|b| b.dim() != shape) {
            return Err(FloodError::toolkit("raster", "bands have different shapes"));
        }
        Ok(Self { transform, projection: None, nodata: None, bands })
    }

    pub fn single_band(transform: GeoTransform, data: Array2<f32>) -> Self {
        Self { transform, projection: None, nodata: None, bands: vec![data] }
    }

    pub fn with_projection(mut self, projection: impl Into<String>) -> Self {
        self.projection = Some(projection.into());
        self
    }

    pub fn with_nodata(mut self, nodata: f32) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Same georeferencing, one new band
    pub fn derive(&self, data: Array2<f32>) -> Self {
        Self {
            transform: self.transform,
            projection: self.projection.clone(),
            nodata: None,
            bands: vec![data],
        }
    }

    pub fn height(&self) -> usize {
        self.bands.first().map(|b| b.nrows()).unwrap_or(0)
    }

    pub fn width(&self) -> usize {
        self.bands.first().map(|b| b.ncols()).unwrap_or(0)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    pub fn band(&self, index: usize) -> Result<&Array2<f32>> {
        self.bands.get(index).ok_or_else(|| {
            FloodError::toolkit(
                "raster",
                format!("band {} requested but raster has {} band(s)", index, self.bands.len()),
            )
        })
    }

    /// Whether a value is a real observation
    pub fn is_data(&self, value: f32) -> bool {
        value.is_finite() && self.nodata.map(|nd| value != nd).unwrap_or(true)
    }

    /// Same grid geometry as `other`
    pub fn is_aligned_with(&self, other: &RasterGrid) -> bool {
        self.shape() == other.shape() && self.transform == other.transform
    }

    pub fn info(&self) -> RasterInfo {
        RasterInfo {
            width: self.width(),
            height: self.height(),
            band_count: self.bands.len(),
            pixel_width: self.transform.pixel_width,
            pixel_height: self.transform.pixel_height,
            projection: self.projection.clone(),
        }
    }

    /// Read a grid file, gzip-compressed or plain
    pub fn read(path: &Path) -> Result<Self> {
        let mut bytes = Vec::new();
        File::open(path)
            .and_then(|mut f| f.read_to_end(&mut bytes))
            .map_err(|e| FloodError::toolkit("read", format!("{}: {}", path.display(), e)))?;

        if is_gzip(&bytes) {
            let mut decoded = Vec::new();
            GzDecoder::new(bytes.as_slice())
                .read_to_end(&mut decoded)
                .map_err(|e| FloodError::toolkit("read", format!("{}: {}", path.display(), e)))?;
            bytes = decoded;
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| FloodError::toolkit("read", format!("{}: {}", path.display(), e)))
    }

    /// Write the grid; paths ending in `.gz` are compressed
    ///
    /// Data goes to a sibling temporary file first so a partial write never
    /// appears at `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        let compress = path.extension().map(|e| e == "gz").unwrap_or(false);
        self.write_encoded(path, compress)
    }

    /// Write the grid, gzip-compressed when `compress` is set
    pub fn write_encoded(&self, path: &Path, compress: bool) -> Result<()> {
        let staging = staging_path(path);

        let written = (|| -> std::io::Result<()> {
            let file = BufWriter::new(File::create(&staging)?);
            if compress {
                let mut encoder = GzEncoder::new(file, Compression::default());
                serde_json::to_writer(&mut encoder, self)?;
                encoder.finish()?.flush()?;
            } else {
                let mut file = file;
                serde_json::to_writer(&mut file, self)?;
                file.flush()?;
            }
            fs::rename(&staging, path)
        })();

        written.map_err(|e| {
            let _ = fs::remove_file(&staging);
            FloodError::toolkit("write", format!("{}: {}", path.display(), e))
        })
    }
}

fn is_gzip(content: &[u8]) -> bool {
    content.len() >= 2 && content[0] == 0x1F && content[1] == 0x8B
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}
