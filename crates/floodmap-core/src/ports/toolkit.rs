use crate::error::Result;
use crate::models::{FloodPolygon, PixelSpacing, RasterInfo};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Parameters for terrain correction and reprojection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrthoParams {
    pub dem: PathBuf,
    pub pixel_spacing: PixelSpacing,
    /// Full projection string, e.g. `UTM 18 D122`
    pub projection: String,
}

/// How overlapping inputs are cut in a mosaic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutMethod {
    /// Later inputs overwrite earlier ones over their entire footprint
    Entire,
}

/// Radiometric balancing applied across mosaic inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceMethod {
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MosaicOptions {
    pub cut: CutMethod,
    pub balance: BalanceMethod,
}

impl Default for MosaicOptions {
    fn default() -> Self {
        Self { cut: CutMethod::Entire, balance: BalanceMethod::None }
    }
}

/// Options for a raster export or copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Export a single band (0-based); all bands when `None`
    pub band: Option<usize>,
    pub compress: bool,
}

/// Summary statistics of one raster band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Pixels that contributed
    pub count: u64,
}

/// Value interval mapped to 1 by [`RasterToolkit::classify`]; everything else maps to 0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassRange {
    pub lower: Option<f64>,
    pub lower_inclusive: bool,
    pub upper: Option<f64>,
    pub upper_inclusive: bool,
}

impl ClassRange {
    /// `0 < v <= threshold`, the open-water flood test on scaled images
    pub fn flood_band(threshold: f64) -> Self {
        Self { lower: Some(0.0), lower_inclusive: false, upper: Some(threshold), upper_inclusive: true }
    }

    /// `v >= threshold`
    pub fn at_least(threshold: f64) -> Self {
        Self { lower: Some(threshold), lower_inclusive: true, upper: None, upper_inclusive: false }
    }

    /// `floor < v <= ceiling`
    pub fn above_up_to(floor: f64, ceiling: f64) -> Self {
        Self { lower: Some(floor), lower_inclusive: false, upper: Some(ceiling), upper_inclusive: true }
    }

    pub fn contains(&self, value: f64) -> bool {
        let above = match self.lower {
            Some(l) if self.lower_inclusive => value >= l,
            Some(l) => value > l,
            None => true,
        };
        let below = match self.upper {
            Some(u) if self.upper_inclusive => value <= u,
            Some(u) => value < u,
            None => true,
        };
        above && below
    }
}

/// How indicator rasters are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayMethod {
    /// 1 where any input is >= 1
    Union,
    /// 1 where every input is >= 1
    Intersection,
}

/// Port for the external raster/vector toolkit
///
/// Every operation writes a new file at `output` and never modifies its inputs.
/// Band indices are 0-based.
pub trait RasterToolkit {
    /// Extension of raster files written by this toolkit, without the dot
    fn raster_extension(&self) -> &str;

    /// Extension of vector files written by this toolkit, without the dot
    fn vector_extension(&self) -> &str;

    /// Import a raw scene described by its metadata file
    fn import(&self, source_metadata: &Path, output: &Path) -> Result<()>;

    /// Terrain-correct and reproject a raster
    fn orthorectify(&self, input: &Path, output: &Path, params: &OrthoParams) -> Result<()>;

    /// Combine several rasters into one
    fn mosaic(&self, inputs: &[PathBuf], output: &Path, options: &MosaicOptions) -> Result<()>;

    /// Copy a raster, optionally selecting a band and compressing
    fn export(&self, input: &Path, output: &Path, options: &ExportOptions) -> Result<()>;

    /// Shape and georeferencing of a raster
    fn raster_info(&self, raster: &Path) -> Result<RasterInfo>;

    /// Statistics of one band, restricted to pixels where `mask` is 1
    fn raster_statistics(
        &self,
        raster: &Path,
        band: usize,
        mask: Option<&Path>,
    ) -> Result<RasterStatistics>;

    /// Linear stretch of one band to 0..=255
    fn scale_to_byte(&self, input: &Path, band: usize, output: &Path) -> Result<()>;

    /// Adaptive speckle filter for multi-look SAR intensity
    fn filter_speckle(&self, input: &Path, output: &Path, window: usize, looks: f32) -> Result<()>;

    /// Convert intensity to decibels; undefined values become 0
    fn to_decibels(&self, input: &Path, band: usize, output: &Path) -> Result<()>;

    fn filter_majority(&self, input: &Path, output: &Path, window: usize) -> Result<()>;

    fn filter_median(&self, input: &Path, output: &Path, window: usize) -> Result<()>;

    /// Binary indicator of `range` on one band; pixels outside `mask` are 0
    fn classify(
        &self,
        input: &Path,
        band: usize,
        range: &ClassRange,
        mask: Option<&Path>,
        output: &Path,
    ) -> Result<()>;

    /// Burn vector polygons into a raster aligned with `template`
    fn rasterize(&self, vector: &Path, template: &Path, burn_value: f64, output: &Path)
        -> Result<()>;

    /// Replace every occurrence of one value
    fn replace_value(&self, input: &Path, from: f64, to: f64, output: &Path) -> Result<()>;

    /// Combine aligned indicator rasters
    fn overlay(&self, inputs: &[PathBuf], method: OverlayMethod, output: &Path) -> Result<()>;

    /// Merge 4-connected regions smaller than `min_pixels` into their neighbours
    fn sieve(&self, input: &Path, output: &Path, min_pixels: u64) -> Result<()>;

    /// Convert equal-valued regions to polygons, without simplification
    fn raster_to_polygon(&self, input: &Path, output: &Path) -> Result<()>;

    fn read_polygons(&self, vector: &Path) -> Result<Vec<FloodPolygon>>;

    fn write_polygons(&self, polygons: &[FloodPolygon], output: &Path) -> Result<()>;
}

impl<T: RasterToolkit + ?Sized> RasterToolkit for &T {
    fn raster_extension(&self) -> &str {
        (**self).raster_extension()
    }
    fn vector_extension(&self) -> &str {
        (**self).vector_extension()
    }
    fn import(&self, source_metadata: &Path, output: &Path) -> Result<()> {
        (**self).import(source_metadata, output)
    }
    fn orthorectify(&self, input: &Path, output: &Path, params: &OrthoParams) -> Result<()> {
        (**self).orthorectify(input, output, params)
    }
    fn mosaic(&self, inputs: &[PathBuf], output: &Path, options: &MosaicOptions) -> Result<()> {
        (**self).mosaic(inputs, output, options)
    }
    fn export(&self, input: &Path, output: &Path, options: &ExportOptions) -> Result<()> {
        (**self).export(input, output, options)
    }
    fn raster_info(&self, raster: &Path) -> Result<RasterInfo> {
        (**self).raster_info(raster)
    }
    fn raster_statistics(
        &self,
        raster: &Path,
        band: usize,
        mask: Option<&Path>,
    ) -> Result<RasterStatistics> {
        (**self).raster_statistics(raster, band, mask)
    }
    fn scale_to_byte(&self, input: &Path, band: usize, output: &Path) -> Result<()> {
        (**self).scale_to_byte(input, band, output)
    }
    fn filter_speckle(&self, input: &Path, output: &Path, window: usize, looks: f32) -> Result<()> {
        (**self).filter_speckle(input, output, window, looks)
    }
    fn to_decibels(&self, input: &Path, band: usize, output: &Path) -> Result<()> {
        (**self).to_decibels(input, band, output)
    }
    fn filter_majority(&self, input: &Path, output: &Path, window: usize) -> Result<()> {
        (**self).filter_majority(input, output, window)
    }
    fn filter_median(&self, input: &Path, output: &Path, window: usize) -> Result<()> {
        (**self).filter_median(input, output, window)
    }
    fn classify(
        &self,
        input: &Path,
        band: usize,
        range: &ClassRange,
        mask: Option<&Path>,
        output: &Path,
    ) -> Result<()> {
        (**self).classify(input, band, range, mask, output)
    }
    fn rasterize(
        &self,
        vector: &Path,
        template: &Path,
        burn_value: f64,
        output: &Path,
    ) -> Result<()> {
        (**self).rasterize(vector, template, burn_value, output)
    }
    fn replace_value(&self, input: &Path, from: f64, to: f64, output: &Path) -> Result<()> {
        (**self).replace_value(input, from, to, output)
    }
    fn overlay(&self, inputs: &[PathBuf], method: OverlayMethod, output: &Path) -> Result<()> {
        (**self).overlay(inputs, method, output)
    }
    fn sieve(&self, input: &Path, output: &Path, min_pixels: u64) -> Result<()> {
        (**self).sieve(input, output, min_pixels)
    }
    fn raster_to_polygon(&self, input: &Path, output: &Path) -> Result<()> {
        (**self).raster_to_polygon(input, output)
    }
    fn read_polygons(&self, vector: &Path) -> Result<Vec<FloodPolygon>> {
        (**self).read_polygons(vector)
    }
    fn write_polygons(&self, polygons: &[FloodPolygon], output: &Path) -> Result<()> {
        (**self).write_polygons(polygons, output)
    }
}
