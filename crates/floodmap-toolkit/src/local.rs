//! File-backed toolkit built on the in-crate raster algorithms.
//!
//! Rasters are serialized `RasterGrid` files and vectors are GeoJSON feature
//! collections. Suitable for tests and already terrain-corrected inputs.

use floodmap_core::error::{FloodError, Result};
use floodmap_core::models::{FloodPolygon, RasterInfo};
use floodmap_core::ports::{
    ClassRange, ExportOptions, MosaicOptions, OrthoParams, OverlayMethod, RasterStatistics,
    RasterToolkit,
};
use floodmap_geo::morphology::{gamma_map_filter, majority_filter, median_filter, sieve};
use floodmap_geo::vectorize::{polygonize, rasterize};
use floodmap_geo::{mosaic, vector, RasterGrid};
use ndarray::{Array2, Zip};
use std::path::{Path, PathBuf};

/// Name of the imagery file expected beside a scene's metadata file
pub const IMAGERY_FILE_NAME: &str = "imagery.grd";

/// Mask value selecting a pixel for processing; any other value is no-data
pub const MASK_PROCESS: f32 = 1.0;

/// Raster toolkit over local grid and GeoJSON files
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalToolkit;

impl LocalToolkit {
    pub fn new() -> Self {
        Self
    }

    fn read_aligned_mask(&self, mask: Option<&Path>, grid: &RasterGrid) -> Result<Option<Array2<f32>>> {
        let Some(path) = mask else {
            return Ok(None);
        };
        let mask = RasterGrid::read(path)?;
        if !mask.is_aligned_with(grid) {
            return Err(FloodError::toolkit(
                "mask",
                format!("{} is not aligned with the input raster", path.display()),
            ));
        }
        Ok(Some(mask.band(0)?.clone()))
    }
}

/// Apply `f` to one band and write it as a single-band grid
fn map_band(input: &Path, band: usize, output: &Path, f: impl Fn(&Array2<f32>) -> Array2<f32>) -> Result<()> {
    let grid = RasterGrid::read(input)?;
    let data = f(grid.band(band)?);
    let mut derived = grid.derive(data);
    derived.nodata = grid.nodata;
    derived.write(output)
}

fn read_aligned(inputs: &[PathBuf], operation: &str) -> Result<Vec<RasterGrid>> {
    let grids = inputs.iter().map(|p| RasterGrid::read(p)).collect::<Result<Vec<_>>>()?;
    if let Some(first) = grids.first() {
        if let Some(pos) = grids.iter().position(|g| !g.is_aligned_with(first)) {
            return Err(FloodError::toolkit(
                operation,
                format!("{} is not aligned with {}", inputs[pos].display(), inputs[0].display()),
            ));
        }
    }
    Ok(grids)
}

impl RasterToolkit for LocalToolkit {
    fn raster_extension(&self) -> &str {
        "grd"
    }

    fn vector_extension(&self) -> &str {
        "geojson"
    }

    fn import(&self, source_metadata: &Path, output: &Path) -> Result<()> {
        if !source_metadata.is_file() {
            return Err(FloodError::toolkit(
                "import",
                format!("metadata file {} not found", source_metadata.display()),
            ));
        }
        let imagery = source_metadata.with_file_name(IMAGERY_FILE_NAME);
        tracing::debug!(source = %imagery.display(), output = %output.display(), "Importing scene");
        RasterGrid::read(&imagery)?.write(output)
    }

    fn orthorectify(&self, input: &Path, output: &Path, params: &OrthoParams) -> Result<()> {
        if !params.dem.exists() {
            return Err(FloodError::toolkit(
                "orthorectify",
                format!("DEM {} not found", params.dem.display()),
            ));
        }
        let mut grid = RasterGrid::read(input)?;
        grid.transform.pixel_width = params.pixel_spacing.x;
        grid.transform.pixel_height = -params.pixel_spacing.y;
        grid.projection = Some(params.projection.clone());
        grid.write(output)
    }

    fn mosaic(&self, inputs: &[PathBuf], output: &Path, options: &MosaicOptions) -> Result<()> {
        tracing::debug!(inputs = inputs.len(), cut = ?options.cut, "Mosaicking rasters");
        let grids = inputs.iter().map(|p| RasterGrid::read(p)).collect::<Result<Vec<_>>>()?;
        mosaic::mosaic(&grids)?.write(output)
    }

    fn export(&self, input: &Path, output: &Path, options: &ExportOptions) -> Result<()> {
        let grid = RasterGrid::read(input)?;
        let exported = match options.band {
            Some(band) => {
                let mut single = grid.derive(grid.band(band)?.clone());
                single.nodata = grid.nodata;
                single
            }
            None => grid,
        };
        let compress = options.compress || output.extension().map(|e| e == "gz").unwrap_or(false);
        exported.write_encoded(output, compress)
    }

    fn raster_info(&self, raster: &Path) -> Result<RasterInfo> {
        Ok(RasterGrid::read(raster)?.info())
    }

    fn raster_statistics(
        &self,
        raster: &Path,
        band: usize,
        mask: Option<&Path>,
    ) -> Result<RasterStatistics> {
        let grid = RasterGrid::read(raster)?;
        let data = grid.band(band)?;
        let mask = self.read_aligned_mask(mask, &grid)?;

        let values: Vec<f64> = data
            .indexed_iter()
            .filter(|(idx, v)| {
                grid.is_data(**v) && mask.as_ref().map(|m| m[*idx] == MASK_PROCESS).unwrap_or(true)
            })
            .map(|(_, v)| f64::from(*v))
            .collect();

        if values.is_empty() {
            return Err(FloodError::toolkit(
                "raster_statistics",
                format!("{} has no valid pixels in band {}", raster.display(), band),
            ));
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Ok(RasterStatistics {
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean,
            std_dev: variance.sqrt(),
            count: values.len() as u64,
        })
    }

    fn scale_to_byte(&self, input: &Path, band: usize, output: &Path) -> Result<()> {
        let grid = RasterGrid::read(input)?;
        let data = grid.band(band)?;

        let (lo, hi) = data
            .iter()
            .filter(|v| grid.is_data(**v))
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        let span = if hi > lo { hi - lo } else { 1.0 };

        // 0 is reserved for no-data; observations stretch over 1..=255
        let scaled = data.mapv(|v| {
            if grid.is_data(v) {
                (1.0 + ((v - lo) / span * 254.0).round()).clamp(1.0, 255.0)
            } else {
                0.0
            }
        });

        grid.derive(scaled).with_nodata(0.0).write(output)
    }

    fn filter_speckle(&self, input: &Path, output: &Path, window: usize, looks: f32) -> Result<()> {
        map_band(input, 0, output, |band| gamma_map_filter(band, window, looks))
    }

    fn to_decibels(&self, input: &Path, band: usize, output: &Path) -> Result<()> {
        let grid = RasterGrid::read(input)?;
        let db = grid.band(band)?.mapv(|v| {
            if grid.is_data(v) && v > 0.0 {
                10.0 * v.log10()
            } else {
                0.0
            }
        });
        grid.derive(db).with_nodata(0.0).write(output)
    }

    fn filter_majority(&self, input: &Path, output: &Path, window: usize) -> Result<()> {
        map_band(input, 0, output, |band| majority_filter(band, window))
    }

    fn filter_median(&self, input: &Path, output: &Path, window: usize) -> Result<()> {
        map_band(input, 0, output, |band| median_filter(band, window))
    }

    fn classify(
        &self,
        input: &Path,
        band: usize,
        range: &ClassRange,
        mask: Option<&Path>,
        output: &Path,
    ) -> Result<()> {
        let grid = RasterGrid::read(input)?;
        let data = grid.band(band)?;
        let mask = self.read_aligned_mask(mask, &grid)?;

        let mut classes = data.mapv(|v| {
            if grid.is_data(v) && range.contains(f64::from(v)) {
                1.0
            } else {
                0.0
            }
        });
        if let Some(mask) = mask {
            Zip::from(&mut classes).and(&mask).for_each(|c, m| {
                if *m != MASK_PROCESS {
                    *c = 0.0;
                }
            });
        }

        grid.derive(classes).write(output)
    }

    fn rasterize(
        &self,
        vector: &Path,
        template: &Path,
        burn_value: f64,
        output: &Path,
    ) -> Result<()> {
        let polygons = vector::read_polygons(vector)?;
        let template = RasterGrid::read(template)?;
        let burned = rasterize(&polygons, &template, burn_value as f32);
        template.derive(burned).write(output)
    }

    fn replace_value(&self, input: &Path, from: f64, to: f64, output: &Path) -> Result<()> {
        let mut grid = RasterGrid::read(input)?;
        let (from, to) = (from as f32, to as f32);
        for band in &mut grid.bands {
            band.mapv_inplace(|v| if v == from { to } else { v });
        }
        if grid.nodata == Some(from) {
            grid.nodata = None;
        }
        grid.write(output)
    }

    fn overlay(&self, inputs: &[PathBuf], method: OverlayMethod, output: &Path) -> Result<()> {
        let grids = read_aligned(inputs, "overlay")?;
        let first = grids.first().ok_or_else(|| FloodError::toolkit("overlay", "no inputs"))?;

        let mut combined = match method {
            OverlayMethod::Union => Array2::zeros(first.shape()),
            OverlayMethod::Intersection => Array2::ones(first.shape()),
        };
        for grid in &grids {
            let band = grid.band(0)?;
            Zip::from(&mut combined).and(band).for_each(|c, v| {
                let hit = grid.is_data(*v) && *v >= 1.0;
                *c = match method {
                    OverlayMethod::Union if hit => 1.0,
                    OverlayMethod::Intersection if !hit => 0.0,
                    _ => *c,
                };
            });
        }

        first.derive(combined).write(output)
    }

    fn sieve(&self, input: &Path, output: &Path, min_pixels: u64) -> Result<()> {
        map_band(input, 0, output, |band| sieve(band, min_pixels))
    }

    fn raster_to_polygon(&self, input: &Path, output: &Path) -> Result<()> {
        let grid = RasterGrid::read(input)?;
        vector::write_polygons(&polygonize(&grid), output)
    }

    fn read_polygons(&self, vector: &Path) -> Result<Vec<FloodPolygon>> {
        vector::read_polygons(vector)
    }

    fn write_polygons(&self, polygons: &[FloodPolygon], output: &Path) -> Result<()> {
        vector::write_polygons(polygons, output)
    }
}
