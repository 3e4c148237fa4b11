//! Shared fixtures for pipeline integration tests

#![allow(dead_code)]

use floodmap_core::config::{CliConfigOverrides, LayeredConfig};
use floodmap_core::error::Result;
use floodmap_core::models::{FloodPolygon, RasterInfo};
use floodmap_core::ports::{
    ClassRange, ExportOptions, MosaicOptions, OrthoParams, OverlayMethod, RasterStatistics,
    RasterToolkit,
};
use floodmap_geo::{vector, GeoTransform, RasterGrid};
use floodmap_pipeline::PipelineConfig;
use floodmap_toolkit::LocalToolkit;
use geo::{MultiPolygon, Rect};
use ndarray::Array2;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

pub const PIXEL: f64 = 12.5;
pub const ORIGIN_X: f64 = 500_000.0;
pub const ORIGIN_Y: f64 = 5_000_000.0;
pub const SIZE: usize = 40;

pub const SCENE_A: &str = "RS2_OK1_PK2_DK3_F6F_20110507_225921_HH_HV_SGF";
pub const SCENE_B: &str = "RS2_OK1_PK2_DK4_F6F_20110507_225937_HH_HV_SGF";

/// One toolkit call: operation name and output path
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub operation: &'static str,
    pub output: Option<PathBuf>,
}

/// `LocalToolkit` that records every call
#[derive(Default)]
pub struct RecordingToolkit {
    inner: LocalToolkit,
    calls: RefCell<Vec<Call>>,
}

impl RecordingToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Calls of `operation` whose output is inside `dir`
    pub fn calls_into(&self, operation: &str, dir: &Path) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.operation == operation)
            .filter(|c| c.output.as_deref().and_then(Path::parent) == Some(dir))
            .count()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, operation: &'static str, output: Option<&Path>) {
        self.calls.borrow_mut().push(Call { operation, output: output.map(Path::to_path_buf) });
    }
}

impl RasterToolkit for RecordingToolkit {
    fn raster_extension(&self) -> &str {
        self.inner.raster_extension()
    }
    fn vector_extension(&self) -> &str {
        self.inner.vector_extension()
    }
    fn import(&self, source_metadata: &Path, output: &Path) -> Result<()> {
        self.record("import", Some(output));
        self.inner.import(source_metadata, output)
    }
    fn orthorectify(&self, input: &Path, output: &Path, params: &OrthoParams) -> Result<()> {
        self.record("orthorectify", Some(output));
        self.inner.orthorectify(input, output, params)
    }
    fn mosaic(&self, inputs: &[PathBuf], output: &Path, options: &MosaicOptions) -> Result<()> {
        self.record("mosaic", Some(output));
        self.inner.mosaic(inputs, output, options)
    }
    fn export(&self, input: &Path, output: &Path, options: &ExportOptions) -> Result<()> {
        self.record("export", Some(output));
        self.inner.export(input, output, options)
    }
    fn raster_info(&self, raster: &Path) -> Result<RasterInfo> {
        self.record("raster_info", None);
        self.inner.raster_info(raster)
    }
    fn raster_statistics(
        &self,
        raster: &Path,
        band: usize,
        mask: Option<&Path>,
    ) -> Result<RasterStatistics> {
        self.record("raster_statistics", None);
        self.inner.raster_statistics(raster, band, mask)
    }
    fn scale_to_byte(&self, input: &Path, band: usize, output: &Path) -> Result<()> {
        self.record("scale_to_byte", Some(output));
        self.inner.scale_to_byte(input, band, output)
    }
    fn filter_speckle(&self, input: &Path, output: &Path, window: usize, looks: f32) -> Result<()> {
        self.record("filter_speckle", Some(output));
        self.inner.filter_speckle(input, output, window, looks)
    }
    fn to_decibels(&self, input: &Path, band: usize, output: &Path) -> Result<()> {
        self.record("to_decibels", Some(output));
        self.inner.to_decibels(input, band, output)
    }
    fn filter_majority(&self, input: &Path, output: &Path, window: usize) -> Result<()> {
        self.record("filter_majority", Some(output));
        self.inner.filter_majority(input, output, window)
    }
    fn filter_median(&self, input: &Path, output: &Path, window: usize) -> Result<()> {
        self.record("filter_median", Some(output));
        self.inner.filter_median(input, output, window)
    }
    fn classify(
        &self,
        input: &Path,
        band: usize,
        range: &ClassRange,
        mask: Option<&Path>,
        output: &Path,
    ) -> Result<()> {
        self.record("classify", Some(output));
        self.inner.classify(input, band, range, mask, output)
    }
    fn rasterize(&self, vector: &Path, template: &Path, burn_value: f64, output: &Path) -> Result<()> {
        self.record("rasterize", Some(output));
        self.inner.rasterize(vector, template, burn_value, output)
    }
    fn replace_value(&self, input: &Path, from: f64, to: f64, output: &Path) -> Result<()> {
        self.record("replace_value", Some(output));
        self.inner.replace_value(input, from, to, output)
    }
    fn overlay(&self, inputs: &[PathBuf], method: OverlayMethod, output: &Path) -> Result<()> {
        self.record("overlay", Some(output));
        self.inner.overlay(inputs, method, output)
    }
    fn sieve(&self, input: &Path, output: &Path, min_pixels: u64) -> Result<()> {
        self.record("sieve", Some(output));
        self.inner.sieve(input, output, min_pixels)
    }
    fn raster_to_polygon(&self, input: &Path, output: &Path) -> Result<()> {
        self.record("raster_to_polygon", Some(output));
        self.inner.raster_to_polygon(input, output)
    }
    fn read_polygons(&self, vector: &Path) -> Result<Vec<FloodPolygon>> {
        self.record("read_polygons", None);
        self.inner.read_polygons(vector)
    }
    fn write_polygons(&self, polygons: &[FloodPolygon], output: &Path) -> Result<()> {
        self.record("write_polygons", Some(output));
        self.inner.write_polygons(polygons, output)
    }
}

pub fn transform() -> GeoTransform {
    GeoTransform::new(ORIGIN_X, ORIGIN_Y, PIXEL, -PIXEL)
}

/// Fill rows `r0..r1` and columns `c0..c1` with `value`
pub fn fill(data: &mut Array2<f32>, (r0, r1): (usize, usize), (c0, c1): (usize, usize), value: f32) {
    for r in r0..r1 {
        for c in c0..c1 {
            data[[r, c]] = value;
        }
    }
}

/// Two-band intensity image: a 20x20 open-water block and an 8x8 bright block
pub fn scene_imagery() -> RasterGrid {
    let mut hh = Array2::from_elem((SIZE, SIZE), 0.2f32);
    fill(&mut hh, (5, 25), (5, 25), 0.01);
    fill(&mut hh, (28, 36), (28, 36), 0.8);

    let mut hv = Array2::from_elem((SIZE, SIZE), 0.05f32);
    fill(&mut hv, (5, 25), (5, 25), 0.005);
    fill(&mut hv, (28, 36), (28, 36), 0.2);

    RasterGrid::new(transform(), vec![hh, hv]).unwrap()
}

/// Scene directory under `Raw/` with metadata and imagery
pub fn write_scene(root: &Path, name: &str, imagery: &RasterGrid) -> PathBuf {
    let dir = root.join("Raw").join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("product.xml"), "<product/>").unwrap();
    imagery.write(&dir.join("imagery.grd")).unwrap();
    dir
}

/// Rectangle polygon in map coordinates covering pixel rows and columns
pub fn pixel_rect(rows: (usize, usize), cols: (usize, usize)) -> MultiPolygon<f64> {
    let rect = Rect::new(
        (ORIGIN_X + cols.0 as f64 * PIXEL, ORIGIN_Y - rows.1 as f64 * PIXEL),
        (ORIGIN_X + cols.1 as f64 * PIXEL, ORIGIN_Y - rows.0 as f64 * PIXEL),
    );
    MultiPolygon::new(vec![rect.to_polygon()])
}

pub fn write_vector(path: &Path, rows: (usize, usize), cols: (usize, usize)) -> PathBuf {
    vector::write_polygons(&[FloodPolygon::new(pixel_rect(rows, cols), 1)], path).unwrap();
    path.to_path_buf()
}

/// Overrides for a runnable pipeline over `root`, with a DEM and full land cover
pub fn overrides(root: &Path) -> CliConfigOverrides {
    let dem = root.join("dem.grd");
    fs::write(&dem, "dem").unwrap();
    let land_cover = write_vector(&root.join("landcover.geojson"), (0, SIZE), (0, SIZE));

    CliConfigOverrides {
        projection: Some("UTM 18 D122".to_string()),
        dem: Some(dem),
        land_cover: Some(land_cover),
        open_water_threshold: Some(-13.0),
        veg_flood_threshold: Some(-4.0),
        ..Default::default()
    }
}

pub fn pipeline_config(root: &Path, overrides: CliConfigOverrides) -> PipelineConfig {
    let mut layered = LayeredConfig::with_defaults();
    layered.update_from_cli(overrides);
    PipelineConfig::from_layered(root, &layered).unwrap()
}

/// Modification time and content of a file
pub fn snapshot(path: &Path) -> (std::time::SystemTime, Vec<u8>) {
    let meta = fs::metadata(path).unwrap();
    (meta.modified().unwrap(), fs::read(path).unwrap())
}
