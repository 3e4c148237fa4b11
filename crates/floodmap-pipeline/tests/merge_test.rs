//! Merge of open-water vectors with flooded-vegetation rasters

mod common;

use common::*;
use floodmap_core::models::sieve_pixel_count;
use floodmap_core::ports::RasterToolkit;
use floodmap_core::RunWorkspace;
use floodmap_geo::RasterGrid;
use floodmap_pipeline::{merge_products, MergePlan};
use floodmap_toolkit::LocalToolkit;
use ndarray::Array2;
use proptest::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Vegetation raster with a 255 no-data frame, a large and a small flooded patch
fn vegetation_raster(path: &Path) -> PathBuf {
    let mut data = Array2::zeros((SIZE, SIZE));
    fill(&mut data, (0, 2), (0, SIZE), 255.0);
    fill(&mut data, (4, 20), (24, 38), 1.0);
    fill(&mut data, (30, 34), (30, 34), 1.0);
    RasterGrid::single_band(transform(), data).with_nodata(255.0).write(path).unwrap();
    path.to_path_buf()
}

#[test]
fn test_sieve_count_for_default_hole_size() {
    assert_eq!(sieve_pixel_count(2.5, 12.5, -12.5).unwrap(), 160);
    assert_eq!(sieve_pixel_count(250.0, 12.5, -12.5).unwrap(), 16000);
}

#[test]
fn test_merge_unions_and_sieves() {
    let dir = TempDir::new().unwrap();
    let workspace = RunWorkspace::init(dir.path()).unwrap();
    workspace.reset_scratch().unwrap();

    let open_water = write_vector(
        &dir.path().join("OWFEP/scene_HH_thr_12_2p5ha.geojson"),
        (22, 38),
        (2, 18),
    );
    let vegetation = vegetation_raster(&dir.path().join("VEGFEP/scene_HH_m4_m13_vegflood.grd"));

    let plan = MergePlan::new(&LocalToolkit, &workspace, &open_water, vec![vegetation], 2.5);
    let merged = merge_products(&LocalToolkit, &plan).unwrap();

    assert_eq!(merged.sieve_pixels, 160);
    assert!(merged.raster.ends_with("MERGEFEP/scene_HH_thr_12_2p5ha_2p5ha_MergeFEP.grd.gz"));

    let raster = RasterGrid::read(&merged.raster).unwrap();
    let band = raster.band(0).unwrap();
    // Open water and the large vegetation patch survive; the 16-pixel patch and the frame do not
    assert_eq!(band[[30, 10]], 1.0);
    assert_eq!(band[[10, 30]], 1.0);
    assert_eq!(band[[31, 31]], 0.0);
    assert_eq!(band[[0, 0]], 0.0);

    let polygons = LocalToolkit.read_polygons(&merged.vector).unwrap();
    assert_eq!(polygons.len(), 2);
    assert!(polygons.iter().all(|p| p.is_flood()));
}

proptest! {
    #[test]
    fn prop_sieve_count_is_positive_above_one_pixel(
        hole in 0.1f64..500.0,
        spacing in 1.0f64..30.0,
    ) {
        let pixel_ha = spacing * spacing / 10_000.0;
        prop_assume!(hole >= pixel_ha * 1.001);
        prop_assert!(sieve_pixel_count(hole, spacing, -spacing).unwrap() >= 1);
    }
}
