//! Multi-threshold vector extraction over a synthetic scaled image

mod common;

use common::*;
use floodmap_core::models::{Polarization, ThresholdRange};
use floodmap_core::{FloodError, RunWorkspace};
use floodmap_geo::RasterGrid;
use floodmap_pipeline::{extract_flood_vectors, plan_products, ExtractionRequest};
use floodmap_toolkit::LocalToolkit;
use ndarray::Array2;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// 8-bit image with a 6.25 ha dark block and a small dark block
fn scaled_image(path: &Path) -> PathBuf {
    let mut data = Array2::from_elem((SIZE, SIZE), 100.0f32);
    fill(&mut data, (2, 22), (2, 22), 5.0);
    fill(&mut data, (28, 34), (28, 34), 5.0);
    RasterGrid::single_band(transform(), data).with_nodata(0.0).write(path).unwrap();
    path.to_path_buf()
}

fn mask(path: &Path, rows: (usize, usize)) -> PathBuf {
    let mut data = Array2::zeros((SIZE, SIZE));
    fill(&mut data, rows, (0, SIZE), 1.0);
    write_mask(path, data)
}

fn write_mask(path: &Path, data: Array2<f32>) -> PathBuf {
    RasterGrid::single_band(transform(), data).write(path).unwrap();
    path.to_path_buf()
}

fn request(image: PathBuf, min_polygon_ha: f64, mask: Option<PathBuf>) -> ExtractionRequest {
    ExtractionRequest {
        image,
        polarization: Polarization::HH,
        range: ThresholdRange::new(10, 12).unwrap(),
        min_polygon_ha,
        mask,
    }
}

fn setup() -> (TempDir, RunWorkspace, PathBuf) {
    let dir = TempDir::new().unwrap();
    let workspace = RunWorkspace::init(dir.path()).unwrap();
    let image = scaled_image(&dir.path().join("Scaled/20110507_225921_UTM18_mos_HH_8bit_MED3x3.grd"));
    (dir, workspace, image)
}

#[test]
fn test_sweep_produces_one_product_per_threshold() {
    let (dir, workspace, image) = setup();

    let products = extract_flood_vectors(&LocalToolkit, &workspace, &request(image, 2.5, None)).unwrap();

    assert_eq!(products.len(), 3);
    let names: Vec<String> = products
        .iter()
        .map(|p| p.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "20110507_225921_UTM18_mos_HH_thr_10_2p5ha.geojson",
            "20110507_225921_UTM18_mos_HH_thr_11_2p5ha.geojson",
            "20110507_225921_UTM18_mos_HH_thr_12_2p5ha.geojson",
        ]
    );
    for product in &products {
        assert!(product.path.starts_with(dir.path().join("OWFEP")));
        assert!(product.path.is_file());
        assert_eq!(product.polygon_count, Some(1));
    }
}

#[test]
fn test_small_polygons_follow_minimum_size() {
    let (_dir, workspace, image) = setup();

    let strict = extract_flood_vectors(&LocalToolkit, &workspace, &request(image.clone(), 2.5, None)).unwrap();
    let loose = extract_flood_vectors(&LocalToolkit, &workspace, &request(image, 0.1, None)).unwrap();

    assert_eq!(strict[0].polygon_count, Some(1));
    assert_eq!(loose[0].polygon_count, Some(2));
    assert_ne!(strict[0].path, loose[0].path);

    let kept = floodmap_geo::vector::read_polygons(&loose[0].path).unwrap();
    assert!(kept.iter().all(|p| p.value > 0 && p.area_ha.unwrap() >= 0.1));
}

#[test]
fn test_all_zero_mask_is_rejected_before_extraction() {
    let (dir, workspace, image) = setup();
    let mask = mask(&dir.path().join("mask.grd"), (0, 0));

    let err = extract_flood_vectors(&LocalToolkit, &workspace, &request(image, 2.5, Some(mask)))
        .unwrap_err();

    assert!(matches!(err, FloodError::Validation { ref parameter, .. } if parameter == "mask"));
    assert_eq!(fs::read_dir(dir.path().join("OWFEP")).unwrap().count(), 0);
}

#[test]
fn test_mask_without_value_one_is_rejected() {
    let (dir, workspace, image) = setup();
    let mask = write_mask(&dir.path().join("mask.grd"), Array2::from_elem((SIZE, SIZE), 2.0));

    let err = extract_flood_vectors(&LocalToolkit, &workspace, &request(image, 2.5, Some(mask)))
        .unwrap_err();

    assert!(matches!(err, FloodError::Validation { ref parameter, .. } if parameter == "mask"));
    assert_eq!(fs::read_dir(dir.path().join("OWFEP")).unwrap().count(), 0);
}

#[test]
fn test_mask_values_other_than_one_are_not_processed() {
    let (dir, workspace, image) = setup();
    // 2 over the rows of the large block, 1 elsewhere
    let mut data = Array2::from_elem((SIZE, SIZE), 1.0f32);
    fill(&mut data, (0, 26), (0, SIZE), 2.0);
    let mask = write_mask(&dir.path().join("mask.grd"), data);

    let products =
        extract_flood_vectors(&LocalToolkit, &workspace, &request(image, 0.1, Some(mask))).unwrap();

    assert_eq!(products[0].polygon_count, Some(1));
    let kept = floodmap_geo::vector::read_polygons(&products[0].path).unwrap();
    assert!(kept.iter().all(|p| p.area_ha.unwrap() < 1.0));
}

#[test]
fn test_misaligned_mask_fails_without_products() {
    let (dir, workspace, image) = setup();
    let mask = write_mask(&dir.path().join("mask.grd"), Array2::from_elem((SIZE / 2, SIZE / 2), 1.0));

    let err = extract_flood_vectors(&LocalToolkit, &workspace, &request(image, 2.5, Some(mask)))
        .unwrap_err();

    assert!(matches!(err, FloodError::StageFailed { .. }));
    assert_eq!(fs::read_dir(dir.path().join("OWFEP")).unwrap().count(), 0);
}

#[test]
fn test_mask_limits_polygons_and_marks_names() {
    let (dir, workspace, image) = setup();
    // Bottom rows only: excludes the large block
    let mask = mask(&dir.path().join("mask.grd"), (26, SIZE));

    let products =
        extract_flood_vectors(&LocalToolkit, &workspace, &request(image, 0.1, Some(mask))).unwrap();

    assert!(products[0].path.to_string_lossy().ends_with("_thr_10_0p1ha_m.geojson"));
    assert!(products.iter().all(|p| p.masked));
    assert_eq!(products[0].polygon_count, Some(1));
}

#[test]
fn test_existing_products_are_not_rewritten() {
    let (_dir, workspace, image) = setup();
    let first = extract_flood_vectors(&LocalToolkit, &workspace, &request(image.clone(), 2.5, None)).unwrap();
    let before = snapshot(&first[1].path);

    let second = extract_flood_vectors(&LocalToolkit, &workspace, &request(image, 2.5, None)).unwrap();

    assert_eq!(snapshot(&second[1].path), before);
    assert_eq!(second[1].polygon_count, None);
}

#[test]
fn test_plan_is_deterministic_and_writes_nothing() {
    let (dir, workspace, image) = setup();
    let request = request(image, 2.5, None);

    let first = plan_products(&LocalToolkit, &workspace, &request);
    let second = plan_products(&LocalToolkit, &workspace, &request);

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert!(first[0].classified.starts_with(dir.path().join("Scratch")));
    assert!(first.iter().all(|p| !p.product.path.exists()));
}
