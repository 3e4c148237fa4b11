//! Seed calibration against synthetic decibel images

mod common;

use common::*;
use floodmap_core::models::{
    CalibrationWarning, FallbackThresholds, SeedClass, SeedSet, ThresholdSource,
};
use floodmap_geo::RasterGrid;
use floodmap_pipeline::calibrate;
use floodmap_toolkit::LocalToolkit;
use ndarray::Array2;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ROWS: usize = 30;

/// Decibel image with three 10-column class strips
///
/// Each strip alternates `mean - std` and `mean + std`, so its population
/// statistics are exactly `(mean, std)`.
fn decibel_image(path: &Path, classes: [(f32, f32); 3]) {
    let mut data = Array2::zeros((ROWS, 30));
    for ((row, col), value) in data.indexed_iter_mut() {
        let (mean, std) = classes[col / 10];
        *value = if (row + col) % 2 == 0 { mean - std } else { mean + std };
    }
    RasterGrid::single_band(transform(), data).write(path).unwrap();
}

fn seeds(dir: &Path) -> SeedSet {
    let strip = |name: &str, c0: usize| -> PathBuf {
        write_vector(&dir.join(name), (0, ROWS), (c0, c0 + 10))
    };
    SeedSet {
        open_water: Some(strip("water.geojson", 0)),
        non_flood_vegetation: Some(strip("nonflood.geojson", 10)),
        flood_vegetation: Some(strip("flood.geojson", 20)),
    }
}

#[test]
fn test_separable_classes_are_calibrated() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("db.grd");
    decibel_image(&image, [(-15.0, 1.0), (-8.0, 1.0), (-2.0, 1.0)]);

    let outcome = calibrate(
        &LocalToolkit,
        &image,
        0,
        &seeds(dir.path()),
        &FallbackThresholds::default(),
        dir.path(),
    );

    assert_eq!(outcome.source, ThresholdSource::Calibrated);
    assert!(outcome.warning.is_none());
    assert!((outcome.thresholds.open_water - -13.0).abs() < 1e-6);
    assert!((outcome.thresholds.veg_flood - -4.0).abs() < 1e-6);
    assert!(outcome.bounds.is_some());
}

#[test]
fn test_overlapping_classes_fall_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("db.grd");
    decibel_image(&image, [(-5.0, 3.0), (-6.0, 1.0), (-2.0, 1.0)]);

    let outcome = calibrate(
        &LocalToolkit,
        &image,
        0,
        &seeds(dir.path()),
        &FallbackThresholds::default(),
        dir.path(),
    );

    assert_eq!(outcome.source, ThresholdSource::Default);
    assert_eq!(outcome.thresholds.open_water, -3.5);
    assert_eq!(outcome.thresholds.veg_flood, -12.5);
    match outcome.warning {
        Some(CalibrationWarning::NotSeparable { water_max, .. }) => {
            assert!((water_max - 1.0).abs() < 1e-6)
        }
        other => panic!("unexpected warning: {:?}", other),
    }
}

#[test]
fn test_overlap_prefers_user_thresholds() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("db.grd");
    decibel_image(&image, [(-5.0, 3.0), (-6.0, 1.0), (-2.0, 1.0)]);

    let fallback = FallbackThresholds { open_water: Some(-14.0), veg_flood: None };
    let outcome = calibrate(&LocalToolkit, &image, 0, &seeds(dir.path()), &fallback, dir.path());

    assert_eq!(outcome.source, ThresholdSource::UserSupplied);
    assert_eq!(outcome.thresholds.open_water, -14.0);
    assert_eq!(outcome.thresholds.veg_flood, -12.5);
}

#[test]
fn test_missing_seed_is_a_warning() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("db.grd");
    decibel_image(&image, [(-15.0, 1.0), (-8.0, 1.0), (-2.0, 1.0)]);
    let mut seeds = seeds(dir.path());
    seeds.flood_vegetation = None;

    let outcome = calibrate(
        &LocalToolkit,
        &image,
        0,
        &seeds,
        &FallbackThresholds::default(),
        dir.path(),
    );

    assert_eq!(outcome.source, ThresholdSource::Default);
    assert_eq!(
        outcome.warning,
        Some(CalibrationWarning::SeedsMissing { classes: vec![SeedClass::FloodVegetation] })
    );
}

#[test]
fn test_seed_outside_image_is_a_warning() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("db.grd");
    decibel_image(&image, [(-15.0, 1.0), (-8.0, 1.0), (-2.0, 1.0)]);
    let mut seeds = seeds(dir.path());
    seeds.open_water =
        Some(write_vector(&dir.path().join("far.geojson"), (100, 110), (100, 110)));

    let outcome = calibrate(
        &LocalToolkit,
        &image,
        0,
        &seeds,
        &FallbackThresholds::default(),
        dir.path(),
    );

    assert!(matches!(
        outcome.warning,
        Some(CalibrationWarning::StatisticsUnavailable { class: SeedClass::OpenWater, .. })
    ));
    assert_eq!(outcome.thresholds.open_water, -3.5);
}
