//! Seed-region threshold calibration against a decibel image

use floodmap_core::models::{
    derive_thresholds, CalibrationOutcome, CalibrationWarning, ClassStatistics, FallbackThresholds,
    SeedClass, SeedSet, SeedStatistics,
};
use floodmap_core::ports::RasterToolkit;
use std::path::Path;

/// Calibrate vegetation thresholds from seed statistics
///
/// Never fails: missing seeds, toolkit errors and overlapping classes all
/// produce a warning and the fallback thresholds.
pub fn calibrate<T: RasterToolkit + ?Sized>(
    toolkit: &T,
    image: &Path,
    band: usize,
    seeds: &SeedSet,
    fallback: &FallbackThresholds,
    scratch: &Path,
) -> CalibrationOutcome {
    let missing = seeds.missing_classes();
    if !missing.is_empty() {
        let warning = CalibrationWarning::SeedsMissing { classes: missing };
        tracing::warn!(image = %image.display(), "{}", warning);
        return CalibrationOutcome::fallback(fallback, Some(warning));
    }

    let mut class_stats = Vec::with_capacity(SeedClass::ALL.len());
    for class in SeedClass::ALL {
        match seed_statistics(toolkit, image, band, seeds, class, scratch) {
            Ok(stats) => class_stats.push(stats),
            Err(reason) => {
                let warning = CalibrationWarning::StatisticsUnavailable { class, reason };
                tracing::warn!(image = %image.display(), "{}", warning);
                return CalibrationOutcome::fallback(fallback, Some(warning));
            }
        }
    }

    let stats = SeedStatistics {
        water: class_stats[0],
        non_flood: class_stats[1],
        flood: class_stats[2],
    };
    let outcome = derive_thresholds(&stats, fallback);

    match &outcome.warning {
        Some(warning) => tracing::warn!(image = %image.display(), "{}", warning),
        None => tracing::info!(
            open_water = outcome.thresholds.open_water,
            veg_flood = outcome.thresholds.veg_flood,
            "Calibrated vegetation thresholds"
        ),
    }

    outcome
}

fn seed_statistics<T: RasterToolkit + ?Sized>(
    toolkit: &T,
    image: &Path,
    band: usize,
    seeds: &SeedSet,
    class: SeedClass,
    scratch: &Path,
) -> std::result::Result<ClassStatistics, String> {
    let region = seeds.region(class).ok_or_else(|| format!("no {} seed configured", class))?;
    let mask = scratch.join(format!("seed_{}.{}", class, toolkit.raster_extension()));

    toolkit.rasterize(&region.path, image, 1.0, &mask).map_err(|e| e.to_string())?;
    let stats = toolkit.raster_statistics(image, band, Some(&mask)).map_err(|e| e.to_string())?;

    tracing::debug!(class = %class, mean = stats.mean, std_dev = stats.std_dev, pixels = stats.count, "Seed statistics");
    Ok(ClassStatistics::new(stats.mean, stats.std_dev))
}
