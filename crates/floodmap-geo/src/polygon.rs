//! Area filtering of vectorized flood polygons

use floodmap_core::models::{FloodPolygon, SQUARE_METRES_PER_HECTARE};
use geo::{Area, MultiPolygon};

/// Planar area in hectares; coordinates must be in metres
pub fn area_hectares(geometry: &MultiPolygon<f64>) -> f64 {
    geometry.unsigned_area() / SQUARE_METRES_PER_HECTARE
}

/// Polygons kept by [`filter_flood_polygons`] and what was dropped
#[derive(Debug, Clone, Default)]
pub struct PolygonFilterOutcome {
    pub kept: Vec<FloodPolygon>,
    pub dropped_non_flood: usize,
    pub dropped_small: usize,
}

/// Keep flood-valued polygons of at least `min_hectares`, with `area_ha` filled in
///
/// Small polygons are removed rather than merged into neighbours.
pub fn filter_flood_polygons(polygons: Vec<FloodPolygon>, min_hectares: f64) -> PolygonFilterOutcome {
    let mut outcome = PolygonFilterOutcome::default();

    for mut polygon in polygons {
        if !polygon.is_flood() {
            outcome.dropped_non_flood += 1;
            continue;
        }

        let area = area_hectares(&polygon.geometry);
        if area < min_hectares {
            outcome.dropped_small += 1;
            continue;
        }

        polygon.area_ha = Some(area);
        outcome.kept.push(polygon);
    }

    outcome
}
