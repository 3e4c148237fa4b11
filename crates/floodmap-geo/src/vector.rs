//! GeoJSON reading and writing of flood polygons

use crate::validation::validate_multipolygon;
use floodmap_core::error::{FloodError, Result};
use floodmap_core::models::FloodPolygon;
use geo::{Coord, LineString, MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use std::fs;
use std::path::Path;

/// Read every polygonal feature of a GeoJSON file
///
/// The `value` property becomes the polygon value (1 when absent) and
/// `area_ha` is carried through when present. Non-polygonal geometries are skipped.
pub fn read_polygons(path: &Path) -> Result<Vec<FloodPolygon>> {
    let content = fs::read_to_string(path)
        .map_err(|e| FloodError::toolkit("read_polygons", format!("{}: {}", path.display(), e)))?;
    let geojson: GeoJson = content
        .parse()
        .map_err(|e| FloodError::toolkit("read_polygons", format!("{}: {}", path.display(), e)))?;

    let features = match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature::from(geometry)],
    };

    let mut polygons = Vec::new();
    for (idx, feature) in features.iter().enumerate() {
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };
        let Some(multi) = to_multipolygon(&geometry.value) else {
            tracing::debug!(path = %path.display(), feature = idx, "Skipping non-polygonal feature");
            continue;
        };

        let validation = validate_multipolygon(&multi);
        if !validation.is_valid {
            let reasons: Vec<String> = validation
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.location, e.reason))
                .collect();
            return Err(FloodError::toolkit(
                "read_polygons",
                format!("{} feature {}: {}", path.display(), idx, reasons.join("; ")),
            ));
        }

        let value = feature
            .property("value")
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
            .unwrap_or(1);
        let mut polygon = FloodPolygon::new(multi, value);
        polygon.area_ha = feature.property("area_ha").and_then(|v| v.as_f64());
        polygons.push(polygon);
    }

    Ok(polygons)
}

/// Write polygons as a feature collection with `value` and `area_ha` properties
pub fn write_polygons(polygons: &[FloodPolygon], path: &Path) -> Result<()> {
    let features = polygons
        .iter()
        .map(|polygon| {
            let mut properties = JsonObject::new();
            properties.insert("value".to_string(), polygon.value.into());
            if let Some(area) = polygon.area_ha {
                properties.insert("area_ha".to_string(), area.into());
            }
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(from_multipolygon(&polygon.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let collection =
        GeoJson::FeatureCollection(FeatureCollection { bbox: None, features, foreign_members: None });

    let mut staging_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    staging_name.push(".partial");
    let staging = path.with_file_name(staging_name);

    fs::write(&staging, collection.to_string())
        .and_then(|_| fs::rename(&staging, path))
        .map_err(|e| {
            let _ = fs::remove_file(&staging);
            FloodError::toolkit("write_polygons", format!("{}: {}", path.display(), e))
        })
}

fn to_multipolygon(value: &Value) -> Option<MultiPolygon<f64>> {
    match value {
        Value::Polygon(rings) => Some(MultiPolygon(vec![to_polygon(rings)])),
        Value::MultiPolygon(polygons) => Some(MultiPolygon(polygons.iter().map(|p| to_polygon(p)).collect())),
        Value::GeometryCollection(geometries) => {
            let polygons: Vec<Polygon<f64>> = geometries
                .iter()
                .filter_map(|g| to_multipolygon(&g.value))
                .flat_map(|m| m.0)
                .collect();
            (!polygons.is_empty()).then(|| MultiPolygon(polygons))
        }
        _ => None,
    }
}

fn to_polygon(rings: &[Vec<Vec<f64>>]) -> Polygon<f64> {
    let mut rings = rings.iter().map(|ring| to_line_string(ring));
    let exterior = rings.next().unwrap_or_else(|| LineString(Vec::new()));
    Polygon::new(exterior, rings.collect())
}

fn to_line_string(ring: &[Vec<f64>]) -> LineString<f64> {
    LineString(
        ring.iter()
            .map(|p| Coord {
                x: p.first().copied().unwrap_or(f64::NAN),
                y: p.get(1).copied().unwrap_or(f64::NAN),
            })
            .collect(),
    )
}

fn from_multipolygon(geometry: &MultiPolygon<f64>) -> Value {
    let ring = |ls: &LineString<f64>| ls.0.iter().map(|c| vec![c.x, c.y]).collect::<Vec<_>>();
    Value::MultiPolygon(
        geometry
            .0
            .iter()
            .map(|polygon| {
                std::iter::once(ring(polygon.exterior()))
                    .chain(polygon.interiors().iter().map(ring))
                    .collect()
            })
            .collect(),
    )
}
