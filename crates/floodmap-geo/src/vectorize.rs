//! Conversion between classified rasters and polygons

use crate::morphology::label_regions;
use crate::raster::{GeoTransform, RasterGrid};
use floodmap_core::models::FloodPolygon;
use geo::{coord, BoundingRect, Contains, MultiPolygon, Point, Polygon, Rect};
use ndarray::Array2;

/// One polygon per 4-connected equal-value region of the first band
///
/// Each region becomes a multipolygon of pixel row runs, so its area is
/// exactly the pixel count times the pixel area. No-data pixels are skipped.
pub fn polygonize(grid: &RasterGrid) -> Vec<FloodPolygon> {
    let Some(band) = grid.bands.first() else {
        return Vec::new();
    };
    let (labels, regions) = label_regions(band, |v| grid.is_data(v));
    let mut runs: Vec<Vec<Polygon<f64>>> = vec![Vec::new(); regions.len()];

    for (row, line) in labels.outer_iter().enumerate() {
        let mut col = 0;
        while col < line.len() {
            let label = line[col];
            let start = col;
            while col < line.len() && line[col] == label {
                col += 1;
            }
            if label != usize::MAX {
                runs[label].push(run_polygon(&grid.transform, row, start, col));
            }
        }
    }

    regions
        .iter()
        .zip(runs)
        .map(|(region, polygons)| FloodPolygon::new(MultiPolygon(polygons), region.value as i64))
        .collect()
}

fn run_polygon(transform: &GeoTransform, row: usize, start: usize, end: usize) -> Polygon<f64> {
    let (x0, y0) = transform.pixel_corner(row, start);
    let (x1, y1) = transform.pixel_corner(row + 1, end);
    Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon()
}

/// Burn polygons into a zeroed band on the grid of `template`
///
/// A pixel is burned when its centre lies inside a polygon.
pub fn rasterize(polygons: &[FloodPolygon], template: &RasterGrid, burn_value: f32) -> Array2<f32> {
    let (height, width) = template.shape();
    let transform = template.transform;
    let mut burned = Array2::zeros((height, width));

    for polygon in polygons {
        let Some(bounds) = polygon.geometry.bounding_rect() else {
            continue;
        };
        let (rows, cols) = pixel_window(&transform, bounds, height, width);

        for row in rows {
            for col in cols.clone() {
                let (x, y) = transform.pixel_center(row, col);
                if polygon.geometry.contains(&Point::new(x, y)) {
                    burned[[row, col]] = burn_value;
                }
            }
        }
    }

    burned
}

/// Pixel index ranges covering a map rectangle, clipped to the grid
fn pixel_window(
    transform: &GeoTransform,
    bounds: Rect<f64>,
    height: usize,
    width: usize,
) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
    let (r0, c0) = transform.to_pixel(bounds.min().x, bounds.min().y);
    let (r1, c1) = transform.to_pixel(bounds.max().x, bounds.max().y);

    let clip = |a: f64, b: f64, limit: usize| {
        let lo = a.min(b).floor().max(0.0) as usize;
        let hi = (a.max(b).ceil().max(0.0) as usize).min(limit);
        lo.min(hi)..hi
    };

    (clip(r0, r1, height), clip(c0, c1, width))
}
