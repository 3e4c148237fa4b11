//! Mosaicking of grids that share a pixel size

use crate::raster::{GeoTransform, RasterGrid};
use floodmap_core::error::{FloodError, Result};
use ndarray::Array2;

const ALIGNMENT_TOLERANCE: f64 = 1e-6;

/// Place every input on the union of their extents
///
/// Inputs must share pixel size and band count, and sit on the same pixel
/// lattice. Later inputs overwrite earlier ones wherever they carry data.
/// Uncovered pixels take the first input's no-data value, or 0.
pub fn mosaic(grids: &[RasterGrid]) -> Result<RasterGrid> {
    let first = grids.first().ok_or_else(|| FloodError::toolkit("mosaic", "no inputs"))?;
    let pw = first.transform.pixel_width;
    let ph = first.transform.pixel_height;
    let band_count = first.bands.len();

    for grid in grids {
        let t = &grid.transform;
        if (t.pixel_width - pw).abs() > ALIGNMENT_TOLERANCE
            || (t.pixel_height - ph).abs() > ALIGNMENT_TOLERANCE
        {
            return Err(FloodError::toolkit(
                "mosaic",
                format!(
                    "pixel size {}x{} differs from {}x{}",
                    t.pixel_width, t.pixel_height, pw, ph
                ),
            ));
        }
        if grid.bands.len() != band_count {
            return Err(FloodError::toolkit(
                "mosaic",
                format!("band count {} differs from {}", grid.bands.len(), band_count),
            ));
        }
    }

    // Edges in map units; rows run along pixel_height's sign
    let left = grids.iter().map(|g| g.transform.origin_x).fold(f64::INFINITY, f64::min);
    let right = grids
        .iter()
        .map(|g| g.transform.origin_x + g.width() as f64 * pw)
        .fold(f64::NEG_INFINITY, f64::max);
    let north_up = ph < 0.0;
    let origins = grids.iter().map(|g| g.transform.origin_y);
    let ends = grids.iter().map(|g| g.transform.origin_y + g.height() as f64 * ph);
    let (top, bottom) = if north_up {
        (origins.fold(f64::NEG_INFINITY, f64::max), ends.fold(f64::INFINITY, f64::min))
    } else {
        (origins.fold(f64::INFINITY, f64::min), ends.fold(f64::NEG_INFINITY, f64::max))
    };

    let width = ((right - left) / pw).round() as usize;
    let height = ((bottom - top) / ph).round() as usize;
    let fill = first.nodata.unwrap_or(0.0);
    let transform = GeoTransform::new(left, top, pw, ph);

    let mut bands: Vec<Array2<f32>> =
        (0..band_count).map(|_| Array2::from_elem((height, width), fill)).collect();

    for grid in grids {
        let col_offset = lattice_offset(grid.transform.origin_x - left, pw)?;
        let row_offset = lattice_offset(grid.transform.origin_y - top, ph)?;

        for (target, source) in bands.iter_mut().zip(&grid.bands) {
            for ((row, col), value) in source.indexed_iter() {
                if grid.is_data(*value) {
                    target[[row + row_offset, col + col_offset]] = *value;
                }
            }
        }
    }

    let mut merged = RasterGrid::new(transform, bands)?;
    merged.projection = first.projection.clone();
    merged.nodata = first.nodata;
    Ok(merged)
}

fn lattice_offset(distance: f64, pixel: f64) -> Result<usize> {
    let steps = distance / pixel;
    if (steps - steps.round()).abs() > ALIGNMENT_TOLERANCE {
        return Err(FloodError::toolkit("mosaic", "inputs are not on a common pixel lattice"));
    }
    Ok(steps.round().max(0.0) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_later_input_overwrites_where_it_has_data() {
        let t = GeoTransform::new(0.0, 20.0, 10.0, -10.0);
        let a = RasterGrid::single_band(t, array![[1.0, 1.0], [1.0, 1.0]]).with_nodata(0.0);
        let b = RasterGrid::single_band(t, array![[2.0, 0.0], [0.0, 2.0]]).with_nodata(0.0);

        let merged = mosaic(&[a, b]).unwrap();
        assert_eq!(merged.bands[0], array![[2.0, 1.0], [1.0, 2.0]]);
    }

    #[test]
    fn test_offset_inputs_cover_union_extent() {
        let a = RasterGrid::single_band(GeoTransform::new(0.0, 20.0, 10.0, -10.0), array![[1.0, 1.0], [1.0, 1.0]]);
        let b = RasterGrid::single_band(GeoTransform::new(10.0, 10.0, 10.0, -10.0), array![[2.0, 2.0], [2.0, 2.0]]);

        let merged = mosaic(&[a, b]).unwrap();
        assert_eq!(merged.shape(), (3, 3));
        assert_eq!(merged.transform, GeoTransform::new(0.0, 20.0, 10.0, -10.0));
        assert_eq!(merged.bands[0], array![[1.0, 1.0, 0.0], [1.0, 2.0, 2.0], [0.0, 2.0, 2.0]]);
    }

    #[test]
    fn test_mismatched_pixel_size_rejected() {
        let a = RasterGrid::single_band(GeoTransform::new(0.0, 0.0, 10.0, -10.0), Array2::zeros((2, 2)));
        let b = RasterGrid::single_band(GeoTransform::new(0.0, 0.0, 5.0, -5.0), Array2::zeros((2, 2)));
        assert!(mosaic(&[a, b]).is_err());
    }
}
