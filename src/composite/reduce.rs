//! Element-wise reduction of a stack of equally shaped rasters.

use crate::composite::error::CompositeError;
use crate::raster::dataset::RasterDataset;
use crate::types::product::Aggregation;

/// Reduces `stack` pixel by pixel with `aggregation`.
///
/// The result takes its transform, CRS and nodata value from the first raster. A pixel that
/// is fill in any layer is fill in the result, written as the first raster's nodata value
/// (or NaN when it has none). Layers are numbered from 1 in errors, matching calendar months
/// when the stack is a year.
pub fn reduce_stack(
    stack: &[RasterDataset],
    aggregation: Aggregation,
) -> Result<RasterDataset, CompositeError> {
    let first = stack.first().ok_or(CompositeError::EmptyStack)?;
    let expected = first.shape();
    for (index, raster) in stack.iter().enumerate() {
        if raster.shape() != expected {
            return Err(CompositeError::ShapeMismatch {
                month: index as u32 + 1,
                expected,
                found: raster.shape(),
            });
        }
    }

    let fill = first.nodata().map_or(f32::NAN, |nodata| nodata as f32);
    let pixel_count = first.data().len();
    let mut reduced = Vec::with_capacity(pixel_count);
    for pixel in 0..pixel_count {
        let all_valid = stack.iter().all(|r| r.is_valid(r.data()[pixel]));
        let value = if all_valid {
            aggregation
                .reduce(stack.iter().map(|r| r.data()[pixel]))
                .unwrap_or(fill)
        } else {
            fill
        };
        reduced.push(value);
    }

    Ok(first.with_pixels(reduced)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::dataset::{Crs, GeoTransform};

    const NODATA: f64 = -9999.0;

    fn uniform(value: f32, width: usize, height: usize) -> RasterDataset {
        RasterDataset::new(
            width,
            height,
            vec![value; width * height],
            GeoTransform::north_up(-160.0, 22.5, 0.01, 0.01),
            Crs::WGS84,
        )
        .unwrap()
        .with_nodata(Some(NODATA))
    }

    fn year_of_months() -> Vec<RasterDataset> {
        (1..=12).map(|m| uniform(m as f32, 5, 3)).collect()
    }

    #[test]
    fn test_mean_of_month_numbers_is_six_and_a_half() -> Result<(), CompositeError> {
        let composite = reduce_stack(&year_of_months(), Aggregation::Mean)?;
        assert_eq!(composite.shape(), (3, 5));
        assert!(composite.data().iter().all(|v| *v == 6.5));
        assert_eq!(composite.crs(), Crs::WGS84);
        assert_eq!(composite.nodata(), Some(NODATA));
        Ok(())
    }

    #[test]
    fn test_min_and_max_are_honoured() -> Result<(), CompositeError> {
        let months = year_of_months();
        let min = reduce_stack(&months, Aggregation::Min)?;
        let max = reduce_stack(&months, Aggregation::Max)?;
        assert!(min.data().iter().all(|v| *v == 1.0));
        assert!(max.data().iter().all(|v| *v == 12.0));
        Ok(())
    }

    #[test]
    fn test_fill_in_any_month_propagates() -> Result<(), CompositeError> {
        let mut months = year_of_months();
        let mut june = months[5].data().to_vec();
        june[0] = NODATA as f32;
        june[1] = f32::NAN;
        months[5] = months[5].with_pixels(june)?;

        let composite = reduce_stack(&months, Aggregation::Mean)?;
        assert_eq!(composite.data()[0], NODATA as f32);
        assert_eq!(composite.data()[1], NODATA as f32);
        assert_eq!(composite.data()[2], 6.5);
        Ok(())
    }

    #[test]
    fn test_shape_mismatch_names_the_layer() {
        let mut months = year_of_months();
        months[8] = uniform(9.0, 4, 3);
        let err = reduce_stack(&months, Aggregation::Mean).unwrap_err();
        assert!(matches!(
            err,
            CompositeError::ShapeMismatch {
                month: 9,
                expected: (3, 5),
                found: (3, 4)
            }
        ));
        assert_eq!(err.month(), Some(9));
    }

    #[test]
    fn test_empty_stack() {
        assert!(matches!(
            reduce_stack(&[], Aggregation::Max),
            Err(CompositeError::EmptyStack)
        ));
    }
}
