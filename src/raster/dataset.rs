//! In-memory single-band rasters with their geospatial reference.

use crate::raster::error::RasterError;
use crate::raster::geotiff;
use std::fmt;

/// Values below this are fill (ocean) cells in HCDP maps, whatever nodata tag the file carries.
pub const INVALID_THRESHOLD: f32 = -1e20;

/// Value written for missing cells by [`RasterDataset::scaled_for_display`].
pub const MISSING_DISPLAY_VALUE: f32 = -1.0;

/// Affine pixel-to-world transform, coefficients in GDAL order.
///
/// `x = origin_x + col * pixel_width + row * row_rotation`
/// `y = origin_y + col * column_rotation + row * pixel_height`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub column_rotation: f64,
    /// Negative for north-up rasters.
    pub pixel_height: f64,
}

impl GeoTransform {
    /// A north-up transform anchored at the top-left corner. Both sizes are given as positive
    /// ground distances.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_size_x: f64, pixel_size_y: f64) -> Self {
        Self {
            origin_x,
            pixel_width: pixel_size_x,
            row_rotation: 0.0,
            origin_y,
            column_rotation: 0.0,
            pixel_height: -pixel_size_y,
        }
    }

    pub fn is_north_up(&self) -> bool {
        self.row_rotation == 0.0 && self.column_rotation == 0.0 && self.pixel_height < 0.0
    }

    /// World coordinates of a (fractional) pixel position. `(0, 0)` is the outer corner of
    /// the top-left pixel.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.column_rotation + row * self.pixel_height,
        )
    }
}

/// Coordinate reference system of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    Epsg(u16),
    /// User-defined or absent geokeys.
    Unknown,
}

impl Crs {
    pub const WGS84: Crs = Crs::Epsg(4326);
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{code}"),
            Crs::Unknown => f.write_str("unknown"),
        }
    }
}

/// Axis-aligned extent in the raster's CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// `[[south, west], [north, east]]`, the corner order web map image overlays expect.
    pub fn to_overlay_corners(&self) -> [[f64; 2]; 2] {
        [[self.min_y, self.min_x], [self.max_y, self.max_x]]
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// A decoded raster band.
///
/// Pixels are stored row-major, top row first. The dataset owns its buffer; there is no
/// file handle behind it, so dropping it is all the cleanup it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterDataset {
    width: usize,
    height: usize,
    data: Vec<f32>,
    transform: GeoTransform,
    crs: Crs,
    nodata: Option<f64>,
}

impl RasterDataset {
    pub fn new(
        width: usize,
        height: usize,
        data: Vec<f32>,
        transform: GeoTransform,
        crs: Crs,
    ) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::Empty { width, height });
        }
        let expected = width * height;
        if data.len() != expected {
            return Err(RasterError::BufferSize {
                width,
                height,
                expected,
                found: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
            transform,
            crs,
            nodata: None,
        })
    }

    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    /// A raster with the same size, transform, CRS and nodata value but different pixels.
    pub fn with_pixels(&self, data: Vec<f32>) -> Result<Self, RasterError> {
        Ok(Self::new(self.width, self.height, data, self.transform, self.crs)?.with_nodata(self.nodata))
    }

    /// Decodes the first band of a GeoTIFF.
    pub fn from_geotiff(bytes: &[u8]) -> Result<Self, RasterError> {
        geotiff::decode(bytes)
    }

    /// Encodes this raster as a single-band Float32 GeoTIFF.
    pub fn to_geotiff(&self) -> Result<Vec<u8>, RasterError> {
        geotiff::encode(self)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    /// Whether `value` is a real measurement rather than fill.
    pub fn is_valid(&self, value: f32) -> bool {
        if !value.is_finite() || value < INVALID_THRESHOLD {
            return false;
        }
        match self.nodata {
            Some(nodata) if nodata.is_nan() => true,
            Some(nodata) => value as f64 != nodata,
            None => true,
        }
    }

    /// Smallest and largest valid pixel, or `None` if every cell is fill.
    pub fn valid_range(&self) -> Option<(f32, f32)> {
        self.data
            .iter()
            .copied()
            .filter(|v| self.is_valid(*v))
            .fold(None, |range, v| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Extent covered by the raster, computed from all four outer corners.
    pub fn bounds(&self) -> Bounds {
        let (w, h) = (self.width as f64, self.height as f64);
        let corners = [
            self.transform.apply(0.0, 0.0),
            self.transform.apply(w, 0.0),
            self.transform.apply(0.0, h),
            self.transform.apply(w, h),
        ];
        corners.iter().skip(1).fold(
            Bounds {
                min_x: corners[0].0,
                min_y: corners[0].1,
                max_x: corners[0].0,
                max_y: corners[0].1,
            },
            |b, &(x, y)| Bounds {
                min_x: b.min_x.min(x),
                min_y: b.min_y.min(y),
                max_x: b.max_x.max(x),
                max_y: b.max_y.max(y),
            },
        )
    }

    /// Min-max scales valid pixels into `[0, 1]` for display and sets fill cells to
    /// [`MISSING_DISPLAY_VALUE`]. A raster with a single distinct valid value scales to zeros.
    pub fn scaled_for_display(&self) -> Vec<f32> {
        let Some((lo, hi)) = self.valid_range() else {
            return vec![MISSING_DISPLAY_VALUE; self.data.len()];
        };
        let span = hi - lo;
        self.data
            .iter()
            .map(|&v| {
                if !self.is_valid(v) {
                    MISSING_DISPLAY_VALUE
                } else if span > 0.0 {
                    (v - lo) / span
                } else {
                    0.0
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HCDP_NODATA: f64 = -3.4028234663852886e38;

    fn statewide(data: Vec<f32>, width: usize, height: usize) -> RasterDataset {
        RasterDataset::new(
            width,
            height,
            data,
            GeoTransform::north_up(-159.816, 22.2955, 0.0025, 0.0025),
            Crs::WGS84,
        )
        .unwrap()
        .with_nodata(Some(HCDP_NODATA))
    }

    #[test]
    fn test_new_checks_buffer_size() {
        let result = RasterDataset::new(3, 2, vec![0.0; 5], GeoTransform::north_up(0.0, 0.0, 1.0, 1.0), Crs::Unknown);
        assert!(matches!(
            result,
            Err(RasterError::BufferSize {
                expected: 6,
                found: 5,
                ..
            })
        ));
        let empty = RasterDataset::new(0, 2, vec![], GeoTransform::north_up(0.0, 0.0, 1.0, 1.0), Crs::Unknown);
        assert!(matches!(empty, Err(RasterError::Empty { .. })));
    }

    #[test]
    fn test_get_is_row_major() {
        let raster = statewide(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 2);
        assert_eq!(raster.shape(), (2, 3));
        assert_eq!(raster.get(0, 2), Some(3.0));
        assert_eq!(raster.get(1, 0), Some(4.0));
        assert_eq!(raster.get(2, 0), None);
        assert_eq!(raster.get(0, 3), None);
    }

    #[test]
    fn test_bounds_of_north_up_raster() {
        let raster = statewide(vec![0.0; 400 * 200], 400, 200);
        let bounds = raster.bounds();
        assert!((bounds.min_x - -159.816).abs() < 1e-9);
        assert!((bounds.max_y - 22.2955).abs() < 1e-9);
        assert!((bounds.max_x - (-159.816 + 1.0)).abs() < 1e-9);
        assert!((bounds.min_y - (22.2955 - 0.5)).abs() < 1e-9);
        assert_eq!(
            bounds.to_overlay_corners(),
            [[bounds.min_y, bounds.min_x], [bounds.max_y, bounds.max_x]]
        );
        assert!(bounds.contains(-159.5, 22.0));
    }

    #[test]
    fn test_fill_cells_are_invalid() {
        let raster = statewide(vec![HCDP_NODATA as f32, -5e30, f32::NAN, 2.0], 2, 2);
        assert!(!raster.is_valid(raster.data()[0]));
        assert!(!raster.is_valid(raster.data()[1]));
        assert!(!raster.is_valid(raster.data()[2]));
        assert!(raster.is_valid(raster.data()[3]));
        assert_eq!(raster.valid_range(), Some((2.0, 2.0)));
    }

    #[test]
    fn test_scaled_for_display() {
        let raster = statewide(vec![HCDP_NODATA as f32, 10.0, 20.0, 30.0], 2, 2);
        assert_eq!(raster.scaled_for_display(), vec![MISSING_DISPLAY_VALUE, 0.0, 0.5, 1.0]);

        let flat = statewide(vec![7.0; 4], 2, 2);
        assert_eq!(flat.scaled_for_display(), vec![0.0; 4]);

        let ocean = statewide(vec![HCDP_NODATA as f32; 4], 2, 2);
        assert_eq!(ocean.scaled_for_display(), vec![MISSING_DISPLAY_VALUE; 4]);
    }

    #[test]
    fn test_with_pixels_keeps_reference() {
        let raster = statewide(vec![1.0; 4], 2, 2);
        let replaced = raster.with_pixels(vec![2.0; 4]).unwrap();
        assert_eq!(replaced.transform(), raster.transform());
        assert_eq!(replaced.crs(), Crs::WGS84);
        assert_eq!(replaced.nodata(), Some(HCDP_NODATA));
        assert!(raster.with_pixels(vec![2.0; 3]).is_err());
    }
}
