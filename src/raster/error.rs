use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("TIFF codec failed")]
    Tiff(#[from] tiff::TiffError),

    #[error("Pixel buffer holds {found} values but a {width}x{height} grid needs {expected}")]
    BufferSize {
        width: usize,
        height: usize,
        expected: usize,
        found: usize,
    },

    #[error("Raster is empty ({width}x{height})")]
    Empty { width: usize, height: usize },

    #[error("GeoTIFF carries no georeferencing (neither tie point + pixel scale nor a transformation matrix)")]
    MissingGeoreference,

    #[error("Malformed GeoTIFF tag {tag}: {message}")]
    MalformedTag { tag: &'static str, message: String },
}
