use crate::fetcher::error::FetchError;
use crate::locator::error::LocateError;
use crate::raster::error::RasterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("Year cannot be composited")]
    Year(#[source] LocateError),

    #[error("Cannot resolve month {month:02} of the composite")]
    Locate {
        month: u32,
        #[source]
        source: LocateError,
    },

    #[error("Failed to fetch month {month:02} of the composite")]
    Month {
        month: u32,
        #[source]
        source: FetchError,
    },

    #[error("Month {month:02} has shape {found:?} but the first month has {expected:?}")]
    ShapeMismatch {
        month: u32,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("No rasters to composite")]
    EmptyStack,

    #[error("Failed to assemble composite raster")]
    Raster(#[from] RasterError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl CompositeError {
    /// Calendar month the failure is attributed to, if any.
    pub fn month(&self) -> Option<u32> {
        match self {
            CompositeError::Locate { month, .. }
            | CompositeError::Month { month, .. }
            | CompositeError::ShapeMismatch { month, .. } => Some(*month),
            CompositeError::Year(_)
            | CompositeError::EmptyStack
            | CompositeError::Raster(_)
            | CompositeError::TaskJoin(_) => None,
        }
    }
}
