use crate::composite::error::CompositeError;
use crate::fetcher::error::FetchError;
use crate::locator::error::LocateError;
use crate::normalize::error::ParseError;
use crate::raster::error::RasterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HcdpError {
    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Composite(#[from] CompositeError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),
}
