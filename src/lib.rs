mod composite;
mod error;
mod fetcher;
mod hcdp;
mod locator;
mod normalize;
mod raster;
mod types;
mod utils;

pub use error::HcdpError;
pub use hcdp::*;

pub use composite::compositor::{MonthlyCompositor, DEFAULT_CONCURRENCY};
pub use composite::reduce::reduce_stack;
pub use fetcher::raster_fetcher::RasterFetcher;
pub use locator::resource_locator::{locate, ResourceLocator, DEFAULT_BASE_URL};
pub use normalize::normalizer::{
    normalize, normalize_or_fallback, normalize_request, NormalizedRequest, RequestedPeriod,
};
pub use raster::dataset::*;
pub use raster::geotiff;

pub use types::product::*;
pub use types::query::*;

pub use composite::error::CompositeError;
pub use fetcher::error::FetchError;
pub use locator::error::{InvalidRequest, LocateError};
pub use normalize::error::ParseError;
pub use raster::error::RasterError;
