pub mod error;
pub mod raster_fetcher;
