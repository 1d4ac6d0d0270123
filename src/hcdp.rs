//! Main entry point: an explicitly constructed handle that turns requests into rasters.
//!
//! A request is either a structured [`ClimateQuery`] or raw text from a language model. A query
//! with a month is served by one download; a query without one is assembled from the twelve
//! monthly maps of its year.

use crate::composite::compositor::{MonthlyCompositor, DEFAULT_CONCURRENCY};
use crate::error::HcdpError;
use crate::fetcher::raster_fetcher::RasterFetcher;
use crate::locator::resource_locator::{ResourceLocator, DEFAULT_BASE_URL};
use crate::normalize::normalizer::{normalize_request, NormalizedRequest};
use crate::raster::dataset::RasterDataset;
use crate::types::product::{Aggregation, ProductType};
use crate::types::query::ClimateQuery;
use bon::bon;
use log::{info, warn};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;

/// Per-request timeout used when no client or timeout is supplied.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the Hawaii Climate Data Portal file API.
///
/// Holds the HTTP client and the portal configuration. It is immutable after construction
/// and cheap to share by reference across tasks.
///
/// # Examples
///
/// ```rust
/// # use hcdp::{Hcdp, HcdpError};
/// # use std::time::Duration;
/// # fn run() -> Result<(), HcdpError> {
/// // Defaults: public portal, 60 s timeout, TLS verification on.
/// let client = Hcdp::builder().build()?;
///
/// // A mirror with a shorter timeout and more months in flight.
/// let mirror = Hcdp::builder()
///     .base_url("http://localhost:8080/HCDP/production/")
///     .timeout(Duration::from_secs(10))
///     .composite_concurrency(12)
///     .build()?;
/// assert_eq!(mirror.base_url(), "http://localhost:8080/HCDP/production/");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Hcdp {
    base_url: String,
    fetcher: RasterFetcher,
    composite_concurrency: usize,
}

#[bon]
impl Hcdp {
    /// Creates a new `Hcdp` client.
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.base_url(impl Into<String>)`: Optional. Root of the portal's production tree. Defaults to [`DEFAULT_BASE_URL`].
    /// * `.timeout(Duration)`: Optional. Per-request timeout. Defaults to [`DEFAULT_TIMEOUT`].
    /// * `.accept_invalid_certs(bool)`: Optional. Skips TLS certificate verification. Defaults to `false`.
    /// * `.composite_concurrency(usize)`: Optional. Monthly maps downloaded at once for whole-year requests. Defaults to `4`.
    /// * `.client(reqwest::Client)`: Optional. A pre-configured HTTP client. When given, `timeout` and `accept_invalid_certs` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`HcdpError::ClientBuild`] if the HTTP client cannot be created.
    #[builder]
    pub fn new(
        #[builder(into)] base_url: Option<String>,
        timeout: Option<Duration>,
        #[builder(default)] accept_invalid_certs: bool,
        composite_concurrency: Option<usize>,
        client: Option<Client>,
    ) -> Result<Self, HcdpError> {
        let client = match client {
            Some(client) => {
                if timeout.is_some() || accept_invalid_certs {
                    warn!("Ignoring timeout and TLS settings because a client was supplied");
                }
                client
            }
            None => {
                if accept_invalid_certs {
                    warn!("TLS certificate verification is disabled");
                }
                Client::builder()
                    .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
                    .danger_accept_invalid_certs(accept_invalid_certs)
                    .build()
                    .map_err(HcdpError::ClientBuild)?
            }
        };

        Ok(Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            fetcher: RasterFetcher::new(client),
            composite_concurrency: composite_concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fetcher(&self) -> &RasterFetcher {
        &self.fetcher
    }

    /// Compositor bound to this client's fetcher and portal.
    pub fn compositor(&self) -> MonthlyCompositor<'_> {
        MonthlyCompositor::new(&self.fetcher, &self.base_url).with_concurrency(self.composite_concurrency)
    }

    /// Download URL of the data map described by `query`.
    ///
    /// A query without a month resolves to the year-level file.
    ///
    /// # Errors
    ///
    /// Returns [`HcdpError::Locate`] if the query is invalid or refers to a date that has not
    /// happened yet.
    pub fn locate(&self, query: &ClimateQuery) -> Result<String, HcdpError> {
        Ok(ResourceLocator::from_query(query)?.url_with_base(&self.base_url))
    }

    /// Downloads and decodes the GeoTIFF at `url`.
    pub async fn fetch(&self, url: &str) -> Result<RasterDataset, HcdpError> {
        Ok(self.fetcher.fetch(url).await?)
    }

    /// Builds the whole-year composite of `product_type` for `year`.
    ///
    /// # Errors
    ///
    /// Returns [`HcdpError::Composite`] naming the month that failed, if any.
    pub async fn composite(
        &self,
        product_type: ProductType,
        year: i32,
        aggregation: Aggregation,
    ) -> Result<RasterDataset, HcdpError> {
        Ok(self
            .compositor()
            .composite(product_type, year, aggregation)
            .await?)
    }

    /// Resolves `query` to a raster.
    ///
    /// With a month set, this is a single download. Without one, the twelve monthly maps of
    /// the year are fetched and reduced with the query's aggregation.
    ///
    /// # Errors
    ///
    /// Returns [`HcdpError::Locate`] for invalid queries, [`HcdpError::Fetch`] for failed
    /// single-month downloads and [`HcdpError::Composite`] for failed whole-year requests.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use hcdp::{Hcdp, HcdpError, ClimateQuery, ProductType};
    /// # async fn run() -> Result<(), HcdpError> {
    /// let client = Hcdp::builder().build()?;
    /// let query = ClimateQuery::builder()
    ///     .product_type(ProductType::Rainfall)
    ///     .year(2012)
    ///     .month(3)
    ///     .build();
    /// let raster = client.get_data(&query).await?;
    /// println!("{}x{} pixels", raster.width(), raster.height());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_data(&self, query: &ClimateQuery) -> Result<RasterDataset, HcdpError> {
        info!("Requesting {}", query);
        if query.is_whole_year() {
            return self
                .composite(query.product_type, query.year, query.aggregation)
                .await;
        }
        let url = self.locate(query)?;
        self.fetch(&url).await
    }

    /// Saves the file described by `query` to `path` without decoding it.
    ///
    /// Returns the number of bytes written.
    pub async fn download(&self, query: &ClimateQuery, path: &Path) -> Result<u64, HcdpError> {
        let url = self.locate(query)?;
        Ok(self.fetcher.download_to(&url, path).await?)
    }

    /// Normalizes model output and resolves it to a raster.
    ///
    /// The returned [`NormalizedRequest`] carries the island and any periods that were not
    /// queried, for display alongside the map.
    ///
    /// # Errors
    ///
    /// Returns [`HcdpError::Parse`] if no usable request can be read from `text`, otherwise
    /// the errors of [`Hcdp::get_data`].
    pub async fn get_data_from_text(
        &self,
        text: &str,
    ) -> Result<(NormalizedRequest, RasterDataset), HcdpError> {
        let request = normalize_request(text)?;
        let raster = self.get_data(&request.query).await?;
        Ok((request, raster))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() -> Result<(), HcdpError> {
        let client = Hcdp::builder().build()?;
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
        assert_eq!(client.composite_concurrency, DEFAULT_CONCURRENCY);
        Ok(())
    }

    #[test]
    fn test_locate_uses_configured_base() -> Result<(), HcdpError> {
        let client = Hcdp::builder()
            .base_url("http://mirror.test/root/")
            .client(Client::new())
            .composite_concurrency(0)
            .build()?;
        assert_eq!(client.composite_concurrency, 1);

        let query = ClimateQuery::builder()
            .product_type(ProductType::Temperature)
            .year(2011)
            .month(12)
            .aggregation(Aggregation::Max)
            .build();
        assert_eq!(
            client.locate(&query)?,
            "http://mirror.test/root/temperature/max/month/statewide/data_map/2011/temperature_max_month_statewide_data_map_2011_12.tif"
        );
        Ok(())
    }

    #[test]
    fn test_locate_rejects_future_years() {
        let client = Hcdp::builder().client(Client::new()).build().unwrap();
        let query = ClimateQuery::builder()
            .product_type(ProductType::Rainfall)
            .year(9999)
            .month(1)
            .build();
        assert!(matches!(client.locate(&query), Err(HcdpError::Locate(_))));
    }
}
