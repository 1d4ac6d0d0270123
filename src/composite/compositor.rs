use crate::composite::error::CompositeError;
use crate::composite::reduce::reduce_stack;
use crate::fetcher::raster_fetcher::RasterFetcher;
use crate::locator::resource_locator::ResourceLocator;
use crate::raster::dataset::RasterDataset;
use crate::types::product::{Aggregation, ProductType};
use crate::types::query::ClimateQuery;
use crate::utils::today;
use chrono::NaiveDate;
use futures_util::{stream, StreamExt, TryStreamExt};
use log::info;
use tokio::task;

/// Months fetched at once when building a composite.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Builds a whole-year raster out of the twelve monthly maps.
///
/// Months are fetched with bounded concurrency and merged in calendar order. The first
/// month that fails aborts the composite; partial years are never reduced.
pub struct MonthlyCompositor<'a> {
    fetcher: &'a RasterFetcher,
    base_url: &'a str,
    concurrency: usize,
    today: NaiveDate,
}

impl<'a> MonthlyCompositor<'a> {
    pub fn new(fetcher: &'a RasterFetcher, base_url: &'a str) -> Self {
        Self {
            fetcher,
            base_url,
            concurrency: DEFAULT_CONCURRENCY,
            today: today(),
        }
    }

    /// Number of months in flight at once. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Reference date for the future-date guard.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Download URLs of the twelve monthly maps, January first.
    ///
    /// Fails before producing any URL if the year as a whole is out of range or not yet over.
    pub fn month_urls(
        &self,
        product_type: ProductType,
        year: i32,
        aggregation: Aggregation,
    ) -> Result<Vec<String>, CompositeError> {
        let year_query = ClimateQuery {
            product_type,
            year,
            month: None,
            day: None,
            aggregation,
        };
        ResourceLocator::from_query_at(&year_query, self.today).map_err(CompositeError::Year)?;

        (1..=12u32)
            .map(|month| {
                ResourceLocator::from_query_at(&year_query.for_month(month), self.today)
                    .map(|locator| locator.url_with_base(self.base_url))
                    .map_err(|source| CompositeError::Locate { month, source })
            })
            .collect()
    }

    /// Fetches all twelve months of `year` and reduces them with `aggregation`.
    pub async fn composite(
        &self,
        product_type: ProductType,
        year: i32,
        aggregation: Aggregation,
    ) -> Result<RasterDataset, CompositeError> {
        let urls = self.month_urls(product_type, year, aggregation)?;
        info!(
            "Compositing {} {} for {} from {} monthly maps",
            aggregation,
            product_type,
            year,
            urls.len()
        );

        let rasters: Vec<RasterDataset> = stream::iter(urls.into_iter().zip(1u32..))
            .map(|(url, month)| async move {
                self.fetcher
                    .fetch(&url)
                    .await
                    .map_err(|source| CompositeError::Month { month, source })
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let composite = task::spawn_blocking(move || reduce_stack(&rasters, aggregation)).await??;
        info!(
            "Composite {} {} for {} ready ({}x{})",
            aggregation,
            product_type,
            year,
            composite.width(),
            composite.height()
        );
        Ok(composite)
    }
}
