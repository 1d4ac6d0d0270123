//! Builds download URLs for the HCDP file API.
//!
//! The portal lays files out as
//!
//! ```text
//! <product>/<production|aggregation>/<period>/<extent>[/<fill>]/<filetype>/<year>/
//!     <product>_<production|aggregation>_<period>_<extent>[_<fill>]_<filetype>_<year>[_<MM>][_<DD>].<ext>
//! ```
//!
//! Rainfall files are keyed by production in the second position, temperature files by
//! aggregation. That asymmetry is part of the remote scheme and must not be normalised away.

use crate::locator::error::{InvalidRequest, LocateError};
use crate::types::product::{
    Aggregation, Extent, FileType, Fill, Period, ProductType, Production,
};
use crate::types::query::ClimateQuery;
use crate::utils::{days_in_month, today};
use bon::bon;
use chrono::{Datelike, NaiveDate};
use log::debug;

/// Root of the public HCDP production tree.
pub const DEFAULT_BASE_URL: &str =
    "https://ikeauth.its.hawaii.edu/files/v2/download/public/system/ikewai-annotated-data/HCDP/production/";

/// A validated reference to one file on the portal.
///
/// Construction performs every check that can be made without touching the network, so
/// holding a `ResourceLocator` means the URL is well-formed and the requested period has
/// already happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocator {
    product_type: ProductType,
    production: Production,
    aggregation: Aggregation,
    period: Period,
    extent: Extent,
    fill: Option<Fill>,
    file_type: FileType,
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
    effective_date: NaiveDate,
}

#[bon]
impl ResourceLocator {
    /// Validates the request fields and derives the remaining path components.
    ///
    /// # Arguments
    ///
    /// * `.product_type(ProductType)`: **Required.**
    /// * `.year(i32)`: **Required.** Four digit year.
    /// * `.month(u32)`: Optional month, 1 to 12.
    /// * `.day(u32)`: Optional day of month.
    /// * `.aggregation(Aggregation)`: Defaults to [`Aggregation::Mean`].
    /// * `.production(Production)`: Overrides the production derived from the year. Useful for
    ///   requesting legacy maps for 1990 through 2012, which both productions cover.
    /// * `.fill(Fill)`: Optional fill variant.
    /// * `.file_type(FileType)`: Defaults to [`FileType::DataMap`].
    /// * `.today(NaiveDate)`: Reference date for the future-date guard. Defaults to the local date.
    ///
    /// # Errors
    ///
    /// [`LocateError::InvalidRequest`] when a field is out of range, and
    /// [`LocateError::FutureDate`] when the effective date lies after `today`. A missing month
    /// counts as December and a missing day as the last day of the month, so a year is only
    /// accepted once it is complete.
    #[builder]
    pub fn new(
        product_type: ProductType,
        year: i32,
        month: Option<u32>,
        day: Option<u32>,
        #[builder(default)] aggregation: Aggregation,
        production: Option<Production>,
        fill: Option<Fill>,
        #[builder(default)] file_type: FileType,
        today: Option<NaiveDate>,
    ) -> Result<Self, LocateError> {
        let production = production.unwrap_or_else(|| Production::for_year(year));
        if !production.covers(year) {
            let (first, last) = production.year_range();
            return Err(InvalidRequest::YearOutOfRange {
                year,
                production,
                first,
                last,
            }
            .into());
        }

        if let Some(month) = month {
            if !(1..=12).contains(&month) {
                return Err(InvalidRequest::MonthOutOfRange(month).into());
            }
        }
        if let Some(day) = day {
            if !(1..=31).contains(&day) {
                return Err(InvalidRequest::DayOutOfRange(day).into());
            }
        }
        if !file_type.supports(product_type) {
            return Err(InvalidRequest::UnsupportedFileType {
                file_type,
                product_type,
            }
            .into());
        }

        let today = today.unwrap_or_else(crate::utils::today);
        let not_yet = || LocateError::FutureDate {
            year,
            month,
            day,
            today,
        };
        // Also covers years too large for a calendar date.
        if year > today.year() {
            return Err(not_yet());
        }

        let effective_month = month.unwrap_or(12);
        let effective_day = match day {
            Some(day) => day,
            None => days_in_month(year, effective_month).ok_or(InvalidRequest::NonexistentDate {
                year,
                month: effective_month,
                day: 1,
            })?,
        };
        let effective_date = NaiveDate::from_ymd_opt(year, effective_month, effective_day)
            .ok_or(InvalidRequest::NonexistentDate {
                year,
                month: effective_month,
                day: effective_day,
            })?;
        if effective_date > today {
            return Err(not_yet());
        }

        Ok(Self {
            product_type,
            production,
            aggregation,
            period: Period::Month,
            extent: Extent::Statewide,
            fill,
            file_type,
            year,
            month,
            day,
            effective_date,
        })
    }
}

impl ResourceLocator {
    /// Locator for the data map described by `query`, checked against the local date.
    pub fn from_query(query: &ClimateQuery) -> Result<Self, LocateError> {
        Self::from_query_at(query, today())
    }

    /// Locator for the data map described by `query`, checked against `today`.
    pub fn from_query_at(query: &ClimateQuery, today: NaiveDate) -> Result<Self, LocateError> {
        Self::builder()
            .product_type(query.product_type)
            .year(query.year)
            .maybe_month(query.month)
            .maybe_day(query.day)
            .aggregation(query.aggregation)
            .today(today)
            .build()
    }

    pub fn product_type(&self) -> ProductType {
        self.product_type
    }

    pub fn production(&self) -> Production {
        self.production
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Option<u32> {
        self.month
    }

    pub fn day(&self) -> Option<u32> {
        self.day
    }

    /// The calendar date the future-date guard was evaluated on.
    pub fn effective_date(&self) -> NaiveDate {
        self.effective_date
    }

    /// Path of the file below the portal root, without a leading slash.
    pub fn relative_path(&self) -> String {
        let product = self.product_type.path_segment();
        let variant = match self.product_type {
            ProductType::Rainfall => self.production.path_segment(),
            ProductType::Temperature => self.aggregation.path_segment(),
        };
        let fill = self.fill.map(|f| f.path_segment()).unwrap_or_default();
        let year = self.year.to_string();
        let month = self.month.map(|m| format!("{m:02}")).unwrap_or_default();
        let day = self.day.map(|d| format!("{d:02}")).unwrap_or_default();

        let head = [
            product,
            variant,
            self.period.path_segment(),
            self.extent.path_segment(),
            fill,
            self.file_type.path_segment(),
            year.as_str(),
        ];
        let directory = join_present(&head, "/");
        let mut stem_parts = head.to_vec();
        stem_parts.push(&month);
        stem_parts.push(&day);
        let stem = join_present(&stem_parts, "_");

        format!("{}/{}.{}", directory, stem, self.file_type.extension())
    }

    /// Full download URL below [`DEFAULT_BASE_URL`].
    pub fn url(&self) -> String {
        self.url_with_base(DEFAULT_BASE_URL)
    }

    /// Full download URL below a custom portal root.
    pub fn url_with_base(&self, base_url: &str) -> String {
        let url = format!("{}/{}", base_url.trim_end_matches('/'), self.relative_path());
        debug!("Resolved {} {} to {}", self.product_type, self.effective_date, url);
        url
    }
}

/// Joins the non-empty parts, so optional components never leave doubled separators.
fn join_present(parts: &[&str], separator: &str) -> String {
    parts
        .iter()
        .copied()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Resolves `query` to its download URL on the public portal.
///
/// # Examples
///
/// ```
/// use hcdp::{locate, ClimateQuery, ProductType};
///
/// let query = ClimateQuery::builder()
///     .product_type(ProductType::Rainfall)
///     .year(2012)
///     .month(3)
///     .build();
/// let url = locate(&query).unwrap();
/// assert!(url.ends_with(
///     "rainfall/new/month/statewide/data_map/2012/rainfall_new_month_statewide_data_map_2012_03.tif"
/// ));
/// ```
pub fn locate(query: &ClimateQuery) -> Result<String, LocateError> {
    Ok(ResourceLocator::from_query(query)?.url())
}
