use crate::types::product::{FileType, ProductType, Production};
use chrono::NaiveDate;
use thiserror::Error;

/// A request field is malformed or outside the range the portal serves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRequest {
    #[error("Unknown product type '{0}', expected 'rainfall' or 'temperature'")]
    UnknownProductType(String),

    #[error("Unknown aggregation '{0}', expected 'min', 'mean' or 'max'")]
    UnknownAggregation(String),

    #[error("Unknown island '{0}'")]
    UnknownIsland(String),

    #[error(
        "Year {year} is not covered by the {production} production ({})",
        coverage(.first, .last)
    )]
    YearOutOfRange {
        year: i32,
        production: Production,
        first: i32,
        last: Option<i32>,
    },

    #[error("Month {0} is out of range, expected 1 to 12")]
    MonthOutOfRange(u32),

    #[error("Day {0} is out of range, expected 1 to 31")]
    DayOutOfRange(u32),

    #[error("{year:04}-{month:02}-{day:02} is not a calendar date")]
    NonexistentDate { year: i32, month: u32, day: u32 },

    #[error("File type '{file_type}' is not published for {product_type}")]
    UnsupportedFileType {
        file_type: FileType,
        product_type: ProductType,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("Invalid request")]
    InvalidRequest(#[from] InvalidRequest),

    /// A missing month counts as December and a missing day as the month's last day.
    #[error(
        "Requested period {} has not ended yet (today is {today}), no data can exist for it",
        period(.year, .month, .day)
    )]
    FutureDate {
        year: i32,
        month: Option<u32>,
        day: Option<u32>,
        today: NaiveDate,
    },
}

fn period(year: &i32, month: &Option<u32>, day: &Option<u32>) -> String {
    match (month, day) {
        (Some(month), Some(day)) => format!("{year:04}-{month:02}-{day:02}"),
        (Some(month), None) => format!("{year:04}-{month:02}"),
        _ => format!("{year:04}"),
    }
}

fn coverage(first: &i32, last: &Option<i32>) -> String {
    match last {
        Some(last) => format!("{first} to {last}"),
        None => format!("{first} onwards"),
    }
}
