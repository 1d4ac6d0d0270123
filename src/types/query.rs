//! The structured request that drives a data fetch.

use crate::locator::error::InvalidRequest;
use crate::types::product::{Aggregation, ProductType};
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single, fully resolved climate data request.
///
/// Every field holds exactly one value. A missing `month` asks for a whole-year composite.
///
/// # Examples
///
/// ```
/// use hcdp::{Aggregation, ClimateQuery, ProductType};
///
/// let query = ClimateQuery::builder()
///     .product_type(ProductType::Rainfall)
///     .year(2012)
///     .month(3)
///     .build();
///
/// assert_eq!(query.aggregation, Aggregation::Mean);
/// assert!(!query.is_whole_year());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Builder)]
pub struct ClimateQuery {
    pub product_type: ProductType,
    pub year: i32,
    /// Calendar month, 1 through 12.
    pub month: Option<u32>,
    /// Day of month. Rarely used; the portal's monthly maps ignore it.
    pub day: Option<u32>,
    #[builder(default)]
    #[serde(default)]
    pub aggregation: Aggregation,
}

impl ClimateQuery {
    /// Year used when model output cannot be interpreted at all.
    pub const FALLBACK_YEAR: i32 = 2020;

    /// The query substituted for unreadable model output by
    /// [`crate::normalize_or_fallback`]: mean rainfall over the whole of 2020.
    pub fn fallback() -> Self {
        ClimateQuery {
            product_type: ProductType::Rainfall,
            year: Self::FALLBACK_YEAR,
            month: None,
            day: None,
            aggregation: Aggregation::Mean,
        }
    }

    /// True when no month is set and the request resolves to a twelve-month composite.
    pub fn is_whole_year(&self) -> bool {
        self.month.is_none()
    }

    /// Same request, restricted to one month.
    pub fn for_month(&self, month: u32) -> Self {
        ClimateQuery {
            month: Some(month),
            day: None,
            ..*self
        }
    }
}

impl fmt::Display for ClimateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {:04}", self.aggregation, self.product_type, self.year)?;
        if let Some(month) = self.month {
            write!(f, "-{:02}", month)?;
        }
        if let Some(day) = self.day {
            write!(f, "-{:02}", day)?;
        }
        Ok(())
    }
}

/// Island named in a request.
///
/// The portal route used here only serves statewide maps, so the island is informational:
/// callers use it to frame the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Island {
    Kauai,
    Oahu,
    Molokai,
    Lanai,
    Maui,
    BigIsland,
    /// The whole state.
    All,
}

impl Island {
    /// Approximate map centre (latitude, longitude) to frame this island.
    pub fn center(&self) -> (f64, f64) {
        match self {
            Island::Kauai => (22.07, -159.50),
            Island::Oahu => (21.47, -157.97),
            Island::Molokai => (21.13, -157.02),
            Island::Lanai => (20.83, -156.92),
            Island::Maui => (20.80, -156.33),
            Island::BigIsland => (19.60, -155.50),
            Island::All => (20.65, -157.3319),
        }
    }
}

impl fmt::Display for Island {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Island::Kauai => "Kauai",
            Island::Oahu => "Oahu",
            Island::Molokai => "Molokai",
            Island::Lanai => "Lanai",
            Island::Maui => "Maui",
            Island::BigIsland => "Big Island",
            Island::All => "all",
        };
        f.write_str(name)
    }
}

impl FromStr for Island {
    type Err = InvalidRequest;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Model output mixes okina, macrons and spacing freely.
        let key: String = s
            .chars()
            .map(|c| match c {
                'ā' | 'Ā' => 'a',
                'ō' | 'Ō' => 'o',
                'ī' | 'Ī' => 'i',
                c => c.to_ascii_lowercase(),
            })
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "kauai" => Ok(Island::Kauai),
            "oahu" => Ok(Island::Oahu),
            "molokai" => Ok(Island::Molokai),
            "lanai" => Ok(Island::Lanai),
            "maui" => Ok(Island::Maui),
            "bigisland" | "hawaiiisland" | "bi" => Ok(Island::BigIsland),
            "all" | "hawaii" | "statewide" => Ok(Island::All),
            _ => Err(InvalidRequest::UnknownIsland(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let query = ClimateQuery::builder()
            .product_type(ProductType::Temperature)
            .year(1985)
            .build();
        assert_eq!(query.month, None);
        assert_eq!(query.day, None);
        assert_eq!(query.aggregation, Aggregation::Mean);
        assert!(query.is_whole_year());
    }

    #[test]
    fn test_for_month_clears_day() {
        let query = ClimateQuery::builder()
            .product_type(ProductType::Rainfall)
            .year(2001)
            .day(4)
            .aggregation(Aggregation::Max)
            .build();
        let march = query.for_month(3);
        assert_eq!(march.month, Some(3));
        assert_eq!(march.day, None);
        assert_eq!(march.aggregation, Aggregation::Max);
    }

    #[test]
    fn test_display() {
        let query = ClimateQuery::builder()
            .product_type(ProductType::Rainfall)
            .year(2012)
            .month(3)
            .build();
        assert_eq!(query.to_string(), "mean rainfall 2012-03");
        assert_eq!(ClimateQuery::fallback().to_string(), "mean rainfall 2020");
    }

    #[test]
    fn test_island_parsing() {
        assert_eq!("Kauaʻi".parse::<Island>().unwrap(), Island::Kauai);
        assert_eq!("O'ahu".parse::<Island>().unwrap(), Island::Oahu);
        assert_eq!("Big Island".parse::<Island>().unwrap(), Island::BigIsland);
        assert_eq!("all".parse::<Island>().unwrap(), Island::All);
        assert!("Niihau".parse::<Island>().is_err());
    }
}
