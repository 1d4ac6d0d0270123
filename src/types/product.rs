//! Enumerations describing the dimensions of an HCDP file: which product, which dataset
//! generation, which statistic and which kind of file.

use crate::locator::error::InvalidRequest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The climate variable being requested.
///
/// # Examples
///
/// ```
/// use hcdp::ProductType;
///
/// assert_eq!("Rainfall".parse::<ProductType>().unwrap(), ProductType::Rainfall);
/// assert_eq!(ProductType::Temperature.to_string(), "temperature");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    /// Monthly rainfall totals.
    Rainfall,
    /// Monthly air temperature, available as min, mean and max products.
    Temperature,
}

impl ProductType {
    pub(crate) fn path_segment(&self) -> &'static str {
        match self {
            ProductType::Rainfall => "rainfall",
            ProductType::Temperature => "temperature",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

impl FromStr for ProductType {
    type Err = InvalidRequest;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rainfall" | "rain" => Ok(ProductType::Rainfall),
            "temperature" | "temp" => Ok(ProductType::Temperature),
            _ => Err(InvalidRequest::UnknownProductType(s.to_string())),
        }
    }
}

/// The statistic applied to a product.
///
/// For temperature the aggregation selects which remote product is downloaded. When a whole
/// year is composited, it is also the element-wise reduction applied to the twelve months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Min,
    #[default]
    Mean,
    Max,
}

impl Aggregation {
    pub(crate) fn path_segment(&self) -> &'static str {
        match self {
            Aggregation::Min => "min",
            Aggregation::Mean => "mean",
            Aggregation::Max => "max",
        }
    }

    /// Reduces a non-empty sequence of values with this statistic.
    ///
    /// Returns `None` for an empty iterator.
    pub fn reduce<I>(&self, values: I) -> Option<f32>
    where
        I: IntoIterator<Item = f32>,
    {
        let mut values = values.into_iter();
        let first = values.next()?;
        Some(match self {
            Aggregation::Min => values.fold(first, f32::min),
            Aggregation::Max => values.fold(first, f32::max),
            Aggregation::Mean => {
                let (sum, count) = values.fold((first as f64, 1usize), |(sum, count), v| {
                    (sum + v as f64, count + 1)
                });
                (sum / count as f64) as f32
            }
        })
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

impl FromStr for Aggregation {
    type Err = InvalidRequest;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" | "minimum" => Ok(Aggregation::Min),
            "mean" | "avg" | "average" => Ok(Aggregation::Mean),
            "max" | "maximum" => Ok(Aggregation::Max),
            _ => Err(InvalidRequest::UnknownAggregation(s.to_string())),
        }
    }
}

/// Generation of the gridded dataset a year belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Production {
    /// Historical maps, 1920 through 2012.
    Legacy,
    /// Current maps, 1990 onwards.
    New,
}

impl Production {
    /// First year covered by the new production.
    pub const NEW_FIRST_YEAR: i32 = 1990;
    /// First year covered by the legacy production.
    pub const LEGACY_FIRST_YEAR: i32 = 1920;
    /// Last year covered by the legacy production.
    pub const LEGACY_LAST_YEAR: i32 = 2012;

    /// The production the portal serves by default for `year`.
    pub fn for_year(year: i32) -> Self {
        if year >= Self::NEW_FIRST_YEAR {
            Production::New
        } else {
            Production::Legacy
        }
    }

    /// Inclusive year range covered by this production. `None` as upper bound means open-ended.
    pub fn year_range(&self) -> (i32, Option<i32>) {
        match self {
            Production::Legacy => (Self::LEGACY_FIRST_YEAR, Some(Self::LEGACY_LAST_YEAR)),
            Production::New => (Self::NEW_FIRST_YEAR, None),
        }
    }

    pub fn covers(&self, year: i32) -> bool {
        let (first, last) = self.year_range();
        year >= first && last.map_or(true, |last| year <= last)
    }

    pub(crate) fn path_segment(&self) -> &'static str {
        match self {
            Production::Legacy => "legacy",
            Production::New => "new",
        }
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

/// Temporal resolution of the files. Only monthly maps are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Period {
    #[default]
    Month,
}

impl Period {
    pub(crate) fn path_segment(&self) -> &'static str {
        match self {
            Period::Month => "month",
        }
    }
}

/// Spatial extent of the files. The portal only exposes statewide maps through this route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Extent {
    #[default]
    Statewide,
}

impl Extent {
    pub(crate) fn path_segment(&self) -> &'static str {
        match self {
            Extent::Statewide => "statewide",
        }
    }
}

/// Gap-filling variant of station-derived products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fill {
    /// No QA/QC applied.
    Raw,
    /// QA/QC applied with missing values filled.
    Partial,
}

impl Fill {
    pub(crate) fn path_segment(&self) -> &'static str {
        match self {
            Fill::Raw => "raw",
            Fill::Partial => "partial",
        }
    }
}

/// Kind of file to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// The gridded map itself.
    #[default]
    DataMap,
    /// Standard error map.
    Se,
    /// Anomaly map (rainfall only).
    Anom,
    /// Standard error of the anomaly map (rainfall only).
    AnomSe,
    Metadata,
    StationData,
}

impl FileType {
    pub(crate) fn path_segment(&self) -> &'static str {
        match self {
            FileType::DataMap => "data_map",
            FileType::Se => "se",
            FileType::Anom => "anom",
            FileType::AnomSe => "anom_se",
            FileType::Metadata => "metadata",
            FileType::StationData => "station_data",
        }
    }

    /// File extension of this kind of file, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FileType::DataMap | FileType::Se | FileType::Anom | FileType::AnomSe => "tif",
            FileType::Metadata => "txt",
            FileType::StationData => "csv",
        }
    }

    pub fn supports(&self, product_type: ProductType) -> bool {
        !matches!(
            (self, product_type),
            (FileType::Anom | FileType::AnomSe, ProductType::Temperature)
        )
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_type_parsing_is_lenient_about_case() {
        assert_eq!(" RAINFALL ".parse::<ProductType>().unwrap(), ProductType::Rainfall);
        assert_eq!("Temperature".parse::<ProductType>().unwrap(), ProductType::Temperature);
        assert!(matches!(
            "snowfall".parse::<ProductType>(),
            Err(InvalidRequest::UnknownProductType(s)) if s == "snowfall"
        ));
    }

    #[test]
    fn test_aggregation_parsing() {
        assert_eq!("max".parse::<Aggregation>().unwrap(), Aggregation::Max);
        assert_eq!("Average".parse::<Aggregation>().unwrap(), Aggregation::Mean);
        assert!("median".parse::<Aggregation>().is_err());
    }

    #[test]
    fn test_production_for_year() {
        assert_eq!(Production::for_year(1990), Production::New);
        assert_eq!(Production::for_year(2012), Production::New);
        assert_eq!(Production::for_year(1989), Production::Legacy);
        assert_eq!(Production::for_year(1920), Production::Legacy);
        assert!(Production::Legacy.covers(2012));
        assert!(!Production::Legacy.covers(2013));
        assert!(!Production::Legacy.covers(1919));
        assert!(!Production::New.covers(1989));
    }

    #[test]
    fn test_aggregation_reduce() {
        let months = (1..=12).map(|m| m as f32);
        assert_eq!(Aggregation::Mean.reduce(months.clone()), Some(6.5));
        assert_eq!(Aggregation::Min.reduce(months.clone()), Some(1.0));
        assert_eq!(Aggregation::Max.reduce(months), Some(12.0));
        assert_eq!(Aggregation::Mean.reduce(std::iter::empty()), None);
    }

    #[test]
    fn test_file_type_extension_and_support() {
        assert_eq!(FileType::DataMap.extension(), "tif");
        assert_eq!(FileType::AnomSe.extension(), "tif");
        assert_eq!(FileType::Metadata.extension(), "txt");
        assert_eq!(FileType::StationData.extension(), "csv");
        assert!(FileType::Anom.supports(ProductType::Rainfall));
        assert!(!FileType::Anom.supports(ProductType::Temperature));
        assert!(FileType::Se.supports(ProductType::Temperature));
    }
}
