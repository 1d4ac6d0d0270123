use crate::normalize::error::ParseError;
use crate::normalize::parser::parse_first_object;
use crate::types::product::{Aggregation, ProductType};
use crate::types::query::{ClimateQuery, Island};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A year, and optionally a month, named by the model but not used for the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestedPeriod {
    pub year: i32,
    pub month: Option<u32>,
}

impl fmt::Display for RequestedPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if let Some(month) = self.month {
            write!(f, "-{:02}", month)?;
        }
        Ok(())
    }
}

/// Everything recovered from one piece of model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRequest {
    pub query: ClimateQuery,
    /// Island the user asked about, when it was recognised.
    pub island: Option<Island>,
    /// Extra periods the model listed. Only the first period is queried.
    pub dropped_periods: Vec<RequestedPeriod>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(values) => values,
            OneOrMany::One(value) => vec![value],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Integer(i64),
    Float(f64),
    Flag(bool),
    Text(String),
}

impl Scalar {
    fn as_text(&self) -> String {
        match self {
            Scalar::Integer(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Flag(b) => b.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }

    fn as_integer(&self) -> Option<i64> {
        match self {
            Scalar::Integer(i) => Some(*i),
            Scalar::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Scalar::Text(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.fract() == 0.0)
                        .map(|f| f as i64)
                })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    island: Option<OneOrMany<Option<Scalar>>>,
    #[serde(alias = "product", alias = "datatype", alias = "variable")]
    product_type: Option<OneOrMany<Option<Scalar>>>,
    #[serde(alias = "years")]
    year: Option<OneOrMany<Option<Scalar>>>,
    #[serde(alias = "months")]
    month: Option<OneOrMany<Option<Scalar>>>,
    #[serde(alias = "days")]
    day: Option<OneOrMany<Option<Scalar>>>,
    #[serde(alias = "aggregates", alias = "aggregate")]
    aggregation: Option<OneOrMany<Option<Scalar>>>,
}

/// Present values of a field, in the order given. `None` when the field is absent or null.
fn present(field: Option<OneOrMany<Option<Scalar>>>) -> Option<Vec<Scalar>> {
    let values: Vec<Scalar> = field?.into_vec().into_iter().flatten().collect();
    (!values.is_empty()).then_some(values)
}

fn year_value(value: &Scalar) -> Result<i32, ParseError> {
    value
        .as_integer()
        .and_then(|year| i32::try_from(year).ok())
        .ok_or_else(|| ParseError::InvalidValue {
            field: "year",
            value: value.as_text(),
        })
}

/// Months are given as numbers, often zero padded, or as English names.
fn month_value(value: &Scalar) -> Result<u32, ParseError> {
    let number = value.as_integer().or_else(|| {
        chrono::Month::from_str(value.as_text().trim())
            .ok()
            .map(|month| i64::from(month.number_from_month()))
    });
    number
        .and_then(|month| u32::try_from(month).ok())
        .ok_or_else(|| ParseError::InvalidValue {
            field: "month",
            value: value.as_text(),
        })
}

fn day_value(value: &Scalar) -> Result<u32, ParseError> {
    value
        .as_integer()
        .and_then(|day| u32::try_from(day).ok())
        .ok_or_else(|| ParseError::InvalidValue {
            field: "day",
            value: value.as_text(),
        })
}

fn first_of(field: &'static str, values: Option<Vec<Scalar>>) -> Option<Scalar> {
    let values = values?;
    if values.len() > 1 {
        debug!("Keeping the first of {} values for '{}'", values.len(), field);
    }
    values.into_iter().next()
}

/// Pairs years with months index by index, repeating the last entry of the shorter list.
fn periods(years: &[i32], months: &[u32]) -> Vec<RequestedPeriod> {
    let count = years.len().max(months.len());
    (0..count)
        .filter_map(|i| {
            let year = *years.get(i).or(years.last())?;
            let month = months.get(i).or(months.last()).copied();
            Some(RequestedPeriod { year, month })
        })
        .collect()
}

fn from_raw(raw: RawRequest) -> Result<NormalizedRequest, ParseError> {
    let product_type = first_of("product_type", present(raw.product_type))
        .ok_or(ParseError::MissingField("product_type"))?;
    let product_type = ProductType::from_str(product_type.as_text().trim()).map_err(|source| {
        ParseError::InvalidRequest {
            field: "product_type",
            source,
        }
    })?;

    let aggregation = match first_of("aggregation", present(raw.aggregation)) {
        Some(value) => Aggregation::from_str(value.as_text().trim()).map_err(|source| {
            ParseError::InvalidRequest {
                field: "aggregation",
                source,
            }
        })?,
        None => Aggregation::default(),
    };

    let year_values = match raw.year {
        None => return Err(ParseError::MissingField("year")),
        Some(year) => present(Some(year)).ok_or(ParseError::EmptyList("year"))?,
    };
    let year = year_values
        .first()
        .map(year_value)
        .ok_or(ParseError::EmptyList("year"))??;

    let month_values = present(raw.month).unwrap_or_default();
    let month = month_values.first().map(month_value).transpose()?;

    let day = first_of("day", present(raw.day))
        .as_ref()
        .map(day_value)
        .transpose()?;

    let island = first_of("island", present(raw.island)).and_then(|value| {
        let name = value.as_text();
        match Island::from_str(&name) {
            Ok(island) => Some(island),
            Err(err) => {
                warn!("Ignoring island: {}", err);
                None
            }
        }
    });

    // Later entries are only reported, so unreadable ones are skipped rather than fatal.
    let years: Vec<i32> = std::iter::once(year)
        .chain(year_values.iter().skip(1).filter_map(|v| year_value(v).ok()))
        .collect();
    let months: Vec<u32> = month
        .into_iter()
        .chain(month_values.iter().skip(1).filter_map(|v| month_value(v).ok()))
        .collect();
    let queried = RequestedPeriod { year, month };
    let mut dropped_periods: Vec<RequestedPeriod> = Vec::new();
    for period in periods(&years, &months) {
        if period != queried && !dropped_periods.contains(&period) {
            dropped_periods.push(period);
        }
    }
    if !dropped_periods.is_empty() {
        warn!(
            "Model listed {} extra period(s), only {} is queried",
            dropped_periods.len(),
            queried
        );
    }

    Ok(NormalizedRequest {
        query: ClimateQuery {
            product_type,
            year,
            month,
            day,
            aggregation,
        },
        island,
        dropped_periods,
    })
}

/// Reads the first object in `text` into a full [`NormalizedRequest`].
pub fn normalize_request(text: &str) -> Result<NormalizedRequest, ParseError> {
    let object = parse_first_object(text)?;
    let raw: RawRequest = serde_json::from_value(Value::Object(object))?;
    from_raw(raw)
}

/// Turns free-form model output into a [`ClimateQuery`].
///
/// The first `{...}` object in `text` is read with a lenient grammar: single quotes,
/// `None`, zero-padded numbers and trailing commas are all accepted. List-valued fields
/// collapse to their first element. `product_type` and `year` are required, `aggregation`
/// defaults to mean and a missing `month` asks for the whole year.
///
/// # Examples
///
/// ```
/// use hcdp::{normalize, Aggregation, ProductType};
///
/// let query = normalize(
///     "{'island':'Kauai','product_type':'rainfall', 'year':[2020,2020], 'month':[01,07], 'aggregation':'mean'}",
/// )?;
/// assert_eq!(query.product_type, ProductType::Rainfall);
/// assert_eq!(query.year, 2020);
/// assert_eq!(query.month, Some(1));
/// assert_eq!(query.aggregation, Aggregation::Mean);
/// # Ok::<(), hcdp::ParseError>(())
/// ```
pub fn normalize(text: &str) -> Result<ClimateQuery, ParseError> {
    normalize_request(text).map(|request| request.query)
}

/// Like [`normalize`], but unusable output yields [`ClimateQuery::fallback`] instead of an error.
pub fn normalize_or_fallback(text: &str) -> ClimateQuery {
    match normalize(text) {
        Ok(query) => query,
        Err(err) => {
            let fallback = ClimateQuery::fallback();
            warn!("Could not read model output ({}), falling back to {}", err, fallback);
            fallback
        }
    }
}
