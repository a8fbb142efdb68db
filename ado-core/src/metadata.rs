use ado_utils::dates::parse_date;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FetchError;

/// Per-index descriptor from `metadata/{INDEX}.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub long_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factsheet: Option<String>,
    /// Date bounds for the gridded/NUTS dataset family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timerange: Option<TimeRange>,
    /// Date bounds for the station dataset family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<TimeRange>,
    pub colormap: Colormap,
}

/// `firstDate`/`lastDate` pair, both `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub first_date: Option<String>,
    pub last_date: Option<String>,
}

/// Mapbox paint spec plus the legend the UI draws next to the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colormap {
    pub legend: Legend,
    #[serde(flatten)]
    pub paint: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub stops: Vec<LegendStop>,
}

/// One band of the piecewise scale, serialized as
/// `[threshold, label, color]`. Thresholds arrive as strings or numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(Value, String, String)", into = "(String, String, String)")]
pub struct LegendStop {
    pub threshold: f64,
    pub label: String,
    pub color: String,
}

impl LegendStop {
    pub fn new(threshold: f64, label: &str, color: &str) -> Self {
        LegendStop {
            threshold,
            label: label.to_string(),
            color: color.to_string(),
        }
    }
}

impl TryFrom<(Value, String, String)> for LegendStop {
    type Error = String;

    fn try_from((threshold, label, color): (Value, String, String)) -> Result<Self, Self::Error> {
        let threshold = match &threshold {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| format!("legend threshold {} is not numeric", threshold))?;
        Ok(LegendStop {
            threshold,
            label,
            color,
        })
    }
}

impl From<LegendStop> for (String, String, String) {
    fn from(stop: LegendStop) -> Self {
        (stop.threshold.to_string(), stop.label, stop.color)
    }
}

impl Metadata {
    /// First and last available date, taken from `timerange` or, for the
    /// station family, from `properties`.
    pub fn date_range(&self) -> Result<(NaiveDate, NaiveDate), FetchError> {
        let missing = || FetchError::MissingDateRange(self.short_name.clone());
        let range = [&self.timerange, &self.properties]
            .into_iter()
            .flatten()
            .find(|range| range.first_date.is_some() && range.last_date.is_some())
            .ok_or_else(missing)?;
        let first = range.first_date.as_deref().map(parse_date);
        let last = range.last_date.as_deref().map(parse_date);
        match (first, last) {
            (Some(Ok(first)), Some(Ok(last))) if first <= last => Ok((first, last)),
            _ => Err(missing()),
        }
    }

    /// Last date as published, used as the snap fallback.
    pub fn last_date(&self) -> Option<&str> {
        [&self.timerange, &self.properties]
            .into_iter()
            .flatten()
            .find_map(|range| range.last_date.as_deref())
    }
}
