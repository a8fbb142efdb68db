//! Shapes per-entity timeseries payloads into the rows the charting
//! surface plots, one series per dimension.

use ado_core::timeseries::{ChartRow, TimeseriesPayload};
use ado_utils::dates::to_day_index;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::cursor::DateBounds;

/// Rows `{date, [INDEX]: number}` ascending by date.
///
/// Only numeric values are kept; a date with no numeric value for any
/// dimension produces no row. When `window` is given, dates outside it (or
/// unparsable dates) are dropped.
pub fn chart_rows(payload: &TimeseriesPayload, window: Option<&DateBounds>) -> Vec<ChartRow> {
    let mut by_date: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    match payload {
        TimeseriesPayload::Rows(rows) => {
            for row in rows {
                let Some(date) = row.get("date").and_then(Value::as_str) else {
                    continue;
                };
                let values = by_date.entry(date.to_string()).or_default();
                for (key, value) in row.iter().filter(|(key, _)| key.as_str() != "date") {
                    if let Some(v) = value.as_f64() {
                        values.insert(key.clone(), v);
                    }
                }
            }
        }
        TimeseriesPayload::Series(series) => {
            for (dimension, points) in series {
                let Some(points) = points.as_object() else {
                    continue;
                };
                for (date, value) in points {
                    if let Some(v) = value.as_f64() {
                        by_date
                            .entry(date.clone())
                            .or_default()
                            .insert(dimension.clone(), v);
                    }
                }
            }
        }
    }

    by_date
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .filter(|(date, _)| match window {
            Some(bounds) => to_day_index(date).map_or(false, |day| bounds.contains(day)),
            None => true,
        })
        .map(|(date, values)| ChartRow { date, values })
        .collect()
}

/// Rows restricted to a subset of dimensions; rows left empty are dropped.
pub fn select_dimensions(rows: &[ChartRow], dimensions: &[String]) -> Vec<ChartRow> {
    rows.iter()
        .filter_map(|row| {
            let values: BTreeMap<String, f64> = row
                .values
                .iter()
                .filter(|(key, _)| dimensions.contains(key))
                .map(|(key, value)| (key.clone(), *value))
                .collect();
            (!values.is_empty()).then(|| ChartRow {
                date: row.date.clone(),
                values,
            })
        })
        .collect()
}
