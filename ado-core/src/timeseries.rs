use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Per-region (`timeseries/NUTS3_{id}.json`) or per-station
/// (`timeseries/ID_STATION_{id}.json`) payload.
///
/// Two layouts are published: a list of rows `[{date, INDEX: value}]`, or
/// one object per index `{INDEX: {date: value}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeseriesPayload {
    Rows(Vec<Map<String, Value>>),
    Series(Map<String, Value>),
}

/// One row of the tabular dataset handed to the charting surface:
/// `{date, [INDEX]: number, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRow {
    pub date: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl TimeseriesPayload {
    /// Series names present in the payload, i.e. the chart dimensions.
    pub fn dimensions(&self) -> Vec<String> {
        let mut names: Vec<String> = match self {
            TimeseriesPayload::Rows(rows) => rows
                .iter()
                .flat_map(|row| row.keys())
                .filter(|key| key.as_str() != "date")
                .cloned()
                .collect(),
            TimeseriesPayload::Series(series) => series
                .iter()
                .filter(|(_, v)| v.is_object())
                .map(|(key, _)| key.clone())
                .collect(),
        };
        names.sort();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_layout() {
        let raw = r#"[{"date": "2020-01-01", "spei-1": 0.5}, {"date": "2020-01-02", "spei-3": -0.1}]"#;
        let payload: TimeseriesPayload = serde_json::from_str(raw).unwrap();
        assert!(matches!(payload, TimeseriesPayload::Rows(_)));
        assert_eq!(payload.dimensions(), vec!["spei-1", "spei-3"]);
    }

    #[test]
    fn test_series_layout() {
        let raw = r#"{"NUTS_ID": "ITC1", "spei-1": {"2020-01-01": 0.5}, "vhi": {"2020-01-01": 31.0}}"#;
        let payload: TimeseriesPayload = serde_json::from_str(raw).unwrap();
        assert!(matches!(payload, TimeseriesPayload::Series(_)));
        assert_eq!(payload.dimensions(), vec!["spei-1", "vhi"]);
    }

    #[test]
    fn test_chart_row_flattens() {
        let mut values = BTreeMap::new();
        values.insert("spei-1".to_string(), 0.25);
        let row = ChartRow {
            date: "2020-01-01".to_string(),
            values,
        };
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"date":"2020-01-01","spei-1":0.25}"#
        );
    }
}
