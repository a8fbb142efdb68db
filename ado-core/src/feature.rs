use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::index::DroughtIndex;

/// Property that the joiner writes and the map colour expression reads.
pub const VALUE_PROPERTY: &str = "value";

/// Region join key for NUTS polygons.
pub const NUTS_ID: &str = "NUTS_ID";
pub const NUTS_NAME: &str = "NUTS_NAME";

/// Join key for hydrological gauging stations.
pub const STATION_ID: &str = "station_id";
pub const STATION_LOCATION: &str = "location";

fn feature_collection_kind() -> String {
    "FeatureCollection".to_string()
}

fn feature_kind() -> String {
    "Feature".to_string()
}

/// A GeoJSON FeatureCollection as published in `{INDEX}-latest.geojson`.
///
/// Members other than `features` (e.g. `crs`, `bbox`) are carried through
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "feature_collection_kind")]
    pub kind: String,
    pub features: Vec<Feature>,
    #[serde(flatten)]
    pub foreign_members: Map<String, Value>,
}

/// A single region polygon or station point.
///
/// `properties` holds `NUTS_ID`/`NUTS_NAME` (or `station_id`/`location`)
/// plus one sparse series per index: `properties[INDEX][YYYY-MM-DD] -> number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default)]
    pub geometry: Value,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        FeatureCollection {
            kind: feature_collection_kind(),
            features,
            foreign_members: Map::new(),
        }
    }

    /// Find a feature by its region or station id.
    pub fn find(&self, entity_id: &str) -> Option<&Feature> {
        self.features
            .iter()
            .find(|feature| feature.entity_id().as_deref() == Some(entity_id))
    }
}

impl Feature {
    pub fn new(id: Option<Value>, properties: Map<String, Value>) -> Self {
        Feature {
            kind: feature_kind(),
            id,
            geometry: Value::Null,
            properties,
        }
    }

    /// NUTS_ID for regions, station_id for stations. Numeric station ids
    /// are rendered as their decimal string.
    pub fn entity_id(&self) -> Option<String> {
        [NUTS_ID, STATION_ID]
            .iter()
            .find_map(|key| match self.properties.get(*key) {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
    }

    /// Human readable name for tooltips.
    pub fn entity_name(&self) -> Option<&str> {
        [NUTS_NAME, STATION_LOCATION]
            .iter()
            .find_map(|key| self.properties.get(*key).and_then(Value::as_str))
    }

    /// The sparse per-date map for an index, if the feature carries one.
    pub fn date_series(&self, index: &DroughtIndex) -> Option<&Map<String, Value>> {
        index
            .property_keys()
            .iter()
            .find_map(|key| self.properties.get(key).and_then(Value::as_object))
    }

    /// Exact lookup of `properties[INDEX][date]`.
    pub fn value_on(&self, index: &DroughtIndex, date: &str) -> Option<f64> {
        self.date_series(index)
            .and_then(|series| series.get(date))
            .and_then(Value::as_f64)
    }

    /// Dates with a numeric value for this index, ascending.
    pub fn available_dates(&self, index: &DroughtIndex) -> Vec<String> {
        let mut dates: Vec<String> = self
            .date_series(index)
            .map(|series| {
                series
                    .iter()
                    .filter(|(_, v)| v.is_number())
                    .map(|(date, _)| date.clone())
                    .collect()
            })
            .unwrap_or_default();
        dates.sort();
        dates
    }

    /// The joined value, `None` when absent or null.
    pub fn joined_value(&self) -> Option<f64> {
        self.properties.get(VALUE_PROPERTY).and_then(Value::as_f64)
    }
}
