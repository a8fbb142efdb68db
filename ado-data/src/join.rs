use ado_core::feature::{Feature, FeatureCollection, VALUE_PROPERTY};
use ado_core::index::DroughtIndex;
use serde_json::Value;

/// Return a copy of `collection` where every feature's properties gain a
/// `value` entry set to `accessor(feature)`.
///
/// Feature order and identity are preserved and the input is left
/// untouched. A `None` from the accessor is written as `null`, which the
/// map and tooltips treat as "no data", never as zero.
pub fn join_values<F>(collection: &FeatureCollection, accessor: F) -> FeatureCollection
where
    F: Fn(&Feature) -> Option<f64>,
{
    let features = collection
        .features
        .iter()
        .map(|feature| {
            let mut joined = feature.clone();
            let value = accessor(feature).map(Value::from).unwrap_or(Value::Null);
            joined.properties.insert(VALUE_PROPERTY.to_string(), value);
            joined
        })
        .collect();
    FeatureCollection {
        kind: collection.kind.clone(),
        features,
        foreign_members: collection.foreign_members.clone(),
    }
}

/// Join the exact `properties[INDEX][date]` value of every feature.
pub fn join_day(
    collection: &FeatureCollection,
    index: &DroughtIndex,
    date: &str,
) -> FeatureCollection {
    join_values(collection, |feature| feature.value_on(index, date))
}
