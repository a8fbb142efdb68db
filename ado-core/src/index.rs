use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FetchError;

/// Identifier of the metric shown on the map, e.g. `spei-1` or `vhi`.
///
/// Ids are lowercase ASCII letters, digits and dashes. The geojson
/// properties may key the per-date series by the id as-is or uppercased,
/// see [`DroughtIndex::property_keys`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DroughtIndex(String);

impl DroughtIndex {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Property names under which a feature may carry this index's series.
    pub fn property_keys(&self) -> [String; 2] {
        [self.0.clone(), self.0.to_uppercase()]
    }

    /// Relative path of the latest per-feature values.
    pub fn latest_path(&self) -> String {
        format!("{}-latest.geojson", self.0)
    }

    /// Relative path of the index descriptor.
    pub fn metadata_path(&self) -> String {
        format!("metadata/{}.json", self.0)
    }
}

impl FromStr for DroughtIndex {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().to_lowercase();
        let valid = !id.is_empty()
            && !id.starts_with('-')
            && id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if valid {
            Ok(DroughtIndex(id))
        } else {
            Err(FetchError::InvalidIndex(s.to_string()))
        }
    }
}

impl TryFrom<String> for DroughtIndex {
    type Error = FetchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DroughtIndex> for String {
    fn from(value: DroughtIndex) -> Self {
        value.0
    }
}

impl fmt::Display for DroughtIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
