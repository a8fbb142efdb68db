//! Core data model for the Alpine Drought Observatory.
//!
//! Everything here mirrors the static artifacts published by the data
//! repository: `{INDEX}-latest.geojson`, `metadata/{INDEX}.json` and the
//! per-region / per-station timeseries files.

pub mod error;
pub mod feature;
pub mod index;
pub mod metadata;
pub mod source;
pub mod timeseries;

#[cfg(feature = "api")]
pub mod fetch;
