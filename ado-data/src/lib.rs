//! Data shaping between the static artifacts and the rendering surfaces.
//!
//! - `join`: derive the per-feature `value` property for the selected day
//! - `cursor`: day-index bounds, correction and nearest-date snapping
//! - `legend`: map colour expressions and value → label lookup
//! - `chart`: per-entity timeseries → tabular chart rows

pub mod chart;
pub mod cursor;
pub mod join;
pub mod legend;
