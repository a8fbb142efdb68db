use std::future::Future;

use crate::error::Result;
use crate::feature::FeatureCollection;
use crate::index::DroughtIndex;
use crate::metadata::Metadata;
use crate::timeseries::TimeseriesPayload;

/// Candidate locations for a NUTS3 region series.
pub fn region_timeseries_paths(nuts_id: &str) -> Vec<String> {
    vec![format!("timeseries/NUTS3_{}.json", nuts_id)]
}

/// Candidate locations for a station series, current layout first, then
/// the legacy flat layout.
pub fn station_timeseries_paths(station_id: &str) -> Vec<String> {
    vec![
        format!("timeseries/ID_STATION_{}.json", station_id),
        format!("timeseries/{}.json", station_id),
    ]
}

/// Candidate locations for the rendered station report.
pub fn station_report_paths(station_id: &str) -> Vec<String> {
    vec![
        format!("html/ID_STATION_{}.html", station_id),
        format!("html/{}.html", station_id),
    ]
}

/// Where the observatory's static artifacts come from.
///
/// Multi-candidate lookups (station series, station report) only fail
/// once every candidate has failed.
pub trait DataSource {
    fn latest_features(&self, index: &DroughtIndex)
        -> impl Future<Output = Result<FeatureCollection>>;

    fn metadata(&self, index: &DroughtIndex) -> impl Future<Output = Result<Metadata>>;

    fn region_timeseries(&self, nuts_id: &str) -> impl Future<Output = Result<TimeseriesPayload>>;

    fn station_timeseries(
        &self,
        station_id: &str,
    ) -> impl Future<Output = Result<TimeseriesPayload>>;

    fn station_report(&self, station_id: &str) -> impl Future<Output = Result<String>>;
}
