//! A single drought-index map view.
//!
//! Loads `{INDEX}-latest.geojson` and `metadata/{INDEX}.json`, keeps the
//! day cursor valid for the index's date range, re-joins the map values on
//! every cursor change and opens per-region/per-station panels through the
//! shared [`TimeseriesCache`]. Fetch failures end up as [`LoadState::Error`]
//! on the part of the view that issued them.

use ado_cache::timeseries::TimeseriesCache;
use ado_cache::ttl::DEFAULT_TTL;
use ado_core::error::FetchError;
use ado_core::feature::FeatureCollection;
use ado_core::index::DroughtIndex;
use ado_core::metadata::{LegendStop, Metadata};
use ado_core::source::DataSource;
use ado_core::timeseries::{ChartRow, TimeseriesPayload};
use ado_data::chart::chart_rows;
use ado_data::cursor::{
    normalize_cursor, value_for_day, CursorRange, CursorState, DateBounds, TimeSpanWindow,
};
use ado_data::join::join_day;
use ado_data::legend::{
    build_color_expression, build_value_expression, format_tooltip, sort_stops, MetricRow,
    DEFAULT_COLOR,
};
use ado_timeline::engine::Timeline;
use ado_timeline::player::Player;
use ado_timeline::speed::{PlaybackSpeed, TimelineError};
use ado_utils::dates::{to_date_string, to_day_index};
use ado_utils::error::DateError;
use log::{debug, info, warn};
use serde_json::Value;
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// Loading / ready / error, for anything the view fetches.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Loading,
    Ready(T),
    Error(String),
}

impl<T> LoadState<T> {
    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => LoadState::Ready(value),
            Err(e) => LoadState::Error(e.to_string()),
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            LoadState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

/// Everything fetched once per index selection.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexData {
    pub features: FeatureCollection,
    pub metadata: Metadata,
    pub bounds: DateBounds,
    /// Legend stops, ascending by threshold.
    pub stops: Vec<LegendStop>,
}

/// The chart panel opened by clicking a region or station.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPanel {
    pub entity_id: String,
    pub rows: LoadState<Vec<ChartRow>>,
    /// Only stations carry an HTML report.
    pub report: Option<LoadState<String>>,
}

struct Playback {
    player: Player,
    days: UnboundedReceiver<i64>,
}

pub struct IndexView<D> {
    source: D,
    cache: TimeseriesCache,
    ttl: Duration,
    index: DroughtIndex,
    data: LoadState<IndexData>,
    playback: Option<Playback>,
    window: Option<TimeSpanWindow>,
    joined: Option<FeatureCollection>,
    panel: Option<EntityPanel>,
}

impl<D: DataSource> IndexView<D> {
    pub fn new(source: D, cache: TimeseriesCache, index: DroughtIndex) -> Self {
        IndexView {
            source,
            cache,
            ttl: DEFAULT_TTL,
            index,
            data: LoadState::Loading,
            playback: None,
            window: None,
            joined: None,
            panel: None,
        }
    }

    /// Lifetime of panel responses stored in the cache.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn index(&self) -> &DroughtIndex {
        &self.index
    }

    pub fn state(&self) -> &LoadState<IndexData> {
        &self.data
    }

    pub fn cache(&self) -> &TimeseriesCache {
        &self.cache
    }

    pub fn panel(&self) -> Option<&EntityPanel> {
        self.panel.as_ref()
    }

    /// Features with `value` set for the current day.
    pub fn joined(&self) -> Option<&FeatureCollection> {
        self.joined.as_ref()
    }

    async fn fetch_index(&self) -> Result<(FeatureCollection, Metadata, DateBounds), FetchError> {
        let (features, metadata) = tokio::try_join!(
            self.source.latest_features(&self.index),
            self.source.metadata(&self.index)
        )?;
        let bounds = DateBounds::from_metadata(&metadata)?;
        Ok((features, metadata, bounds))
    }

    /// Fetch the index data and put the cursor on `requested` (the last
    /// available day when `None`), corrected into range before the first
    /// join. Any running auto-play is torn down first.
    pub async fn load(&mut self, requested: Option<i64>) {
        self.playback = None;
        self.window = None;
        self.joined = None;
        self.panel = None;
        self.data = LoadState::Loading;

        let (features, metadata, bounds) = match self.fetch_index().await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("Failed to load {}: {}", self.index, e);
                self.data = LoadState::Error(e.to_string());
                return;
            }
        };

        let requested = requested.unwrap_or(bounds.last);
        if let CursorState::Corrected { from, to } = normalize_cursor(requested, &bounds) {
            info!("Day {} outside {:?} for {}, showing {}", from, bounds, self.index, to);
        }
        let (player, days) = Player::new(Timeline::new(CursorRange::new(bounds), requested));
        let stops = sort_stops(&metadata.colormap.legend.stops);
        info!(
            "Loaded {} ({} features, {} legend stops)",
            self.index,
            features.features.len(),
            stops.len()
        );
        self.data = LoadState::Ready(IndexData {
            features,
            metadata,
            bounds,
            stops,
        });
        self.playback = Some(Playback { player, days });
        self.rejoin();
    }

    /// Switch to another index, keeping the current day when it is valid
    /// for the new one.
    pub async fn switch_index(&mut self, index: DroughtIndex) {
        let day = self.day();
        self.index = index;
        self.load(day).await;
    }

    fn rejoin(&mut self) {
        let joined = match (self.data.ready(), self.date()) {
            (Some(data), Some(date)) => Some(join_day(&data.features, &self.index, &date)),
            _ => None,
        };
        self.joined = joined;
    }

    fn with_player<R>(&mut self, action: impl FnOnce(&mut Player) -> R) -> Option<R> {
        let result = self
            .playback
            .as_mut()
            .map(|playback| action(&mut playback.player));
        self.rejoin();
        result
    }

    pub fn day(&self) -> Option<i64> {
        self.playback.as_ref().map(|playback| playback.player.day())
    }

    pub fn date(&self) -> Option<String> {
        self.day().and_then(|day| to_date_string(day).ok())
    }

    /// Range the slider and auto-play currently cover.
    pub fn bounds(&self) -> Option<DateBounds> {
        self.playback.as_ref().map(|playback| playback.player.bounds())
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|playback| playback.player.is_playing())
    }

    /// Slider to `date`. Out-of-range dates are corrected.
    pub fn select_day(&mut self, date: &str) -> Result<Option<i64>, DateError> {
        let day = to_day_index(date)?;
        Ok(self.with_player(|player| player.scrub(day)))
    }

    pub fn next(&mut self) -> Option<i64> {
        self.with_player(Player::next)
    }

    pub fn prev(&mut self) -> Option<i64> {
        self.with_player(Player::prev)
    }

    /// Narrow the slider to the `days` most recent days.
    pub fn set_window(&mut self, days: i64) -> Option<i64> {
        let window = TimeSpanWindow::last_days(days, self.data.ready()?.bounds.last);
        self.window = Some(window);
        self.with_player(|player| player.set_window(window))
    }

    pub fn reset_window(&mut self) -> Option<i64> {
        self.window = None;
        self.with_player(Player::reset_window)
    }

    pub fn set_speed(&mut self, speed: PlaybackSpeed) -> Result<(), TimelineError> {
        match self.playback.as_mut() {
            Some(playback) => playback.player.set_speed(speed),
            None => Ok(()),
        }
    }

    /// Start or stop auto-play. Returns whether it plays afterwards.
    pub fn toggle_play(&mut self) -> bool {
        self.with_player(|player| {
            player.toggle();
            player.is_playing()
        })
        .unwrap_or(false)
    }

    /// Apply the days auto-play produced since the last call. Only the
    /// newest one is shown. Returns it, if there was any.
    pub fn sync(&mut self) -> Option<i64> {
        let playback = self.playback.as_mut()?;
        let mut latest = None;
        while let Ok(day) = playback.days.try_recv() {
            latest = Some(day);
        }
        self.apply_tick(latest?)
    }

    /// Wait for the next auto-play step and apply it. `None` when not
    /// playing.
    pub async fn next_frame(&mut self) -> Option<i64> {
        let playback = self.playback.as_mut()?;
        if !playback.player.is_playing() {
            return None;
        }
        let mut day = playback.days.recv().await?;
        while let Ok(newer) = playback.days.try_recv() {
            day = newer;
        }
        self.apply_tick(day)
    }

    fn apply_tick(&mut self, day: i64) -> Option<i64> {
        let playback = self.playback.as_mut()?;
        playback.player.observe(day);
        debug!("Auto-play showing day {}", day);
        self.rejoin();
        Some(day)
    }

    /// Hover text for one region or station, e.g.
    /// `Piemonte (ITC1) 2020-01-03: 0.40 (normal)`. A missing day snaps to
    /// the nearest date the feature has.
    pub fn tooltip(&self, entity_id: &str) -> Option<String> {
        let data = self.data.ready()?;
        let feature = data.features.find(entity_id)?;
        let date = self.date()?;
        let fallback = data.metadata.last_date().unwrap_or(&date);
        let (used, value) = value_for_day(feature, &self.index, &date, fallback);
        Some(format!(
            "{} ({}) {}: {}",
            feature.entity_name().unwrap_or(entity_id),
            entity_id,
            used,
            format_tooltip(value, &data.stops)
        ))
    }

    /// `match` expression colouring each region by its joined value.
    pub fn color_expression(&self) -> Option<Value> {
        let data = self.data.ready()?;
        let rows: Vec<MetricRow> = self
            .joined
            .as_ref()?
            .features
            .iter()
            .filter_map(|feature| {
                Some(MetricRow::new(&feature.entity_id()?, feature.joined_value()))
            })
            .collect();
        Some(build_color_expression(&rows, &data.stops, DEFAULT_COLOR))
    }

    /// `step` expression over the legend bands for the joined value.
    pub fn step_expression(&self) -> Option<Value> {
        Some(build_value_expression(&self.data.ready()?.stops))
    }

    fn chart(&self, payload: &TimeseriesPayload) -> Vec<ChartRow> {
        let window = self.window.and(self.bounds());
        chart_rows(payload, window.as_ref())
    }

    /// Open the panel for a NUTS3 region.
    pub async fn select_feature(&mut self, nuts_id: &str) -> &EntityPanel {
        self.panel = Some(EntityPanel {
            entity_id: nuts_id.to_string(),
            rows: LoadState::Loading,
            report: None,
        });
        let series = match self.cache.get_timeseries(nuts_id) {
            Some(payload) => Ok(payload),
            None => self.source.region_timeseries(nuts_id).await.map(|payload| {
                self.cache
                    .set_timeseries_with_ttl(nuts_id, payload.clone(), self.ttl);
                payload
            }),
        };
        if let Err(e) = &series {
            warn!("No timeseries for region {}: {}", nuts_id, e);
        }
        let rows = LoadState::from_result(series.map(|payload| self.chart(&payload)));
        self.panel.insert(EntityPanel {
            entity_id: nuts_id.to_string(),
            rows,
            report: None,
        })
    }

    /// Open the panel for a gauging station: its series and its report.
    pub async fn select_station(&mut self, station_id: &str) -> &EntityPanel {
        self.panel = Some(EntityPanel {
            entity_id: station_id.to_string(),
            rows: LoadState::Loading,
            report: Some(LoadState::Loading),
        });
        let series = match self.cache.get_timeseries(station_id) {
            Some(payload) => Ok(payload),
            None => self.source.station_timeseries(station_id).await.map(|payload| {
                self.cache
                    .set_timeseries_with_ttl(station_id, payload.clone(), self.ttl);
                payload
            }),
        };
        let report = match self.cache.get_report(station_id) {
            Some(html) => Ok(html),
            None => self.source.station_report(station_id).await.map(|html| {
                self.cache.set_report_with_ttl(station_id, html.clone(), self.ttl);
                html
            }),
        };
        if let Err(e) = &series {
            warn!("No timeseries for station {}: {}", station_id, e);
        }
        if let Err(e) = &report {
            warn!("No report for station {}: {}", station_id, e);
        }
        let rows = LoadState::from_result(series.map(|payload| self.chart(&payload)));
        self.panel.insert(EntityPanel {
            entity_id: station_id.to_string(),
            rows,
            report: Some(LoadState::from_result(report)),
        })
    }

    pub fn close_panel(&mut self) {
        self.panel = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ado_core::error::Result;
    use serde_json::json;
    use std::cell::Cell;

    #[derive(Default)]
    struct FakeSource {
        offline: bool,
        region_calls: Cell<usize>,
        station_calls: Cell<usize>,
    }

    impl FakeSource {
        fn unavailable(&self, path: &str) -> FetchError {
            FetchError::Status {
                url: format!("fake://{}", path),
                status: 404,
            }
        }
    }

    impl DataSource for FakeSource {
        async fn latest_features(&self, index: &DroughtIndex) -> Result<FeatureCollection> {
            if self.offline {
                return Err(self.unavailable(&index.latest_path()));
            }
            Ok(serde_json::from_value(json!({
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "id": 1,
                        "geometry": null,
                        "properties": {
                            "NUTS_ID": "ITC1",
                            "NUTS_NAME": "Piemonte",
                            "SPEI-1": { "2020-01-01": -1.2, "2020-01-03": 0.4, "2020-01-05": 2.5 }
                        }
                    },
                    {
                        "type": "Feature",
                        "id": 2,
                        "geometry": null,
                        "properties": {
                            "NUTS_ID": "AT33",
                            "NUTS_NAME": "Tirol",
                            "SPEI-1": { "2020-01-05": -0.5 }
                        }
                    }
                ]
            }))
            .unwrap())
        }

        async fn metadata(&self, index: &DroughtIndex) -> Result<Metadata> {
            let timerange = if index.as_str() == "vhi" {
                json!({ "firstDate": "2020-01-10", "lastDate": "2020-01-20" })
            } else {
                json!({ "firstDate": "2020-01-01", "lastDate": "2020-01-05" })
            };
            Ok(serde_json::from_value(json!({
                "short_name": index.to_string().to_uppercase(),
                "long_name": "Standardized Precipitation-Evapotranspiration Index",
                "timerange": timerange,
                "colormap": {
                    "legend": {
                        "stops": [["2", "wet", "#0000ff"], ["-2", "dry", "#ff0000"], ["0", "normal", "#ffffff"]]
                    },
                    "fill-opacity": 0.8
                }
            }))
            .unwrap())
        }

        async fn region_timeseries(&self, nuts_id: &str) -> Result<TimeseriesPayload> {
            self.region_calls.set(self.region_calls.get() + 1);
            if nuts_id != "ITC1" {
                return Err(FetchError::AllCandidatesFailed(vec![format!(
                    "fake://timeseries/NUTS3_{}.json",
                    nuts_id
                )]));
            }
            Ok(serde_json::from_value(json!({
                "spei-1": { "2020-01-02": 0.1, "2020-01-01": -0.3 }
            }))
            .unwrap())
        }

        async fn station_timeseries(&self, _station_id: &str) -> Result<TimeseriesPayload> {
            self.station_calls.set(self.station_calls.get() + 1);
            Ok(serde_json::from_value(json!([
                { "date": "2020-01-04", "discharge": 12.5 }
            ]))
            .unwrap())
        }

        async fn station_report(&self, station_id: &str) -> Result<String> {
            Err(FetchError::AllCandidatesFailed(vec![
                format!("fake://html/ID_STATION_{}.html", station_id),
                format!("fake://html/{}.html", station_id),
            ]))
        }
    }

    fn day(date: &str) -> i64 {
        to_day_index(date).unwrap()
    }

    async fn loaded(requested: Option<&str>) -> IndexView<FakeSource> {
        let mut view = IndexView::new(
            FakeSource::default(),
            TimeseriesCache::new(),
            "spei-1".parse().unwrap(),
        );
        view.load(requested.map(day)).await;
        view
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_select_click_and_play() {
        let mut view = loaded(None).await;
        assert_eq!(view.date().as_deref(), Some("2020-01-05"));

        assert_eq!(view.select_day("2020-01-10").unwrap(), Some(day("2020-01-05")));
        assert_eq!(view.date().as_deref(), Some("2020-01-05"));

        let panel = view.select_feature("ITC1").await;
        assert_eq!(panel.entity_id, "ITC1");
        assert_eq!(panel.rows.ready().map(Vec::len), Some(2));
        assert!(view.cache().get_timeseries("ITC1").is_some());

        assert!(view.toggle_play());
        // playing from the last day starts over at the first
        assert_eq!(view.sync(), Some(day("2020-01-01")));
        let started = tokio::time::Instant::now();
        assert_eq!(view.next_frame().await, Some(day("2020-01-02")));
        assert_eq!(started.elapsed(), Duration::from_millis(500));
        assert!(view.is_playing());
        assert_eq!(view.date().as_deref(), Some("2020-01-02"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_index_stops_playback_and_corrects_day() {
        let mut view = loaded(Some("2020-01-02")).await;
        assert!(view.toggle_play());
        assert_eq!(view.next_frame().await, Some(day("2020-01-03")));

        view.switch_index("vhi".parse().unwrap()).await;
        assert_eq!(view.index().as_str(), "vhi");
        assert!(!view.is_playing());
        // 2020-01-03 is before the new range
        assert_eq!(view.date().as_deref(), Some("2020-01-20"));
        assert_eq!(view.bounds().map(|b| b.first), Some(day("2020-01-10")));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(view.sync(), None);
        assert_eq!(view.next_frame().await, None);
        assert_eq!(view.date().as_deref(), Some("2020-01-20"));
    }

    #[tokio::test]
    async fn test_joined_values_follow_cursor() {
        let mut view = loaded(Some("2020-01-03")).await;
        let values = |view: &IndexView<FakeSource>| -> Vec<Option<f64>> {
            view.joined()
                .unwrap()
                .features
                .iter()
                .map(|feature| feature.joined_value())
                .collect()
        };
        assert_eq!(values(&view), vec![Some(0.4), None]);
        view.next();
        assert_eq!(values(&view), vec![None, None]);
        view.next();
        assert_eq!(values(&view), vec![Some(2.5), Some(-0.5)]);
        // stepping stops at the last day
        assert_eq!(view.next(), Some(day("2020-01-05")));
    }

    #[tokio::test]
    async fn test_out_of_range_request_corrected_on_load() {
        let view = loaded(Some("2019-06-01")).await;
        assert_eq!(view.date().as_deref(), Some("2020-01-05"));
    }

    #[tokio::test]
    async fn test_second_click_is_served_from_cache() {
        let mut view = loaded(None).await;
        view.select_feature("ITC1").await;
        view.select_feature("ITC1").await;
        assert_eq!(view.source.region_calls.get(), 1);
        assert_eq!(view.cache().stats().timeseries, 1);
    }

    #[tokio::test]
    async fn test_failed_region_is_panel_error() {
        let mut view = loaded(None).await;
        let panel = view.select_feature("AT33").await;
        assert!(panel.rows.error().unwrap().contains("NUTS3_AT33"));
        // nothing cached for a failure
        assert_eq!(view.cache().stats().timeseries, 0);
        assert!(view.state().ready().is_some());
    }

    #[tokio::test]
    async fn test_station_panel_with_missing_report() {
        let mut view = loaded(None).await;
        let panel = view.select_station("4711").await.clone();
        assert_eq!(panel.rows.ready().unwrap()[0].values["discharge"], 12.5);
        assert!(panel.report.unwrap().error().unwrap().contains("ID_STATION_4711"));
        view.select_station("4711").await;
        assert_eq!(view.source.station_calls.get(), 1);
        view.close_panel();
        assert!(view.panel().is_none());
    }

    #[tokio::test]
    async fn test_unavailable_index_is_error_state() {
        let mut view = IndexView::new(
            FakeSource {
                offline: true,
                ..FakeSource::default()
            },
            TimeseriesCache::new(),
            "vhi".parse().unwrap(),
        );
        view.load(None).await;
        assert!(view.state().error().unwrap().contains("vhi-latest.geojson"));
        assert_eq!(view.day(), None);
        assert!(view.joined().is_none());
        assert!(!view.toggle_play());
    }

    #[tokio::test]
    async fn test_tooltip_snaps_to_nearest_date() {
        let mut view = loaded(Some("2020-01-02")).await;
        assert_eq!(
            view.tooltip("ITC1").as_deref(),
            Some("Piemonte (ITC1) 2020-01-01: -1.20 (dry)")
        );
        view.select_day("2020-01-05").unwrap();
        assert_eq!(
            view.tooltip("AT33").as_deref(),
            Some("Tirol (AT33) 2020-01-05: -0.50 (dry)")
        );
        assert_eq!(view.tooltip("XX99"), None);
    }

    #[tokio::test]
    async fn test_window_narrows_bounds_and_chart() {
        let mut view = loaded(Some("2020-01-01")).await;
        assert_eq!(view.set_window(2), Some(day("2020-01-05")));
        assert_eq!(view.bounds().map(|b| b.first), Some(day("2020-01-04")));
        let panel = view.select_feature("ITC1").await;
        assert_eq!(panel.rows.ready().map(Vec::len), Some(0));

        view.reset_window();
        assert_eq!(view.bounds().map(|b| b.first), Some(day("2020-01-01")));
    }

    #[tokio::test]
    async fn test_expressions_use_joined_values() {
        let view = loaded(None).await;
        let expression = view.color_expression().unwrap();
        assert_eq!(expression[0], "match");
        assert_eq!(expression[2], "ITC1");
        assert_eq!(expression[4], "AT33");
        assert_eq!(view.step_expression().unwrap()[0], "case");
    }
}
