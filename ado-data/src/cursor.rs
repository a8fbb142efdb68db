//! The day cursor: which day the map shows, and keeping it valid.
//!
//! Days are integer day indexes (whole days since 1970-01-01) so stepping
//! and range checks are plain integer arithmetic.

use ado_core::error::FetchError;
use ado_core::feature::Feature;
use ado_core::index::DroughtIndex;
use ado_core::metadata::Metadata;
use ado_utils::dates::{day_index, parse_date};
use chrono::NaiveDate;
use log::debug;

/// Inclusive `[first, last]` day range of an index's dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateBounds {
    pub first: i64,
    pub last: i64,
}

impl DateBounds {
    /// `None` when `first > last`.
    pub fn new(first: i64, last: i64) -> Option<Self> {
        (first <= last).then_some(DateBounds { first, last })
    }

    pub fn from_dates(first: &NaiveDate, last: &NaiveDate) -> Option<Self> {
        DateBounds::new(day_index(first), day_index(last))
    }

    pub fn from_metadata(metadata: &Metadata) -> Result<Self, FetchError> {
        let (first, last) = metadata.date_range()?;
        DateBounds::from_dates(&first, &last)
            .ok_or_else(|| FetchError::MissingDateRange(metadata.short_name.clone()))
    }

    pub fn contains(&self, day: i64) -> bool {
        self.first <= day && day <= self.last
    }

    /// Number of days in the range.
    pub fn days(&self) -> i64 {
        self.last - self.first + 1
    }
}

/// Bring `day` back into `[first, last]`.
///
/// A day past `last` becomes `last`. A day before `first` also becomes
/// `last`: the map jumps to the most recent data rather than the oldest.
pub fn clamp(day: i64, first: i64, last: i64) -> i64 {
    if day > last || day < first {
        last
    } else {
        day
    }
}

/// Outcome of validating a requested day against the active bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Idle(i64),
    Corrected { from: i64, to: i64 },
}

impl CursorState {
    pub fn day(&self) -> i64 {
        match *self {
            CursorState::Idle(day) => day,
            CursorState::Corrected { to, .. } => to,
        }
    }
}

/// Pre-render normalization, run once whenever the index or its range
/// changes and before any join.
pub fn normalize_cursor(requested: i64, bounds: &DateBounds) -> CursorState {
    let day = clamp(requested, bounds.first, bounds.last);
    if day == requested {
        CursorState::Idle(day)
    } else {
        debug!(
            "Day {} outside [{}, {}], corrected to {}",
            requested, bounds.first, bounds.last, day
        );
        CursorState::Corrected { from: requested, to: day }
    }
}

/// The available date closest to `date`. Ties keep the first candidate
/// encountered. Unparsable candidates are ignored; with nothing usable the
/// index's last date is returned.
pub fn snap_to_nearest_available(date: &str, available: &[String], fallback: &str) -> String {
    let Ok(target) = parse_date(date) else {
        return fallback.to_string();
    };
    let mut best: Option<(&String, i64)> = None;
    for candidate in available {
        let Ok(parsed) = parse_date(candidate) else {
            continue;
        };
        let distance = (parsed - target).num_days().abs();
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((candidate, distance));
        }
    }
    best.map(|(candidate, _)| candidate.clone())
        .unwrap_or_else(|| fallback.to_string())
}

/// Value of one feature for `date`, snapping to the nearest date the
/// feature actually has. Returns the date used alongside the value.
pub fn value_for_day(
    feature: &Feature,
    index: &DroughtIndex,
    date: &str,
    fallback_last_date: &str,
) -> (String, Option<f64>) {
    if let Some(value) = feature.value_on(index, date) {
        return (date.to_string(), Some(value));
    }
    let snapped =
        snap_to_nearest_available(date, &feature.available_dates(index), fallback_last_date);
    let value = feature.value_on(index, &snapped);
    (snapped, value)
}

/// Optional `[start, end]` sub-range, e.g. "last 30 days".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpanWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeSpanWindow {
    /// The `days` most recent days ending at `last_day`.
    pub fn last_days(days: i64, last_day: i64) -> Self {
        TimeSpanWindow {
            start: last_day - days.max(1) + 1,
            end: last_day,
        }
    }
}

/// Dataset bounds plus the window narrowing the slider minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorRange {
    bounds: DateBounds,
    window: Option<TimeSpanWindow>,
}

impl CursorRange {
    pub fn new(bounds: DateBounds) -> Self {
        CursorRange { bounds, window: None }
    }

    pub fn bounds(&self) -> DateBounds {
        self.bounds
    }

    pub fn window(&self) -> Option<TimeSpanWindow> {
        self.window
    }

    pub fn set_window(&mut self, window: TimeSpanWindow) {
        self.window = Some(window);
    }

    /// Back to the full dataset range.
    pub fn reset(&mut self) {
        self.window = None;
    }

    /// Range the slider and auto-play operate on. Only the minimum is
    /// narrowed and never outside the dataset's own bounds.
    pub fn effective(&self) -> DateBounds {
        match self.window {
            Some(window) => DateBounds {
                first: window.start.clamp(self.bounds.first, self.bounds.last),
                last: self.bounds.last,
            },
            None => self.bounds,
        }
    }
}
