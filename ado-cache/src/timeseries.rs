use ado_core::timeseries::TimeseriesPayload;
use log::debug;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::ttl::{TtlCache, DEFAULT_TTL};

/// Entry counts, for diagnostics.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub timeseries: usize,
    pub reports: usize,
}

#[derive(Debug, Default)]
struct Tables {
    timeseries: TtlCache<String, TimeseriesPayload>,
    reports: TtlCache<String, String>,
}

/// Memoizes per-region/per-station responses, keyed by NUTS or station id.
///
/// Two tables share the same eviction policy: parsed timeseries and the
/// station HTML reports. No I/O happens here; callers fetch on a miss and
/// store the first successful result.
///
/// Cheaply cloneable (via `Rc`); clones share the same tables, which
/// suits a single-threaded host where every view gets a handle.
#[derive(Debug, Clone, Default)]
pub struct TimeseriesCache {
    tables: Rc<RefCell<Tables>>,
}

impl TimeseriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_timeseries(&self, key: &str) -> Option<TimeseriesPayload> {
        let hit = self.tables.borrow_mut().timeseries.get(&key.to_string());
        debug!("Timeseries cache {} for {}", if hit.is_some() { "hit" } else { "miss" }, key);
        hit
    }

    pub fn set_timeseries(&self, key: &str, payload: TimeseriesPayload) {
        self.set_timeseries_with_ttl(key, payload, DEFAULT_TTL);
    }

    pub fn set_timeseries_with_ttl(&self, key: &str, payload: TimeseriesPayload, ttl: Duration) {
        self.tables
            .borrow_mut()
            .timeseries
            .set(key.to_string(), payload, ttl);
    }

    pub fn get_report(&self, key: &str) -> Option<String> {
        let hit = self.tables.borrow_mut().reports.get(&key.to_string());
        debug!("Report cache {} for {}", if hit.is_some() { "hit" } else { "miss" }, key);
        hit
    }

    pub fn set_report(&self, key: &str, html: String) {
        self.set_report_with_ttl(key, html, DEFAULT_TTL);
    }

    pub fn set_report_with_ttl(&self, key: &str, html: String, ttl: Duration) {
        self.tables.borrow_mut().reports.set(key.to_string(), html, ttl);
    }

    /// Empties both tables.
    pub fn clear(&self) {
        let mut tables = self.tables.borrow_mut();
        tables.timeseries.clear();
        tables.reports.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let tables = self.tables.borrow();
        CacheStats {
            timeseries: tables.timeseries.len(),
            reports: tables.reports.len(),
        }
    }
}
