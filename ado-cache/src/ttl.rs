use log::debug;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

/// Default lifetime of a cached response.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    timestamp: Instant,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.timestamp) > self.ttl
    }
}

/// Map whose entries expire `ttl` after insertion.
///
/// Expiry is checked on every read before anything is returned; an expired
/// entry is removed by that read. Time comes from `tokio::time::Instant`,
/// so paused-clock tests can move it.
#[derive(Debug, Clone)]
pub struct TtlCache<K, T> {
    entries: HashMap<K, CacheEntry<T>>,
}

impl<K: Eq + Hash, T: Clone> TtlCache<K, T> {
    pub fn new() -> Self {
        TtlCache {
            entries: HashMap::new(),
        }
    }

    pub fn get(&mut self, key: &K) -> Option<T> {
        let now = Instant::now();
        let expired = self.entries.get(key)?.is_expired(now);
        if expired {
            self.entries.remove(key);
            debug!("Cache entry expired");
            return None;
        }
        self.entries.get(key).map(|entry| entry.data.clone())
    }

    pub fn set(&mut self, key: K, data: T, ttl: Duration) {
        self.entries.insert(
            key,
            CacheEntry {
                data,
                timestamp: Instant::now(),
                ttl,
            },
        );
    }

    pub fn remove(&mut self, key: &K) -> Option<T> {
        self.entries.remove(key).map(|entry| entry.data)
    }

    /// Entries currently stored, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Eq + Hash, T: Clone> Default for TtlCache<K, T> {
    fn default() -> Self {
        Self::new()
    }
}
