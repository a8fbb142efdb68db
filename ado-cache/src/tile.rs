//! Weekly high-resolution rasters keyed by (index, year, week).
//!
//! A tile is the georeferenced bounds (from the `.tif`) plus the display
//! image bytes (the `.jpg`), held in memory so re-showing a week costs no
//! network call. Neighbouring weeks of the active selection are fetched in
//! the background. Tiles expire like any other cached response (lazily,
//! on read). Each prefetch carries the selection generation it was
//! issued under and its result is dropped if the active index or year has
//! changed by the time it completes.

use ado_core::index::DroughtIndex;
use ado_utils::dates::{date_from_day_index, iso_year_week, weeks_in_iso_year};
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::ttl::{TtlCache, DEFAULT_TTL};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TileError {
    /// Raster or image could not be fetched
    #[error("Failed to fetch tile {key}: {message}")]
    Fetch { key: String, message: String },

    /// Georeferencing file could not be decoded
    #[error("Failed to decode raster metadata: {0}")]
    Decode(String),

    #[error("Day {0} cannot be mapped to a calendar week")]
    InvalidDay(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub index: DroughtIndex,
    pub year: i32,
    pub week: u32,
}

impl TileKey {
    pub fn new(index: DroughtIndex, year: i32, week: u32) -> Self {
        TileKey { index, year, week }
    }

    /// The ISO week containing a day cursor.
    pub fn for_day(index: DroughtIndex, day: i64) -> Result<Self, TileError> {
        let date = date_from_day_index(day).map_err(|_| TileError::InvalidDay(day))?;
        let (year, week) = iso_year_week(&date);
        Ok(TileKey { index, year, week })
    }

    /// Previous and following week of the same index and year.
    pub fn neighbors(&self) -> Vec<TileKey> {
        let last_week = weeks_in_iso_year(self.year);
        [self.week.checked_sub(1), Some(self.week + 1)]
            .into_iter()
            .flatten()
            .filter(|week| (1..=last_week).contains(week))
            .map(|week| TileKey::new(self.index.clone(), self.year, week))
            .collect()
    }

    fn selection(&self) -> (DroughtIndex, i32) {
        (self.index.clone(), self.year)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/w{:02}", self.index, self.year, self.week)
    }
}

/// Geographic extent in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl TileBounds {
    /// Corner coordinates in the order a Mapbox image source expects:
    /// top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [[f64; 2]; 4] {
        [
            [self.west, self.north],
            [self.east, self.north],
            [self.east, self.south],
            [self.west, self.south],
        ]
    }
}

/// A cached raster ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub key: TileKey,
    pub bounds: TileBounds,
    pub image: Arc<[u8]>,
}

/// Where tiles come from: georeferencing and image for one key.
pub trait TileSource: Send + Sync + 'static {
    fn bounds(&self, key: &TileKey) -> impl Future<Output = Result<TileBounds, TileError>> + Send;

    fn image(&self, key: &TileKey) -> impl Future<Output = Result<Vec<u8>, TileError>> + Send;
}

#[derive(Debug)]
struct CacheState {
    tiles: TtlCache<TileKey, Tile>,
    ttl: Duration,
    in_flight: HashMap<TileKey, watch::Sender<()>>,
    active: Option<(DroughtIndex, i32)>,
    generation: u64,
}

impl CacheState {
    fn new(ttl: Duration) -> Self {
        CacheState {
            tiles: TtlCache::new(),
            ttl,
            in_flight: HashMap::new(),
            active: None,
            generation: 0,
        }
    }
}

struct Shared<S> {
    source: S,
    state: Mutex<CacheState>,
}

/// Removes the in-flight marker when a fetch ends, however it ends.
/// Dropping the sender wakes every request waiting on that key.
struct InFlight<'a> {
    state: &'a Mutex<CacheState>,
    key: &'a TileKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.state).in_flight.remove(self.key);
    }
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cache and prefetcher for weekly tiles. Clones share one cache.
///
/// Tiles are kept across overlay toggles for instant re-display; they go
/// away when their TTL runs out or on [`TileCache::clear`].
pub struct TileCache<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for TileCache<S> {
    fn clone(&self) -> Self {
        TileCache {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: TileSource> TileCache<S> {
    pub fn new(source: S) -> Self {
        Self::with_ttl(source, DEFAULT_TTL)
    }

    pub fn with_ttl(source: S, ttl: Duration) -> Self {
        TileCache {
            shared: Arc::new(Shared {
                source,
                state: Mutex::new(CacheState::new(ttl)),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        lock(&self.shared.state)
    }

    pub fn source(&self) -> &S {
        &self.shared.source
    }

    /// Make `(index, year)` the active selection. Changing it invalidates
    /// every prefetch issued before.
    pub fn set_active(&self, index: &DroughtIndex, year: i32) {
        let mut state = self.state();
        let selection = (index.clone(), year);
        if state.active.as_ref() != Some(&selection) {
            state.active = Some(selection);
            state.generation += 1;
            debug!("Active tile selection {}/{} (generation {})", index, year, state.generation);
        }
    }

    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    pub fn get(&self, key: &TileKey) -> Option<Tile> {
        self.state().tiles.get(key)
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.get(key).is_some()
    }

    /// Tiles stored, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.state().tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().tiles.is_empty()
    }

    pub fn clear(&self) {
        self.state().tiles.clear();
    }

    /// Foreground load of the tile the user is looking at. Its result is
    /// always stored.
    pub async fn load(&self, key: &TileKey) -> Result<Tile, TileError> {
        match self.obtain(key, None).await? {
            Some(tile) => Ok(tile),
            None => Err(TileError::Fetch {
                key: key.to_string(),
                message: "foreground load discarded".to_string(),
            }),
        }
    }

    /// Select `key`'s index/year, load it, then prefetch its neighbours.
    pub async fn show(&self, key: &TileKey) -> Result<(Tile, Vec<JoinHandle<()>>), TileError> {
        self.set_active(&key.index, key.year);
        let tile = self.load(key).await?;
        Ok((tile, self.prefetch_neighbors(key)))
    }

    /// Background-fetch the weeks either side of `key`.
    pub fn prefetch_neighbors(&self, key: &TileKey) -> Vec<JoinHandle<()>> {
        key.neighbors()
            .into_iter()
            .filter_map(|neighbor| self.prefetch(neighbor))
            .collect()
    }

    /// Background-fetch one tile under the current generation. `None` when
    /// it is already cached or being fetched.
    pub fn prefetch(&self, key: TileKey) -> Option<JoinHandle<()>> {
        let generation = {
            let mut state = self.state();
            if state.in_flight.contains_key(&key) || state.tiles.get(&key).is_some() {
                return None;
            }
            state.generation
        };
        let cache = self.clone();
        Some(tokio::spawn(async move {
            match cache.obtain(&key, Some(generation)).await {
                Ok(Some(_)) => debug!("Prefetched tile {}", key),
                Ok(None) => debug!("Discarded stale prefetch of {}", key),
                Err(e) => warn!("Prefetch of {} failed: {}", key, e),
            }
        }))
    }

    /// Serve from cache, join a fetch already running for `key`, or fetch.
    ///
    /// With a `ticket`, the result is stored only if the selection
    /// generation still matches and the key belongs to the active
    /// selection; otherwise `Ok(None)`.
    async fn obtain(&self, key: &TileKey, ticket: Option<u64>) -> Result<Option<Tile>, TileError> {
        loop {
            let mut waiter = {
                let mut state = self.state();
                if let Some(tile) = state.tiles.get(key) {
                    return Ok(Some(tile));
                }
                match state.in_flight.get(key) {
                    Some(sender) => sender.subscribe(),
                    None => {
                        let (sender, _) = watch::channel(());
                        state.in_flight.insert(key.clone(), sender);
                        break;
                    }
                }
            };
            // Resolves once the running fetch drops its sender.
            let _ = waiter.changed().await;
        }

        let _in_flight = InFlight {
            state: &self.shared.state,
            key,
        };
        let tile = self.fetch(key).await?;

        let mut state = self.state();
        if let Some(generation) = ticket {
            let current = state.generation == generation
                && state.active.as_ref() == Some(&key.selection());
            if !current {
                return Ok(None);
            }
        }
        let ttl = state.ttl;
        state.tiles.set(key.clone(), tile.clone(), ttl);
        Ok(Some(tile))
    }

    async fn fetch(&self, key: &TileKey) -> Result<Tile, TileError> {
        let bounds = self.shared.source.bounds(key).await?;
        let image = self.shared.source.image(key).await?;
        debug!("Fetched tile {} ({} bytes)", key, image.len());
        Ok(Tile {
            key: key.clone(),
            bounds,
            image: Arc::from(image),
        })
    }
}
