//! In-memory caches shared by every view of the observatory.
//!
//! Caches are plain values built once at startup and handed to views,
//! so tests can construct isolated instances.
//!
//! - `ttl`: keyed entries with a per-entry time-to-live, evicted on read
//! - `timeseries`: region/station series and station reports
//! - `tile`: georeferenced weekly rasters with neighbour prefetching
//! - `geotiff`: bounds from GeoTIFF georeferencing tags
//! - `overlay`: attaching a cached tile to a map surface

pub mod geotiff;
pub mod overlay;
pub mod tile;
pub mod timeseries;
pub mod ttl;
