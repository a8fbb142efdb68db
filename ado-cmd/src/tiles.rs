use ado_cache::overlay::{MapSurface, TileOverlay};
use ado_cache::tile::{TileBounds, TileCache, TileKey};
use ado_core::fetch::DataFetcher;
use ado_core::index::DroughtIndex;
use ado_utils::dates::to_day_index;
use std::sync::Arc;

use crate::raster::RasterFetcher;

/// Prints layer changes instead of drawing them.
struct ConsoleMap;

impl MapSurface for ConsoleMap {
    fn add_raster_layer(&mut self, layer_id: &str, image: Arc<[u8]>, bounds: TileBounds) {
        println!(
            "{}: {} bytes over W {:.4} S {:.4} E {:.4} N {:.4}",
            layer_id,
            image.len(),
            bounds.west,
            bounds.south,
            bounds.east,
            bounds.north
        );
    }

    fn remove_layer(&mut self, layer_id: &str) {
        println!("{}: removed", layer_id);
    }
}

/// Show the tile of the week containing `day`, then wait for the
/// neighbouring weeks to be prefetched.
pub async fn run_tiles(raster_url: &str, index: &str, day: &str) -> anyhow::Result<()> {
    let index: DroughtIndex = index.parse()?;
    let key = TileKey::for_day(index, to_day_index(day)?)?;
    let cache = TileCache::new(RasterFetcher::new(DataFetcher::new(raster_url)?));

    let (tile, prefetches) = cache.show(&key).await?;
    let mut overlay = TileOverlay::new(ConsoleMap, &format!("hires-{}", key));
    overlay.show(&tile);

    for prefetch in prefetches {
        prefetch.await?;
    }
    for neighbor in key.neighbors() {
        let state = if cache.contains(&neighbor) { "cached" } else { "unavailable" };
        println!("{}: {}", neighbor, state);
    }
    println!("{} tiles cached", cache.len());
    Ok(())
}
