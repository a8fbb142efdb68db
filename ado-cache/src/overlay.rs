use log::debug;
use std::sync::Arc;

use crate::tile::{Tile, TileBounds, TileKey};

/// The part of a map the overlay needs: one raster layer at a time.
pub trait MapSurface {
    fn add_raster_layer(&mut self, layer_id: &str, image: Arc<[u8]>, bounds: TileBounds);

    fn remove_layer(&mut self, layer_id: &str);
}

impl<T: MapSurface + ?Sized> MapSurface for &mut T {
    fn add_raster_layer(&mut self, layer_id: &str, image: Arc<[u8]>, bounds: TileBounds) {
        (**self).add_raster_layer(layer_id, image, bounds)
    }

    fn remove_layer(&mut self, layer_id: &str) {
        (**self).remove_layer(layer_id)
    }
}

/// Shows at most one high-resolution tile on a map surface.
///
/// Hiding or dropping the overlay detaches the layer from the map; the
/// tile itself stays in the [`crate::tile::TileCache`].
pub struct TileOverlay<M: MapSurface> {
    map: M,
    layer_id: String,
    shown: Option<TileKey>,
}

impl<M: MapSurface> TileOverlay<M> {
    pub fn new(map: M, layer_id: &str) -> Self {
        TileOverlay {
            map,
            layer_id: layer_id.to_string(),
            shown: None,
        }
    }

    pub fn shown(&self) -> Option<&TileKey> {
        self.shown.as_ref()
    }

    pub fn show(&mut self, tile: &Tile) {
        if self.shown.as_ref() == Some(&tile.key) {
            return;
        }
        self.hide();
        debug!("Showing tile {} as {}", tile.key, self.layer_id);
        self.map
            .add_raster_layer(&self.layer_id, Arc::clone(&tile.image), tile.bounds);
        self.shown = Some(tile.key.clone());
    }

    pub fn hide(&mut self) {
        if self.shown.take().is_some() {
            self.map.remove_layer(&self.layer_id);
        }
    }
}

impl<M: MapSurface> Drop for TileOverlay<M> {
    fn drop(&mut self) {
        self.hide();
    }
}
