//! Weekly high-resolution rasters over HTTP.

use ado_cache::geotiff::decode_bounds;
use ado_cache::tile::{TileBounds, TileError, TileKey, TileSource};
use ado_core::error::FetchError;
use ado_core::fetch::DataFetcher;

/// Root of the weekly raster tree.
pub const DEFAULT_RASTER_URL: &str =
    "https://raw.githubusercontent.com/Eurac-Research/ado-data/main/hires";

/// `{index}/{year}/{index}_{year}_w{week}.{extension}`, week zero-padded.
pub fn raster_path(key: &TileKey, extension: &str) -> String {
    format!(
        "{index}/{year}/{index}_{year}_w{week:02}.{extension}",
        index = key.index,
        year = key.year,
        week = key.week,
        extension = extension
    )
}

/// Georeferencing from the `.tif`, display image from the `.jpg`.
#[derive(Debug, Clone)]
pub struct RasterFetcher {
    fetcher: DataFetcher,
}

impl RasterFetcher {
    pub fn new(fetcher: DataFetcher) -> Self {
        RasterFetcher { fetcher }
    }

    async fn get(&self, key: &TileKey, extension: &str) -> Result<Vec<u8>, TileError> {
        self.fetcher
            .get_bytes(&raster_path(key, extension))
            .await
            .map_err(|e: FetchError| TileError::Fetch {
                key: key.to_string(),
                message: e.to_string(),
            })
    }
}

impl TileSource for RasterFetcher {
    async fn bounds(&self, key: &TileKey) -> Result<TileBounds, TileError> {
        let tif = self.get(key, "tif").await?;
        decode_bounds(&tif)
    }

    async fn image(&self, key: &TileKey) -> Result<Vec<u8>, TileError> {
        self.get(key, "jpg").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_raster_path_pads_week() {
        let key = TileKey::new("vhi".parse().unwrap(), 2023, 7);
        assert_eq!(raster_path(&key, "tif"), "vhi/2023/vhi_2023_w07.tif");
        let key = TileKey::new("sma".parse().unwrap(), 2022, 52);
        assert_eq!(raster_path(&key, "jpg"), "sma/2022/sma_2022_w52.jpg");
    }

    /// Local server answering every request with 404.
    async fn not_found_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        const NOT_FOUND: &[u8] =
            b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n";
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket.write_all(NOT_FOUND).await;
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_missing_raster_is_fetch_error() {
        let fetcher = DataFetcher::new(&not_found_server().await)
            .unwrap()
            .with_retries(1, Duration::from_millis(0));
        let source = RasterFetcher::new(fetcher);
        let key = TileKey::new("vhi".parse().unwrap(), 2023, 7);
        assert!(matches!(
            source.bounds(&key).await,
            Err(TileError::Fetch { .. })
        ));
    }
}
