//! HTTP client for the static-data repository.

use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{FetchError, Result};
use crate::feature::FeatureCollection;
use crate::index::DroughtIndex;
use crate::metadata::Metadata;
use crate::source::{
    region_timeseries_paths, station_report_paths, station_timeseries_paths, DataSource,
};
use crate::timeseries::TimeseriesPayload;

/// Root of the published NUTS artifacts.
pub const DEFAULT_BASE_URL: &str =
    "https://raw.githubusercontent.com/Eurac-Research/ado-data/main/json/nuts";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_TRIES: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);

/// Fetches artifacts relative to a base URL, retrying transient failures
/// with exponential backoff.
#[derive(Debug, Clone)]
pub struct DataFetcher {
    client: Client,
    base_url: String,
    max_tries: u32,
    initial_backoff: Duration,
}

impl DataFetcher {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Http {
                url: base_url.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        DataFetcher {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tries: MAX_TRIES,
            initial_backoff: INITIAL_BACKOFF,
        }
    }

    /// Override the retry policy. `max_tries` is clamped to at least one.
    pub fn with_retries(mut self, max_tries: u32, initial_backoff: Duration) -> Self {
        self.max_tries = max_tries.max(1);
        self.initial_backoff = initial_backoff;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_once(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await.map_err(|e| FetchError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await.map_err(|e| FetchError::Http {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(body.to_vec())
    }

    /// Fetch raw bytes, retrying network errors and server errors.
    /// Client errors (e.g. 404) fail immediately.
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.url_for(path);
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;
        loop {
            match self.get_once(&url).await {
                Ok(body) => {
                    debug!("Fetched {} ({} bytes)", url, body.len());
                    return Ok(body);
                }
                Err(e) => {
                    let retryable = match &e {
                        FetchError::Http { .. } => true,
                        FetchError::Status { status, .. } => {
                            *status >= StatusCode::INTERNAL_SERVER_ERROR.as_u16()
                        }
                        _ => false,
                    };
                    if !retryable || attempt >= self.max_tries {
                        warn!("Attempt {}/{} failed, giving up: {}", attempt, self.max_tries, e);
                        return Err(e);
                    }
                    warn!("Attempt {}/{} failed: {}", attempt, self.max_tries, e);
                    info!("Sleeping for {} milliseconds before retry", backoff.as_millis());
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
            }
        }
    }

    pub async fn get_text(&self, path: &str) -> Result<String> {
        let body = self.get_bytes(path).await?;
        String::from_utf8(body).map_err(|e| FetchError::Decode {
            url: self.url_for(path),
            message: e.to_string(),
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.get_bytes(path).await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
            url: self.url_for(path),
            message: e.to_string(),
        })
    }

    /// Try each candidate in priority order, returning the first success.
    pub async fn get_first_json<T: DeserializeOwned>(&self, paths: &[String]) -> Result<T> {
        let mut tried = Vec::with_capacity(paths.len());
        for path in paths {
            match self.get_json(path).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!("Candidate {} failed: {}", path, e);
                    tried.push(self.url_for(path));
                }
            }
        }
        Err(FetchError::AllCandidatesFailed(tried))
    }

    pub async fn get_first_text(&self, paths: &[String]) -> Result<String> {
        let mut tried = Vec::with_capacity(paths.len());
        for path in paths {
            match self.get_text(path).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!("Candidate {} failed: {}", path, e);
                    tried.push(self.url_for(path));
                }
            }
        }
        Err(FetchError::AllCandidatesFailed(tried))
    }
}

impl DataSource for DataFetcher {
    async fn latest_features(&self, index: &DroughtIndex) -> Result<FeatureCollection> {
        self.get_json(&index.latest_path()).await
    }

    async fn metadata(&self, index: &DroughtIndex) -> Result<Metadata> {
        self.get_json(&index.metadata_path()).await
    }

    async fn region_timeseries(&self, nuts_id: &str) -> Result<TimeseriesPayload> {
        self.get_first_json(&region_timeseries_paths(nuts_id)).await
    }

    async fn station_timeseries(&self, station_id: &str) -> Result<TimeseriesPayload> {
        self.get_first_json(&station_timeseries_paths(station_id)).await
    }

    async fn station_report(&self, station_id: &str) -> Result<String> {
        self.get_first_text(&station_report_paths(station_id)).await
    }
}
