/// Error types for loading observatory data
use thiserror::Error;

/// Failure to obtain or understand one of the static data artifacts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// HTTP request could not be sent or the body could not be read
    #[error("HTTP request failed for {url}: {message}")]
    Http { url: String, message: String },

    /// Server answered with a non-2xx status
    #[error("Bad response status {status} for {url}")]
    Status { url: String, status: u16 },

    /// Body was fetched but is not the expected document
    #[error("Failed to decode {url}: {message}")]
    Decode { url: String, message: String },

    /// Every candidate location for an entity failed
    #[error("All candidate sources failed: {}", .0.join(", "))]
    AllCandidatesFailed(Vec<String>),

    /// Index id that cannot name a dataset
    #[error("Invalid drought index id: {0}")]
    InvalidIndex(String),

    /// Metadata without a usable first/last date
    #[error("Metadata for {0} has no valid date range")]
    MissingDateRange(String),
}

/// Type alias for Results using FetchError
pub type Result<T> = std::result::Result<T, FetchError>;
