//! Error types for the NHL fetcher

use thiserror::Error;

/// Result type for fetcher operations
pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("Upstream returned status {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("Rate limit exceeded for {endpoint}")]
    RateLimited {
        endpoint: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl FetchError {
    /// True when the caller should back off instead of retrying immediately
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }
}
