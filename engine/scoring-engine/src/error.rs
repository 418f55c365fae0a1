//! Error types for the scoring engine

use nhl_fetcher::FetchError;
use thiserror::Error;

/// Result type for scoring engine operations
pub type Result<T> = std::result::Result<T, ScoringError>;

/// Errors that can occur while scoring, reconciling or settling
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Upstream feed error: {0}")]
    Feed(#[from] FetchError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Roster directory error: {0}")]
    Collaborator(String),

    #[error("Unknown event kind: {0}")]
    UnknownEventKind(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScoringError {
    /// True when the upstream asked us to slow down
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ScoringError::Feed(e) if e.is_rate_limited())
    }
}

impl From<String> for ScoringError {
    fn from(err: String) -> Self {
        ScoringError::Internal(err)
    }
}

impl From<&str> for ScoringError {
    fn from(err: &str) -> Self {
        ScoringError::Internal(err.to_string())
    }
}
