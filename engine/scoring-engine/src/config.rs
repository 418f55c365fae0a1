use crate::directory::DirectoryPolicy;
use crate::error::{Result, ScoringError};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Configuration for the periodic scoring tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Incremental poll interval for active games
    pub poll_interval_secs: u64,

    /// Boxscore reconciliation interval for finished games
    pub reconcile_interval_secs: u64,

    /// Schedule discovery interval
    pub discovery_interval_secs: u64,

    /// Games polled concurrently within one cycle
    pub max_concurrent_games: usize,

    /// Reconciliation passes before a finished game is retired
    pub max_reconcile_passes: u32,

    /// Hours a retired game stays in the directory
    pub retention_hours: i64,

    /// Live update bus capacity
    pub bus_capacity: usize,

    /// Backoff applied after a rate-limited cycle
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Initial backoff in seconds
    pub initial_delay_secs: u64,

    /// Maximum backoff in seconds
    pub max_delay_secs: u64,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            reconcile_interval_secs: 300,
            discovery_interval_secs: 3600,
            max_concurrent_games: 4,
            max_reconcile_passes: 12,
            retention_hours: 48,
            bus_capacity: 1024,
            retry: RetryConfig {
                initial_delay_secs: 30,
                max_delay_secs: 600,
                backoff_multiplier: 2.0,
            },
        }
    }
}

impl ScoringConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(secs) = env_setting("SCORING_POLL_SECS")? {
            config.poll_interval_secs = secs;
        }

        if let Some(secs) = env_setting("SCORING_RECONCILE_SECS")? {
            config.reconcile_interval_secs = secs;
        }

        if let Some(secs) = env_setting("SCORING_DISCOVERY_SECS")? {
            config.discovery_interval_secs = secs;
        }

        if let Some(games) = env_setting("SCORING_MAX_CONCURRENT_GAMES")? {
            config.max_concurrent_games = games;
        }

        if let Some(passes) = env_setting("SCORING_MAX_RECONCILE_PASSES")? {
            config.max_reconcile_passes = passes;
        }

        if let Some(hours) = env_setting("SCORING_RETENTION_HOURS")? {
            config.retention_hours = hours;
        }

        if let Some(capacity) = env_setting("SCORING_BUS_CAPACITY")? {
            config.bus_capacity = capacity;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0
            || self.reconcile_interval_secs == 0
            || self.discovery_interval_secs == 0
        {
            return Err(ScoringError::Configuration(
                "task intervals must be positive".to_string(),
            ));
        }
        if self.max_concurrent_games == 0 {
            return Err(ScoringError::Configuration(
                "max_concurrent_games must be positive".to_string(),
            ));
        }
        if self.max_reconcile_passes == 0 {
            return Err(ScoringError::Configuration(
                "max_reconcile_passes must be positive".to_string(),
            ));
        }
        if self.retention_hours <= 0 {
            return Err(ScoringError::Configuration(
                "retention_hours must be positive".to_string(),
            ));
        }
        if self.bus_capacity == 0 {
            return Err(ScoringError::Configuration(
                "bus_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn directory_policy(&self) -> DirectoryPolicy {
        DirectoryPolicy {
            max_reconcile_passes: self.max_reconcile_passes,
            retention: chrono::Duration::hours(self.retention_hours),
        }
    }
}

/// Read a numeric variable; a present but malformed value is an error rather than the default
fn env_setting<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => parse_setting(name, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_setting<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|e| {
        ScoringError::Configuration(format!("{} must be a number, got '{}': {}", name, raw, e))
    })
}
