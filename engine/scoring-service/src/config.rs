//! Service configuration management

use anyhow::{bail, Context, Result};
use nhl_fetcher::NhlApiConfig;
use scoring_engine::ScoringConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Postgres holding the ledger and the league tables
    pub database: DatabaseSettings,

    /// Redis live-update publisher
    pub redis: RedisSettings,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// NHL web API client configuration
    pub nhl: NhlApiConfig,

    /// Scheduler and lifecycle configuration
    pub scoring: ScoringConfig,

    /// Service-level settings
    pub service: ServiceSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    /// Publisher is disabled when unset
    pub url: Option<String>,
    pub channel: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or full filter directive (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
        }
    }
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: None,
            channel: "scoring:update".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: 10,
        }
    }
}

/// Load configuration from an optional env file, the process environment and `.env`
pub fn load_config(env_file: Option<&Path>) -> Result<ServiceConfig> {
    match env_file {
        Some(path) => {
            dotenv::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }

    let mut config = ServiceConfig {
        nhl: NhlApiConfig::from_env().context("Invalid NHL API configuration")?,
        scoring: ScoringConfig::from_env().context("Invalid scoring configuration")?,
        ..Default::default()
    };
    load_from_env(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Load service-level settings from environment variables
fn load_from_env(config: &mut ServiceConfig) -> Result<()> {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database.url = url;
    }

    if let Ok(max) = std::env::var("DATABASE_MAX_CONNECTIONS") {
        config.database.max_connections =
            max.parse().context("DATABASE_MAX_CONNECTIONS must be a number")?;
    }

    if let Ok(url) = std::env::var("REDIS_URL") {
        config.redis.url = Some(url).filter(|url| !url.is_empty());
    }

    if let Ok(level) = std::env::var("SCORING_LOG_LEVEL") {
        config.logging.level = level;
    }

    if let Ok(format) = std::env::var("SCORING_LOG_FORMAT") {
        config.logging.format = format;
    }

    if let Ok(secs) = std::env::var("SCORING_SHUTDOWN_TIMEOUT_SECS") {
        config.service.shutdown_timeout_secs =
            secs.parse().context("SCORING_SHUTDOWN_TIMEOUT_SECS must be a number")?;
    }

    Ok(())
}

/// Validate configuration
pub fn validate_config(config: &ServiceConfig) -> Result<()> {
    if config.database.url.is_empty() {
        bail!("DATABASE_URL must be set");
    }

    if config.database.max_connections == 0 {
        bail!("Database max_connections must be greater than 0");
    }

    if !matches!(config.logging.format.as_str(), "json" | "pretty" | "compact") {
        bail!(
            "Unknown log format '{}', expected json, pretty or compact",
            config.logging.format
        );
    }

    config.nhl.validate().context("Invalid NHL API configuration")?;
    config.scoring.validate().context("Invalid scoring configuration")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_config() -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.database.url = "postgres://localhost/scoring".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.redis.channel, "scoring:update");
        assert!(config.redis.url.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.service.shutdown_timeout_secs, 10);
    }

    #[test]
    fn test_validation() {
        tokio_test::assert_ok!(validate_config(&valid_config()));

        // No database
        tokio_test::assert_err!(validate_config(&ServiceConfig::default()));

        let mut config = valid_config();
        config.logging.format = "xml".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.scoring.poll_interval_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_env_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DATABASE_URL=postgres://localhost/from_file").unwrap();
        writeln!(file, "SCORING_DISCOVERY_SECS=900").unwrap();
        writeln!(file, "SCORING_LOG_FORMAT=json").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert!(!config.database.url.is_empty());
        assert_eq!(config.scoring.discovery_interval_secs, 900);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_missing_env_file() {
        assert!(load_config(Some(Path::new("/nonexistent/scoring.env"))).is_err());
    }
}
