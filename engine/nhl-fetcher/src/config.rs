use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::error::{FetchError, Result};

/// Configuration for the NHL API client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NhlApiConfig {
    /// Base URL of the NHL web API
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Outbound rate limiting
    pub rate_limit: RateLimitConfig,

    /// Response cache configuration
    pub cache: CacheConfig,

    /// Team abbreviations enumerated during discovery and player lookups
    pub teams: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests inside one window
    pub max_requests: u32,

    /// Window length in milliseconds
    pub window_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Play-by-play TTL in seconds
    pub play_by_play_ttl_secs: u64,

    /// Boxscore TTL in seconds
    pub boxscore_ttl_secs: u64,

    /// Team schedule TTL in seconds
    pub schedule_ttl_secs: u64,

    /// Team roster TTL in seconds
    pub roster_ttl_secs: u64,

    /// Maximum number of cached responses
    pub max_entries: usize,
}

const NHL_TEAMS: [&str; 32] = [
    "ana", "ari", "bos", "buf", "car", "cbj", "cgy", "chi", "col", "dal", "det", "edm", "fla",
    "lak", "min", "mtl", "nsh", "nj", "nyi", "nyr", "ott", "phi", "pit", "sea", "sj", "stl", "tb",
    "tor", "van", "vgk", "wsh", "wpg",
];

impl Default for NhlApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-web.nhle.com/v1".to_string(),
            timeout_secs: 10,
            rate_limit: RateLimitConfig {
                max_requests: 100,
                window_ms: 60_000,
            },
            cache: CacheConfig {
                play_by_play_ttl_secs: 10,
                boxscore_ttl_secs: 60,
                schedule_ttl_secs: 3600,
                roster_ttl_secs: 3600,
                max_entries: 2048,
            },
            teams: NHL_TEAMS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl NhlApiConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(base_url) = std::env::var("NHL_API_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }

        if let Some(timeout) = env_setting("NHL_API_TIMEOUT_SECS")? {
            config.timeout_secs = timeout;
        }

        if let Some(requests) = env_setting("NHL_API_RATE_LIMIT_REQUESTS")? {
            config.rate_limit.max_requests = requests;
        }

        if let Some(window) = env_setting("NHL_API_RATE_LIMIT_WINDOW_MS")? {
            config.rate_limit.window_ms = window;
        }

        if let Some(ttl) = env_setting("CACHE_TTL_PLAY_BY_PLAY")? {
            config.cache.play_by_play_ttl_secs = ttl;
        }

        if let Some(ttl) = env_setting("CACHE_TTL_BOXSCORE")? {
            config.cache.boxscore_ttl_secs = ttl;
        }

        if let Some(ttl) = env_setting("CACHE_TTL_SCHEDULE")? {
            config.cache.schedule_ttl_secs = ttl;
        }

        if let Some(ttl) = env_setting("CACHE_TTL_ROSTER")? {
            config.cache.roster_ttl_secs = ttl;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(FetchError::InvalidConfig {
                message: "base_url must not be empty".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(FetchError::InvalidConfig {
                message: "timeout_secs must be positive".to_string(),
            });
        }
        if self.rate_limit.max_requests == 0 || self.rate_limit.window_ms == 0 {
            return Err(FetchError::InvalidConfig {
                message: "rate limit requires a positive request count and window".to_string(),
            });
        }
        if self.teams.is_empty() {
            return Err(FetchError::InvalidConfig {
                message: "at least one team is required".to_string(),
            });
        }
        Ok(())
    }
}

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
    raw.trim().parse().map_err(|e| FetchError::InvalidConfig {
        message: format!("{} must be a number, got '{}': {}", name, raw, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = NhlApiConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.teams.len(), 32);
        assert_eq!(config.cache.play_by_play_ttl_secs, 10);
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let mut config = NhlApiConfig::default();
        config.rate_limit.max_requests = 0;
        assert!(matches!(config.validate(), Err(FetchError::InvalidConfig { .. })));
    }

    #[test]
    fn test_malformed_ttl_rejected() {
        assert_eq!(parse_setting::<u64>("CACHE_TTL_BOXSCORE", "30").unwrap(), 30);
        assert!(matches!(
            parse_setting::<u64>("CACHE_TTL_BOXSCORE", "1m"),
            Err(FetchError::InvalidConfig { message }) if message.contains("CACHE_TTL_BOXSCORE")
        ));
    }
}
