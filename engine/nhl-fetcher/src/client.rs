use crate::cache::ResponseCache;
use crate::config::NhlApiConfig;
use crate::error::{FetchError, Result};
use crate::models::*;
use crate::rate_limiter::RateLimiter;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Client for the public NHL web API.
///
/// Every request goes through the response cache and the shared rate limiter. When the limiter
/// is exhausted, or the upstream call fails, a stale cached body is served if one exists.
pub struct NhlApiClient {
    config: NhlApiConfig,
    http: Client,
    cache: ResponseCache,
    limiter: RateLimiter,
}

impl NhlApiClient {
    pub fn new(config: NhlApiConfig) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        info!(
            "NHL API client targeting {} ({} requests / {} ms)",
            config.base_url, config.rate_limit.max_requests, config.rate_limit.window_ms
        );

        Ok(Self {
            cache: ResponseCache::new(config.cache.max_entries),
            limiter: RateLimiter::new(&config.rate_limit),
            http,
            config,
        })
    }

    pub fn config(&self) -> &NhlApiConfig {
        &self.config
    }

    /// Team abbreviations known to the client
    pub fn all_teams(&self) -> Vec<String> {
        self.config.teams.clone()
    }

    pub async fn team_schedule(&self, team: &str, season: &str) -> Result<Vec<ScheduledGame>> {
        let endpoint = format!("/club-schedule-season/{}/{}", team, season);
        let cache_key = format!("nhl:schedule:{}:{}", team, season);
        let raw: RawSchedule = self
            .fetch(&endpoint, &cache_key, self.config.cache.schedule_ttl_secs)
            .await?;

        Ok(raw
            .games
            .into_iter()
            .filter_map(RawScheduleGame::normalize)
            .collect())
    }

    /// Cumulative play-by-play for a game
    pub async fn game_events(&self, game_id: GameId) -> Result<Vec<PlayEvent>> {
        let endpoint = format!("/gamecenter/{}/play-by-play", game_id);
        let cache_key = format!("nhl:pbp:{}", game_id);
        let raw: RawPlayByPlay = self
            .fetch(&endpoint, &cache_key, self.config.cache.play_by_play_ttl_secs)
            .await?;

        Ok(raw.plays.into_iter().map(RawPlay::normalize).collect())
    }

    pub async fn boxscore(&self, game_id: GameId) -> Result<Boxscore> {
        let endpoint = format!("/gamecenter/{}/boxscore", game_id);
        let cache_key = format!("nhl:boxscore:{}", game_id);
        let raw: RawBoxscore = self
            .fetch(&endpoint, &cache_key, self.config.cache.boxscore_ttl_secs)
            .await?;

        Ok(raw.normalize(game_id))
    }

    pub async fn team_roster(&self, team: &str, season: &str) -> Result<TeamRoster> {
        let endpoint = format!("/roster/{}/{}", team, season);
        let cache_key = format!("nhl:roster:{}:{}", team, season);
        let raw: RawTeamRoster = self
            .fetch(&endpoint, &cache_key, self.config.cache.roster_ttl_secs)
            .await?;

        Ok(raw.normalize(team, season))
    }

    /// Team the player is currently rostered on, by scanning every club roster.
    ///
    /// A rate limit aborts the scan; other per-team failures are skipped.
    pub async fn player_team(&self, player_id: PlayerId, season: &str) -> Result<Option<String>> {
        for team in &self.config.teams {
            match self.team_roster(team, season).await {
                Ok(roster) if roster.contains(player_id) => return Ok(Some(team.clone())),
                Ok(_) => {}
                Err(e) if e.is_rate_limited() => return Err(e),
                Err(e) => warn!("Roster lookup for {} failed: {}", team, e),
            }
        }
        Ok(None)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        cache_key: &str,
        ttl_secs: u64,
    ) -> Result<T> {
        let body = self.fetch_json(endpoint, cache_key, ttl_secs).await?;
        serde_json::from_value(body).map_err(|source| FetchError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    async fn fetch_json(&self, endpoint: &str, cache_key: &str, ttl_secs: u64) -> Result<Value> {
        if let Some(body) = self.cache.get_fresh(cache_key, ttl_secs).await {
            debug!("Cache hit for {}", endpoint);
            return Ok(body);
        }

        if !self.limiter.try_acquire().await {
            warn!("Local rate limit exhausted before requesting {}", endpoint);
            return self
                .stale_or(
                    cache_key,
                    FetchError::RateLimited {
                        endpoint: endpoint.to_string(),
                        retry_after_secs: None,
                    },
                )
                .await;
        }

        match self.request(endpoint).await {
            Ok(body) => {
                self.cache.store(cache_key, body.clone()).await;
                Ok(body)
            }
            Err(e) => {
                warn!("Request to {} failed: {}", endpoint, e);
                self.stale_or(cache_key, e).await
            }
        }
    }

    async fn stale_or(&self, cache_key: &str, error: FetchError) -> Result<Value> {
        match self.cache.get_stale(cache_key).await {
            Some(body) => {
                info!("Serving stale cache for {}", cache_key);
                Ok(body)
            }
            None => Err(error),
        }
    }

    async fn request(&self, endpoint: &str) -> Result<Value> {
        let url = format!("{}{}", self.config.base_url, endpoint);
        debug!("GET {}", url);

        let response = self.http.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    endpoint: endpoint.to_string(),
                }
            } else {
                FetchError::Http(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(FetchError::RateLimited {
                endpoint: endpoint.to_string(),
                retry_after_secs,
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    endpoint: endpoint.to_string(),
                }
            } else {
                FetchError::Http(e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;

    fn offline_config() -> NhlApiConfig {
        NhlApiConfig {
            // Reserved TEST-NET address, nothing listens here
            base_url: "http://192.0.2.1:9".to_string(),
            timeout_secs: 1,
            rate_limit: RateLimitConfig {
                max_requests: 1,
                window_ms: 60_000,
            },
            ..NhlApiConfig::default()
        }
    }

    #[tokio::test]
    async fn test_exhausted_limiter_reports_rate_limited() {
        let client = NhlApiClient::new(offline_config()).unwrap();
        // Spend the only request in the window
        assert!(client.limiter.try_acquire().await);

        let err = client.boxscore(2024020001).await.unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn test_exhausted_limiter_serves_stale_cache() {
        let mut config = offline_config();
        config.cache.boxscore_ttl_secs = 0;
        let client = NhlApiClient::new(config).unwrap();
        assert!(client.limiter.try_acquire().await);
        client
            .cache
            .store(
                "nhl:boxscore:2024020001",
                serde_json::json!({ "id": 2024020001, "gameState": "OFF" }),
            )
            .await;

        let boxscore = client.boxscore(2024020001).await.unwrap();
        assert_eq!(boxscore.game_id, 2024020001);
        assert!(boxscore.status.is_final());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = NhlApiConfig::default();
        config.teams.clear();
        assert!(matches!(
            NhlApiClient::new(config),
            Err(FetchError::InvalidConfig { .. })
        ));
    }
}
