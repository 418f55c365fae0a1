//! Upstream game data seam

use async_trait::async_trait;
use nhl_fetcher::{
    Boxscore, GameId, NhlApiClient, PlayEvent, PlayerId, Result as FetchResult, ScheduledGame,
};

/// Schedules, play-by-play, boxscores and player lookups from the sports-data provider
#[async_trait]
pub trait GameFeed: Send + Sync {
    fn all_teams(&self) -> Vec<String>;

    async fn team_schedule(&self, team: &str, season: &str) -> FetchResult<Vec<ScheduledGame>>;

    /// Cumulative event list for a game
    async fn game_events(&self, game_id: GameId) -> FetchResult<Vec<PlayEvent>>;

    async fn boxscore(&self, game_id: GameId) -> FetchResult<Boxscore>;

    async fn player_team(&self, player_id: PlayerId, season: &str) -> FetchResult<Option<String>>;
}

#[async_trait]
impl GameFeed for NhlApiClient {
    fn all_teams(&self) -> Vec<String> {
        NhlApiClient::all_teams(self)
    }

    async fn team_schedule(&self, team: &str, season: &str) -> FetchResult<Vec<ScheduledGame>> {
        NhlApiClient::team_schedule(self, team, season).await
    }

    async fn game_events(&self, game_id: GameId) -> FetchResult<Vec<PlayEvent>> {
        NhlApiClient::game_events(self, game_id).await
    }

    async fn boxscore(&self, game_id: GameId) -> FetchResult<Boxscore> {
        NhlApiClient::boxscore(self, game_id).await
    }

    async fn player_team(&self, player_id: PlayerId, season: &str) -> FetchResult<Option<String>> {
        NhlApiClient::player_team(self, player_id, season).await
    }
}
