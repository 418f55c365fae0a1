//! Collaborator seams for roster data owned outside the engine

use crate::error::Result;
use crate::formula::ScoringWeights;
use crate::models::{LeagueId, LineupSlot, RosterId, RosterPlayer, RosterSummary};
use async_trait::async_trait;
use nhl_fetcher::{GameId, PlayerId};

/// Read-only view of fantasy rosters and league settings
#[async_trait]
pub trait RosterDirectory: Send + Sync {
    /// Active-lineup slots for any of the given players, across all leagues
    async fn active_lineup_slots(&self, player_ids: &[PlayerId]) -> Result<Vec<LineupSlot>>;

    /// League weights with per-weight default fallback applied
    async fn scoring_weights(&self, league_id: LeagueId) -> Result<ScoringWeights>;

    async fn roster_players(&self, roster_id: RosterId) -> Result<Vec<RosterPlayer>>;

    async fn league_rosters(&self, league_id: LeagueId) -> Result<Vec<RosterSummary>>;
}

/// Writes the engine makes back into roster data
#[async_trait]
pub trait RosterMutations: Send + Sync {
    /// Idempotent: recording the same start twice is a no-op
    async fn record_goalie_start(
        &self,
        roster_id: RosterId,
        player_id: PlayerId,
        game_id: GameId,
    ) -> Result<()>;
}
