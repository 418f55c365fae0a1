//! Retroactive settlement for players added to a roster mid-season

use crate::error::Result;
use crate::feed::GameFeed;
use crate::formula::{ScoringWeights, StatLine};
use crate::ledger::LedgerWriter;
use crate::models::{
    keys, EventDetail, EventKind, InsertOutcome, LeagueId, LineupSlot, RosterId, ScoringEvent,
};
use crate::roster::RosterDirectory;
use chrono::{DateTime, Utc};
use nhl_fetcher::{season_for, GameId, PlayerId};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RetroactiveRequest {
    pub roster_id: RosterId,
    pub league_id: LeagueId,
    pub player_id: PlayerId,
    /// Games starting strictly before this instant are settled
    pub added_at: DateTime<Utc>,
    /// Falls back to the league's weights when absent
    pub weights: Option<ScoringWeights>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SettlementReport {
    pub player_team: Option<String>,
    pub games_considered: usize,
    pub settled: usize,
    pub duplicates: usize,
    /// Games the player appeared in without scoring
    pub zero_point_games: usize,
    pub failed: Vec<GameId>,
    pub points_awarded: f64,
}

pub struct RetroactiveSettler {
    feed: Arc<dyn GameFeed>,
    roster: Arc<dyn RosterDirectory>,
    writer: LedgerWriter,
}

impl RetroactiveSettler {
    pub fn new(feed: Arc<dyn GameFeed>, roster: Arc<dyn RosterDirectory>, writer: LedgerWriter) -> Self {
        Self {
            feed,
            roster,
            writer,
        }
    }

    /// Back-fill points for finished games the player's team played before the add.
    ///
    /// Per-game failures are logged and listed in the report; nothing already written is
    /// rolled back.
    pub async fn settle(&self, request: &RetroactiveRequest) -> Result<SettlementReport> {
        let season = season_for(request.added_at.date_naive());
        let mut report = SettlementReport::default();

        let Some(team) = self.feed.player_team(request.player_id, &season).await? else {
            warn!(
                "Player {} not found on any team for season {}, nothing to settle",
                request.player_id, season
            );
            return Ok(report);
        };
        report.player_team = Some(team.clone());

        let weights = match request.weights {
            Some(weights) => weights,
            None => self.roster.scoring_weights(request.league_id).await?,
        };

        let schedule = self.feed.team_schedule(&team, &season).await?;
        let games: Vec<GameId> = schedule
            .iter()
            .filter(|game| game.status.is_final() && game.starts_at() < request.added_at)
            .map(|game| game.game_id)
            .collect();
        report.games_considered = games.len();

        info!(
            "Settling {} past games for player {} ({}) on roster {}",
            games.len(),
            request.player_id,
            team,
            request.roster_id
        );

        let slot = LineupSlot {
            roster_id: request.roster_id,
            league_id: request.league_id,
            player_id: request.player_id,
        };

        for game_id in games {
            match self.settle_game(&slot, game_id, &weights).await {
                Ok(Some((InsertOutcome::Inserted, points))) => {
                    report.settled += 1;
                    report.points_awarded += points;
                }
                Ok(Some((InsertOutcome::Duplicate, _))) => report.duplicates += 1,
                Ok(None) => report.zero_point_games += 1,
                Err(e) => {
                    warn!(
                        "Retroactive settlement of game {} for player {} failed: {}",
                        game_id, request.player_id, e
                    );
                    report.failed.push(game_id);
                }
            }
        }

        info!(
            "Retroactive settlement for player {} on roster {}: {} settled ({:.2} pts), {} duplicates, {} failed",
            request.player_id,
            request.roster_id,
            report.settled,
            report.points_awarded,
            report.duplicates,
            report.failed.len()
        );
        Ok(report)
    }

    /// `None` when the player did not appear or scored nothing
    async fn settle_game(
        &self,
        slot: &LineupSlot,
        game_id: GameId,
        weights: &ScoringWeights,
    ) -> Result<Option<(InsertOutcome, f64)>> {
        let boxscore = self.feed.boxscore(game_id).await?;
        let Some(player) = boxscore.player(slot.player_id) else {
            debug!("Player {} did not appear in game {}", slot.player_id, game_id);
            return Ok(None);
        };

        let stats = StatLine::from(player);
        let points = stats.points(weights);
        if points == 0.0 {
            return Ok(None);
        }

        let event = ScoringEvent::new(
            slot,
            game_id,
            EventKind::RetroactiveScoring,
            keys::retroactive(game_id, slot.player_id, slot.roster_id),
            points,
            EventDetail {
                stats: Some(stats),
                ..Default::default()
            },
        );
        let outcome = self.writer.record(event).await?;
        Ok(Some((outcome, points)))
    }
}
