//! End-of-game reconciliation against the authoritative boxscore

use crate::directory::GameDirectory;
use crate::error::Result;
use crate::feed::GameFeed;
use crate::formula::{ScoringWeights, StatLine};
use crate::ledger::LedgerWriter;
use crate::models::{keys, CycleReport, EventDetail, EventKind, InsertOutcome, LeagueId, ScoringEvent};
use crate::roster::{RosterDirectory, RosterMutations};
use nhl_fetcher::{GameId, PlayerId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameReconcileReport {
    pub game_id: GameId,
    /// The boxscore still reports the game in progress; nothing was written
    pub not_final: bool,
    pub players_listed: usize,
    pub slots: usize,
    pub inserted: usize,
    pub already_reconciled: usize,
    pub goalie_starts: usize,
}

pub struct BoxscoreReconciler {
    feed: Arc<dyn GameFeed>,
    roster: Arc<dyn RosterDirectory>,
    mutations: Arc<dyn RosterMutations>,
    writer: LedgerWriter,
}

impl BoxscoreReconciler {
    pub fn new(
        feed: Arc<dyn GameFeed>,
        roster: Arc<dyn RosterDirectory>,
        mutations: Arc<dyn RosterMutations>,
        writer: LedgerWriter,
    ) -> Self {
        Self {
            feed,
            roster,
            mutations,
            writer,
        }
    }

    /// Reconcile every finished game, counting a pass for each game reconciled cleanly
    pub async fn reconcile_finished_games(&self, directory: &GameDirectory) -> CycleReport {
        let games = directory.finished_games();
        let mut report = CycleReport::default();
        if games.is_empty() {
            return report;
        }
        debug!("Reconciling {} finished games", games.len());

        let total = games.len();
        for (index, game_id) in games.into_iter().enumerate() {
            match self.reconcile_game(game_id).await {
                Ok(game) => {
                    report.processed += 1;
                    report.inserted += game.inserted;
                    if !game.not_final {
                        directory.record_reconciliation_pass(game_id);
                    }
                }
                Err(e) if e.is_rate_limited() => {
                    warn!("Rate limited while reconciling game {}, backing off", game_id);
                    report.rate_limited = true;
                    report.skipped += total - index;
                    break;
                }
                Err(e) => {
                    error!("Error reconciling game {}: {}", game_id, e);
                    report.failed += 1;
                }
            }
        }

        if report.inserted > 0 {
            info!(
                "Reconcile cycle: {} games, {} reconciliation records",
                report.processed, report.inserted
            );
        }
        report
    }

    /// Write one reconciliation record per active (player, roster) pair in the boxscore
    pub async fn reconcile_game(&self, game_id: GameId) -> Result<GameReconcileReport> {
        let boxscore = self.feed.boxscore(game_id).await?;
        let mut report = GameReconcileReport {
            game_id,
            players_listed: boxscore.players.len(),
            ..Default::default()
        };

        if boxscore.status.is_in_progress() {
            warn!("Boxscore for game {} is not final yet, skipping", game_id);
            report.not_final = true;
            return Ok(report);
        }

        let player_ids: Vec<PlayerId> = boxscore.players.iter().map(|p| p.player_id).collect();
        let slots = self.roster.active_lineup_slots(&player_ids).await?;
        report.slots = slots.len();

        let existing = self.writer.store().existing_keys(game_id).await?;
        let mut weights_by_league: HashMap<LeagueId, ScoringWeights> = HashMap::new();

        for slot in &slots {
            let Some(player) = boxscore.player(slot.player_id) else {
                continue;
            };

            if player.played_in_net() {
                match self
                    .mutations
                    .record_goalie_start(slot.roster_id, slot.player_id, game_id)
                    .await
                {
                    Ok(()) => report.goalie_starts += 1,
                    Err(e) => warn!(
                        "Failed to record goalie start for player {} on roster {}: {}",
                        slot.player_id, slot.roster_id, e
                    ),
                }
            }

            let key = keys::reconciliation(game_id, slot.player_id, slot.roster_id);
            if existing.contains(&(slot.roster_id, key.clone())) {
                report.already_reconciled += 1;
                continue;
            }

            let weights = match weights_by_league.get(&slot.league_id) {
                Some(weights) => *weights,
                None => {
                    let weights = self.roster.scoring_weights(slot.league_id).await?;
                    weights_by_league.insert(slot.league_id, weights);
                    weights
                }
            };

            let stats = StatLine::from(player);
            // Written even at zero: the record supersedes the game's incremental events
            let event = ScoringEvent::new(
                slot,
                game_id,
                EventKind::BoxscoreReconciliation,
                key,
                stats.points(&weights),
                EventDetail {
                    stats: Some(stats),
                    ..Default::default()
                },
            );

            match self.writer.record(event).await? {
                InsertOutcome::Inserted => report.inserted += 1,
                InsertOutcome::Duplicate => report.already_reconciled += 1,
            }
        }

        debug!(
            "Reconciled game {}: {} records written, {} already present",
            game_id, report.inserted, report.already_reconciled
        );
        Ok(report)
    }
}
