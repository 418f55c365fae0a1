//! Incremental scoring from the live play-by-play feed

use crate::directory::GameDirectory;
use crate::error::Result;
use crate::feed::GameFeed;
use crate::formula::{points_for_play, PlayType, ScoringWeights};
use crate::ledger::LedgerWriter;
use crate::models::{
    keys, CycleReport, EventDetail, InsertOutcome, LeagueId, LineupSlot, ScoringEvent,
};
use crate::roster::RosterDirectory;
use futures::stream::{self, StreamExt};
use nhl_fetcher::{GameId, PlayEvent, PlayerId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameIngestReport {
    pub game_id: GameId,
    pub events_seen: usize,
    /// Scoring (event, player) pairs fielded by a roster that has not recorded them
    pub candidates: usize,
    /// The same pairs already in that roster's ledger
    pub already_recorded: usize,
    pub inserted: usize,
    pub duplicates: usize,
}

/// A scoring play for one participant, pending lineup lookup
struct Candidate<'a> {
    key: String,
    player_id: PlayerId,
    play: PlayType,
    event: &'a PlayEvent,
}

pub struct EventIngestor {
    feed: Arc<dyn GameFeed>,
    roster: Arc<dyn RosterDirectory>,
    writer: LedgerWriter,
    max_concurrent_games: usize,
}

impl EventIngestor {
    pub fn new(
        feed: Arc<dyn GameFeed>,
        roster: Arc<dyn RosterDirectory>,
        writer: LedgerWriter,
        max_concurrent_games: usize,
    ) -> Self {
        Self {
            feed,
            roster,
            writer,
            max_concurrent_games: max_concurrent_games.max(1),
        }
    }

    /// Process every active game once. A rate limit stops the rest of the cycle.
    pub async fn poll_active_games(&self, directory: &GameDirectory) -> CycleReport {
        let games = directory.active_games();
        if games.is_empty() {
            return CycleReport::default();
        }
        debug!("Polling {} active games", games.len());

        let rate_limited = AtomicBool::new(false);
        let outcomes: Vec<Option<Result<GameIngestReport>>> = stream::iter(games)
            .map(|game_id| {
                let rate_limited = &rate_limited;
                async move {
                    if rate_limited.load(Ordering::Relaxed) {
                        return None;
                    }
                    let outcome = self.process_game_events(game_id).await;
                    if let Err(e) = &outcome {
                        if e.is_rate_limited() {
                            rate_limited.store(true, Ordering::Relaxed);
                            warn!("Rate limited while polling game {}, backing off", game_id);
                        } else {
                            error!("Error polling game {}: {}", game_id, e);
                        }
                    }
                    Some(outcome)
                }
            })
            .buffer_unordered(self.max_concurrent_games)
            .collect()
            .await;

        let mut report = CycleReport::default();
        for outcome in outcomes {
            match outcome {
                None => report.skipped += 1,
                Some(Ok(game)) => {
                    report.processed += 1;
                    report.inserted += game.inserted;
                }
                Some(Err(e)) if e.is_rate_limited() => report.skipped += 1,
                Some(Err(_)) => report.failed += 1,
            }
        }
        report.rate_limited = rate_limited.load(Ordering::Relaxed);

        if report.inserted > 0 {
            info!(
                "Poll cycle: {} games, {} scoring events recorded",
                report.processed, report.inserted
            );
        }
        report
    }

    /// Score every (event, player) pair of a game's cumulative feed that some fielding roster
    /// has not recorded yet
    pub async fn process_game_events(&self, game_id: GameId) -> Result<GameIngestReport> {
        let events = self.feed.game_events(game_id).await?;

        let mut report = GameIngestReport {
            game_id,
            events_seen: events.len(),
            ..Default::default()
        };

        let mut candidates = Vec::new();
        for event in &events {
            for participant in &event.players {
                let play = PlayType::for_participant(&event.event_type, participant.role);
                if play == PlayType::Unrecognized {
                    continue;
                }
                candidates.push(Candidate {
                    key: keys::incremental(event.event_id, participant.player_id),
                    player_id: participant.player_id,
                    play,
                    event,
                });
            }
        }
        if candidates.is_empty() {
            return Ok(report);
        }

        let player_ids: Vec<PlayerId> = candidates
            .iter()
            .map(|c| c.player_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let slots = self.roster.active_lineup_slots(&player_ids).await?;
        if slots.is_empty() {
            return Ok(report);
        }

        let mut slots_by_player: HashMap<PlayerId, Vec<LineupSlot>> = HashMap::new();
        for slot in slots {
            slots_by_player.entry(slot.player_id).or_default().push(slot);
        }

        // Keyed per roster so a cycle that failed partway is finished by the next one
        let existing = self.writer.store().existing_keys(game_id).await?;

        let mut weights_by_league: HashMap<LeagueId, ScoringWeights> = HashMap::new();
        for candidate in &candidates {
            let Some(slots) = slots_by_player.get(&candidate.player_id) else {
                continue;
            };
            let Some(kind) = candidate.play.event_kind() else {
                continue;
            };

            for slot in slots {
                if existing.contains(&(slot.roster_id, candidate.key.clone())) {
                    report.already_recorded += 1;
                    continue;
                }
                report.candidates += 1;

                let weights = match weights_by_league.get(&slot.league_id) {
                    Some(weights) => *weights,
                    None => {
                        let weights = self.roster.scoring_weights(slot.league_id).await?;
                        weights_by_league.insert(slot.league_id, weights);
                        weights
                    }
                };

                let points = points_for_play(candidate.play, &weights);
                if points == 0.0 {
                    continue;
                }

                let event = ScoringEvent::new(
                    slot,
                    game_id,
                    kind,
                    candidate.key.clone(),
                    points,
                    EventDetail {
                        period: candidate.event.period,
                        clock: candidate.event.clock.clone(),
                        description: candidate.event.description.clone(),
                        play_type: Some(candidate.event.event_type.clone()),
                        ..Default::default()
                    },
                );

                match self.writer.record(event).await? {
                    InsertOutcome::Inserted => {
                        report.inserted += 1;
                        debug!(
                            "Game {}: {} {} pts to roster {} for player {}",
                            game_id, kind, points, slot.roster_id, slot.player_id
                        );
                    }
                    InsertOutcome::Duplicate => report.duplicates += 1,
                }
            }
        }

        Ok(report)
    }
}
