//! Point-total queries over the ledger

use crate::error::Result;
use crate::formula::StatLine;
use crate::models::{
    EventFilter, EventKind, GameBreakdown, LeagueId, PointsSource, RosterId, RosterPlayerPoints,
    RosterStanding, ScoringEvent, StatsBreakdown,
};
use crate::roster::RosterDirectory;
use crate::store::EventStore;
use nhl_fetcher::{GameId, PlayerId};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct Aggregator {
    store: Arc<dyn EventStore>,
    roster: Arc<dyn RosterDirectory>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn EventStore>, roster: Arc<dyn RosterDirectory>) -> Self {
        Self { store, roster }
    }

    pub async fn roster_total_points(&self, roster_id: RosterId) -> Result<f64> {
        self.store.total_points(EventFilter::roster(roster_id)).await
    }

    /// Across every roster that fields the player
    pub async fn player_total_points(&self, player_id: PlayerId) -> Result<f64> {
        self.store.total_points(EventFilter::player(player_id)).await
    }

    pub async fn player_points_in_roster(&self, roster_id: RosterId, player_id: PlayerId) -> Result<f64> {
        self.store
            .total_points(EventFilter::roster_player(roster_id, player_id))
            .await
    }

    pub async fn stats_breakdown(&self, roster_id: RosterId, player_id: PlayerId) -> Result<StatsBreakdown> {
        let events = self
            .store
            .events(EventFilter::roster_player(roster_id, player_id))
            .await?;
        Ok(breakdown(roster_id, player_id, &events))
    }

    /// Breakdown for every rostered player, highest total first
    pub async fn roster_player_points(&self, roster_id: RosterId) -> Result<Vec<RosterPlayerPoints>> {
        let players = self.roster.roster_players(roster_id).await?;
        let events = self.store.events(EventFilter::roster(roster_id)).await?;

        let mut points: Vec<RosterPlayerPoints> = players
            .into_iter()
            .map(|player| {
                let player_events: Vec<ScoringEvent> = events
                    .iter()
                    .filter(|e| e.player_id == player.player_id)
                    .cloned()
                    .collect();
                RosterPlayerPoints {
                    breakdown: breakdown(roster_id, player.player_id, &player_events),
                    player_id: player.player_id,
                    player_name: player.player_name,
                    position: player.position,
                    lineup_status: player.lineup_status,
                }
            })
            .collect();

        points.sort_by(|a, b| descending(a.breakdown.total_points, b.breakdown.total_points));
        Ok(points)
    }

    /// Ledger total per roster in the league, highest first
    pub async fn league_scoring_summary(&self, league_id: LeagueId) -> Result<Vec<RosterStanding>> {
        let rosters = self.roster.league_rosters(league_id).await?;
        let events = self.store.events(EventFilter::league(league_id)).await?;

        let mut standings: Vec<RosterStanding> = rosters
            .into_iter()
            .map(|roster| RosterStanding {
                total_points: events
                    .iter()
                    .filter(|e| e.roster_id == roster.roster_id)
                    .fold(0.0, |total, e| total + e.points_awarded),
                roster_id: roster.roster_id,
                name: roster.name,
            })
            .collect();

        standings.sort_by(|a, b| descending(a.total_points, b.total_points));
        Ok(standings)
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Per-game precedence: a boxscore reconciliation record is the sole source for its game,
/// then a retroactive record, then the incremental events summed.
pub fn breakdown(roster_id: RosterId, player_id: PlayerId, events: &[ScoringEvent]) -> StatsBreakdown {
    let mut by_game: BTreeMap<GameId, Vec<&ScoringEvent>> = BTreeMap::new();
    for event in events {
        by_game.entry(event.game_id).or_default().push(event);
    }

    let mut total = StatsBreakdown {
        roster_id,
        player_id,
        total_points: 0.0,
        stats: StatLine::default(),
        games: Vec::with_capacity(by_game.len()),
    };

    for (game_id, game_events) in by_game {
        let settled = |kind: EventKind| game_events.iter().find(|e| e.event_kind == kind);

        let game = if let Some(record) = settled(EventKind::BoxscoreReconciliation) {
            GameBreakdown {
                game_id,
                source: PointsSource::Boxscore,
                points: record.points_awarded,
                stats: record.event_detail.stats.unwrap_or_default(),
            }
        } else if let Some(record) = settled(EventKind::RetroactiveScoring) {
            GameBreakdown {
                game_id,
                source: PointsSource::Retroactive,
                points: record.points_awarded,
                stats: record.event_detail.stats.unwrap_or_default(),
            }
        } else {
            let mut stats = StatLine::default();
            let mut points = 0.0;
            for event in &game_events {
                points += event.points_awarded;
                stats.count(event.event_kind);
                if let Some(plus_minus) = event.event_detail.plus_minus {
                    stats.plus_minus += plus_minus;
                }
            }
            GameBreakdown {
                game_id,
                source: PointsSource::Incremental,
                points,
                stats,
            }
        };

        total.total_points += game.points;
        total.stats.add(&game.stats);
        total.games.push(game);
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{keys, EventDetail, LineupSlot};
    use uuid::Uuid;

    fn slot() -> LineupSlot {
        LineupSlot {
            roster_id: Uuid::new_v4(),
            league_id: Uuid::new_v4(),
            player_id: 8478402,
        }
    }

    fn incremental(slot: &LineupSlot, game_id: GameId, event_id: i64, kind: EventKind, points: f64) -> ScoringEvent {
        ScoringEvent::new(
            slot,
            game_id,
            kind,
            keys::incremental(event_id, slot.player_id),
            points,
            EventDetail::default(),
        )
    }

    fn settled(slot: &LineupSlot, game_id: GameId, kind: EventKind, stats: StatLine, points: f64) -> ScoringEvent {
        ScoringEvent::new(
            slot,
            game_id,
            kind,
            keys::reconciliation(game_id, slot.player_id, slot.roster_id),
            points,
            EventDetail {
                stats: Some(stats),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_reconciliation_supersedes_incremental() {
        let slot = slot();
        let stats = StatLine {
            goals: 1,
            assists: 1,
            shots: 4,
            ..Default::default()
        };
        let events = vec![
            incremental(&slot, 1, 10, EventKind::Goal, 3.0),
            incremental(&slot, 1, 11, EventKind::Shot, 0.5),
            settled(&slot, 1, EventKind::BoxscoreReconciliation, stats, 7.0),
            incremental(&slot, 2, 10, EventKind::Hit, 0.5),
        ];

        let result = breakdown(slot.roster_id, slot.player_id, &events);
        assert_eq!(result.total_points, 7.5);
        assert_eq!(result.stats.goals, 1);
        assert_eq!(result.stats.shots, 4);
        assert_eq!(result.stats.hits, 1);
        assert_eq!(result.games.len(), 2);
        assert_eq!(result.games[0].source, PointsSource::Boxscore);
        assert_eq!(result.games[1].source, PointsSource::Incremental);
    }

    #[test]
    fn test_retroactive_is_sole_source_without_reconciliation() {
        let slot = slot();
        let stats = StatLine {
            goals: 2,
            ..Default::default()
        };
        let events = vec![
            settled(&slot, 5, EventKind::RetroactiveScoring, stats, 6.0),
            incremental(&slot, 5, 3, EventKind::Goal, 3.0),
        ];

        let result = breakdown(slot.roster_id, slot.player_id, &events);
        assert_eq!(result.total_points, 6.0);
        assert_eq!(result.stats.goals, 2);
        assert_eq!(result.games[0].source, PointsSource::Retroactive);
    }

    #[test]
    fn test_incremental_counters_and_plus_minus() {
        let slot = slot();
        let mut penalty = incremental(&slot, 9, 4, EventKind::Penalty, 0.25);
        penalty.event_detail.plus_minus = Some(-1);
        let events = vec![incremental(&slot, 9, 1, EventKind::Block, 0.5), penalty];

        let result = breakdown(slot.roster_id, slot.player_id, &events);
        assert_eq!(result.total_points, 0.75);
        assert_eq!(result.stats.blocks, 1);
        assert_eq!(result.stats.pim, 1);
        assert_eq!(result.stats.plus_minus, -1);
    }

    #[test]
    fn test_empty_ledger() {
        let result = breakdown(Uuid::nil(), 1, &[]);
        assert_eq!(result.total_points, 0.0);
        assert!(result.games.is_empty());
    }
}
