use crate::error::ScoringError;
use crate::formula::StatLine;
use chrono::{DateTime, Utc};
use nhl_fetcher::{GameId, PlayerId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type RosterId = Uuid;
pub type LeagueId = Uuid;

/// Kind of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Goal,
    Assist,
    Shot,
    Hit,
    Block,
    Penalty,
    BoxscoreReconciliation,
    RetroactiveScoring,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Goal => "goal",
            EventKind::Assist => "assist",
            EventKind::Shot => "shot",
            EventKind::Hit => "hit",
            EventKind::Block => "block",
            EventKind::Penalty => "penalty",
            EventKind::BoxscoreReconciliation => "boxscore_reconciliation",
            EventKind::RetroactiveScoring => "retroactive_scoring",
        }
    }

    /// Produced from the live play-by-play feed
    pub fn is_incremental(&self) -> bool {
        !matches!(
            self,
            EventKind::BoxscoreReconciliation | EventKind::RetroactiveScoring
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "goal" => Ok(EventKind::Goal),
            "assist" => Ok(EventKind::Assist),
            "shot" => Ok(EventKind::Shot),
            "hit" => Ok(EventKind::Hit),
            "block" => Ok(EventKind::Block),
            "penalty" => Ok(EventKind::Penalty),
            "boxscore_reconciliation" => Ok(EventKind::BoxscoreReconciliation),
            "retroactive_scoring" => Ok(EventKind::RetroactiveScoring),
            other => Err(ScoringError::UnknownEventKind(other.to_string())),
        }
    }
}

/// Context stored alongside a ledger entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Raw upstream play type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub play_type: Option<String>,
    /// Full stat line behind a reconciliation or retroactive record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plus_minus: Option<i32>,
}

/// Append-only ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringEvent {
    pub id: Uuid,
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub roster_id: RosterId,
    pub league_id: LeagueId,
    pub event_kind: EventKind,
    pub idempotency_key: String,
    pub points_awarded: f64,
    pub event_detail: EventDetail,
    pub created_at: DateTime<Utc>,
}

impl ScoringEvent {
    pub fn new(
        slot: &LineupSlot,
        game_id: GameId,
        event_kind: EventKind,
        idempotency_key: String,
        points_awarded: f64,
        event_detail: EventDetail,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id,
            player_id: slot.player_id,
            roster_id: slot.roster_id,
            league_id: slot.league_id,
            event_kind,
            idempotency_key,
            points_awarded,
            event_detail,
            created_at: Utc::now(),
        }
    }
}

/// Result of an insert-if-absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// Deterministic idempotency keys, unique per (game, roster)
pub mod keys {
    use super::RosterId;
    use nhl_fetcher::{GameId, PlayerId};

    pub fn incremental(source_event_id: i64, player_id: PlayerId) -> String {
        format!("{}-{}", source_event_id, player_id)
    }

    pub fn reconciliation(game_id: GameId, player_id: PlayerId, roster_id: RosterId) -> String {
        format!("boxscore_{}_{}_{}", game_id, player_id, roster_id)
    }

    pub fn retroactive(game_id: GameId, player_id: PlayerId, roster_id: RosterId) -> String {
        format!("retroactive_{}_{}_{}", game_id, player_id, roster_id)
    }
}

/// One active-lineup slot for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineupSlot {
    pub roster_id: RosterId,
    pub league_id: LeagueId,
    pub player_id: PlayerId,
}

/// Lineup status of a rostered player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineupStatus {
    Active,
    Bench,
    Ir,
}

impl LineupStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "active" => LineupStatus::Active,
            "ir" => LineupStatus::Ir,
            _ => LineupStatus::Bench,
        }
    }
}

/// A player on a fantasy roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterPlayer {
    pub roster_id: RosterId,
    pub player_id: PlayerId,
    pub player_name: String,
    pub position: String,
    pub lineup_status: LineupStatus,
}

/// A fantasy roster within a league
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterSummary {
    pub roster_id: RosterId,
    pub league_id: LeagueId,
    pub name: String,
}

/// Point-delta published after every point-awarding write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsUpdate {
    pub league_id: LeagueId,
    pub roster_id: RosterId,
    pub player_id: PlayerId,
    pub game_id: GameId,
    pub event_kind: EventKind,
    pub points_awarded: f64,
    pub new_roster_total: f64,
}

/// Ledger query filter; `None` fields match everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub roster_id: Option<RosterId>,
    pub league_id: Option<LeagueId>,
    pub player_id: Option<PlayerId>,
    pub game_id: Option<GameId>,
}

impl EventFilter {
    pub fn roster(roster_id: RosterId) -> Self {
        Self {
            roster_id: Some(roster_id),
            ..Default::default()
        }
    }

    pub fn league(league_id: LeagueId) -> Self {
        Self {
            league_id: Some(league_id),
            ..Default::default()
        }
    }

    pub fn player(player_id: PlayerId) -> Self {
        Self {
            player_id: Some(player_id),
            ..Default::default()
        }
    }

    pub fn roster_player(roster_id: RosterId, player_id: PlayerId) -> Self {
        Self {
            roster_id: Some(roster_id),
            player_id: Some(player_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, event: &ScoringEvent) -> bool {
        self.roster_id.map_or(true, |id| event.roster_id == id)
            && self.league_id.map_or(true, |id| event.league_id == id)
            && self.player_id.map_or(true, |id| event.player_id == id)
            && self.game_id.map_or(true, |id| event.game_id == id)
    }
}

/// Which ledger records a game's points were taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsSource {
    Boxscore,
    Retroactive,
    Incremental,
}

/// Points and counters for one game of a player's breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameBreakdown {
    pub game_id: GameId,
    pub source: PointsSource,
    pub points: f64,
    pub stats: StatLine,
}

/// Per-player totals under the precedence rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsBreakdown {
    pub roster_id: RosterId,
    pub player_id: PlayerId,
    pub total_points: f64,
    pub stats: StatLine,
    pub games: Vec<GameBreakdown>,
}

/// A rostered player with their breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterPlayerPoints {
    pub player_id: PlayerId,
    pub player_name: String,
    pub position: String,
    pub lineup_status: LineupStatus,
    pub breakdown: StatsBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterStanding {
    pub roster_id: RosterId,
    pub name: String,
    pub total_points: f64,
}

/// Outcome counters for one periodic pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Games processed without error
    pub processed: usize,
    pub failed: usize,
    /// Games left for the next cycle after a rate limit
    pub skipped: usize,
    /// Ledger rows written
    pub inserted: usize,
    pub rate_limited: bool,
}

impl CycleReport {
    pub fn merge(&mut self, other: CycleReport) {
        self.processed += other.processed;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.inserted += other.inserted;
        self.rate_limited |= other.rate_limited;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_round_trip() {
        for kind in [
            EventKind::Goal,
            EventKind::Penalty,
            EventKind::BoxscoreReconciliation,
            EventKind::RetroactiveScoring,
        ] {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        assert!("faceoff".parse::<EventKind>().is_err());
        assert!(!EventKind::RetroactiveScoring.is_incremental());
        assert!(EventKind::Hit.is_incremental());
    }

    #[test]
    fn test_key_shapes() {
        let roster = Uuid::nil();
        assert_eq!(keys::incremental(52, 8478402), "52-8478402");
        assert_eq!(
            keys::reconciliation(2024020001, 8478402, roster),
            format!("boxscore_2024020001_8478402_{}", roster)
        );
        assert_eq!(
            keys::retroactive(2024020001, 8478402, roster),
            format!("retroactive_2024020001_8478402_{}", roster)
        );
    }

    #[test]
    fn test_event_detail_tolerates_unknown_json() {
        let detail: EventDetail =
            serde_json::from_value(serde_json::json!({ "period": 2, "extra": true })).unwrap();
        assert_eq!(detail.period, Some(2));
        assert_eq!(detail.stats, None);
    }
}
