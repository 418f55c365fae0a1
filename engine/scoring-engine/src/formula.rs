//! Scoring formula
//!
//! Pure functions turning plays and stat lines into fantasy points under a league's weights.
//! The same `StatLine::points` is used for boxscore reconciliation and retroactive settlement.

use crate::models::EventKind;
use nhl_fetcher::{BoxscorePlayer, ParticipantRole};
use serde::{Deserialize, Serialize};

/// Resolved per-league weights, one per counted stat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringWeights {
    pub goals: f64,
    pub assists: f64,
    pub shots: f64,
    pub hits: f64,
    pub blocks: f64,
    pub pim: f64,
    pub plus_minus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            goals: 3.0,
            assists: 2.0,
            shots: 0.5,
            hits: 0.5,
            blocks: 0.5,
            pim: 0.25,
            plus_minus: 0.5,
        }
    }
}

/// League scoring overrides as stored in league settings.
///
/// Every weight is optional; a missing weight falls back to its default on its own, and an
/// explicit zero is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeagueScoring {
    pub goals: Option<f64>,
    pub assists: Option<f64>,
    pub shots: Option<f64>,
    pub hits: Option<f64>,
    pub blocks: Option<f64>,
    pub pim: Option<f64>,
    pub plus_minus: Option<f64>,
}

impl LeagueScoring {
    pub fn resolve(&self) -> ScoringWeights {
        let defaults = ScoringWeights::default();
        ScoringWeights {
            goals: self.goals.unwrap_or(defaults.goals),
            assists: self.assists.unwrap_or(defaults.assists),
            shots: self.shots.unwrap_or(defaults.shots),
            hits: self.hits.unwrap_or(defaults.hits),
            blocks: self.blocks.unwrap_or(defaults.blocks),
            pim: self.pim.unwrap_or(defaults.pim),
            plus_minus: self.plus_minus.unwrap_or(defaults.plus_minus),
        }
    }
}

impl From<LeagueScoring> for ScoringWeights {
    fn from(scoring: LeagueScoring) -> Self {
        scoring.resolve()
    }
}

/// Closed classification of upstream play types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayType {
    Goal,
    Assist,
    Shot,
    Hit,
    Block,
    Penalty,
    Unrecognized,
}

impl PlayType {
    /// Classify a raw upstream play type. Total: anything unknown is `Unrecognized`.
    pub fn classify(raw: &str) -> Self {
        let raw = raw.trim().to_ascii_lowercase();

        match raw.as_str() {
            "goal" => return PlayType::Goal,
            "shot-on-goal" | "missed-shot" => return PlayType::Shot,
            "blocked-shot" => return PlayType::Block,
            "hit" => return PlayType::Hit,
            "penalty" => return PlayType::Penalty,
            _ => {}
        }

        if raw.contains("block") {
            PlayType::Block
        } else if raw.contains("shot") {
            PlayType::Shot
        } else if raw.contains("goal") {
            PlayType::Goal
        } else if raw.contains("assist") {
            PlayType::Assist
        } else if raw.contains("hit") {
            PlayType::Hit
        } else if raw.contains("penalty") || raw.contains("pim") {
            PlayType::Penalty
        } else {
            PlayType::Unrecognized
        }
    }

    /// Play type credited to one participant of a play.
    ///
    /// Assisting players on a goal score an assist; passive participants score nothing.
    pub fn for_participant(raw: &str, role: ParticipantRole) -> Self {
        use ParticipantRole::*;

        match (Self::classify(raw), role) {
            (PlayType::Goal, Scorer | Player) => PlayType::Goal,
            (PlayType::Goal, Assist) => PlayType::Assist,
            (PlayType::Assist, Assist | Scorer | Player) => PlayType::Assist,
            (PlayType::Shot, Shooter | Player) => PlayType::Shot,
            (PlayType::Block, Blocker | Player) => PlayType::Block,
            (PlayType::Hit, Hitter | Player) => PlayType::Hit,
            (PlayType::Penalty, CommittedBy | Player) => PlayType::Penalty,
            _ => PlayType::Unrecognized,
        }
    }

    /// Ledger kind for a scoring play; `None` for `Unrecognized`
    pub fn event_kind(&self) -> Option<EventKind> {
        match self {
            PlayType::Goal => Some(EventKind::Goal),
            PlayType::Assist => Some(EventKind::Assist),
            PlayType::Shot => Some(EventKind::Shot),
            PlayType::Hit => Some(EventKind::Hit),
            PlayType::Block => Some(EventKind::Block),
            PlayType::Penalty => Some(EventKind::Penalty),
            PlayType::Unrecognized => None,
        }
    }
}

/// Points for a single play under the given weights
pub fn points_for_play(play: PlayType, weights: &ScoringWeights) -> f64 {
    match play {
        PlayType::Goal => weights.goals,
        PlayType::Assist => weights.assists,
        PlayType::Shot => weights.shots,
        PlayType::Hit => weights.hits,
        PlayType::Block => weights.blocks,
        PlayType::Penalty => weights.pim,
        PlayType::Unrecognized => 0.0,
    }
}

/// Full-game stat counters for one player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatLine {
    pub goals: i32,
    pub assists: i32,
    pub shots: i32,
    pub hits: i32,
    pub blocks: i32,
    pub pim: i32,
    pub plus_minus: i32,
}

impl StatLine {
    pub fn points(&self, weights: &ScoringWeights) -> f64 {
        self.goals as f64 * weights.goals
            + self.assists as f64 * weights.assists
            + self.shots as f64 * weights.shots
            + self.hits as f64 * weights.hits
            + self.blocks as f64 * weights.blocks
            + self.pim as f64 * weights.pim
            + self.plus_minus as f64 * weights.plus_minus
    }

    pub fn add(&mut self, other: &StatLine) {
        self.goals += other.goals;
        self.assists += other.assists;
        self.shots += other.shots;
        self.hits += other.hits;
        self.blocks += other.blocks;
        self.pim += other.pim;
        self.plus_minus += other.plus_minus;
    }

    /// Count one incremental event of the given kind
    pub fn count(&mut self, kind: EventKind) {
        match kind {
            EventKind::Goal => self.goals += 1,
            EventKind::Assist => self.assists += 1,
            EventKind::Shot => self.shots += 1,
            EventKind::Hit => self.hits += 1,
            EventKind::Block => self.blocks += 1,
            EventKind::Penalty => self.pim += 1,
            EventKind::BoxscoreReconciliation | EventKind::RetroactiveScoring => {}
        }
    }
}

impl From<&BoxscorePlayer> for StatLine {
    fn from(player: &BoxscorePlayer) -> Self {
        Self {
            goals: player.goals,
            assists: player.assists,
            shots: player.shots,
            hits: player.hits,
            blocks: player.blocks,
            pim: player.pim,
            plus_minus: player.plus_minus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_points_table() {
        let defaults = ScoringWeights::default();
        let custom = LeagueScoring {
            goals: Some(5.0),
            shots: Some(0.0),
            ..Default::default()
        }
        .resolve();

        let cases: &[(&str, &ScoringWeights, f64)] = &[
            ("goal", &defaults, 3.0),
            ("GOAL", &defaults, 3.0),
            ("shot-on-goal", &defaults, 0.5),
            ("missed-shot", &defaults, 0.5),
            ("blocked-shot", &defaults, 0.5),
            ("hit", &defaults, 0.5),
            ("penalty", &defaults, 0.25),
            ("major-penalty", &defaults, 0.25),
            ("assist", &defaults, 2.0),
            ("faceoff", &defaults, 0.0),
            ("stoppage", &defaults, 0.0),
            ("goal", &custom, 5.0),
            ("shot-on-goal", &custom, 0.0),
            ("hit", &custom, 0.5),
        ];

        for (raw, weights, expected) in cases {
            let points = points_for_play(PlayType::classify(raw), weights);
            assert_eq!(points, *expected, "play type {}", raw);
        }
    }

    #[test]
    fn test_shot_on_goal_is_a_shot() {
        assert_eq!(PlayType::classify("shot-on-goal"), PlayType::Shot);
        assert_eq!(PlayType::classify("blocked-shot"), PlayType::Block);
        assert_eq!(PlayType::classify(""), PlayType::Unrecognized);
    }

    #[test]
    fn test_participant_roles() {
        use ParticipantRole::*;

        assert_eq!(PlayType::for_participant("goal", Scorer), PlayType::Goal);
        assert_eq!(PlayType::for_participant("goal", Assist), PlayType::Assist);
        assert_eq!(PlayType::for_participant("goal", Goalie), PlayType::Unrecognized);
        assert_eq!(PlayType::for_participant("hit", Hitter), PlayType::Hit);
        assert_eq!(PlayType::for_participant("hit", Hittee), PlayType::Unrecognized);
        assert_eq!(PlayType::for_participant("blocked-shot", Blocker), PlayType::Block);
        assert_eq!(PlayType::for_participant("blocked-shot", Shooter), PlayType::Unrecognized);
        assert_eq!(PlayType::for_participant("penalty", CommittedBy), PlayType::Penalty);
        assert_eq!(PlayType::for_participant("penalty", DrawnBy), PlayType::Unrecognized);
        assert_eq!(PlayType::for_participant("penalty", ServedBy), PlayType::Unrecognized);
        assert_eq!(PlayType::for_participant("shot-on-goal", Goalie), PlayType::Unrecognized);
        assert_eq!(PlayType::for_participant("faceoff", FaceoffWinner), PlayType::Unrecognized);
    }

    #[test]
    fn test_missing_weights_fall_back_individually() {
        let scoring: LeagueScoring = serde_json::from_str(r#"{"goals": 4}"#).unwrap();
        let weights = scoring.resolve();

        assert_eq!(weights.goals, 4.0);
        assert_eq!(weights.assists, 2.0);
        assert_eq!(weights.plus_minus, 0.5);

        let zeroed: LeagueScoring = serde_json::from_str(r#"{"hits": 0}"#).unwrap();
        assert_eq!(zeroed.resolve().hits, 0.0);
    }

    #[test]
    fn test_stat_line_points() {
        let weights = ScoringWeights {
            goals: 3.0,
            assists: 2.0,
            shots: 0.5,
            ..ScoringWeights::default()
        };
        let line = StatLine {
            goals: 1,
            assists: 1,
            shots: 4,
            ..Default::default()
        };
        assert_eq!(line.points(&weights), 7.0);

        let negative = StatLine {
            plus_minus: -2,
            ..Default::default()
        };
        assert_eq!(negative.points(&weights), -1.0);
    }
}
