use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type GameId = i64;
pub type PlayerId = i64;

/// Lifecycle status reported by the schedule, play-by-play and boxscore endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    Scheduled,
    PreGame,
    Live,
    Final,
    Unknown,
}

impl GameStatus {
    /// Map the upstream `gameState` vocabulary onto a status
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "FUT" => GameStatus::Scheduled,
            "PRE" | "PREVIEW" | "PRE_GAME" => GameStatus::PreGame,
            "LIVE" | "CRIT" | "IN_PROGRESS" => GameStatus::Live,
            "OFF" | "FINAL" | "FINAL_OT" | "FINAL_SO" => GameStatus::Final,
            _ => GameStatus::Unknown,
        }
    }

    /// Live or pre-game: the game should be polled for incremental events
    pub fn is_in_progress(&self) -> bool {
        matches!(self, GameStatus::PreGame | GameStatus::Live)
    }

    pub fn is_final(&self) -> bool {
        matches!(self, GameStatus::Final)
    }
}

/// NHL season string for a calendar date, e.g. `20242025`.
///
/// Seasons start in October; January through September belong to the season that began
/// the previous autumn.
pub fn season_for(date: NaiveDate) -> String {
    let year = date.year();
    if date.month() >= 10 {
        format!("{}{}", year, year + 1)
    } else {
        format!("{}{}", year - 1, year)
    }
}

// ---------------------------------------------------------------------------
// Normalized models
// ---------------------------------------------------------------------------

/// One game from a team schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledGame {
    pub game_id: GameId,
    pub game_date: NaiveDate,
    pub status: GameStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub home_team: String,
    pub away_team: String,
}

impl ScheduledGame {
    /// Puck drop, falling back to midnight UTC of the game date when the schedule omits it
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.start_time.unwrap_or_else(|| {
            self.game_date
                .and_hms_opt(0, 0, 0)
                .unwrap_or_default()
                .and_utc()
        })
    }
}

/// How a player took part in a play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Scorer,
    Assist,
    Shooter,
    Goalie,
    Hitter,
    Hittee,
    Blocker,
    CommittedBy,
    DrawnBy,
    ServedBy,
    FaceoffWinner,
    FaceoffLoser,
    Player,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub player_id: PlayerId,
    pub role: ParticipantRole,
}

/// One play from the cumulative play-by-play feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayEvent {
    /// Upstream event id, unique within its game
    pub event_id: i64,
    /// Raw upstream play type, e.g. `shot-on-goal`
    pub event_type: String,
    pub period: Option<u32>,
    pub clock: Option<String>,
    pub description: Option<String>,
    pub players: Vec<Participant>,
}

/// One player's line from a boxscore
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxscorePlayer {
    pub player_id: PlayerId,
    pub name: String,
    pub position: String,
    pub team: String,
    pub goals: i32,
    pub assists: i32,
    pub shots: i32,
    pub hits: i32,
    pub blocks: i32,
    pub pim: i32,
    pub plus_minus: i32,
    pub shots_against: Option<i32>,
    pub saves: Option<i32>,
}

impl BoxscorePlayer {
    pub fn is_goalie(&self) -> bool {
        self.position.eq_ignore_ascii_case("G")
    }

    /// A goalie who faced or stopped at least one shot is credited with the start
    pub fn played_in_net(&self) -> bool {
        self.is_goalie()
            && (self.shots_against.unwrap_or(0) > 0 || self.saves.unwrap_or(0) > 0)
    }
}

/// Authoritative end-of-game summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boxscore {
    pub game_id: GameId,
    pub status: GameStatus,
    pub home_team: String,
    pub away_team: String,
    pub players: Vec<BoxscorePlayer>,
}

impl Boxscore {
    pub fn player(&self, player_id: PlayerId) -> Option<&BoxscorePlayer> {
        self.players.iter().find(|p| p.player_id == player_id)
    }
}

/// Current roster of an NHL team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRoster {
    pub team: String,
    pub season: String,
    pub player_ids: Vec<PlayerId>,
}

impl TeamRoster {
    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.player_ids.contains(&player_id)
    }
}

// ---------------------------------------------------------------------------
// Upstream response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawName {
    Plain(String),
    Localized { default: String },
}

impl RawName {
    fn into_string(self) -> String {
        match self {
            RawName::Plain(name) => name,
            RawName::Localized { default } => default,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTeamRef {
    #[serde(default)]
    pub abbrev: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawSchedule {
    #[serde(default)]
    pub games: Vec<RawScheduleGame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawScheduleGame {
    #[serde(default, alias = "gameId")]
    pub id: Option<GameId>,
    #[serde(default)]
    pub game_date: Option<String>,
    #[serde(default)]
    pub game_state: Option<String>,
    #[serde(default, rename = "startTimeUTC")]
    pub start_time_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    pub home_team: Option<RawTeamRef>,
    #[serde(default)]
    pub away_team: Option<RawTeamRef>,
}

impl RawScheduleGame {
    /// Games without an id or a parseable date are dropped
    pub fn normalize(self) -> Option<ScheduledGame> {
        let game_id = self.id?;
        let game_date = self
            .game_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.get(..10).unwrap_or(d), "%Y-%m-%d").ok())?;
        let abbrev = |team: Option<RawTeamRef>, fallback: &str| {
            team.and_then(|t| t.abbrev).unwrap_or_else(|| fallback.to_string())
        };

        Some(ScheduledGame {
            game_id,
            game_date,
            status: GameStatus::parse(self.game_state.as_deref().unwrap_or("UNKNOWN")),
            start_time: self.start_time_utc,
            home_team: abbrev(self.home_team, "HOME"),
            away_team: abbrev(self.away_team, "AWAY"),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RawPlayByPlay {
    #[serde(default)]
    pub plays: Vec<RawPlay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPeriod {
    pub number: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlay {
    pub event_id: i64,
    #[serde(default)]
    pub type_desc_key: String,
    #[serde(default)]
    pub period_descriptor: Option<RawPeriod>,
    #[serde(default)]
    pub time_remaining: Option<String>,
    #[serde(default)]
    pub details: Option<RawPlayDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlayDetails {
    pub scoring_player_id: Option<PlayerId>,
    pub assist1_player_id: Option<PlayerId>,
    pub assist2_player_id: Option<PlayerId>,
    pub shooting_player_id: Option<PlayerId>,
    pub goalie_in_net_id: Option<PlayerId>,
    pub hitting_player_id: Option<PlayerId>,
    pub hittee_player_id: Option<PlayerId>,
    pub blocking_player_id: Option<PlayerId>,
    pub committed_by_player_id: Option<PlayerId>,
    pub drawn_by_player_id: Option<PlayerId>,
    pub served_by_player_id: Option<PlayerId>,
    pub winning_player_id: Option<PlayerId>,
    pub losing_player_id: Option<PlayerId>,
    pub player_id: Option<PlayerId>,
    pub desc_key: Option<String>,
}

impl RawPlayDetails {
    fn participants(&self) -> Vec<Participant> {
        let slots = [
            (self.scoring_player_id, ParticipantRole::Scorer),
            (self.assist1_player_id, ParticipantRole::Assist),
            (self.assist2_player_id, ParticipantRole::Assist),
            (self.shooting_player_id, ParticipantRole::Shooter),
            (self.hitting_player_id, ParticipantRole::Hitter),
            (self.hittee_player_id, ParticipantRole::Hittee),
            (self.blocking_player_id, ParticipantRole::Blocker),
            (self.committed_by_player_id, ParticipantRole::CommittedBy),
            (self.drawn_by_player_id, ParticipantRole::DrawnBy),
            (self.served_by_player_id, ParticipantRole::ServedBy),
            (self.winning_player_id, ParticipantRole::FaceoffWinner),
            (self.losing_player_id, ParticipantRole::FaceoffLoser),
            (self.goalie_in_net_id, ParticipantRole::Goalie),
            (self.player_id, ParticipantRole::Player),
        ];

        let mut participants: Vec<Participant> = Vec::new();
        for (player_id, role) in slots {
            let Some(player_id) = player_id else { continue };
            // First role wins when the feed names a player twice
            if participants.iter().any(|p| p.player_id == player_id) {
                continue;
            }
            participants.push(Participant { player_id, role });
        }
        participants
    }
}

impl RawPlay {
    pub fn normalize(self) -> PlayEvent {
        let details = self.details.unwrap_or_default();
        PlayEvent {
            event_id: self.event_id,
            event_type: self.type_desc_key,
            period: self.period_descriptor.map(|p| p.number),
            clock: self.time_remaining,
            players: details.participants(),
            description: details.desc_key,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBoxscore {
    #[serde(default, alias = "gameId")]
    pub id: Option<GameId>,
    #[serde(default)]
    pub game_state: Option<String>,
    #[serde(default)]
    pub home_team: Option<RawTeamRef>,
    #[serde(default)]
    pub away_team: Option<RawTeamRef>,
    #[serde(default)]
    pub player_by_game_stats: Option<RawPlayerByGameStats>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlayerByGameStats {
    #[serde(default)]
    pub home_team: RawTeamPlayers,
    #[serde(default)]
    pub away_team: RawTeamPlayers,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawTeamPlayers {
    #[serde(default)]
    pub forwards: Vec<RawPlayerLine>,
    #[serde(default)]
    pub defense: Vec<RawPlayerLine>,
    #[serde(default)]
    pub goalies: Vec<RawPlayerLine>,
}

impl RawTeamPlayers {
    fn into_lines(self) -> impl Iterator<Item = RawPlayerLine> {
        self.forwards
            .into_iter()
            .chain(self.defense)
            .chain(self.goalies)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlayerLine {
    #[serde(alias = "id")]
    pub player_id: PlayerId,
    #[serde(default)]
    pub name: Option<RawName>,
    #[serde(default, alias = "positionCode")]
    pub position: Option<String>,
    #[serde(default)]
    pub goals: i32,
    #[serde(default)]
    pub assists: i32,
    #[serde(default, alias = "shots", alias = "shotsOnGoal")]
    pub sog: i32,
    #[serde(default)]
    pub hits: i32,
    #[serde(default, alias = "blocks")]
    pub blocked_shots: i32,
    #[serde(default, alias = "penaltyMinutes")]
    pub pim: i32,
    #[serde(default)]
    pub plus_minus: i32,
    #[serde(default)]
    pub shots_against: Option<i32>,
    #[serde(default)]
    pub saves: Option<i32>,
}

impl RawPlayerLine {
    fn normalize(self, team: &str, goalie_group: bool) -> BoxscorePlayer {
        let position = self
            .position
            .unwrap_or_else(|| (if goalie_group { "G" } else { "F" }).to_string());
        BoxscorePlayer {
            player_id: self.player_id,
            name: self
                .name
                .map(RawName::into_string)
                .unwrap_or_else(|| "Unknown".to_string()),
            position,
            team: team.to_string(),
            goals: self.goals,
            assists: self.assists,
            shots: self.sog,
            hits: self.hits,
            blocks: self.blocked_shots,
            pim: self.pim,
            plus_minus: self.plus_minus,
            shots_against: self.shots_against,
            saves: self.saves,
        }
    }
}

impl RawBoxscore {
    pub fn normalize(self, requested_game_id: GameId) -> Boxscore {
        let home_team = self
            .home_team
            .and_then(|t| t.abbrev)
            .unwrap_or_else(|| "HOME".to_string());
        let away_team = self
            .away_team
            .and_then(|t| t.abbrev)
            .unwrap_or_else(|| "AWAY".to_string());
        let stats = self.player_by_game_stats.unwrap_or_default();

        let mut players = Vec::new();
        for (team, group) in [(&home_team, stats.home_team), (&away_team, stats.away_team)] {
            let goalie_ids: Vec<PlayerId> = group.goalies.iter().map(|g| g.player_id).collect();
            for line in group.into_lines() {
                let is_goalie = goalie_ids.contains(&line.player_id);
                players.push(line.normalize(team, is_goalie));
            }
        }

        Boxscore {
            game_id: self.id.unwrap_or(requested_game_id),
            status: GameStatus::parse(self.game_state.as_deref().unwrap_or("UNKNOWN")),
            home_team,
            away_team,
            players,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RawTeamRoster {
    #[serde(default)]
    pub forwards: Vec<RawRosterEntry>,
    #[serde(default)]
    pub defensemen: Vec<RawRosterEntry>,
    #[serde(default)]
    pub goalies: Vec<RawRosterEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRosterEntry {
    #[serde(alias = "playerId")]
    pub id: PlayerId,
}

impl RawTeamRoster {
    pub fn normalize(self, team: &str, season: &str) -> TeamRoster {
        TeamRoster {
            team: team.to_string(),
            season: season.to_string(),
            player_ids: self
                .forwards
                .into_iter()
                .chain(self.defensemen)
                .chain(self.goalies)
                .map(|p| p.id)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_game_status_families() {
        assert!(GameStatus::parse("LIVE").is_in_progress());
        assert!(GameStatus::parse("crit").is_in_progress());
        assert!(GameStatus::parse("PRE_GAME").is_in_progress());
        assert!(GameStatus::parse("FINAL_SO").is_final());
        assert!(GameStatus::parse("OFF").is_final());

        let future = GameStatus::parse("FUT");
        assert!(!future.is_in_progress());
        assert!(!future.is_final());
        assert_eq!(GameStatus::parse("POSTPONED"), GameStatus::Unknown);
    }

    #[test]
    fn test_season_for_date() {
        let october = NaiveDate::from_ymd_opt(2024, 10, 8).unwrap();
        let february = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        assert_eq!(season_for(october), "20242025");
        assert_eq!(season_for(february), "20242025");
    }

    #[test]
    fn test_schedule_game_normalization() {
        let raw: RawSchedule = serde_json::from_value(json!({
            "games": [
                {
                    "id": 2024020001,
                    "gameDate": "2024-10-08",
                    "gameState": "FINAL",
                    "startTimeUTC": "2024-10-08T23:00:00Z",
                    "homeTeam": { "abbrev": "TOR" },
                    "awayTeam": { "abbrev": "MTL" }
                },
                { "gameDate": "2024-10-09" }
            ]
        }))
        .unwrap();

        let games: Vec<ScheduledGame> = raw.games.into_iter().filter_map(|g| g.normalize()).collect();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].game_id, 2024020001);
        assert_eq!(games[0].status, GameStatus::Final);
        assert_eq!(games[0].home_team, "TOR");
        assert_eq!(games[0].starts_at().to_rfc3339(), "2024-10-08T23:00:00+00:00");
    }

    #[test]
    fn test_play_participants_carry_roles() {
        let raw: RawPlayByPlay = serde_json::from_value(json!({
            "plays": [{
                "eventId": 151,
                "typeDescKey": "goal",
                "periodDescriptor": { "number": 2 },
                "timeRemaining": "12:31",
                "details": {
                    "scoringPlayerId": 8478402,
                    "assist1PlayerId": 8477934,
                    "goalieInNetId": 8476945
                }
            }]
        }))
        .unwrap();

        let play = raw.plays.into_iter().next().unwrap().normalize();
        assert_eq!(play.event_id, 151);
        assert_eq!(play.period, Some(2));
        assert_eq!(play.players.len(), 3);
        assert_eq!(play.players[0].role, ParticipantRole::Scorer);
        assert_eq!(play.players[1].role, ParticipantRole::Assist);
        assert_eq!(play.players[2].role, ParticipantRole::Goalie);
    }

    #[test]
    fn test_boxscore_normalization() {
        let raw: RawBoxscore = serde_json::from_value(json!({
            "id": 2024020001,
            "gameState": "OFF",
            "homeTeam": { "abbrev": "TOR" },
            "awayTeam": { "abbrev": "MTL" },
            "playerByGameStats": {
                "homeTeam": {
                    "forwards": [{
                        "playerId": 8478402,
                        "name": { "default": "A. Matthews" },
                        "position": "C",
                        "goals": 1, "assists": 1, "sog": 4, "hits": 2,
                        "blockedShots": 1, "pim": 2, "plusMinus": 1
                    }],
                    "goalies": [{
                        "playerId": 8476945,
                        "name": "J. Woll",
                        "shotsAgainst": 30,
                        "saves": 28
                    }]
                }
            }
        }))
        .unwrap();

        let boxscore = raw.normalize(2024020001);
        assert!(boxscore.status.is_final());
        assert_eq!(boxscore.players.len(), 2);

        let skater = boxscore.player(8478402).unwrap();
        assert_eq!(skater.shots, 4);
        assert_eq!(skater.blocks, 1);
        assert_eq!(skater.team, "TOR");
        assert!(!skater.played_in_net());

        let goalie = boxscore.player(8476945).unwrap();
        assert_eq!(goalie.position, "G");
        assert!(goalie.played_in_net());
    }
}
