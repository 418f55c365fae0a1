//! Postgres adapters for the ledger and the roster collaborators

use crate::error::{Result, ScoringError};
use crate::formula::{LeagueScoring, ScoringWeights};
use crate::models::{
    EventDetail, EventFilter, InsertOutcome, LeagueId, LineupSlot, LineupStatus, RosterId,
    RosterPlayer, RosterSummary, ScoringEvent,
};
use crate::roster::{RosterDirectory, RosterMutations};
use crate::store::EventStore;
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use nhl_fetcher::{GameId, PlayerId};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Scoring ledger in the `scoring_events` table
#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Scoring ledger migrations applied");
        Ok(())
    }

    fn event_from_row(row: &PgRow) -> Result<ScoringEvent> {
        let kind: String = row.try_get("event_kind")?;
        let detail: Json<EventDetail> = row.try_get("event_detail")?;

        Ok(ScoringEvent {
            id: row.try_get("id")?,
            game_id: row.try_get("game_id")?,
            player_id: row.try_get("player_id")?,
            roster_id: row.try_get("roster_id")?,
            league_id: row.try_get("league_id")?,
            event_kind: kind.parse()?,
            idempotency_key: row.try_get("idempotency_key")?,
            points_awarded: row.try_get("points_awarded")?,
            event_detail: detail.0,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn insert_if_absent(&self, event: ScoringEvent) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO scoring_events
                (id, game_id, player_id, roster_id, league_id, event_kind, idempotency_key,
                 points_awarded, event_detail, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (game_id, roster_id, idempotency_key) DO NOTHING
            "#,
        )
        .bind(event.id)
        .bind(event.game_id)
        .bind(event.player_id)
        .bind(event.roster_id)
        .bind(event.league_id)
        .bind(event.event_kind.as_str())
        .bind(&event.idempotency_key)
        .bind(event.points_awarded)
        .bind(Json(&event.event_detail))
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::Duplicate)
        }
    }

    async fn existing_keys(&self, game_id: GameId) -> Result<HashSet<(RosterId, String)>> {
        let keys: Vec<(RosterId, String)> = sqlx::query_as(
            "SELECT roster_id, idempotency_key FROM scoring_events WHERE game_id = $1",
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(keys.into_iter().collect())
    }

    async fn contains_key(&self, game_id: GameId, roster_id: RosterId, key: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM scoring_events
                WHERE game_id = $1 AND roster_id = $2 AND idempotency_key = $3
            )
            "#,
        )
        .bind(game_id)
        .bind(roster_id)
        .bind(key)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn events(&self, filter: EventFilter) -> Result<Vec<ScoringEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, game_id, player_id, roster_id, league_id, event_kind, idempotency_key,
                   points_awarded, event_detail, created_at
            FROM scoring_events
            WHERE ($1::uuid IS NULL OR roster_id = $1)
              AND ($2::uuid IS NULL OR league_id = $2)
              AND ($3::bigint IS NULL OR player_id = $3)
              AND ($4::bigint IS NULL OR game_id = $4)
            ORDER BY created_at ASC
            "#,
        )
        .bind(filter.roster_id)
        .bind(filter.league_id)
        .bind(filter.player_id)
        .bind(filter.game_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::event_from_row).collect()
    }

    async fn total_points(&self, filter: EventFilter) -> Result<f64> {
        let total: f64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(points_awarded), 0)::float8
            FROM scoring_events
            WHERE ($1::uuid IS NULL OR roster_id = $1)
              AND ($2::uuid IS NULL OR league_id = $2)
              AND ($3::bigint IS NULL OR player_id = $3)
              AND ($4::bigint IS NULL OR game_id = $4)
            "#,
        )
        .bind(filter.roster_id)
        .bind(filter.league_id)
        .bind(filter.player_id)
        .bind(filter.game_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}

/// Roster Directory over the league tables (`rosters`, `roster_players`, `leagues`)
#[derive(Clone)]
pub struct PgRosterDirectory {
    pool: PgPool,
}

impl PgRosterDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RosterDirectory for PgRosterDirectory {
    async fn active_lineup_slots(&self, player_ids: &[PlayerId]) -> Result<Vec<LineupSlot>> {
        if player_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Only announced rosters score
        let rows = sqlx::query(
            r#"
            SELECT rp."rosterId" AS roster_id,
                   r."leagueId" AS league_id,
                   rp."nhlPlayerId"::bigint AS player_id
            FROM roster_players rp
            JOIN rosters r ON r.id = rp."rosterId"
            WHERE r."rosterAnnounced" = true
              AND rp."lineupStatus" = 'active'
              AND rp."nhlPlayerId"::bigint = ANY($1)
            "#,
        )
        .bind(player_ids)
        .fetch_all(&self.pool)
        .await?;

        let slots = rows
            .iter()
            .map(|row| {
                Ok(LineupSlot {
                    roster_id: row.try_get("roster_id")?,
                    league_id: row.try_get("league_id")?,
                    player_id: row.try_get("player_id")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;

        debug!("{} active lineup slots for {} players", slots.len(), player_ids.len());
        Ok(slots)
    }

    async fn scoring_weights(&self, league_id: LeagueId) -> Result<ScoringWeights> {
        let scoring: Option<Option<serde_json::Value>> =
            sqlx::query_scalar(r#"SELECT settings->'scoring' FROM leagues WHERE id = $1"#)
                .bind(league_id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(value) = scoring.flatten() else {
            return Ok(ScoringWeights::default());
        };

        match serde_json::from_value::<LeagueScoring>(value) {
            Ok(scoring) => Ok(scoring.resolve()),
            Err(e) => {
                warn!("League {} has unreadable scoring settings, using defaults: {}", league_id, e);
                Ok(ScoringWeights::default())
            }
        }
    }

    async fn roster_players(&self, roster_id: RosterId) -> Result<Vec<RosterPlayer>> {
        let rows = sqlx::query(
            r#"
            SELECT "rosterId" AS roster_id,
                   "nhlPlayerId"::bigint AS player_id,
                   "playerName" AS player_name,
                   position,
                   "lineupStatus" AS lineup_status
            FROM roster_players
            WHERE "rosterId" = $1
            "#,
        )
        .bind(roster_id)
        .fetch_all(&self.pool)
        .await?;

        let players = rows
            .iter()
            .map(|row| {
                let status: String = row.try_get("lineup_status")?;
                Ok(RosterPlayer {
                    roster_id: row.try_get("roster_id")?,
                    player_id: row.try_get("player_id")?,
                    player_name: row.try_get("player_name")?,
                    position: row.try_get("position")?,
                    lineup_status: LineupStatus::parse(&status),
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;
        Ok(players)
    }

    async fn league_rosters(&self, league_id: LeagueId) -> Result<Vec<RosterSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, "leagueId" AS league_id, "teamName" AS team_name
            FROM rosters
            WHERE "leagueId" = $1
            "#,
        )
        .bind(league_id)
        .fetch_all(&self.pool)
        .await?;

        let rosters = rows
            .iter()
            .map(|row| {
                Ok(RosterSummary {
                    roster_id: row.try_get("id")?,
                    league_id: row.try_get("league_id")?,
                    name: row.try_get("team_name")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;
        Ok(rosters)
    }
}

/// Goalie start bookkeeping in `goalie_starts`
#[derive(Clone)]
pub struct PgRosterMutations {
    pool: PgPool,
}

impl PgRosterMutations {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Monday of the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

#[async_trait]
impl RosterMutations for PgRosterMutations {
    async fn record_goalie_start(
        &self,
        roster_id: RosterId,
        player_id: PlayerId,
        game_id: GameId,
    ) -> Result<()> {
        // The league tables store NHL ids as 32-bit integers
        let player = i32::try_from(player_id)
            .map_err(|_| ScoringError::Internal(format!("player id {} out of range", player_id)))?;
        let game = i32::try_from(game_id)
            .map_err(|_| ScoringError::Internal(format!("game id {} out of range", game_id)))?;

        let result = sqlx::query(
            r#"
            INSERT INTO goalie_starts (id, "rosterId", "nhlPlayerId", "nhlGameId", "weekStartDate")
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ("rosterId", "nhlPlayerId", "nhlGameId") DO NOTHING
            "#,
        )
        .bind(uuid::Uuid::new_v4())
        .bind(roster_id)
        .bind(player)
        .bind(game)
        .bind(week_start(Utc::now().date_naive()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            info!(
                "Recorded goalie start: roster {}, player {}, game {}",
                roster_id, player_id, game_id
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_week_start_is_monday() {
        let sunday = NaiveDate::from_ymd_opt(2024, 11, 3).unwrap();
        let monday = NaiveDate::from_ymd_opt(2024, 10, 28).unwrap();
        assert_eq!(week_start(sunday), monday);
        assert_eq!(week_start(monday), monday);
    }
}
