//! Game lifecycle tracking
//!
//! The directory is an explicit store keyed by game id. Discovery feeds it from team schedules;
//! the ingestor reads the active set and the reconciler reads the finished set.

use crate::feed::GameFeed;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;
use nhl_fetcher::{season_for, GameId, ScheduledGame};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GameState {
    /// Scheduled for today, not yet live; polled with the active set
    Discovered,
    Active,
    /// Eligible for boxscore reconciliation
    Finished,
    /// Reconciliation cap reached; waiting for retention eviction
    Reconciled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedGame {
    pub game_id: GameId,
    pub state: GameState,
    pub game_date: Option<NaiveDate>,
    pub matchup: Option<String>,
    pub tracked_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub reconcile_passes: u32,
}

impl TrackedGame {
    fn new(game_id: GameId, state: GameState, now: DateTime<Utc>) -> Self {
        Self {
            game_id,
            state,
            game_date: None,
            matchup: None,
            tracked_at: now,
            finished_at: None,
            reconcile_passes: 0,
        }
    }
}

/// Eviction limits for finished games
#[derive(Debug, Clone, Copy)]
pub struct DirectoryPolicy {
    /// Successful reconciliation passes before a game is considered settled
    pub max_reconcile_passes: u32,
    /// How long a reconciled game stays in the store after it finished
    pub retention: Duration,
}

impl Default for DirectoryPolicy {
    fn default() -> Self {
        Self {
            max_reconcile_passes: 12,
            retention: Duration::hours(48),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    pub teams_scanned: usize,
    pub teams_failed: usize,
    pub games_today: usize,
    pub activated: usize,
    pub finished: usize,
    pub discovered: usize,
    pub evicted: usize,
}

pub struct GameDirectory {
    games: DashMap<GameId, TrackedGame>,
    policy: DirectoryPolicy,
}

impl GameDirectory {
    pub fn new(policy: DirectoryPolicy) -> Self {
        Self {
            games: DashMap::new(),
            policy,
        }
    }

    /// Scan every team's schedule for the season containing `today` and update lifecycle states
    pub async fn discover_daily(&self, feed: &dyn GameFeed, today: NaiveDate) -> DiscoveryReport {
        let season = season_for(today);
        let mut report = DiscoveryReport::default();
        let mut seen: HashSet<GameId> = HashSet::new();
        let now = Utc::now();

        info!("Discovering games for {} (season {})", today, season);

        for team in feed.all_teams() {
            report.teams_scanned += 1;
            let schedule = match feed.team_schedule(&team, &season).await {
                Ok(schedule) => schedule,
                Err(e) => {
                    report.teams_failed += 1;
                    warn!("Schedule fetch for {} failed: {}", team, e);
                    continue;
                }
            };

            for game in schedule {
                // Every game appears in both teams' schedules
                if !seen.insert(game.game_id) {
                    continue;
                }
                if game.game_date == today {
                    report.games_today += 1;
                } else if !self.games.contains_key(&game.game_id) {
                    continue;
                }

                match self.observe(&game, now) {
                    Some(GameState::Active) => report.activated += 1,
                    Some(GameState::Finished) => report.finished += 1,
                    Some(GameState::Discovered) => report.discovered += 1,
                    _ => {}
                }
            }
        }

        report.evicted = self.evict(now, today);

        info!(
            "Discovery complete: {} games today, {} activated, {} finished, {} discovered, {} evicted ({} of {} schedules failed)",
            report.games_today,
            report.activated,
            report.finished,
            report.discovered,
            report.evicted,
            report.teams_failed,
            report.teams_scanned
        );
        report
    }

    /// Apply one schedule observation. Returns the new state when it changed.
    pub fn observe(&self, game: &ScheduledGame, now: DateTime<Utc>) -> Option<GameState> {
        let matchup = format!("{} @ {}", game.away_team, game.home_team);

        if game.status.is_in_progress() {
            let mut entry = self
                .games
                .entry(game.game_id)
                .or_insert_with(|| TrackedGame::new(game.game_id, GameState::Discovered, now));
            entry.game_date = Some(game.game_date);
            entry.matchup = Some(matchup.clone());
            if entry.state == GameState::Discovered {
                entry.state = GameState::Active;
                info!("Game {} ({}) is live, polling", game.game_id, matchup);
                return Some(GameState::Active);
            }
            return None;
        }

        if game.status.is_final() {
            // Finished games we never tracked are ignored
            let mut entry = self.games.get_mut(&game.game_id)?;
            if matches!(entry.state, GameState::Discovered | GameState::Active) {
                entry.state = GameState::Finished;
                entry.finished_at = Some(now);
                info!("Game {} ({}) finished, queued for reconciliation", game.game_id, matchup);
                return Some(GameState::Finished);
            }
            return None;
        }

        if self.games.contains_key(&game.game_id) {
            return None;
        }
        let mut tracked = TrackedGame::new(game.game_id, GameState::Discovered, now);
        tracked.game_date = Some(game.game_date);
        tracked.matchup = Some(matchup.clone());
        self.games.insert(game.game_id, tracked);
        debug!("Game {} ({}) discovered", game.game_id, matchup);
        Some(GameState::Discovered)
    }

    /// Games to poll for incremental events
    pub fn active_games(&self) -> Vec<GameId> {
        self.ids_in(&[GameState::Discovered, GameState::Active])
    }

    /// Games eligible for reconciliation
    pub fn finished_games(&self) -> Vec<GameId> {
        self.ids_in(&[GameState::Finished])
    }

    fn ids_in(&self, states: &[GameState]) -> Vec<GameId> {
        let mut ids: Vec<GameId> = self
            .games
            .iter()
            .filter(|entry| states.contains(&entry.state))
            .map(|entry| entry.game_id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Count a successful reconciliation pass, retiring the game once the cap is reached
    pub fn record_reconciliation_pass(&self, game_id: GameId) {
        if let Some(mut entry) = self.games.get_mut(&game_id) {
            if entry.state != GameState::Finished {
                return;
            }
            entry.reconcile_passes += 1;
            if entry.reconcile_passes >= self.policy.max_reconcile_passes {
                entry.state = GameState::Reconciled;
                info!(
                    "Game {} reconciled {} times, no longer reconciling",
                    game_id, entry.reconcile_passes
                );
            }
        }
    }

    /// Drop reconciled games past retention and scheduled games whose date fell out of the
    /// retention window. Returns the number of games removed.
    pub fn evict(&self, now: DateTime<Utc>, today: NaiveDate) -> usize {
        let retention = self.policy.retention;
        let before = self.games.len();

        self.games.retain(|game_id, game| {
            let keep = match game.state {
                GameState::Reconciled => game
                    .finished_at
                    .map_or(false, |finished| now - finished < retention),
                // Evening games outlive the midnight rollover; postponed ones age out
                GameState::Discovered => game
                    .game_date
                    .map_or(true, |date| today.signed_duration_since(date) <= retention),
                GameState::Active => now - game.tracked_at < retention,
                GameState::Finished => true,
            };
            if !keep {
                debug!("Evicting game {} in state {:?}", game_id, game.state);
            }
            keep
        });

        before - self.games.len()
    }

    /// Operator override: poll a game regardless of its schedule status
    pub fn track_game(&self, game_id: GameId) {
        let now = Utc::now();
        self.games
            .entry(game_id)
            .and_modify(|game| {
                if game.state == GameState::Discovered {
                    game.state = GameState::Active;
                }
            })
            .or_insert_with(|| TrackedGame::new(game_id, GameState::Active, now));
        info!("Game {} tracked manually", game_id);
    }

    pub fn untrack_game(&self, game_id: GameId) -> Option<TrackedGame> {
        let removed = self.games.remove(&game_id).map(|(_, game)| game);
        if removed.is_some() {
            info!("Game {} untracked", game_id);
        }
        removed
    }

    /// Operator override: queue a game for reconciliation
    pub fn mark_finished(&self, game_id: GameId) {
        let now = Utc::now();
        let mut entry = self
            .games
            .entry(game_id)
            .or_insert_with(|| TrackedGame::new(game_id, GameState::Finished, now));
        entry.state = GameState::Finished;
        entry.finished_at.get_or_insert(now);
        entry.reconcile_passes = 0;
    }

    pub fn state(&self, game_id: GameId) -> Option<GameState> {
        self.games.get(&game_id).map(|game| game.state)
    }

    pub fn snapshot(&self) -> Vec<TrackedGame> {
        let mut games: Vec<TrackedGame> = self.games.iter().map(|g| g.value().clone()).collect();
        games.sort_by_key(|g| g.game_id);
        games
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

impl Default for GameDirectory {
    fn default() -> Self {
        Self::new(DirectoryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nhl_fetcher::GameStatus;

    fn scheduled(game_id: GameId, date: NaiveDate, status: GameStatus) -> ScheduledGame {
        ScheduledGame {
            game_id,
            game_date: date,
            status,
            start_time: None,
            home_team: "TOR".to_string(),
            away_team: "MTL".to_string(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, 2).unwrap()
    }

    #[test]
    fn test_lifecycle_transitions() {
        let directory = GameDirectory::default();
        let now = Utc::now();

        assert_eq!(
            directory.observe(&scheduled(1, today(), GameStatus::Scheduled), now),
            Some(GameState::Discovered)
        );
        // Discovered games are polled with the live ones
        assert_eq!(directory.active_games(), vec![1]);

        assert_eq!(
            directory.observe(&scheduled(1, today(), GameStatus::Live), now),
            Some(GameState::Active)
        );
        assert_eq!(directory.observe(&scheduled(1, today(), GameStatus::Live), now), None);

        assert_eq!(
            directory.observe(&scheduled(1, today(), GameStatus::Final), now),
            Some(GameState::Finished)
        );
        // Finished exactly once
        assert_eq!(directory.observe(&scheduled(1, today(), GameStatus::Final), now), None);
        assert!(directory.active_games().is_empty());
        assert_eq!(directory.finished_games(), vec![1]);
    }

    #[test]
    fn test_untracked_final_game_ignored() {
        let directory = GameDirectory::default();
        assert_eq!(directory.observe(&scheduled(9, today(), GameStatus::Final), Utc::now()), None);
        assert!(directory.is_empty());
    }

    #[test]
    fn test_reconcile_cap_and_retention() {
        let directory = GameDirectory::new(DirectoryPolicy {
            max_reconcile_passes: 2,
            retention: Duration::hours(48),
        });
        let now = Utc::now();
        directory.observe(&scheduled(3, today(), GameStatus::Live), now);
        directory.observe(&scheduled(3, today(), GameStatus::Final), now);

        directory.record_reconciliation_pass(3);
        assert_eq!(directory.state(3), Some(GameState::Finished));
        directory.record_reconciliation_pass(3);
        assert_eq!(directory.state(3), Some(GameState::Reconciled));
        assert!(directory.finished_games().is_empty());

        assert_eq!(directory.evict(now + Duration::hours(1), today()), 0);
        assert_eq!(directory.evict(now + Duration::hours(49), today()), 1);
        assert!(directory.is_empty());
    }

    #[test]
    fn test_stale_discovered_game_evicted() {
        let directory = GameDirectory::default();
        let now = Utc::now();
        directory.observe(&scheduled(4, today(), GameStatus::Scheduled), now);

        assert_eq!(directory.evict(now, today()), 0);
        assert_eq!(directory.evict(now, today() + Duration::days(2)), 0);
        assert_eq!(directory.evict(now, today() + Duration::days(3)), 1);
    }

    #[test]
    fn test_evening_game_survives_midnight() {
        let directory = GameDirectory::default();
        let now = Utc::now();
        directory.observe(&scheduled(6, today(), GameStatus::Scheduled), now);

        // Discovery after midnight UTC, puck drop still ahead
        let tomorrow = today() + Duration::days(1);
        assert_eq!(directory.evict(now + Duration::hours(3), tomorrow), 0);
        assert_eq!(directory.state(6), Some(GameState::Discovered));

        assert_eq!(
            directory.observe(&scheduled(6, today(), GameStatus::Live), now + Duration::hours(4)),
            Some(GameState::Active)
        );
        assert_eq!(directory.active_games(), vec![6]);
    }

    #[test]
    fn test_manual_tracking() {
        let directory = GameDirectory::default();
        directory.track_game(5);
        assert_eq!(directory.state(5), Some(GameState::Active));
        assert_eq!(directory.active_games(), vec![5]);

        directory.mark_finished(5);
        assert_eq!(directory.finished_games(), vec![5]);

        assert!(directory.untrack_game(5).is_some());
        assert!(directory.untrack_game(5).is_none());
    }
}
