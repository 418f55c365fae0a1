//! Scoring ledger storage

use crate::error::Result;
use crate::models::{EventFilter, InsertOutcome, RosterId, ScoringEvent};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use nhl_fetcher::GameId;
use std::collections::HashSet;

/// Append-only store of scoring events.
///
/// Uniqueness is enforced on (game, roster, idempotency key) by the store itself, so concurrent
/// producers never double-count.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Atomically insert unless the key already exists for the event's game and roster
    async fn insert_if_absent(&self, event: ScoringEvent) -> Result<InsertOutcome>;

    /// Every (roster, idempotency key) pair already recorded for a game
    async fn existing_keys(&self, game_id: GameId) -> Result<HashSet<(RosterId, String)>>;

    async fn contains_key(&self, game_id: GameId, roster_id: RosterId, key: &str) -> Result<bool>;

    /// Matching events, oldest first
    async fn events(&self, filter: EventFilter) -> Result<Vec<ScoringEvent>>;

    /// Plain sum of `points_awarded` over matching events
    async fn total_points(&self, filter: EventFilter) -> Result<f64>;
}

type LedgerKey = (GameId, RosterId, String);

/// In-process ledger used by tests and dry runs
#[derive(Default)]
pub struct MemoryEventStore {
    events: DashMap<LedgerKey, ScoringEvent>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert_if_absent(&self, event: ScoringEvent) -> Result<InsertOutcome> {
        let key = (event.game_id, event.roster_id, event.idempotency_key.clone());
        match self.events.entry(key) {
            Entry::Occupied(_) => Ok(InsertOutcome::Duplicate),
            Entry::Vacant(slot) => {
                slot.insert(event);
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn existing_keys(&self, game_id: GameId) -> Result<HashSet<(RosterId, String)>> {
        Ok(self
            .events
            .iter()
            .filter(|entry| entry.key().0 == game_id)
            .map(|entry| (entry.key().1, entry.key().2.clone()))
            .collect())
    }

    async fn contains_key(&self, game_id: GameId, roster_id: RosterId, key: &str) -> Result<bool> {
        Ok(self
            .events
            .contains_key(&(game_id, roster_id, key.to_string())))
    }

    async fn events(&self, filter: EventFilter) -> Result<Vec<ScoringEvent>> {
        let mut events: Vec<ScoringEvent> = self
            .events
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }

    async fn total_points(&self, filter: EventFilter) -> Result<f64> {
        Ok(self
            .events
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .fold(0.0, |total, entry| total + entry.value().points_awarded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{keys, EventDetail, EventKind, LineupSlot};
    use std::sync::Arc;
    use uuid::Uuid;

    fn slot(roster_id: RosterId) -> LineupSlot {
        LineupSlot {
            roster_id,
            league_id: Uuid::nil(),
            player_id: 8478402,
        }
    }

    fn goal(slot: &LineupSlot, game_id: GameId, event_id: i64) -> ScoringEvent {
        ScoringEvent::new(
            slot,
            game_id,
            EventKind::Goal,
            keys::incremental(event_id, slot.player_id),
            3.0,
            EventDetail::default(),
        )
    }

    #[tokio::test]
    async fn test_duplicate_is_not_an_error() {
        let store = MemoryEventStore::new();
        let slot = slot(Uuid::new_v4());

        assert_eq!(store.insert_if_absent(goal(&slot, 1, 10)).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.insert_if_absent(goal(&slot, 1, 10)).await.unwrap(), InsertOutcome::Duplicate);
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_points(EventFilter::roster(slot.roster_id)).await.unwrap(), 3.0);
    }

    #[tokio::test]
    async fn test_empty_total_is_positive_zero() {
        let store = MemoryEventStore::new();
        store.insert_if_absent(goal(&slot(Uuid::new_v4()), 1, 10)).await.unwrap();

        let total = store.total_points(EventFilter::roster(Uuid::new_v4())).await.unwrap();
        assert_eq!(total, 0.0);
        assert!(total.is_sign_positive());
    }

    #[tokio::test]
    async fn test_key_scoped_to_game_and_roster() {
        let store = MemoryEventStore::new();
        let first = slot(Uuid::new_v4());
        let second = slot(Uuid::new_v4());

        // Same upstream event id in another game, and the same play for another roster
        assert_eq!(store.insert_if_absent(goal(&first, 1, 10)).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.insert_if_absent(goal(&first, 2, 10)).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.insert_if_absent(goal(&second, 1, 10)).await.unwrap(), InsertOutcome::Inserted);

        let keys = store.existing_keys(1).await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&(first.roster_id, "10-8478402".to_string())));
        assert!(keys.contains(&(second.roster_id, "10-8478402".to_string())));
        assert!(store.contains_key(2, first.roster_id, "10-8478402").await.unwrap());
        assert!(!store.contains_key(2, second.roster_id, "10-8478402").await.unwrap());
        assert_eq!(store.total_points(EventFilter::player(8478402)).await.unwrap(), 9.0);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_write_once() {
        let store = Arc::new(MemoryEventStore::new());
        let slot = slot(Uuid::new_v4());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let event = goal(&slot, 7, 99);
                tokio::spawn(async move { store.insert_if_absent(event).await.unwrap() })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() == InsertOutcome::Inserted {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.len(), 1);
    }
}
