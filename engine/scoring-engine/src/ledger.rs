use crate::bus::LiveUpdateBus;
use crate::error::Result;
use crate::models::{EventFilter, InsertOutcome, PointsUpdate, ScoringEvent};
use crate::store::EventStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared write path for every producer: insert-if-absent, then publish the delta
#[derive(Clone)]
pub struct LedgerWriter {
    store: Arc<dyn EventStore>,
    bus: LiveUpdateBus,
}

impl LedgerWriter {
    pub fn new(store: Arc<dyn EventStore>, bus: LiveUpdateBus) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    pub async fn record(&self, event: ScoringEvent) -> Result<InsertOutcome> {
        let update = PointsUpdate {
            league_id: event.league_id,
            roster_id: event.roster_id,
            player_id: event.player_id,
            game_id: event.game_id,
            event_kind: event.event_kind,
            points_awarded: event.points_awarded,
            new_roster_total: 0.0,
        };
        let key = event.idempotency_key.clone();

        let outcome = self.store.insert_if_absent(event).await?;
        if outcome == InsertOutcome::Duplicate {
            debug!("Skipping duplicate ledger key {}", key);
            return Ok(outcome);
        }

        // The write stands even if the notification cannot be built
        match self.store.total_points(EventFilter::roster(update.roster_id)).await {
            Ok(total) => {
                self.bus.publish(PointsUpdate {
                    new_roster_total: total,
                    ..update
                });
            }
            Err(e) => warn!(
                "Recorded {} but could not total roster {} for notification: {}",
                key, update.roster_id, e
            ),
        }

        Ok(outcome)
    }
}
