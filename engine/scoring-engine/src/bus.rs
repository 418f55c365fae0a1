//! Live update delivery
//!
//! Producers push point deltas onto a bounded channel without blocking; a notifier task drains
//! it and fans each update out to the registered sinks.

use crate::error::Result;
use crate::models::{PointsUpdate, RosterId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Destination for live point updates
#[async_trait]
pub trait UpdateSink: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, update: &PointsUpdate) -> Result<()>;
}

/// Sending half handed to every producer
#[derive(Clone)]
pub struct LiveUpdateBus {
    sender: mpsc::Sender<PointsUpdate>,
}

impl LiveUpdateBus {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<PointsUpdate>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Non-blocking publish. A full or closed channel drops the update with a warning.
    pub fn publish(&self, update: PointsUpdate) -> bool {
        match self.sender.try_send(update) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(update)) => {
                warn!(
                    "Live update bus full, dropping update for roster {} player {}",
                    update.roster_id, update.player_id
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(update)) => {
                warn!(
                    "Live update bus closed, dropping update for roster {} player {}",
                    update.roster_id, update.player_id
                );
                false
            }
        }
    }
}

/// Drain the bus into the sinks until every sender is dropped
pub fn spawn_notifier(
    mut receiver: mpsc::Receiver<PointsUpdate>,
    sinks: Vec<Arc<dyn UpdateSink>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Live update notifier started with {} sinks", sinks.len());

        while let Some(update) = receiver.recv().await {
            for sink in &sinks {
                // Delivery failures are never retried and never touch the ledger
                if let Err(e) = sink.deliver(&update).await {
                    warn!("Sink {} failed to deliver update: {}", sink.name(), e);
                }
            }
        }

        info!("Live update notifier stopped");
    })
}

/// Per-roster in-process subscribers
#[derive(Clone, Default)]
pub struct RosterBroadcaster {
    roster_clients: Arc<RwLock<HashMap<RosterId, Vec<mpsc::UnboundedSender<PointsUpdate>>>>>,
}

impl RosterBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, roster_id: RosterId) -> mpsc::UnboundedReceiver<PointsUpdate> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut clients = self.roster_clients.write().await;
        clients.entry(roster_id).or_insert_with(Vec::new).push(sender);
        receiver
    }

    pub async fn subscriber_count(&self, roster_id: RosterId) -> usize {
        let clients = self.roster_clients.read().await;
        clients.get(&roster_id).map_or(0, |c| c.len())
    }
}

#[async_trait]
impl UpdateSink for RosterBroadcaster {
    fn name(&self) -> &str {
        "roster-broadcaster"
    }

    async fn deliver(&self, update: &PointsUpdate) -> Result<()> {
        let mut clients = self.roster_clients.write().await;
        if let Some(roster_clients) = clients.get_mut(&update.roster_id) {
            // Dropped receivers are pruned on the next delivery
            roster_clients.retain(|sender| sender.send(update.clone()).is_ok());
            debug!(
                "Delivered update to {} subscribers of roster {}",
                roster_clients.len(),
                update.roster_id
            );
            if roster_clients.is_empty() {
                clients.remove(&update.roster_id);
            }
        }
        Ok(())
    }
}
