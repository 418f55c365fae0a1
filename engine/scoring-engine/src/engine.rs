use crate::aggregator::Aggregator;
use crate::bus::LiveUpdateBus;
use crate::config::ScoringConfig;
use crate::directory::GameDirectory;
use crate::feed::GameFeed;
use crate::ingestor::EventIngestor;
use crate::ledger::LedgerWriter;
use crate::reconciler::BoxscoreReconciler;
use crate::roster::{RosterDirectory, RosterMutations};
use crate::settler::RetroactiveSettler;
use crate::store::EventStore;
use std::sync::Arc;

/// All scoring components wired over one event store and one live update bus
pub struct ScoringEngine {
    pub directory: Arc<GameDirectory>,
    pub ingestor: EventIngestor,
    pub reconciler: BoxscoreReconciler,
    pub settler: RetroactiveSettler,
    pub aggregator: Aggregator,
    feed: Arc<dyn GameFeed>,
}

impl ScoringEngine {
    pub fn new(
        config: &ScoringConfig,
        feed: Arc<dyn GameFeed>,
        roster: Arc<dyn RosterDirectory>,
        mutations: Arc<dyn RosterMutations>,
        store: Arc<dyn EventStore>,
        bus: LiveUpdateBus,
    ) -> Self {
        let writer = LedgerWriter::new(Arc::clone(&store), bus);

        Self {
            directory: Arc::new(GameDirectory::new(config.directory_policy())),
            ingestor: EventIngestor::new(
                Arc::clone(&feed),
                Arc::clone(&roster),
                writer.clone(),
                config.max_concurrent_games,
            ),
            reconciler: BoxscoreReconciler::new(
                Arc::clone(&feed),
                Arc::clone(&roster),
                mutations,
                writer.clone(),
            ),
            settler: RetroactiveSettler::new(Arc::clone(&feed), Arc::clone(&roster), writer),
            aggregator: Aggregator::new(store, roster),
            feed,
        }
    }

    pub fn feed(&self) -> &dyn GameFeed {
        self.feed.as_ref()
    }
}
