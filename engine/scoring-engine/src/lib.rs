//! # Scoring Engine
//!
//! Live fantasy-hockey scoring and settlement. Games are discovered from team schedules and
//! tracked through an explicit lifecycle; in-flight games are polled for play-by-play events
//! that are scored per active lineup slot; finished games are reconciled against the boxscore,
//! which supersedes the incremental events; players added mid-season are settled retroactively.
//!
//! Every producer writes through an append-only ledger with atomic insert-if-absent, so repeated
//! delivery never double-counts, and publishes point deltas on a bounded live update bus.

pub mod aggregator;
pub mod bus;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod feed;
pub mod formula;
pub mod ingestor;
pub mod ledger;
pub mod models;
pub mod postgres;
pub mod reconciler;
pub mod roster;
pub mod scheduler;
pub mod settler;
pub mod store;


pub use aggregator::Aggregator;
pub use bus::{spawn_notifier, LiveUpdateBus, RosterBroadcaster, UpdateSink};
pub use config::ScoringConfig;
pub use directory::{DirectoryPolicy, DiscoveryReport, GameDirectory, GameState, TrackedGame};
pub use engine::ScoringEngine;
pub use error::{Result, ScoringError};
pub use feed::GameFeed;
pub use formula::{LeagueScoring, PlayType, ScoringWeights, StatLine};
pub use ingestor::{EventIngestor, GameIngestReport};
pub use ledger::LedgerWriter;
pub use models::*;
pub use postgres::{PgEventStore, PgRosterDirectory, PgRosterMutations};
pub use reconciler::{BoxscoreReconciler, GameReconcileReport};
pub use roster::{RosterDirectory, RosterMutations};
pub use scheduler::ScoringScheduler;
pub use settler::{RetroactiveRequest, RetroactiveSettler, SettlementReport};
pub use store::{EventStore, MemoryEventStore};

/// Re-export commonly used types
pub use nhl_fetcher::{GameId, PlayerId};
