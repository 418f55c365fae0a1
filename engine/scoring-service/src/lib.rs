//! Scoring Service
//!
//! Production wiring for the scoring engine: configuration, logging, signal handling,
//! Postgres adapters, the Redis live-update publisher and the periodic scheduler.

pub mod config;
pub mod logging;
pub mod service;
pub mod signals;

pub use config::{load_config, validate_config, ServiceConfig};
pub use logging::initialize_logging;
pub use service::{RedisUpdateSink, ScoringService};
pub use signals::setup_signal_handlers;
