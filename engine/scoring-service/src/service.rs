//! Service wiring: database, upstream client, engine, live update sinks and scheduler

use crate::config::ServiceConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use nhl_fetcher::NhlApiClient;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use scoring_engine::{
    spawn_notifier, LiveUpdateBus, PgEventStore, PgRosterDirectory, PgRosterMutations,
    PointsUpdate, RosterBroadcaster, ScoringEngine, ScoringError, ScoringScheduler, UpdateSink,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Publishes every points update as JSON on a Redis channel
pub struct RedisUpdateSink {
    connection: ConnectionManager,
    channel: String,
}

impl RedisUpdateSink {
    pub async fn connect(url: &str, channel: &str) -> Result<Self, redis::RedisError> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self {
            connection,
            channel: channel.to_string(),
        })
    }
}

#[async_trait]
impl UpdateSink for RedisUpdateSink {
    fn name(&self) -> &str {
        "redis"
    }

    async fn deliver(&self, update: &PointsUpdate) -> scoring_engine::Result<()> {
        let payload = serde_json::to_string(update)?;
        let mut conn = self.connection.clone();
        let receivers: i64 = conn
            .publish(&self.channel, payload)
            .await
            .map_err(|e| ScoringError::Collaborator(format!("redis publish failed: {}", e)))?;
        debug!(
            "Published update for roster {} to {} subscribers on {}",
            update.roster_id, receivers, self.channel
        );
        Ok(())
    }
}

/// Running service state
pub struct ScoringService {
    pub config: ServiceConfig,
    pub engine: Arc<ScoringEngine>,
    pub broadcaster: RosterBroadcaster,
    pool: PgPool,
    notifier: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl ScoringService {
    /// Connect to Postgres, apply ledger migrations and wire the engine
    pub async fn new(config: ServiceConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await
            .context("Failed to connect to database")?;
        info!("Connected to database");

        let store = PgEventStore::new(pool.clone());
        store.migrate().await.context("Failed to migrate scoring ledger")?;

        let client = NhlApiClient::new(config.nhl.clone()).context("Failed to build NHL client")?;

        let broadcaster = RosterBroadcaster::new();
        let mut sinks: Vec<Arc<dyn UpdateSink>> = vec![Arc::new(broadcaster.clone())];
        if let Some(url) = &config.redis.url {
            match RedisUpdateSink::connect(url, &config.redis.channel).await {
                Ok(sink) => {
                    info!("Publishing live updates to Redis channel {}", config.redis.channel);
                    sinks.push(Arc::new(sink));
                }
                // Scoring never depends on live delivery
                Err(e) => warn!("Redis unavailable, live updates stay in-process: {}", e),
            }
        }

        let (bus, receiver) = LiveUpdateBus::new(config.scoring.bus_capacity);
        let notifier = spawn_notifier(receiver, sinks);

        let engine = Arc::new(ScoringEngine::new(
            &config.scoring,
            Arc::new(client),
            Arc::new(PgRosterDirectory::new(pool.clone())),
            Arc::new(PgRosterMutations::new(pool.clone())),
            Arc::new(store),
            bus,
        ));

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            engine,
            broadcaster,
            pool,
            notifier,
            shutdown_tx,
        })
    }

    /// Start discovery, polling and reconciliation
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        let scheduler = ScoringScheduler::new(self.config.scoring.clone(), Arc::clone(&self.engine));
        scheduler.start(self.shutdown_tx.subscribe())
    }

    /// Stop the scheduler tasks, drain pending live updates and close the pool
    pub async fn shutdown(self, tasks: Vec<JoinHandle<()>>) -> Result<()> {
        info!("Starting graceful shutdown...");
        let shutdown_timeout = Duration::from_secs(self.config.service.shutdown_timeout_secs);

        let _ = self.shutdown_tx.send(true);
        for task in tasks {
            match timeout(shutdown_timeout, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Scheduler task failed: {}", e),
                Err(_) => warn!("Scheduler task did not stop within timeout"),
            }
        }

        // The notifier ends once the engine, and with it every bus sender, is gone
        let Self {
            engine,
            pool,
            notifier,
            ..
        } = self;
        drop(engine);
        match timeout(shutdown_timeout, notifier).await {
            Ok(Ok(())) => info!("Live update notifier drained"),
            Ok(Err(e)) => error!("Live update notifier failed: {}", e),
            Err(_) => warn!("Live update notifier did not drain within timeout"),
        }

        pool.close().await;
        info!("Graceful shutdown complete");
        Ok(())
    }
}
