use crate::config::{RetryConfig, ScoringConfig};
use crate::engine::ScoringEngine;
use crate::models::CycleReport;
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Periodic discovery, polling and reconciliation tasks
pub struct ScoringScheduler {
    config: ScoringConfig,
    engine: Arc<ScoringEngine>,
}

impl ScoringScheduler {
    pub fn new(config: ScoringConfig, engine: Arc<ScoringEngine>) -> Self {
        Self { config, engine }
    }

    /// Spawn every periodic task. Each stops once `shutdown` flips to true or its sender drops.
    pub fn start(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        info!(
            "Starting scoring scheduler (poll {}s, reconcile {}s, discovery {}s)",
            self.config.poll_interval_secs,
            self.config.reconcile_interval_secs,
            self.config.discovery_interval_secs
        );

        vec![
            tokio::spawn(Self::run_discovery_task(
                Arc::clone(&self.engine),
                self.config.clone(),
                shutdown.clone(),
            )),
            tokio::spawn(Self::run_poll_task(
                Arc::clone(&self.engine),
                self.config.clone(),
                shutdown.clone(),
            )),
            tokio::spawn(Self::run_reconcile_task(
                Arc::clone(&self.engine),
                self.config.clone(),
                shutdown,
            )),
        ]
    }

    /// Discover today's games at startup and then on every interval
    async fn run_discovery_task(
        engine: Arc<ScoringEngine>,
        config: ScoringConfig,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("Starting discovery task");
        let interval = Duration::from_secs(config.discovery_interval_secs);
        let mut delay = Duration::ZERO;

        while Self::wait(&mut shutdown, delay).await {
            let today = Local::now().date_naive();
            let report = engine.directory.discover_daily(engine.feed(), today).await;
            debug!("Discovery report: {:?}", report);
            delay = interval;
        }

        info!("Discovery task stopped");
    }

    async fn run_poll_task(
        engine: Arc<ScoringEngine>,
        config: ScoringConfig,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("Starting live polling task");
        let interval = Duration::from_secs(config.poll_interval_secs);
        let mut backoff = Backoff::new(&config.retry);
        let mut delay = interval;

        while Self::wait(&mut shutdown, delay).await {
            let report = engine.ingestor.poll_active_games(&engine.directory).await;
            delay = backoff.after("poll", &report, interval);
        }

        info!("Live polling task stopped");
    }

    async fn run_reconcile_task(
        engine: Arc<ScoringEngine>,
        config: ScoringConfig,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("Starting reconciliation task");
        let interval = Duration::from_secs(config.reconcile_interval_secs);
        let mut backoff = Backoff::new(&config.retry);
        let mut delay = interval;

        while Self::wait(&mut shutdown, delay).await {
            let report = engine
                .reconciler
                .reconcile_finished_games(&engine.directory)
                .await;
            delay = backoff.after("reconcile", &report, interval);
        }

        info!("Reconciliation task stopped");
    }

    /// Sleep for `delay`; false when shutdown was requested first
    async fn wait(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
        if *shutdown.borrow() {
            return false;
        }
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    return false;
                }
            }
            _ = sleep(delay) => return true,
        }
        !*shutdown.borrow()
    }
}

/// Exponential backoff applied on top of the regular interval after a rate-limited cycle
struct Backoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    current: Option<Duration>,
}

impl Backoff {
    fn new(retry: &RetryConfig) -> Self {
        Self {
            initial: Duration::from_secs(retry.initial_delay_secs),
            max: Duration::from_secs(retry.max_delay_secs),
            multiplier: retry.backoff_multiplier,
            current: None,
        }
    }

    fn after(&mut self, task: &str, report: &CycleReport, interval: Duration) -> Duration {
        if !report.rate_limited {
            self.current = None;
            return interval;
        }

        let next = match self.current {
            None => self.initial,
            Some(current) => Duration::from_secs_f64(
                (current.as_secs_f64() * self.multiplier).min(self.max.as_secs_f64()),
            ),
        };
        self.current = Some(next);
        warn!(
            "{} cycle rate limited ({} games skipped), backing off {:?}",
            task, report.skipped, next
        );
        interval + next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_resets() {
        let mut backoff = Backoff::new(&RetryConfig {
            initial_delay_secs: 10,
            max_delay_secs: 25,
            backoff_multiplier: 2.0,
        });
        let interval = Duration::from_secs(5);
        let limited = CycleReport {
            rate_limited: true,
            ..Default::default()
        };

        assert_eq!(backoff.after("poll", &limited, interval), Duration::from_secs(15));
        assert_eq!(backoff.after("poll", &limited, interval), Duration::from_secs(25));
        assert_eq!(backoff.after("poll", &limited, interval), Duration::from_secs(30));
        assert_eq!(backoff.after("poll", &CycleReport::default(), interval), interval);
        assert_eq!(backoff.after("poll", &limited, interval), Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_wait_observes_shutdown() {
        let (sender, mut receiver) = watch::channel(false);
        assert!(ScoringScheduler::wait(&mut receiver, Duration::from_millis(1)).await);

        sender.send(true).unwrap();
        assert!(!ScoringScheduler::wait(&mut receiver, Duration::from_secs(60)).await);
    }
}
