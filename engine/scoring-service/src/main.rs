//! Scoring Service
//!
//! Discovers today's games, scores live play-by-play for every active lineup, reconciles
//! finished games against the boxscore and publishes point updates until shut down.

use anyhow::{Context, Result};
use clap::Parser;
use scoring_engine::GameId;
use std::path::PathBuf;
use tracing::info;

use scoring_service::{initialize_logging, load_config, setup_signal_handlers, ScoringService};

#[derive(Parser, Debug)]
#[command(name = "scoring-service", about = "Live fantasy-hockey scoring service")]
struct Args {
    /// Env file loaded before the process environment is read
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Poll these games from startup regardless of their schedule status
    #[arg(long = "track", value_name = "GAME_ID")]
    track: Vec<GameId>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.env_file.as_deref()).context("Failed to load configuration")?;
    initialize_logging(&config.logging)?;

    info!("Starting Scoring Service v{}", env!("CARGO_PKG_VERSION"));

    let service = ScoringService::new(config)
        .await
        .context("Failed to initialize scoring service")?;
    for game_id in args.track {
        service.engine.directory.track_game(game_id);
    }

    let shutdown_signal = setup_signal_handlers()?;
    let tasks = service.start();

    info!("Scoring Service is running. Press Ctrl+C to shutdown gracefully.");
    let _ = shutdown_signal.await;

    info!("Shutdown signal received. Initiating graceful shutdown...");
    service.shutdown(tasks).await?;

    info!("Scoring Service shutdown complete");
    Ok(())
}
