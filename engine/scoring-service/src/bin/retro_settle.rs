//! Operator CLI: settle a newly added player's past games for one roster

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use scoring_engine::{PlayerId, RetroactiveRequest};
use scoring_service::{initialize_logging, load_config, ScoringService};
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "retro-settle", about = "Back-fill points for games played before a player was added")]
struct Args {
    #[arg(long)]
    roster: Uuid,

    #[arg(long)]
    league: Uuid,

    #[arg(long)]
    player: PlayerId,

    /// When the player joined the roster (RFC 3339); defaults to now
    #[arg(long)]
    added_at: Option<DateTime<Utc>>,

    /// Print the player's breakdown for the roster after settling
    #[arg(long)]
    breakdown: bool,

    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.env_file.as_deref()).context("Failed to load configuration")?;
    initialize_logging(&config.logging)?;

    let service = ScoringService::new(config)
        .await
        .context("Failed to initialize scoring service")?;

    let request = RetroactiveRequest {
        roster_id: args.roster,
        league_id: args.league,
        player_id: args.player,
        added_at: args.added_at.unwrap_or_else(Utc::now),
        weights: None,
    };
    info!(
        "Settling player {} on roster {} as of {}",
        request.player_id, request.roster_id, request.added_at
    );

    let report = service
        .engine
        .settler
        .settle(&request)
        .await
        .context("Retroactive settlement failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if args.breakdown {
        let breakdown = service
            .engine
            .aggregator
            .stats_breakdown(request.roster_id, request.player_id)
            .await?;
        println!("{}", serde_json::to_string_pretty(&breakdown)?);
    }

    service.shutdown(Vec::new()).await
}
