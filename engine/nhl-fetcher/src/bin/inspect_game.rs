use anyhow::{Context, Result};
use nhl_fetcher::{GameId, NhlApiClient, NhlApiConfig};
use tracing::info;

/// Print the normalized boxscore and play-by-play for one game.
///
/// Usage: inspect-game <game-id>
#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let game_id: GameId = std::env::args()
        .nth(1)
        .context("usage: inspect-game <game-id>")?
        .parse()
        .context("game id must be numeric")?;

    let client = NhlApiClient::new(NhlApiConfig::from_env()?)?;

    let boxscore = client.boxscore(game_id).await?;
    info!(
        "Game {} {} @ {} status {:?}, {} players",
        boxscore.game_id,
        boxscore.away_team,
        boxscore.home_team,
        boxscore.status,
        boxscore.players.len()
    );

    for player in &boxscore.players {
        println!(
            "{:>10} {:<24} {:<3} {:<2} G {} A {} SOG {} HIT {} BLK {} PIM {} +/- {}",
            player.player_id,
            player.name,
            player.team,
            player.position,
            player.goals,
            player.assists,
            player.shots,
            player.hits,
            player.blocks,
            player.pim,
            player.plus_minus
        );
    }

    let events = client.game_events(game_id).await?;
    info!("{} plays in feed", events.len());
    for event in &events {
        let players: Vec<String> = event
            .players
            .iter()
            .map(|p| format!("{}:{:?}", p.player_id, p.role))
            .collect();
        println!(
            "{:>6} P{} {:<6} {:<16} {}",
            event.event_id,
            event.period.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
            event.clock.as_deref().unwrap_or("-"),
            event.event_type,
            players.join(", ")
        );
    }

    Ok(())
}
