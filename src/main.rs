//! Fairround CLI
//!
//! Manual verification tools: hash a seed, recompute an outcome, verify a saved round
//! record, or replay a recorded event log through a session.

use clap::{Parser, Subcommand};
use fairround::{
    config::{ConfigLoader, FairroundConfig},
    driver::SessionDriver,
    errors::{CodecError, FairroundResult},
    fairness::FairnessVerifier,
    games::{BetParameters, GameKind, GameSpec, Seat, SeedInput},
    session::{ClientSeedGenerator, Round, RoundSession},
};
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Provably-fair round verification
#[derive(Parser)]
#[command(name = "fairround")]
#[command(about = "Verify provably-fair coinflip, crash, dice, mines and plinko rounds")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SHA-256 commitment of a server seed
    Hash {
        seed: String,
    },

    /// Recompute an outcome from revealed seeds
    Derive {
        /// coinflip, crash, dice, mines or plinko
        #[arg(short, long)]
        game: GameKind,

        #[arg(long)]
        server_seed: String,

        #[arg(long)]
        client_seed: String,

        #[arg(short, long)]
        nonce: String,

        /// Other coinflip player's client seed
        #[arg(long)]
        opponent_seed: Option<String>,

        /// Coinflip: the player joined rather than created the game
        #[arg(long)]
        joiner: bool,

        /// Player address (mines)
        #[arg(long)]
        player: Option<String>,

        /// Number of mines
        #[arg(long, default_value = "3")]
        mines: u8,

        /// Plinko rows
        #[arg(long, default_value = "16")]
        rows: u8,

        /// Plinko balls
        #[arg(long, default_value = "1")]
        balls: u8,
    },

    /// Verify a saved round record (JSON)
    Verify {
        round: PathBuf,
    },

    /// Replay a JSON-lines event log through a fresh session
    Replay {
        /// Event log, one inbound frame per line
        log: PathBuf,

        #[arg(short, long)]
        game: GameKind,

        /// Bet parameters as JSON, e.g. '{"game":"dice","amount":100,"roll_under":50}'
        #[arg(short, long)]
        bet: String,

        #[arg(short, long, default_value = "replay")]
        player: String,

        /// Client seed the recorded round used
        #[arg(long)]
        client_seed: Option<String>,
    },
}

#[tokio::main]
async fn main() -> FairroundResult<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_path(path);
    }
    let config = loader.load()?;

    init_tracing(&config, cli.verbose);

    match cli.command {
        Commands::Hash { seed } => {
            println!("{}", FairnessVerifier::hash_seed(&seed));
            Ok(())
        }
        Commands::Derive {
            game,
            server_seed,
            client_seed,
            nonce,
            opponent_seed,
            joiner,
            player,
            mines,
            rows,
            balls,
        } => {
            let spec = game_spec(game, &config, mines, rows, balls);
            let mut input = SeedInput::new(&server_seed, &client_seed, &nonce);
            if let Some(opponent) = opponent_seed.as_deref() {
                let seat = if joiner { Seat::Joiner } else { Seat::Creator };
                input = input.with_opponent(opponent, seat);
            }
            if let Some(player) = player.as_deref() {
                input = input.with_player(player);
            }

            match FairnessVerifier::derive_outcome(&spec, &input) {
                Ok(outcome) => print_json(&outcome),
                Err(failure) => {
                    eprintln!("❌ {}", failure);
                    std::process::exit(1);
                }
            }
        }
        Commands::Verify { round } => verify_record(round, &config).await,
        Commands::Replay {
            log,
            game,
            bet,
            player,
            client_seed,
        } => replay(log, game, &bet, player, client_seed, &config).await,
    }
}

fn init_tracing(config: &FairroundConfig, verbose: bool) {
    let fallback = if verbose {
        "fairround=debug".to_string()
    } else {
        config.logging.filter.clone()
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn game_spec(game: GameKind, config: &FairroundConfig, mines: u8, rows: u8, balls: u8) -> GameSpec {
    match game {
        GameKind::Coinflip => GameSpec::Coinflip,
        GameKind::Dice => GameSpec::Dice,
        GameKind::Crash => GameSpec::Crash {
            house_edge_bps: config.games.crash_house_edge_bps,
        },
        GameKind::Mines => GameSpec::Mines {
            grid_size: config.games.mines_grid_size,
            mines,
        },
        GameKind::Plinko => GameSpec::Plinko { rows, balls },
    }
}

async fn verify_record(path: PathBuf, config: &FairroundConfig) -> FairroundResult<()> {
    let content = tokio::fs::read_to_string(&path).await?;
    let round: Round = serde_json::from_str(&content).map_err(CodecError::from)?;

    let report = FairnessVerifier::verify_round(&round, &config.games);
    print_json(&report)?;

    if report.is_verified() {
        println!("✅ Round verified");
        Ok(())
    } else {
        println!("❌ Round failed verification");
        std::process::exit(1);
    }
}

async fn replay(
    log: PathBuf,
    game: GameKind,
    bet: &str,
    player: String,
    client_seed: Option<String>,
    config: &FairroundConfig,
) -> FairroundResult<()> {
    let bet: BetParameters = serde_json::from_str(bet).map_err(CodecError::from)?;

    let mut session = RoundSession::new(game, player, config);
    if let Some(seed) = client_seed {
        session = session.with_seed_generator(ClientSeedGenerator::fixed(seed));
    }

    let mut driver = SessionDriver::new(session, config.session.update_channel_capacity);
    let request = driver.session_mut().submit(bet)?;
    info!(client_seed = %request.client_seed, "Replaying with submitted bet");

    let content = tokio::fs::read_to_string(&log).await?;
    let frames: Vec<String> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect();

    // No commands during a replay
    let (_commands, receiver) = mpsc::channel(1);
    let session = driver.run(futures::stream::iter(frames), receiver).await;

    if let Some(display) = session.verification_display() {
        print_json(&display)?;
    }
    let report = session.verify();
    print_json(&report)?;
    print_json(&session.metrics().snapshot())?;

    if report.is_verified() {
        println!("✅ Replayed round verified");
        Ok(())
    } else {
        println!("❌ Replayed round failed verification");
        std::process::exit(1);
    }
}

fn print_json<T: Serialize>(value: &T) -> FairroundResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(CodecError::from)?;
    println!("{}", text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert()
    }

    #[test]
    fn test_parse_derive() {
        let cli = Cli::try_parse_from([
            "fairround", "derive", "--game", "dice", "--server-seed", "s", "--client-seed", "c", "--nonce", "42",
        ])
        .unwrap();

        assert!(matches!(cli.command, Commands::Derive { game: GameKind::Dice, .. }));
    }

    #[test]
    fn test_game_spec_uses_config() {
        let mut config = FairroundConfig::default();
        config.games.crash_house_edge_bps = 250;

        assert_eq!(
            game_spec(GameKind::Crash, &config, 3, 16, 1),
            GameSpec::Crash { house_edge_bps: 250 }
        );
        assert_eq!(
            game_spec(GameKind::Mines, &config, 5, 16, 1),
            GameSpec::Mines { grid_size: 25, mines: 5 }
        );
    }
}
