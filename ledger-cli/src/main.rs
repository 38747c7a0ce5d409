//! Lead Ledger CLI - Command-line interface
//!
//! Commands:
//! - train: Self-play training session with periodic weight jitter
//! - play: Play a single narrated game
//! - evaluate: Play a batch of games in parallel with frozen weights

mod common;
mod evaluate;
mod play;
mod train;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ledger")]
#[command(about = "Lead Ledger hex skirmish simulator")]
struct Cli {
    /// Random seed for reproducible runs
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a self-play training session
    Train(train::TrainArgs),
    /// Play a single game and print its narrative
    Play(play::PlayArgs),
    /// Evaluate the current weights over a parallel batch of games
    Evaluate(evaluate::EvaluateArgs),
}

fn main() -> Result<()> {
    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train(args) => train::run(args, cli.seed),
        Commands::Play(args) => play::run(args, cli.seed),
        Commands::Evaluate(args) => evaluate::run(args, cli.seed),
    }
}
