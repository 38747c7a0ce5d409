//! Play command - one narrated game between two agents
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: play_single_game(), report_results()
//! - Level 4: RNG creation, output

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use ledger_sim::{play_game, write_game_log, GameOutcome, GameRecord};

use crate::common::{parse_army, print_json, GameArgs};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct PlayArgs {
    #[command(flatten)]
    pub game: GameArgs,

    /// Player 1 army as comma-separated unit names (generated if omitted)
    #[arg(long, value_name = "UNITS")]
    pub army1: Option<String>,

    /// Player 2 army as comma-separated unit names (generated if omitted)
    #[arg(long, value_name = "UNITS")]
    pub army2: Option<String>,

    /// Also write the narrative to a log in this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Output the result as JSON instead of the narrative
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct PlayOutput<'a> {
    played_at: String,
    seed: u64,
    #[serde(flatten)]
    record: &'a GameRecord,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

pub fn run(args: PlayArgs, seed: Option<u64>) -> Result<()> {
    let seed = seed.unwrap_or_else(rand::random);
    tracing::info!("Playing one game (seed {seed})");

    let outcome = play_single_game(&args, seed)?;

    if let Some(dir) = &args.log_dir {
        let path = write_game_log(dir, 1, &outcome.narrative)?;
        tracing::info!("Narrative saved to {}", path.display());
    }

    report_results(&outcome, seed, &args)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn play_single_game(args: &PlayArgs, seed: u64) -> Result<GameOutcome> {
    let mut config = args.game.config(Some(seed)).with_narrative(true);
    config.army1 = args.army1.as_deref().map(parse_army);
    config.army2 = args.army2.as_deref().map(parse_army);

    let roster = args.game.roster();
    let (mut ai1, mut ai2) = args.game.agents()?;
    let mut rng = create_rng(seed);

    Ok(play_game(&config, &roster, &mut ai1, &mut ai2, &mut rng))
}

fn report_results(outcome: &GameOutcome, seed: u64, args: &PlayArgs) -> Result<()> {
    if args.json {
        return print_json(&PlayOutput {
            played_at: chrono::Local::now().to_rfc3339(),
            seed,
            record: &outcome.record,
        });
    }
    for line in &outcome.narrative {
        println!("{line}");
    }
    Ok(())
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn create_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}
