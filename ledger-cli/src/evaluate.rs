//! Evaluate command - parallel batch with frozen weights
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: run_batch(), report_results()
//! - Level 4: text output

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Args;

use ledger_core::Player;
use ledger_sim::{run_evaluation, SessionReport};

use crate::common::{print_json, GameArgs};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct EvaluateArgs {
    /// Number of games to play
    #[arg(long, default_value = "100")]
    pub games: usize,

    #[command(flatten)]
    pub game: GameArgs,

    /// Directory for game logs and the session summary
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

pub fn run(args: EvaluateArgs, seed: Option<u64>) -> Result<()> {
    tracing::info!("Evaluating {} games", args.games);

    let start = Instant::now();
    let report = run_batch(&args, seed)?;
    tracing::info!("Evaluation finished in {:.2?}", start.elapsed());

    report_results(&report, &args)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn run_batch(args: &EvaluateArgs, seed: Option<u64>) -> Result<SessionReport> {
    let mut config = args.game.config(seed).with_jitter(0, 0.0);
    if let Some(dir) = &args.output {
        config = config.with_output_dir(dir);
    }
    let roster = args.game.roster();
    let (mut ai1, mut ai2) = args.game.agents()?;

    Ok(run_evaluation(&config, &roster, &mut ai1, &mut ai2, args.games))
}

fn report_results(report: &SessionReport, args: &EvaluateArgs) -> Result<()> {
    if args.json {
        return print_json(report);
    }
    print_text_results(report);
    Ok(())
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn print_text_results(report: &SessionReport) {
    println!("\n=== Evaluation Results ===");
    println!("Total games: {}", report.games_played);
    println!(
        "Player 1 wins: {} ({:.1}%)",
        report.p1_wins,
        report.win_rate(Player::One) * 100.0
    );
    println!(
        "Player 2 wins: {} ({:.1}%)",
        report.p2_wins,
        report.win_rate(Player::Two) * 100.0
    );
    println!("Ties:          {}", report.ties);
    println!("Avg turns:     {:.1}", report.average_turns);
}
