//! Train command - sequential self-play with periodic weight jitter
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: setup_session(), run_session(), save_results(), report_results()
//! - Level 3: create_progress_bar()
//! - Level 4: formatting utilities

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use ledger_core::{HeuristicAgent, Roster};
use ledger_sim::{format_summary, run_training, SessionReport, SimConfig, DEFAULT_JITTER_INTERVAL};

use crate::common::{print_json, save_weights, GameArgs};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct TrainArgs {
    /// Number of games to play
    #[arg(long, default_value = "100")]
    pub games: usize,

    #[command(flatten)]
    pub game: GameArgs,

    /// Jitter both agents' weights every N games (0 disables)
    #[arg(long, default_value_t = DEFAULT_JITTER_INTERVAL)]
    pub jitter_interval: usize,

    /// Relative jitter applied to each weight
    #[arg(long, default_value = "0.05")]
    pub jitter_variance: f64,

    /// Directory for game logs and the session summary
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Write player 1's final weights to this file
    #[arg(long, value_name = "FILE")]
    pub save_weights: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run train command
///
/// 1. Build config, roster and agents
/// 2. Play the session
/// 3. Save weights and report
pub fn run(args: TrainArgs, seed: Option<u64>) -> Result<()> {
    let (config, roster, mut ai1, mut ai2) = setup_session(&args, seed)?;

    tracing::info!(
        "Training: {} games, radius {}, {} turns, jitter every {}",
        args.games,
        config.map_radius,
        config.max_turns,
        config.jitter_interval
    );

    let report = run_session(&config, &roster, &mut ai1, &mut ai2, &args)?;

    save_results(&ai1, &args)?;
    report_results(&report, &args)?;

    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn setup_session(
    args: &TrainArgs,
    seed: Option<u64>,
) -> Result<(SimConfig, Roster, HeuristicAgent, HeuristicAgent)> {
    let mut config = args
        .game
        .config(seed)
        .with_jitter(args.jitter_interval, args.jitter_variance);
    if let Some(dir) = &args.output {
        config = config.with_output_dir(dir);
    }
    let roster = args.game.roster();
    let (ai1, ai2) = args.game.agents()?;
    Ok((config, roster, ai1, ai2))
}

fn run_session(
    config: &SimConfig,
    roster: &Roster,
    ai1: &mut HeuristicAgent,
    ai2: &mut HeuristicAgent,
    args: &TrainArgs,
) -> Result<SessionReport> {
    let pb = create_progress_bar(args.games, args.json)?;

    let report = run_training(config, roster, ai1, ai2, args.games, |game| {
        pb.inc(1);
        pb.set_message(format!(
            "P1 {:.0}% / P2 {:.0}%",
            game.ai1_win_rate_after * 100.0,
            game.ai2_win_rate_after * 100.0
        ));
    });

    pb.finish_and_clear();
    Ok(report)
}

fn save_results(ai1: &HeuristicAgent, args: &TrainArgs) -> Result<()> {
    if let Some(path) = &args.save_weights {
        save_weights(path, ai1.weights())?;
        tracing::info!("Weights v{} saved to {}", ai1.weights().version, path.display());
    }
    Ok(())
}

fn report_results(report: &SessionReport, args: &TrainArgs) -> Result<()> {
    if args.json {
        print_json(report)
    } else {
        print!("{}", format_summary(report));
        Ok(())
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Progress bar over the session's games, hidden for JSON output
fn create_progress_bar(games: usize, hidden: bool) -> Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(games as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}
