//! Training sessions and parallel evaluation
//!
//! Level 1 - Orchestration

use std::path::PathBuf;

use ledger_core::{HeuristicAgent, Player, Roster, Weights};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::SimConfig;
use crate::game_runner::{play_game, run_game, setup_game, GameOutcome, GameRecord};
use crate::report;

/// Per-game line of a session report
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    pub game_number: usize,
    pub winner: Option<Player>,
    pub turns: u32,
    pub final_scores: [i32; 2],
    pub p1_units_left: usize,
    pub p2_units_left: usize,
    pub ai1_win_rate_after: f64,
    pub ai2_win_rate_after: f64,
}

/// Aggregate result of a batch of games
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub games_played: usize,
    pub p1_wins: usize,
    pub p2_wins: usize,
    pub ties: usize,
    pub average_turns: f64,
    pub ai1_win_rate: f64,
    pub ai2_win_rate: f64,
    pub ai1_games_played: u32,
    pub ai2_games_played: u32,
    pub ai1_final_weights: Weights,
    pub ai2_final_weights: Weights,
    pub game_results: Vec<GameSummary>,
}

impl SessionReport {
    fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            games_played: 0,
            p1_wins: 0,
            p2_wins: 0,
            ties: 0,
            average_turns: 0.0,
            ai1_win_rate: 0.0,
            ai2_win_rate: 0.0,
            ai1_games_played: 0,
            ai2_games_played: 0,
            ai1_final_weights: Weights::default(),
            ai2_final_weights: Weights::default(),
            game_results: Vec::new(),
        }
    }

    /// Fold one game into the totals
    fn add(&mut self, record: &GameRecord, ai1: &HeuristicAgent, ai2: &HeuristicAgent) {
        self.games_played += 1;
        match record.winner {
            Some(Player::One) => self.p1_wins += 1,
            Some(Player::Two) => self.p2_wins += 1,
            None => self.ties += 1,
        }
        self.game_results.push(GameSummary {
            game_number: self.games_played,
            winner: record.winner,
            turns: record.turns_played,
            final_scores: record.final_scores,
            p1_units_left: record.p1_units_remaining,
            p2_units_left: record.p2_units_remaining,
            ai1_win_rate_after: ai1.win_rate(),
            ai2_win_rate_after: ai2.win_rate(),
        });
    }

    /// Fill in the closing statistics
    fn finish(&mut self, ai1: &HeuristicAgent, ai2: &HeuristicAgent) {
        let total_turns: u64 = self.game_results.iter().map(|g| g.turns as u64).sum();
        self.average_turns = if self.games_played > 0 {
            total_turns as f64 / self.games_played as f64
        } else {
            0.0
        };
        self.ai1_win_rate = ai1.win_rate();
        self.ai2_win_rate = ai2.win_rate();
        self.ai1_games_played = ai1.games_played();
        self.ai2_games_played = ai2.games_played();
        self.ai1_final_weights = ai1.weights().clone();
        self.ai2_final_weights = ai2.weights().clone();
    }

    pub fn win_rate(&self, player: Player) -> f64 {
        if self.games_played == 0 {
            return 0.0;
        }
        let wins = match player {
            Player::One => self.p1_wins,
            Player::Two => self.p2_wins,
        };
        wins as f64 / self.games_played as f64
    }
}

/// Session id: local time to the millisecond plus the batch seed
fn session_id(base_seed: u64) -> String {
    format!(
        "{}_{base_seed:016x}",
        chrono::Local::now().format("%Y%m%d_%H%M%S_%3f")
    )
}

/// Create the session output directory, if output is configured
fn prepare_output(config: &SimConfig, id: &str) -> Option<PathBuf> {
    let base = config.output_dir.as_ref()?;
    let dir = report::session_dir(base, id);
    match std::fs::create_dir_all(&dir) {
        Ok(()) => {
            info!("Saving logs to: {}", dir.display());
            Some(dir)
        }
        Err(e) => {
            warn!("Cannot create {}: {e}; logs disabled", dir.display());
            None
        }
    }
}

fn save_game_log(dir: Option<&PathBuf>, game_number: usize, outcome: &GameOutcome) {
    if let Some(dir) = dir {
        if let Err(e) = report::write_game_log(dir, game_number, &outcome.narrative) {
            warn!("Failed to write log for game {game_number}: {e:#}");
        }
    }
}

fn save_summary(dir: Option<&PathBuf>, session: &SessionReport) {
    if let Some(dir) = dir {
        match report::write_session_report(dir, session) {
            Ok(()) => info!("Session summary saved to: {}", dir.display()),
            Err(e) => warn!("Failed to write session summary: {e:#}"),
        }
    }
}

// ============================================================================
// TRAINING
// ============================================================================

/// Run `games` sequential games between the two agents.
///
/// Both agents keep their statistics across games and are jittered every
/// `config.jitter_interval` games. `on_game` is called after each game.
pub fn run_training(
    config: &SimConfig,
    roster: &Roster,
    ai1: &mut HeuristicAgent,
    ai2: &mut HeuristicAgent,
    games: usize,
    mut on_game: impl FnMut(&GameSummary),
) -> SessionReport {
    let base_seed = config.base_seed();
    let id = session_id(base_seed);
    let out = prepare_output(config, &id);
    let mut jitter_rng = ChaCha8Rng::seed_from_u64(base_seed.rotate_left(32));

    info!("Starting training session {id}: {games} games, seed {base_seed}");
    let mut session = SessionReport::new(&id);

    for index in 0..games {
        let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(index as u64));
        let outcome = play_game(config, roster, ai1, ai2, &mut rng);

        session.add(&outcome.record, ai1, ai2);
        save_game_log(out.as_ref(), index + 1, &outcome);
        if let Some(summary) = session.game_results.last() {
            on_game(summary);
        }

        if config.jitter_interval > 0 && (index + 1) % config.jitter_interval == 0 {
            ai1.jitter(config.jitter_variance, &mut jitter_rng);
            ai2.jitter(config.jitter_variance, &mut jitter_rng);
            info!(
                "Weight adjustment at game {} (v{}/v{})",
                index + 1,
                ai1.weights().version,
                ai2.weights().version
            );
        }
    }

    session.finish(ai1, ai2);
    save_summary(out.as_ref(), &session);
    info!(
        "Session {id} done: P1 {} / P2 {} / ties {}",
        session.p1_wins, session.p2_wins, session.ties
    );
    session
}

// ============================================================================
// PARALLEL EVALUATION
// ============================================================================

/// Play `games` independent games in parallel with the agents' current
/// weights frozen.
///
/// Workers never touch the agents: each game builds its own agents from
/// copies of the weights and its own seeded RNG. Results are folded into the
/// agents' statistics afterwards, in game order.
pub fn run_evaluation(
    config: &SimConfig,
    roster: &Roster,
    ai1: &mut HeuristicAgent,
    ai2: &mut HeuristicAgent,
    games: usize,
) -> SessionReport {
    let base_seed = config.base_seed();
    let id = session_id(base_seed);
    let out = prepare_output(config, &id);

    let w1 = ai1.weights().clone();
    let w2 = ai2.weights().clone();

    info!("Evaluating {games} games in parallel, seed {base_seed}");
    let outcomes: Vec<GameOutcome> = (0..games)
        .into_par_iter()
        .map(|index| {
            let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(index as u64));
            let p1 = HeuristicAgent::with_weights(Player::One, w1.clone());
            let p2 = HeuristicAgent::with_weights(Player::Two, w2.clone());
            let mut world = setup_game(config, roster, &mut rng);
            run_game(&mut world, &p1, &p2, config.narrative, &mut rng)
        })
        .collect();

    let mut session = SessionReport::new(&id);
    for (index, outcome) in outcomes.iter().enumerate() {
        let winner = outcome.record.winner;
        ai1.record_result(winner == Some(Player::One));
        ai2.record_result(winner == Some(Player::Two));
        session.add(&outcome.record, ai1, ai2);
        save_game_log(out.as_ref(), index + 1, outcome);
    }

    session.finish(ai1, ai2);
    save_summary(out.as_ref(), &session);
    session
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimConfig {
        SimConfig::default().with_seed(1234).with_max_turns(8)
    }

    fn agents() -> (HeuristicAgent, HeuristicAgent) {
        (
            HeuristicAgent::new(Player::One),
            HeuristicAgent::new(Player::Two),
        )
    }

    #[test]
    fn test_training_totals() {
        let (mut ai1, mut ai2) = agents();
        let mut seen = 0;
        let report = run_training(&config(), &Roster::builtin(), &mut ai1, &mut ai2, 4, |_| seen += 1);

        assert_eq!(seen, 4);
        assert_eq!(report.games_played, 4);
        assert_eq!(report.p1_wins + report.p2_wins + report.ties, 4);
        assert_eq!(report.game_results.len(), 4);
        assert_eq!(report.ai1_games_played, 4);
        assert!((report.ai1_win_rate - report.p1_wins as f64 / 4.0).abs() < 1e-9);
        let last = report.game_results.last().unwrap();
        assert_eq!(last.ai1_win_rate_after, report.ai1_win_rate);
    }

    #[test]
    fn test_training_jitters_on_interval() {
        let (mut ai1, mut ai2) = agents();
        let config = config().with_jitter(2, 0.05);
        let report = run_training(&config, &Roster::builtin(), &mut ai1, &mut ai2, 5, |_| {});
        assert_eq!(ai1.weights().version, 2);
        assert_eq!(report.ai2_final_weights.version, 2);
    }

    #[test]
    fn test_training_is_reproducible() {
        let run = || {
            let (mut ai1, mut ai2) = agents();
            let config = config().with_jitter(1, 0.1);
            let report = run_training(&config, &Roster::builtin(), &mut ai1, &mut ai2, 3, |_| {});
            (report.game_results, report.ai1_final_weights)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_evaluation_matches_sequential_play() {
        let config = config().with_jitter(0, 0.0);

        let (mut a1, mut a2) = agents();
        let parallel = run_evaluation(&config, &Roster::builtin(), &mut a1, &mut a2, 4);

        let (mut b1, mut b2) = agents();
        let sequential = run_training(&config, &Roster::builtin(), &mut b1, &mut b2, 4, |_| {});

        assert_eq!(parallel.game_results, sequential.game_results);
        assert_eq!(a1.games_played(), 4);
        assert_eq!(a1.weights().version, 0);
    }

    #[test]
    fn test_session_ids_differ_by_seed() {
        let a = session_id(1);
        let b = session_id(2);
        assert_ne!(a, b);
        assert!(a.ends_with("_0000000000000001"));
        // date_time_millis_seed
        assert_eq!(a.split('_').count(), 4);
    }

    #[test]
    fn test_concurrent_sessions_get_separate_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let base = SimConfig::default().with_max_turns(4).with_output_dir(tmp.path());

        let (mut a1, mut a2) = agents();
        let first = run_training(&base.clone().with_seed(1), &Roster::builtin(), &mut a1, &mut a2, 1, |_| {});
        let (mut b1, mut b2) = agents();
        let second = run_training(&base.with_seed(2), &Roster::builtin(), &mut b1, &mut b2, 1, |_| {});

        assert_ne!(first.session_id, second.session_id);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_empty_session() {
        let (mut ai1, mut ai2) = agents();
        let report = run_training(&config(), &Roster::builtin(), &mut ai1, &mut ai2, 0, |_| {});
        assert_eq!(report.games_played, 0);
        assert_eq!(report.average_turns, 0.0);
        assert_eq!(report.win_rate(Player::One), 0.0);
    }
}
