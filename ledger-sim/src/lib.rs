//! Lead Ledger Sim - Game orchestration and self-play training
//!
//! This crate builds games and runs them to completion:
//! - Army composition within a points budget
//! - Random map generation and deployment zones
//! - Single games between two heuristic agents
//! - Training sessions with periodic weight jitter
//! - Parallel evaluation with frozen weights
//! - Session reports (game logs, text summary, JSON data)
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run_training, run_evaluation (orchestration)
//! - Level 2: play_game (phases)
//! - Level 3: setup_game, run_game (steps)
//! - Level 4: army, map generation, configuration

mod army;
mod config;
mod game_runner;
mod map_gen;
mod report;
mod session;

pub use army::{army_cost, balanced_army, CatalogEntry, CATALOG, DEFAULT_BUDGET};
pub use config::{SimConfig, DEFAULT_JITTER_INTERVAL};
pub use game_runner::{play_game, run_game, setup_game, GameOutcome, GameRecord};
pub use map_gen::{deployment_facing, deployment_zone, generate_map, MapLayout, BUILDING_PIPS};
pub use report::{format_summary, session_dir, write_game_log, write_session_report};
pub use session::{run_evaluation, run_training, GameSummary, SessionReport};
