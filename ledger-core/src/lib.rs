//! Lead Ledger Core - Game model, rules and heuristic agent
//!
//! This crate provides the core logic for Lead Ledger skirmishes:
//! - Hex geometry (axial coordinates)
//! - Units, weapons and penetration tables
//! - World state, line of sight and turn flow
//! - Rules engine for the major/minor action economy
//! - Single-ply heuristic agent with versioned weights
//! - Unit rosters (built-in datasheets and JSON files)

pub mod hex;
pub mod units;
pub mod world;
pub mod error;
pub mod rules;
pub mod weights;
pub mod agent;
pub mod roster;

// Re-exports for convenient access
pub use hex::{Hex, DIRECTIONS};
pub use units::{ArmorClass, Penetration, Unit, UnitClass, UnitId, Weapon};
pub use world::{Building, Player, World};
pub use error::RuleViolation;
pub use rules::{Action, Outcome, ShotReport, Slot};
pub use weights::{evaluate_world, Factor, Weights};
pub use agent::{ActionRecord, AgentStats, Candidate, HeuristicAgent, TurnReport};
pub use roster::{Roster, UnitSpec};
