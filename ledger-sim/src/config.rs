//! Configuration for simulated games and sessions
//!
//! Level 4 - Utilities and configuration

use std::path::PathBuf;

use ledger_core::world::{DEFAULT_CYCLE_LENGTH, DEFAULT_MAP_RADIUS, DEFAULT_MAX_TURNS};

use crate::army::DEFAULT_BUDGET;

/// Games between weight jitters in a training session
pub const DEFAULT_JITTER_INTERVAL: usize = 20;

/// Simulation configuration
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Map radius
    pub map_radius: i32,
    /// Turn cap per game
    pub max_turns: u32,
    /// Turns between score recomputations
    pub cycle_length: u32,
    /// Points budget for generated armies
    pub army_budget: i32,
    /// Fixed army for player 1 (None = generated)
    pub army1: Option<Vec<String>>,
    /// Fixed army for player 2 (None = generated)
    pub army2: Option<Vec<String>>,
    /// Jitter both agents every this many games (0 = never)
    pub jitter_interval: usize,
    /// Relative jitter applied to each weight
    pub jitter_variance: f64,
    /// Random seed for reproducibility (None = random)
    pub seed: Option<u64>,
    /// Record a narrative of each game
    pub narrative: bool,
    /// Directory for session output (None = no files written)
    pub output_dir: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            map_radius: DEFAULT_MAP_RADIUS,
            max_turns: DEFAULT_MAX_TURNS,
            cycle_length: DEFAULT_CYCLE_LENGTH,
            army_budget: DEFAULT_BUDGET,
            army1: None,
            army2: None,
            jitter_interval: DEFAULT_JITTER_INTERVAL,
            jitter_variance: ledger_core::agent::DEFAULT_JITTER,
            seed: None,
            narrative: false,
            output_dir: None,
        }
    }
}

impl SimConfig {
    pub fn with_map_radius(mut self, radius: i32) -> Self {
        self.map_radius = radius;
        self
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_cycle_length(mut self, cycle_length: u32) -> Self {
        self.cycle_length = cycle_length;
        self
    }

    pub fn with_budget(mut self, budget: i32) -> Self {
        self.army_budget = budget;
        self
    }

    /// Use fixed armies instead of generated ones
    pub fn with_armies(mut self, army1: Vec<String>, army2: Vec<String>) -> Self {
        self.army1 = Some(army1);
        self.army2 = Some(army2);
        self
    }

    pub fn with_jitter(mut self, interval: usize, variance: f64) -> Self {
        self.jitter_interval = interval;
        self.jitter_variance = variance;
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_narrative(mut self, narrative: bool) -> Self {
        self.narrative = narrative;
        self
    }

    /// Write game logs and session summaries under `dir`
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self.narrative = true;
        self
    }

    /// Seed of the first game; later games add their index
    pub fn base_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimConfig::default();
        assert_eq!(config.map_radius, 8);
        assert_eq!(config.max_turns, 50);
        assert_eq!(config.cycle_length, 10);
        assert_eq!(config.army_budget, 200);
        assert_eq!(config.jitter_interval, 20);
        assert!(config.output_dir.is_none());
    }

    #[test]
    fn test_builder() {
        let config = SimConfig::default()
            .with_seed(9)
            .with_max_turns(12)
            .with_output_dir("out");
        assert_eq!(config.base_seed(), 9);
        assert_eq!(config.max_turns, 12);
        assert!(config.narrative);
    }
}
