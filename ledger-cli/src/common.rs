//! Arguments and helpers shared by every command
//!
//! Level 4 - Configuration and utilities

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use ledger_core::{HeuristicAgent, Player, Roster, Weights};
use ledger_sim::SimConfig;

/// Game settings common to all commands
#[derive(Args, Clone, Debug)]
pub struct GameArgs {
    /// Map radius
    #[arg(long, default_value = "8", value_parser = clap::value_parser!(i32).range(1..))]
    pub map_radius: i32,

    /// Maximum turns per game
    #[arg(long, default_value = "50")]
    pub max_turns: u32,

    /// Turns between score recomputations
    #[arg(long, default_value = "10")]
    pub cycle_length: u32,

    /// Points budget for generated armies
    #[arg(long, default_value = "200")]
    pub budget: i32,

    /// Unit roster JSON file (built-in roster if omitted or unreadable)
    #[arg(long, value_name = "FILE")]
    pub roster: Option<PathBuf>,

    /// Starting weights JSON for both agents
    #[arg(long, value_name = "FILE")]
    pub weights: Option<PathBuf>,
}

impl GameArgs {
    /// Base simulation config from these arguments
    pub fn config(&self, seed: Option<u64>) -> SimConfig {
        let config = SimConfig::default()
            .with_map_radius(self.map_radius)
            .with_max_turns(self.max_turns)
            .with_cycle_length(self.cycle_length)
            .with_budget(self.budget);
        match seed {
            Some(s) => config.with_seed(s),
            None => config,
        }
    }

    pub fn roster(&self) -> Roster {
        Roster::load_or_builtin(self.roster.as_deref())
    }

    /// Both agents, starting from `--weights` when given
    pub fn agents(&self) -> Result<(HeuristicAgent, HeuristicAgent)> {
        let weights = match &self.weights {
            Some(path) => load_weights(path)?,
            None => Weights::default(),
        };
        Ok((
            HeuristicAgent::with_weights(Player::One, weights.clone()),
            HeuristicAgent::with_weights(Player::Two, weights),
        ))
    }
}

/// Read a weights JSON file
pub fn load_weights(path: &Path) -> Result<Weights> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read weights {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse weights {}", path.display()))
}

/// Write weights as pretty JSON
pub fn save_weights(path: &Path, weights: &Weights) -> Result<()> {
    let json = serde_json::to_string_pretty(weights)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write weights {}", path.display()))
}

/// Split a comma-separated army list
pub fn parse_army(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Print a value as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_army() {
        assert_eq!(
            parse_army("Rookie Squad, M14 Puma,,"),
            vec!["Rookie Squad".to_string(), "M14 Puma".to_string()]
        );
        assert!(parse_army("").is_empty());
    }

    #[test]
    fn test_weights_file_is_reloaded() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("weights.json");
        let weights = Weights::default().with(ledger_core::Factor::EliminateEnemy, 7.5);
        save_weights(&path, &weights).unwrap();
        assert_eq!(load_weights(&path).unwrap(), weights);
    }
}
