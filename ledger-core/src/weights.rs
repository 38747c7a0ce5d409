//! Heuristic weights and static world evaluation

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::world::{Player, World};

/// A named term of the heuristic
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    EliminateEnemy,
    CaptureBuilding,
    ProtectUnit,
    PositionAdvantage,
    DamageDealt,
    HealthPreservation,
    BuildingControl,
}

impl Factor {
    pub const ALL: [Factor; 7] = [
        Factor::EliminateEnemy,
        Factor::CaptureBuilding,
        Factor::ProtectUnit,
        Factor::PositionAdvantage,
        Factor::DamageDealt,
        Factor::HealthPreservation,
        Factor::BuildingControl,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Factor::EliminateEnemy => "eliminate_enemy",
            Factor::CaptureBuilding => "capture_building",
            Factor::ProtectUnit => "protect_unit",
            Factor::PositionAdvantage => "position_advantage",
            Factor::DamageDealt => "damage_dealt",
            Factor::HealthPreservation => "health_preservation",
            Factor::BuildingControl => "building_control",
        }
    }

    pub fn default_value(self) -> f64 {
        match self {
            Factor::EliminateEnemy => 100.0,
            Factor::CaptureBuilding => 80.0,
            Factor::ProtectUnit => 70.0,
            Factor::PositionAdvantage => 50.0,
            Factor::DamageDealt => 60.0,
            Factor::HealthPreservation => 40.0,
            Factor::BuildingControl => 90.0,
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Versioned weight set.
///
/// Never mutated in place: tuning returns a new value with the next version,
/// which the agent then swaps in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub version: u32,
    values: BTreeMap<Factor, f64>,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            version: 0,
            values: Factor::ALL.iter().map(|&f| (f, f.default_value())).collect(),
        }
    }
}

impl Weights {
    /// Weight for a factor; a factor missing from a loaded set uses its default
    pub fn get(&self, factor: Factor) -> f64 {
        self.values
            .get(&factor)
            .copied()
            .unwrap_or_else(|| factor.default_value())
    }

    /// Copy with one weight replaced
    pub fn with(&self, factor: Factor, value: f64) -> Self {
        let mut values = self.values.clone();
        values.insert(factor, value);
        Self {
            version: self.version + 1,
            values,
        }
    }

    /// Copy with every weight scaled by an independent `1 + U(-variance, variance)`
    pub fn jitter<R: Rng + ?Sized>(&self, variance: f64, rng: &mut R) -> Self {
        let values = Factor::ALL
            .iter()
            .map(|&f| {
                let adjustment = if variance > 0.0 {
                    rng.gen_range(-variance..=variance)
                } else {
                    0.0
                };
                (f, self.get(f) * (1.0 + adjustment))
            })
            .collect();
        Self {
            version: self.version + 1,
            values,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Factor, f64)> + '_ {
        Factor::ALL.iter().map(move |&f| (f, self.get(f)))
    }
}

impl fmt::Display for Weights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "weights v{}", self.version)?;
        for (factor, value) in self.iter() {
            writeln!(f, "  {factor}: {value:.2}")?;
        }
        Ok(())
    }
}

/// Static evaluation of `world` from `player`'s side
pub fn evaluate_world(world: &World, player: Player, weights: &Weights) -> f64 {
    let enemy = player.opponent();
    let mut score = 0.0;

    let (mine, theirs) = world.buildings().fold((0, 0), |(m, t), b| {
        (m + b.pips_of(player), t + b.pips_of(enemy))
    });
    score += (mine - theirs) as f64 * weights.get(Factor::BuildingControl);

    let my_health: i32 = world.living_units(player).map(|u| u.current_health).sum();
    let enemy_health: i32 = world.living_units(enemy).map(|u| u.current_health).sum();
    score += (my_health - enemy_health) as f64 * weights.get(Factor::HealthPreservation);

    let count_diff = world.living_count(player) as f64 - world.living_count(enemy) as f64;
    score += count_diff * weights.get(Factor::EliminateEnemy);

    for unit in world.living_units(player) {
        let Some(pos) = unit.position else { continue };

        for b in world.buildings() {
            let d = pos.distance(b.position);
            if d <= 2 {
                score += ((3 - d) * 10) as f64;
            }
        }

        if let Some(range) = unit.max_weapon_range() {
            let in_range = world
                .living_units(enemy)
                .filter_map(|e| e.position)
                .filter(|&p| pos.distance(p) <= range)
                .count();
            score += in_range as f64 * 20.0;
        }
    }

    score
}
