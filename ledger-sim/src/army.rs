//! Army composition within a points budget
//!
//! Level 4 - Utilities

use rand::seq::SliceRandom;
use rand::Rng;

/// Default points budget per army
pub const DEFAULT_BUDGET: i32 = 200;

/// Minimum infantry units in a generated army
const MIN_INFANTRY: usize = 2;

/// A purchasable unit type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub cost: i32,
    pub role: &'static str,
}

impl CatalogEntry {
    pub fn is_infantry(&self) -> bool {
        self.role == "Infantry"
    }
}

/// Units available to generated armies
pub const CATALOG: [CatalogEntry; 4] = [
    CatalogEntry { name: "Rookie Squad", cost: 20, role: "Infantry" },
    CatalogEntry { name: "M14 Puma", cost: 50, role: "Light Tank" },
    CatalogEntry { name: "M24 Grizzly", cost: 45, role: "IFV" },
    CatalogEntry { name: "M29 Vindicator", cost: 60, role: "Tank Destroyer" },
];

/// Greedy budgeted army: infantry first, then random affordable picks
/// until nothing fits
pub fn balanced_army<R: Rng + ?Sized>(budget: i32, rng: &mut R) -> Vec<String> {
    let mut army = Vec::new();
    let mut spent = 0;

    if let Some(infantry) = CATALOG.iter().find(|e| e.is_infantry()) {
        while army.len() < MIN_INFANTRY && spent + infantry.cost <= budget {
            army.push(infantry.name.to_string());
            spent += infantry.cost;
        }
    }

    loop {
        let affordable: Vec<&CatalogEntry> =
            CATALOG.iter().filter(|e| e.cost <= budget - spent).collect();
        let Some(pick) = affordable.choose(rng) else {
            break;
        };
        army.push(pick.name.to_string());
        spent += pick.cost;
    }

    army
}

/// Points cost of a list of unit names; unknown names cost nothing
pub fn army_cost(army: &[String]) -> i32 {
    army.iter()
        .filter_map(|name| CATALOG.iter().find(|e| e.name == name))
        .map(|e| e.cost)
        .sum()
}
