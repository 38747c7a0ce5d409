//! Unit and weapon definitions

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hex::Hex;
use crate::world::Player;

/// Unit identifier (key into the world's unit map)
pub type UnitId = u32;

/// Weapon keyword: +2 range
pub const KW_LONG: &str = "Long";
/// Weapon keyword: may only fire into the frontal arc
pub const KW_FRONTAL: &str = "Frontal";
/// Weapon keyword: may take a minor shot right after an advance
pub const KW_ASSAULT: &str = "Assault";

/// Range bonus granted by the `Long` keyword
pub const LONG_RANGE_BONUS: i32 = 2;

/// Armor class
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArmorClass {
    #[serde(rename = "N")]
    None,
    #[serde(rename = "L")]
    Light,
    #[serde(rename = "M")]
    Medium,
    #[serde(rename = "H")]
    Heavy,
}

impl ArmorClass {
    pub fn code(self) -> &'static str {
        match self {
            ArmorClass::None => "N",
            ArmorClass::Light => "L",
            ArmorClass::Medium => "M",
            ArmorClass::Heavy => "H",
        }
    }
}

/// Broad classification derived from a unit's tags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitClass {
    Infantry,
    Vehicle,
    Aircraft,
    Hover,
}

/// Die-roll requirement to penetrate one armor class
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Penetration {
    /// "N+": roll N or higher
    AtLeast(u8),
    /// "N-": roll N or lower
    AtMost(u8),
    /// "NA": cannot penetrate
    NotApplicable,
}

impl Penetration {
    /// Whether `roll` satisfies the requirement
    pub fn is_met(self, roll: u8) -> bool {
        match self {
            Penetration::AtLeast(n) => roll >= n,
            Penetration::AtMost(n) => roll <= n,
            Penetration::NotApplicable => false,
        }
    }

    /// Requirement for an unaimed snap shot: never easier than 9+ or 4-
    pub fn snap_shot(self) -> Self {
        match self {
            Penetration::AtLeast(n) if n < 9 => Penetration::AtLeast(9),
            Penetration::AtMost(n) if n > 4 => Penetration::AtMost(4),
            other => other,
        }
    }

    /// Chance that a single d12 meets the requirement
    pub fn hit_probability(self) -> f64 {
        match self {
            Penetration::AtLeast(n) => (13.0 - n as f64) / 12.0,
            Penetration::AtMost(n) => n as f64 / 12.0,
            Penetration::NotApplicable => 0.0,
        }
    }
}

impl TryFrom<String> for Penetration {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl std::str::FromStr for Penetration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("NA") {
            return Ok(Penetration::NotApplicable);
        }
        let parse = |digits: &str| {
            digits
                .parse::<u8>()
                .map_err(|_| format!("invalid penetration value: {s:?}"))
        };
        if let Some(digits) = s.strip_suffix('+') {
            Ok(Penetration::AtLeast(parse(digits)?))
        } else if let Some(digits) = s.strip_suffix('-') {
            Ok(Penetration::AtMost(parse(digits)?))
        } else {
            Err(format!("invalid penetration value: {s:?}"))
        }
    }
}

impl From<Penetration> for String {
    fn from(p: Penetration) -> Self {
        p.to_string()
    }
}

impl fmt::Display for Penetration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Penetration::AtLeast(n) => write!(f, "{n}+"),
            Penetration::AtMost(n) => write!(f, "{n}-"),
            Penetration::NotApplicable => f.write_str("NA"),
        }
    }
}

/// A weapon carried by a unit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    pub range: i32,
    /// Requirement per armor class; a missing class cannot be penetrated
    pub penetration: BTreeMap<ArmorClass, Penetration>,
    #[serde(default)]
    pub fortification_damage: i32,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Carried as data only; no rule consumes it
    #[serde(default)]
    pub ammo: Option<u32>,
}

impl Weapon {
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k == keyword)
    }

    /// Range including the `Long` bonus
    pub fn effective_range(&self) -> i32 {
        if self.has_keyword(KW_LONG) {
            self.range + LONG_RANGE_BONUS
        } else {
            self.range
        }
    }

    pub fn requirement(&self, armor: ArmorClass) -> Penetration {
        self.penetration
            .get(&armor)
            .copied()
            .unwrap_or(Penetration::NotApplicable)
    }

    /// Check if a roll penetrates the given armor
    pub fn can_penetrate(&self, armor: ArmorClass, roll: u8) -> bool {
        self.requirement(armor).is_met(roll)
    }
}

/// A unit in play
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub movement: i32,
    pub armor: ArmorClass,
    pub control: i32,
    pub max_health: i32,
    pub current_health: i32,
    pub weapons: Vec<Weapon>,
    pub abilities: Vec<String>,
    pub tags: Vec<String>,
    pub position: Option<Hex>,
    pub facing: u8,
    pub owner: Player,

    // Per-turn state
    pub has_moved: bool,
    pub has_shot: bool,
    pub movement_used: i32,
    pub weapons_fired: BTreeSet<usize>,
    pub in_overwatch: bool,
    pub overwatch_arc: Option<u8>,
}

impl Unit {
    /// Fresh unit at full health with cleared turn state
    pub fn new(id: UnitId, name: impl Into<String>, owner: Player) -> Self {
        Self {
            id,
            name: name.into(),
            movement: 1,
            armor: ArmorClass::None,
            control: 0,
            max_health: 1,
            current_health: 1,
            weapons: Vec::new(),
            abilities: Vec::new(),
            tags: Vec::new(),
            position: None,
            facing: 0,
            owner,
            has_moved: false,
            has_shot: false,
            movement_used: 0,
            weapons_fired: BTreeSet::new(),
            in_overwatch: false,
            overwatch_arc: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current_health > 0
    }

    pub fn class(&self) -> UnitClass {
        for tag in &self.tags {
            if tag.contains("Infantry") {
                return UnitClass::Infantry;
            } else if tag.contains("Aircraft") {
                return UnitClass::Aircraft;
            } else if tag.contains("Hover") {
                return UnitClass::Hover;
            }
        }
        UnitClass::Vehicle
    }

    /// Remove health, never below zero
    pub fn take_damage(&mut self, amount: i32) {
        self.current_health = (self.current_health - amount).max(0);
    }

    pub fn remaining_movement(&self) -> i32 {
        self.movement - self.movement_used
    }

    pub fn max_weapon_range(&self) -> Option<i32> {
        self.weapons.iter().map(|w| w.range).max()
    }

    pub fn has_assault_weapon(&self) -> bool {
        self.weapons.iter().any(|w| w.has_keyword(KW_ASSAULT))
    }

    /// Clear the per-turn flags at the start of the owner's turn
    pub fn reset_turn_state(&mut self) {
        self.has_moved = false;
        self.has_shot = false;
        self.movement_used = 0;
        self.weapons_fired.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rifle() -> Weapon {
        Weapon {
            name: "Rifle".into(),
            range: 2,
            penetration: BTreeMap::from([
                (ArmorClass::None, Penetration::AtLeast(3)),
                (ArmorClass::Light, "5+".parse().unwrap()),
                (ArmorClass::Medium, Penetration::AtMost(4)),
            ]),
            fortification_damage: 0,
            keywords: vec!["Long".into()],
            ammo: None,
        }
    }

    #[test]
    fn test_can_penetrate() {
        let w = rifle();
        assert!(w.can_penetrate(ArmorClass::Light, 6));
        assert!(!w.can_penetrate(ArmorClass::Light, 4));
        assert!(w.can_penetrate(ArmorClass::Medium, 4));
        assert!(!w.can_penetrate(ArmorClass::Medium, 5));
        // Missing class is NA
        assert!(!w.can_penetrate(ArmorClass::Heavy, 12));
    }

    #[test]
    fn test_penetration_parse() {
        assert_eq!("3+".parse::<Penetration>(), Ok(Penetration::AtLeast(3)));
        assert_eq!("13+".parse::<Penetration>(), Ok(Penetration::AtLeast(13)));
        assert_eq!("8-".parse::<Penetration>(), Ok(Penetration::AtMost(8)));
        assert_eq!("NA".parse::<Penetration>(), Ok(Penetration::NotApplicable));
        assert!("x".parse::<Penetration>().is_err());
        assert_eq!(Penetration::AtMost(7).to_string(), "7-");
    }

    #[test]
    fn test_snap_shot() {
        assert_eq!(Penetration::AtLeast(5).snap_shot(), Penetration::AtLeast(9));
        assert_eq!(Penetration::AtLeast(10).snap_shot(), Penetration::AtLeast(10));
        assert_eq!(Penetration::AtMost(8).snap_shot(), Penetration::AtMost(4));
        assert_eq!(Penetration::AtMost(3).snap_shot(), Penetration::AtMost(3));
        assert_eq!(Penetration::NotApplicable.snap_shot(), Penetration::NotApplicable);
    }

    #[test]
    fn test_hit_probability() {
        assert!((Penetration::AtLeast(3).hit_probability() - 10.0 / 12.0).abs() < 1e-9);
        assert!((Penetration::AtMost(4).hit_probability() - 4.0 / 12.0).abs() < 1e-9);
        assert_eq!(Penetration::NotApplicable.hit_probability(), 0.0);
    }

    #[test]
    fn test_effective_range() {
        let mut w = rifle();
        assert_eq!(w.effective_range(), 4);
        w.keywords.clear();
        assert_eq!(w.effective_range(), 2);
    }

    #[test]
    fn test_damage_clamps() {
        let mut u = Unit::new(1, "Squad", Player::One);
        u.max_health = 2;
        u.current_health = 2;
        u.take_damage(5);
        assert_eq!(u.current_health, 0);
        assert!(!u.is_alive());
    }

    #[test]
    fn test_unit_class() {
        let mut u = Unit::new(1, "Squad", Player::One);
        u.tags = vec!["Infantry".into()];
        assert_eq!(u.class(), UnitClass::Infantry);
        u.tags = vec!["Vehicle".into(), "Light Tank".into()];
        assert_eq!(u.class(), UnitClass::Vehicle);
    }
}
