//! Roster - unit datasheets by name

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::units::{ArmorClass, Penetration, Unit, UnitId, Weapon};
use crate::world::Player;

/// Datasheet for one unit type
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub movement: i32,
    pub armor: ArmorClass,
    pub control: i32,
    pub health: i32,
    #[serde(default)]
    pub weapons: Vec<Weapon>,
    #[serde(default)]
    pub abilities: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl UnitSpec {
    /// Fresh, undeployed unit from this datasheet
    pub fn instantiate(&self, id: UnitId, name: &str, owner: Player) -> Unit {
        let mut unit = Unit::new(id, name, owner);
        unit.movement = self.movement;
        unit.armor = self.armor;
        unit.control = self.control;
        unit.max_health = self.health;
        unit.current_health = self.health;
        unit.weapons = self.weapons.clone();
        unit.abilities = self.abilities.clone();
        unit.tags = self.tags.clone();
        unit
    }
}

/// Unit datasheets keyed by display name
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    entries: BTreeMap<String, UnitSpec>,
}

impl Roster {
    pub fn get(&self, name: &str) -> Option<&UnitSpec> {
        self.entries.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: UnitSpec) {
        self.entries.insert(name.into(), spec);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a unit by name; None if the roster has no such entry
    pub fn instantiate(&self, name: &str, id: UnitId, owner: Player) -> Option<Unit> {
        self.get(name).map(|spec| spec.instantiate(id, name, owner))
    }

    /// Load from a JSON object of name -> datasheet.
    ///
    /// Entries that fail to parse are skipped with a warning; only an
    /// unreadable file or a non-object document is an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read roster {}", path.display()))?;
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse roster {}", path.display()))?;

        let mut roster = Roster::default();
        for (name, value) in raw {
            match serde_json::from_value::<UnitSpec>(value) {
                Ok(spec) => roster.insert(name, spec),
                Err(e) => tracing::warn!("Skipping malformed roster entry {name:?}: {e}"),
            }
        }
        Ok(roster)
    }

    /// Load `path` if given, falling back to the built-in roster on any error
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };
        match Self::load(path) {
            Ok(roster) => roster,
            Err(e) => {
                tracing::warn!("{e:#}; using built-in roster");
                Self::builtin()
            }
        }
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write roster {}", path.display()))?;
        Ok(())
    }

    /// The Ordax datasheets
    pub fn builtin() -> Self {
        use ArmorClass::{Heavy as H, Light as L, Medium as M, None as N};
        use Penetration::{AtLeast, AtMost, NotApplicable as NA};

        fn weapon(
            name: &str,
            range: i32,
            pen: [Penetration; 4],
            fortification_damage: i32,
            keywords: &[&str],
        ) -> Weapon {
            Weapon {
                name: name.to_string(),
                range,
                penetration: [N, L, M, H].into_iter().zip(pen).collect(),
                fortification_damage,
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
                ammo: None,
            }
        }

        fn strings(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        let mut roster = Roster::default();

        roster.insert(
            "Rookie Squad",
            UnitSpec {
                movement: 2,
                armor: N,
                control: 2,
                health: 4,
                weapons: vec![weapon(
                    "5.56×45mm NATO",
                    2,
                    [AtLeast(3), AtLeast(13), NA, NA],
                    0,
                    &["Assault"],
                )],
                abilities: Vec::new(),
                tags: strings(&["Infantry"]),
            },
        );

        roster.insert(
            "M24 Grizzly",
            UnitSpec {
                movement: 2,
                armor: M,
                control: 0,
                health: 4,
                weapons: vec![
                    weapon("50mm AC", 2, [AtMost(4), AtLeast(2), AtLeast(10), NA], 1, &["Linked"]),
                    weapon("7.62mm MG", 2, [AtLeast(1), AtLeast(11), NA, NA], 0, &["Linked"]),
                ],
                abilities: Vec::new(),
                tags: strings(&["Vehicle", "IFV"]),
            },
        );

        roster.insert(
            "M14 Puma",
            UnitSpec {
                movement: 3,
                armor: L,
                control: 0,
                health: 3,
                weapons: vec![weapon(
                    "105mm HEAT",
                    2,
                    [NA, AtMost(8), AtLeast(4), AtLeast(9)],
                    0,
                    &["Assault"],
                )],
                abilities: Vec::new(),
                tags: strings(&["Vehicle", "Light Tank"]),
            },
        );

        roster.insert(
            "M29 Vindicator",
            UnitSpec {
                movement: 2,
                armor: M,
                control: 0,
                health: 2,
                weapons: vec![weapon(
                    "130mm APFSDS",
                    5,
                    [NA, NA, AtMost(7), AtLeast(3)],
                    0,
                    &["Long", "Frontal"],
                )],
                abilities: strings(&["Sloped, NERA Armor", "Sturdy"]),
                tags: strings(&["Vehicle", "SPG"]),
            },
        );

        roster
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitClass;

    #[test]
    fn test_builtin_contents() {
        let roster = Roster::builtin();
        assert_eq!(roster.len(), 4);
        let squad = roster.get("Rookie Squad").unwrap();
        assert_eq!((squad.movement, squad.control, squad.health), (2, 2, 4));
        assert!(squad.weapons[0].has_keyword("Assault"));

        let vindicator = roster.get("M29 Vindicator").unwrap();
        assert_eq!(vindicator.weapons[0].effective_range(), 7);
        assert_eq!(
            vindicator.weapons[0].requirement(ArmorClass::Heavy),
            Penetration::AtLeast(3)
        );
    }

    #[test]
    fn test_instantiate() {
        let roster = Roster::builtin();
        let unit = roster.instantiate("M14 Puma", 7, Player::Two).unwrap();
        assert_eq!(unit.id, 7);
        assert_eq!(unit.name, "M14 Puma");
        assert_eq!(unit.owner, Player::Two);
        assert_eq!(unit.current_health, 3);
        assert_eq!(unit.class(), UnitClass::Vehicle);
        assert!(roster.instantiate("Nope", 0, Player::One).is_none());
    }

    #[test]
    fn test_parse_json_entry() {
        let json = r#"{
            "Scout": {
                "movement": 3, "armor": "L", "control": 1, "health": 2,
                "weapons": [{"name": "Carbine", "range": 2,
                             "penetration": {"N": "4+", "L": "10+", "M": "NA"},
                             "keywords": ["Assault"]}],
                "tags": ["Infantry"]
            }
        }"#;
        let roster: Roster = serde_json::from_str(json).unwrap();
        let scout = roster.get("Scout").unwrap();
        assert_eq!(scout.armor, ArmorClass::Light);
        assert_eq!(scout.weapons[0].requirement(ArmorClass::None), Penetration::AtLeast(4));
        assert_eq!(
            scout.weapons[0].requirement(ArmorClass::Heavy),
            Penetration::NotApplicable
        );
        assert!(scout.abilities.is_empty());
    }

    #[test]
    fn test_builtin_survives_json() {
        let roster = Roster::builtin();
        let json = serde_json::to_string(&roster).unwrap();
        let back: Roster = serde_json::from_str(&json).unwrap();
        assert_eq!(back, roster);
    }

    #[test]
    fn test_load_skips_malformed_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("roster.json");
        Roster::builtin().save(&path).unwrap();

        let mut raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        raw["Broken"] = serde_json::json!({ "movement": "fast" });
        std::fs::write(&path, raw.to_string()).unwrap();

        let loaded = Roster::load(&path).unwrap();
        assert!(loaded.get("Broken").is_none());
        assert_eq!(loaded.len(), 4);
    }

    #[test]
    fn test_unreadable_roster_falls_back() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("roster.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        assert!(Roster::load(&path).is_err());
        assert_eq!(Roster::load_or_builtin(Some(&path)), Roster::builtin());
        assert_eq!(Roster::load_or_builtin(None).len(), 4);
    }
}
