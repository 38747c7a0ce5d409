//! World state: units, buildings, terrain, and turn bookkeeping

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::hex::{in_frontal_arc, Hex};
use crate::units::{Unit, UnitId, Weapon, KW_FRONTAL};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Default map radius
pub const DEFAULT_MAP_RADIUS: i32 = 8;

/// Default turn cap
pub const DEFAULT_MAX_TURNS: u32 = 50;

/// Turns between score recomputations
pub const DEFAULT_CYCLE_LENGTH: u32 = 10;

// ============================================================================
// PLAYER
// ============================================================================

/// Side in the game, serialized as 1 or 2
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }

    fn index(self) -> usize {
        self.number() as usize - 1
    }
}

impl From<Player> for u8 {
    fn from(p: Player) -> Self {
        p.number()
    }
}

impl TryFrom<u8> for Player {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Player::One),
            2 => Ok(Player::Two),
            other => Err(format!("invalid player number: {other}")),
        }
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.number())
    }
}

// ============================================================================
// BUILDING
// ============================================================================

/// A capturable building holding control pips
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub position: Hex,
    pub total_pips: i32,
    pub neutral_pips: i32,
    pub player1_pips: i32,
    pub player2_pips: i32,
    /// Bonus pips created by 2x neutral captures
    pub minted_pips: i32,
}

impl Building {
    /// New building, all pips neutral
    pub fn new(position: Hex, total_pips: i32) -> Self {
        Self {
            position,
            total_pips,
            neutral_pips: total_pips,
            player1_pips: 0,
            player2_pips: 0,
            minted_pips: 0,
        }
    }

    pub fn current_pips(&self) -> i32 {
        self.neutral_pips + self.player1_pips + self.player2_pips
    }

    /// Pips held by `player`
    pub fn pips_of(&self, player: Player) -> i32 {
        match player {
            Player::One => self.player1_pips,
            Player::Two => self.player2_pips,
        }
    }

    fn pips_mut(&mut self, player: Player) -> &mut i32 {
        match player {
            Player::One => &mut self.player1_pips,
            Player::Two => &mut self.player2_pips,
        }
    }

    /// Major capture: pip by pip, neutral first at 2x, then enemy pips 1:1.
    ///
    /// Returns the number of control points spent.
    pub fn capture(&mut self, player: Player, amount: i32) -> i32 {
        let enemy = player.opponent();
        let mut remaining = amount;

        while remaining > 0 {
            if self.neutral_pips > 0 {
                self.neutral_pips -= 1;
                *self.pips_mut(player) += 2;
                self.minted_pips += 1;
                remaining -= 1;
            } else if self.pips_of(enemy) > 0 {
                let convert = self.pips_of(enemy).min(remaining);
                *self.pips_mut(enemy) -= convert;
                *self.pips_mut(player) += convert;
                remaining -= convert;
            } else {
                break;
            }
        }

        amount - remaining
    }

    /// Minor control: neutral first at 1:1, leftover as one bulk enemy transfer.
    ///
    /// Returns the number of control points spent.
    pub fn control(&mut self, player: Player, amount: i32) -> i32 {
        let enemy = player.opponent();
        let mut remaining = amount;

        if self.neutral_pips > 0 {
            let convert = self.neutral_pips.min(remaining);
            self.neutral_pips -= convert;
            *self.pips_mut(player) += convert;
            remaining -= convert;
        }

        if remaining > 0 && self.pips_of(enemy) > 0 {
            let convert = self.pips_of(enemy).min(remaining);
            *self.pips_mut(enemy) -= convert;
            *self.pips_mut(player) += convert;
            remaining -= convert;
        }

        amount - remaining
    }
}

// ============================================================================
// WORLD
// ============================================================================

/// Authoritative game state (clone for an independent copy)
#[derive(Clone, Debug)]
pub struct World {
    /// Map radius (hexagonal map centred on the origin)
    pub radius: i32,

    units: BTreeMap<UnitId, Unit>,
    buildings: FxHashMap<Hex, Building>,
    blocked: FxHashSet<Hex>,

    /// Full turns completed (increments when play returns to player 1)
    pub turn: u32,
    pub cycle: u32,
    active_player: Player,

    /// Action slots for the active player this turn
    pub major_available: bool,
    pub minor_available: bool,

    scores: [i32; 2],

    pub max_turns: u32,
    pub cycle_length: u32,
}

impl World {
    // ========================================================================
    // CONSTRUCTORS
    // ========================================================================

    /// Empty world with the given map radius
    pub fn new(radius: i32) -> Self {
        Self {
            radius,
            units: BTreeMap::new(),
            buildings: FxHashMap::default(),
            blocked: FxHashSet::default(),
            turn: 0,
            cycle: 0,
            active_player: Player::One,
            major_available: true,
            minor_available: true,
            scores: [0, 0],
            max_turns: DEFAULT_MAX_TURNS,
            cycle_length: DEFAULT_CYCLE_LENGTH,
        }
    }

    pub fn add_unit(&mut self, unit: Unit) {
        self.units.insert(unit.id, unit);
    }

    /// Place a building; replaces any building already on that tile
    pub fn add_building(&mut self, building: Building) {
        self.buildings.insert(building.position, building);
    }

    pub fn block_tile(&mut self, hex: Hex) {
        self.blocked.insert(hex);
    }

    /// Next unused unit id
    pub fn next_unit_id(&self) -> UnitId {
        self.units.keys().next_back().map_or(0, |id| id + 1)
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn active_player(&self) -> Player {
        self.active_player
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// All units, dead ones included, in id order
    pub fn units(&self) -> impl Iterator<Item = &Unit> + '_ {
        self.units.values()
    }

    pub fn units_of(&self, player: Player) -> impl Iterator<Item = &Unit> + '_ {
        self.units.values().filter(move |u| u.owner == player)
    }

    pub fn living_units(&self, player: Player) -> impl Iterator<Item = &Unit> + '_ {
        self.units
            .values()
            .filter(move |u| u.owner == player && u.is_alive())
    }

    pub fn living_count(&self, player: Player) -> usize {
        self.living_units(player).count()
    }

    /// First living unit on a tile
    pub fn unit_at(&self, pos: Hex) -> Option<&Unit> {
        self.units
            .values()
            .find(|u| u.position == Some(pos) && u.is_alive())
    }

    pub fn building_at(&self, pos: Hex) -> Option<&Building> {
        self.buildings.get(&pos)
    }

    pub(crate) fn building_mut(&mut self, pos: Hex) -> Option<&mut Building> {
        self.buildings.get_mut(&pos)
    }

    pub fn buildings(&self) -> impl Iterator<Item = &Building> + '_ {
        self.buildings.values()
    }

    pub fn is_blocked(&self, hex: Hex) -> bool {
        self.blocked.contains(&hex)
    }

    pub fn blocked_tiles(&self) -> impl Iterator<Item = Hex> + '_ {
        self.blocked.iter().copied()
    }

    pub fn score(&self, player: Player) -> i32 {
        self.scores[player.index()]
    }

    // ========================================================================
    // SPATIAL QUERIES
    // ========================================================================

    /// Check if position is within the hexagonal map
    pub fn is_valid_position(&self, pos: Hex) -> bool {
        pos.q.abs() <= self.radius && pos.r.abs() <= self.radius && (pos.q + pos.r).abs() <= self.radius
    }

    /// Check if a living enemy of `player` stands on `pos`
    pub fn is_enemy_tile(&self, pos: Hex, player: Player) -> bool {
        let enemy = player.opponent();
        self.units
            .values()
            .any(|u| u.owner == enemy && u.is_alive() && u.position == Some(pos))
    }

    /// Sampled line of sight.
    ///
    /// Interior points are linearly interpolated in axial space and each
    /// coordinate rounded on its own (half to even). Buildings and living
    /// enemies of the shooter on a sampled interior tile block the line.
    pub fn has_line_of_sight(&self, from: Hex, to: Hex, shooter: Player) -> bool {
        if from == to {
            return true;
        }

        let distance = from.distance(to);
        if distance <= 1 {
            return true;
        }

        let mut checked = FxHashSet::default();
        for i in 1..distance {
            let t = i as f64 / distance as f64;
            let q = from.q as f64 + t * (to.q - from.q) as f64;
            let r = from.r as f64 + t * (to.r - from.r) as f64;
            let sample = Hex::new(q.round_ties_even() as i32, r.round_ties_even() as i32);

            if !checked.insert(sample) {
                continue;
            }
            if sample == from || sample == to {
                continue;
            }
            if self.buildings.contains_key(&sample) || self.is_enemy_tile(sample, shooter) {
                return false;
            }
        }

        true
    }

    /// Whether `target` is a legal direction for a frontal-only weapon
    pub fn in_firing_arc(unit: &Unit, weapon: &Weapon, target: Hex) -> bool {
        match unit.position {
            Some(pos) if weapon.has_keyword(KW_FRONTAL) => {
                in_frontal_arc(unit.facing, pos.direction_to(target))
            }
            _ => true,
        }
    }

    /// Living enemies the weapon can legally engage from the unit's position
    pub fn get_units_in_range(&self, unit: &Unit, weapon: &Weapon) -> Vec<&Unit> {
        let Some(pos) = unit.position else {
            return Vec::new();
        };
        let enemy = unit.owner.opponent();
        let range = weapon.effective_range();

        self.units
            .values()
            .filter(|t| t.is_alive() && t.owner == enemy)
            .filter(|t| match t.position {
                Some(tpos) => {
                    pos.distance(tpos) <= range
                        && Self::in_firing_arc(unit, weapon, tpos)
                        && self.has_line_of_sight(pos, tpos, unit.owner)
                }
                None => false,
            })
            .collect()
    }

    // ========================================================================
    // TURN FLOW
    // ========================================================================

    /// Recompute both scores from building pips
    pub fn calculate_score(&mut self) {
        self.scores = [0, 0];
        for b in self.buildings.values() {
            self.scores[0] += b.player1_pips;
            self.scores[1] += b.player2_pips;
        }
    }

    /// Hand play to the other side
    pub fn advance_turn(&mut self) {
        self.active_player = self.active_player.opponent();

        if self.active_player == Player::One {
            self.turn += 1;

            if self.cycle_length > 0 && self.turn % self.cycle_length == 0 {
                self.cycle += 1;
                self.calculate_score();
            }
        }

        self.major_available = true;
        self.minor_available = true;

        let active = self.active_player;
        for unit in self.units.values_mut().filter(|u| u.owner == active) {
            unit.reset_turn_state();
        }
    }

    pub fn is_game_over(&self) -> bool {
        if self.turn >= self.max_turns {
            return true;
        }
        self.living_count(Player::One) == 0 || self.living_count(Player::Two) == 0
    }

    /// Winner once the game is over; None for a running game or a tie
    pub fn winner(&self) -> Option<Player> {
        if !self.is_game_over() {
            return None;
        }

        let p1_alive = self.living_count(Player::One) > 0;
        let p2_alive = self.living_count(Player::Two) > 0;
        match (p1_alive, p2_alive) {
            (false, true) => return Some(Player::Two),
            (true, false) => return Some(Player::One),
            _ => {}
        }

        let (s1, s2) = (self.score(Player::One), self.score(Player::Two));
        if s1 > s2 {
            Some(Player::One)
        } else if s2 > s1 {
            Some(Player::Two)
        } else {
            None
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{ArmorClass, Penetration};

    fn soldier(id: UnitId, owner: Player, pos: Hex) -> Unit {
        let mut u = Unit::new(id, "Soldier", owner);
        u.movement = 2;
        u.max_health = 3;
        u.current_health = 3;
        u.position = Some(pos);
        u
    }

    fn gun(range: i32, keywords: &[&str]) -> Weapon {
        Weapon {
            name: "Gun".into(),
            range,
            penetration: [(ArmorClass::None, Penetration::AtLeast(3))].into(),
            fortification_damage: 0,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            ammo: None,
        }
    }

    #[test]
    fn test_building_starts_neutral() {
        let b = Building::new(Hex::new(0, 0), 5);
        assert_eq!((b.neutral_pips, b.player1_pips, b.player2_pips), (5, 0, 0));
        assert_eq!(b.current_pips(), b.total_pips);
    }

    #[test]
    fn test_capture_doubles_neutral() {
        let mut b = Building::new(Hex::new(0, 0), 5);
        b.capture(Player::One, 1);
        assert_eq!((b.neutral_pips, b.player1_pips, b.player2_pips), (4, 2, 0));
        assert_eq!(b.current_pips(), b.total_pips + b.minted_pips);
    }

    #[test]
    fn test_capture_then_enemy_pips() {
        let mut b = Building::new(Hex::new(0, 0), 3);
        b.neutral_pips = 1;
        b.player2_pips = 2;
        let spent = b.capture(Player::One, 4);
        // 1 neutral -> 2 pips, then both enemy pips, one control point unused
        assert_eq!(spent, 3);
        assert_eq!((b.neutral_pips, b.player1_pips, b.player2_pips), (0, 4, 0));
    }

    #[test]
    fn test_control_is_one_to_one() {
        let mut b = Building::new(Hex::new(0, 0), 5);
        b.control(Player::Two, 2);
        assert_eq!((b.neutral_pips, b.player1_pips, b.player2_pips), (3, 0, 2));
        assert_eq!(b.current_pips(), b.total_pips);
    }

    #[test]
    fn test_control_bulk_enemy_transfer() {
        let mut b = Building::new(Hex::new(0, 0), 6);
        b.neutral_pips = 1;
        b.player1_pips = 5;
        let spent = b.control(Player::Two, 4);
        assert_eq!(spent, 4);
        assert_eq!((b.neutral_pips, b.player1_pips, b.player2_pips), (0, 2, 4));
        assert_eq!(b.current_pips(), b.total_pips);
    }

    #[test]
    fn test_valid_position() {
        let w = World::new(4);
        assert!(w.is_valid_position(Hex::new(0, 0)));
        assert!(w.is_valid_position(Hex::new(4, -4)));
        assert!(!w.is_valid_position(Hex::new(3, 3)));
        assert!(!w.is_valid_position(Hex::new(5, 0)));
    }

    #[test]
    fn test_enemy_tile_ignores_dead() {
        let mut w = World::new(4);
        let mut enemy = soldier(1, Player::Two, Hex::new(1, 0));
        w.add_unit(enemy.clone());
        assert!(w.is_enemy_tile(Hex::new(1, 0), Player::One));
        assert!(!w.is_enemy_tile(Hex::new(1, 0), Player::Two));
        enemy.current_health = 0;
        w.add_unit(enemy);
        assert!(!w.is_enemy_tile(Hex::new(1, 0), Player::One));
    }

    #[test]
    fn test_los_adjacent_always_clear() {
        let mut w = World::new(4);
        w.add_building(Building::new(Hex::new(1, 0), 3));
        assert!(w.has_line_of_sight(Hex::new(0, 0), Hex::new(1, 0), Player::One));
        assert!(w.has_line_of_sight(Hex::new(0, 0), Hex::new(0, 1), Player::One));
    }

    #[test]
    fn test_los_blocked_by_building() {
        let mut w = World::new(4);
        assert!(w.has_line_of_sight(Hex::new(0, 0), Hex::new(2, 0), Player::One));
        w.add_building(Building::new(Hex::new(1, 0), 3));
        assert!(!w.has_line_of_sight(Hex::new(0, 0), Hex::new(2, 0), Player::One));
    }

    #[test]
    fn test_los_blocked_by_enemy_not_friend() {
        let mut w = World::new(4);
        w.add_unit(soldier(1, Player::One, Hex::new(0, 1)));
        assert!(w.has_line_of_sight(Hex::new(0, 0), Hex::new(0, 2), Player::One));
        w.add_unit(soldier(2, Player::Two, Hex::new(0, 1)));
        assert!(!w.has_line_of_sight(Hex::new(0, 0), Hex::new(0, 2), Player::One));
    }

    #[test]
    fn test_los_rounds_half_to_even() {
        // (0,0) -> (1,1): distance 2, midpoint (0.5, 0.5) rounds to (0, 0),
        // which is an endpoint, so nothing on (1,0) or (0,1) can block.
        let mut w = World::new(4);
        w.add_building(Building::new(Hex::new(1, 0), 3));
        w.add_building(Building::new(Hex::new(0, 1), 3));
        assert!(w.has_line_of_sight(Hex::new(0, 0), Hex::new(1, 1), Player::One));
    }

    #[test]
    fn test_units_in_range_long_and_frontal() {
        let mut w = World::new(6);
        let mut shooter = soldier(1, Player::One, Hex::new(0, 0));
        shooter.facing = 0;
        w.add_unit(shooter.clone());
        // In front, distance 3
        w.add_unit(soldier(2, Player::Two, Hex::new(3, 0)));
        // Behind, distance 3
        w.add_unit(soldier(3, Player::Two, Hex::new(-3, 0)));

        let short = gun(2, &[]);
        assert!(w.get_units_in_range(&shooter, &short).is_empty());

        let long = gun(1, &["Long"]);
        let ids: Vec<_> = w.get_units_in_range(&shooter, &long).iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![2, 3]);

        let frontal = gun(1, &["Long", "Frontal"]);
        let ids: Vec<_> = w.get_units_in_range(&shooter, &frontal).iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_advance_turn_resets_only_active() {
        let mut w = World::new(4);
        let mut a = soldier(1, Player::One, Hex::new(0, 2));
        a.has_moved = true;
        a.weapons_fired.insert(0);
        let mut b = soldier(2, Player::Two, Hex::new(0, -2));
        b.has_shot = true;
        w.add_unit(a);
        w.add_unit(b);
        w.major_available = false;

        w.advance_turn();
        assert_eq!(w.active_player(), Player::Two);
        assert_eq!(w.turn, 0);
        assert!(w.major_available && w.minor_available);
        assert!(!w.unit(2).unwrap().has_shot);
        assert!(w.unit(1).unwrap().has_moved);

        w.advance_turn();
        assert_eq!(w.active_player(), Player::One);
        assert_eq!(w.turn, 1);
        assert!(!w.unit(1).unwrap().has_moved);
        assert!(w.unit(1).unwrap().weapons_fired.is_empty());
    }

    #[test]
    fn test_cycle_scoring() {
        let mut w = World::new(4);
        w.cycle_length = 2;
        w.add_unit(soldier(1, Player::One, Hex::new(0, 2)));
        w.add_unit(soldier(2, Player::Two, Hex::new(0, -2)));
        let mut b = Building::new(Hex::new(0, 0), 4);
        b.control(Player::One, 3);
        w.add_building(b);

        w.advance_turn();
        w.advance_turn();
        assert_eq!(w.score(Player::One), 0);
        w.advance_turn();
        w.advance_turn();
        assert_eq!(w.turn, 2);
        assert_eq!(w.cycle, 1);
        assert_eq!(w.score(Player::One), 3);
    }

    #[test]
    fn test_tie_at_turn_cap() {
        let mut w = World::new(4);
        w.max_turns = 1;
        w.add_unit(soldier(1, Player::One, Hex::new(0, 2)));
        w.add_unit(soldier(2, Player::Two, Hex::new(0, -2)));
        assert!(!w.is_game_over());
        assert_eq!(w.winner(), None);
        w.advance_turn();
        w.advance_turn();
        w.calculate_score();
        assert!(w.is_game_over());
        assert_eq!(w.score(Player::One), w.score(Player::Two));
        assert_eq!(w.winner(), None);
    }

    #[test]
    fn test_winner_by_elimination_and_score() {
        let mut w = World::new(4);
        w.add_unit(soldier(1, Player::One, Hex::new(0, 2)));
        let mut dead = soldier(2, Player::Two, Hex::new(0, -2));
        dead.current_health = 0;
        w.add_unit(dead);
        assert!(w.is_game_over());
        assert_eq!(w.winner(), Some(Player::One));

        let mut w = World::new(4);
        w.max_turns = 0;
        w.add_unit(soldier(1, Player::One, Hex::new(0, 2)));
        w.add_unit(soldier(2, Player::Two, Hex::new(0, -2)));
        let mut b = Building::new(Hex::new(0, 0), 4);
        b.control(Player::Two, 1);
        w.add_building(b);
        w.calculate_score();
        assert_eq!(w.winner(), Some(Player::Two));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut w = World::new(4);
        w.add_unit(soldier(1, Player::One, Hex::new(0, 2)));
        w.add_building(Building::new(Hex::new(0, 0), 4));

        let mut copy = w.clone();
        copy.unit_mut(1).unwrap().take_damage(2);
        copy.building_mut(Hex::new(0, 0)).unwrap().capture(Player::One, 1);
        copy.advance_turn();

        assert_eq!(w.unit(1).unwrap().current_health, 3);
        assert_eq!(w.building_at(Hex::new(0, 0)).unwrap().neutral_pips, 4);
        assert_eq!(w.active_player(), Player::One);
    }

    #[test]
    fn test_player_serde() {
        assert_eq!(serde_json::to_string(&Player::Two).unwrap(), "2");
        assert_eq!(serde_json::from_str::<Player>("1").unwrap(), Player::One);
        assert!(serde_json::from_str::<Player>("3").is_err());
    }
}
