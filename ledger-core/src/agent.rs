//! Single-ply heuristic agent

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::RuleViolation;
use crate::hex::Hex;
use crate::rules::{self, Action, Outcome, Slot};
use crate::units::{Penetration, Unit, UnitId, KW_ASSAULT};
use crate::weights::{evaluate_world, Factor, Weights};
use crate::world::{Player, World};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Score for standing on a building we do not fully hold
const ON_BUILDING_BONUS: f64 = 100.0;

/// Per-step bonus for approaching a building we do not fully hold
const NEAR_BUILDING_BONUS: f64 = 30.0;

const ENEMY_IN_RANGE_BONUS: f64 = 25.0;

const DANGER_PENALTY: f64 = 20.0;

/// Penalty for standing on a building the enemy dominates
const ENEMY_BUILDING_PENALTY: f64 = 30.0;

/// Jitter applied between training blocks
pub const DEFAULT_JITTER: f64 = 0.05;

// ============================================================================
// TYPES
// ============================================================================

/// A scored action proposal
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub action: Action,
    pub value: f64,
}

/// An action the agent tried and what came of it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionRecord {
    pub action: Action,
    pub result: Result<Outcome, RuleViolation>,
}

/// Everything the agent did in one turn
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnReport {
    pub records: Vec<ActionRecord>,
}

impl TurnReport {
    pub fn executed(&self) -> impl Iterator<Item = (&Action, &Outcome)> + '_ {
        self.records
            .iter()
            .filter_map(|r| r.result.as_ref().ok().map(|o| (&r.action, o)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Action, &RuleViolation)> + '_ {
        self.records
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (&r.action, e)))
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Running record of an agent's results
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    pub games_played: u32,
    pub win_rate: f64,
}

impl AgentStats {
    /// Incremental mean of wins
    pub fn record(&mut self, won: bool) {
        self.games_played += 1;
        let n = self.games_played as f64;
        let w = if won { 1.0 } else { 0.0 };
        self.win_rate = (self.win_rate * (n - 1.0) + w) / n;
    }
}

// ============================================================================
// AGENT
// ============================================================================

/// Heuristic agent for one side
#[derive(Clone, Debug)]
pub struct HeuristicAgent {
    pub player: Player,
    weights: Weights,
    pub stats: AgentStats,
}

impl HeuristicAgent {
    pub fn new(player: Player) -> Self {
        Self::with_weights(player, Weights::default())
    }

    pub fn with_weights(player: Player, weights: Weights) -> Self {
        Self {
            player,
            weights,
            stats: AgentStats::default(),
        }
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Swap in a new weight version
    pub fn set_weights(&mut self, weights: Weights) {
        self.weights = weights;
    }

    pub fn win_rate(&self) -> f64 {
        self.stats.win_rate
    }

    pub fn games_played(&self) -> u32 {
        self.stats.games_played
    }

    pub fn record_result(&mut self, won: bool) {
        self.stats.record(won);
    }

    /// Replace the weights with a jittered copy
    pub fn jitter<R: Rng + ?Sized>(&mut self, variance: f64, rng: &mut R) {
        let next = self.weights.jitter(variance, rng);
        self.set_weights(next);
    }

    fn w(&self, factor: Factor) -> f64 {
        self.weights.get(factor)
    }

    // ========================================================================
    // EVALUATION
    // ========================================================================

    /// Static evaluation of a world from this agent's side
    pub fn evaluate(&self, world: &World) -> f64 {
        evaluate_world(world, self.player, &self.weights)
    }

    /// Apply `action` to a copy of `world` and evaluate the result.
    /// Returns the violation if the action is illegal.
    pub fn preview<R: Rng + ?Sized>(
        &self,
        world: &World,
        action: &Action,
        rng: &mut R,
    ) -> Result<f64, RuleViolation> {
        let mut scratch = world.clone();
        rules::apply(&mut scratch, action, rng)?;
        Ok(self.evaluate(&scratch))
    }

    /// Priority of shooting `target` with `weapon`
    fn target_score(&self, world: &World, requirement: Penetration, target: &Unit) -> f64 {
        let mut score = 0.0;

        let health_ratio = target.current_health as f64 / target.max_health.max(1) as f64;
        score += (1.0 - health_ratio) * 50.0;
        score += target.weapons.len() as f64 * 20.0;

        if let Some(pos) = target.position {
            let near = world
                .buildings()
                .filter(|b| pos.distance(b.position) <= 2)
                .count();
            score += near as f64 * 30.0;
        }

        score + requirement.hit_probability() * 40.0
    }

    /// Best target for one weapon, with its score
    fn best_target_for(&self, world: &World, unit: &Unit, weapon: usize) -> Option<(UnitId, f64)> {
        if unit.weapons_fired.contains(&weapon) {
            return None;
        }
        let w = unit.weapons.get(weapon)?;

        let mut best: Option<(UnitId, f64)> = None;
        for target in world.get_units_in_range(unit, w) {
            let score = self.target_score(world, w.requirement(target.armor), target);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((target.id, score));
            }
        }
        best
    }

    /// Best (weapon, target) pair over the weapons accepted by `filter`
    fn best_target(
        &self,
        world: &World,
        unit: &Unit,
        filter: impl Fn(usize) -> bool,
    ) -> Option<(usize, UnitId)> {
        let mut best: Option<(usize, UnitId, f64)> = None;
        for weapon in (0..unit.weapons.len()).filter(|&i| filter(i)) {
            if let Some((target, score)) = self.best_target_for(world, unit, weapon) {
                if best.map_or(true, |(_, _, s)| score > s) {
                    best = Some((weapon, target, score));
                }
            }
        }
        best.map(|(w, t, _)| (w, t))
    }

    /// Value of hitting `target`, before the per-action base
    fn damage_value(&self, base: f64, target: &Unit) -> f64 {
        let mut value = base;
        if target.current_health == 1 {
            value *= 3.0;
        } else if target.current_health == 2 {
            value *= 2.0;
        }
        if !target.weapons.is_empty() {
            value += self.w(Factor::EliminateEnemy) * 0.5;
        }
        value
    }

    /// Score a destination for an advance
    fn move_position_score(&self, world: &World, unit: &Unit, pos: Hex) -> f64 {
        let enemy = self.player.opponent();
        let mut score = 0.0;

        for b in world.buildings() {
            if b.pips_of(self.player) < b.total_pips {
                let d = pos.distance(b.position);
                if d == 0 {
                    score += ON_BUILDING_BONUS;
                } else if d <= 2 {
                    score += (3 - d) as f64 * NEAR_BUILDING_BONUS;
                }
            }
        }

        let max_range = unit.max_weapon_range();
        for e in world.living_units(enemy) {
            let Some(epos) = e.position else { continue };
            let d = pos.distance(epos);
            if max_range.is_some_and(|r| d <= r) {
                score += ENEMY_IN_RANGE_BONUS;
            }
            if !e.weapons.is_empty() && d <= 2 {
                score -= DANGER_PENALTY;
            }
        }

        for b in world.buildings() {
            if b.pips_of(enemy) > b.pips_of(self.player) && b.position == pos {
                score -= ENEMY_BUILDING_PENALTY;
            }
        }

        score
    }

    /// Best reachable tile for an advance
    pub fn choose_move_position(&self, world: &World, unit: &Unit) -> Option<Hex> {
        let mut best: Option<(Hex, f64)> = None;
        for pos in rules::valid_moves(world, unit) {
            let score = self.move_position_score(world, unit, pos);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((pos, score));
            }
        }
        best.map(|(p, _)| p)
    }

    /// Value of a tile for a one-step reposition
    pub fn evaluate_position(&self, world: &World, unit: &Unit, pos: Hex) -> f64 {
        let mut score = 0.0;
        for b in world.buildings() {
            let d = pos.distance(b.position);
            if d <= 2 {
                score += ((3 - d) * 10) as f64;
            }
        }
        if !unit.weapons.is_empty() {
            let near = world
                .units_of(self.player.opponent())
                .filter_map(|e| e.position)
                .filter(|&p| pos.distance(p) <= 3)
                .count();
            score += near as f64 * 5.0;
        }
        score
    }

    // ========================================================================
    // CANDIDATES
    // ========================================================================

    fn major_candidates(&self, world: &World, unit: &Unit, pos: Hex, out: &mut Vec<Candidate>) {
        let enemy = self.player.opponent();

        // Capture
        if let Some(b) = world.building_at(pos) {
            let (enemy_pips, neutral) = (b.pips_of(enemy), b.neutral_pips);
            if unit.control > 0 && (enemy_pips > 0 || neutral > 0) {
                let value =
                    (enemy_pips * 2 + neutral * 4) as f64 * self.w(Factor::CaptureBuilding) / 100.0;
                out.push(Candidate {
                    action: Action::Capture { unit: unit.id },
                    value,
                });
            }
        }

        // Salvo: every weapon takes its own best target
        if let Some((_, best)) = self.best_target(world, unit, |_| true) {
            let shots: Vec<_> = (0..unit.weapons.len())
                .filter_map(|i| self.best_target_for(world, unit, i).map(|(t, _)| (i, t)))
                .collect();
            if let Some(target) = world.unit(best) {
                let value = self.damage_value(self.w(Factor::DamageDealt) * 2.0, target);
                out.push(Candidate {
                    action: Action::Salvo {
                        unit: unit.id,
                        shots,
                    },
                    value,
                });
            }
        }

        // Advance
        if let Some(dest) = self.choose_move_position(world, unit) {
            if dest != pos {
                let mut value = self.w(Factor::PositionAdvantage) * 0.8;
                if unit.has_assault_weapon() {
                    value *= 1.5;
                }
                out.push(Candidate {
                    action: Action::Advance {
                        unit: unit.id,
                        path: vec![pos, dest],
                        facing: None,
                    },
                    value,
                });
            }
        }
    }

    fn minor_candidates(&self, world: &World, unit: &Unit, pos: Hex, out: &mut Vec<Candidate>) {
        let enemy = self.player.opponent();

        // Minor shot
        if !unit.has_shot && unit.weapons_fired.is_empty() {
            if let Some((weapon, target_id)) = self.best_target(world, unit, |_| true) {
                if let Some(target) = world.unit(target_id) {
                    let value = self.damage_value(self.w(Factor::DamageDealt) * 1.5, target);
                    out.push(Candidate {
                        action: Action::MinorShot {
                            unit: unit.id,
                            weapon,
                            target: target_id,
                        },
                        value,
                    });
                }
            }
        }

        // Control
        if let Some(b) = world.building_at(pos) {
            let (enemy_pips, neutral) = (b.pips_of(enemy), b.neutral_pips);
            if unit.control > 0 && !unit.has_moved && (enemy_pips > 0 || neutral > 0) {
                let value =
                    (enemy_pips + neutral * 2) as f64 * self.w(Factor::CaptureBuilding) / 150.0;
                out.push(Candidate {
                    action: Action::Control { unit: unit.id },
                    value,
                });
            }
        }

        // Minor move
        if !unit.has_moved && unit.movement > 1 {
            let mut best: Option<(Hex, f64)> = None;
            for n in pos.neighbors() {
                if !world.is_valid_position(n) || world.is_blocked(n) {
                    continue;
                }
                let score = self.evaluate_position(world, unit, n);
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((n, score));
                }
            }
            if let Some((to, _)) = best {
                out.push(Candidate {
                    action: Action::MinorMove { unit: unit.id, to },
                    value: self.w(Factor::PositionAdvantage) * 0.3,
                });
            }
        }
    }

    /// All scored candidates for `slot`, in evaluation order
    pub fn candidates(&self, world: &World, slot: Slot) -> Vec<Candidate> {
        let mut out = Vec::new();
        let available = match slot {
            Slot::Major => world.major_available,
            Slot::Minor => world.minor_available,
            Slot::Both => world.major_available && world.minor_available,
        };
        if !available {
            return out;
        }

        for unit in world.living_units(self.player) {
            let Some(pos) = unit.position else { continue };
            match slot {
                Slot::Major => self.major_candidates(world, unit, pos, &mut out),
                Slot::Minor => self.minor_candidates(world, unit, pos, &mut out),
                // Overwatch is never chosen by the heuristic
                Slot::Both => {}
            }
        }
        out
    }

    /// Best candidate for `slot`. Doing nothing scores 0; ties keep the
    /// earliest candidate.
    pub fn decide(&self, world: &World, slot: Slot) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        let mut best_value = 0.0;
        for c in self.candidates(world, slot) {
            if c.value > best_value {
                best_value = c.value;
                best = Some(c);
            }
        }
        best
    }

    // ========================================================================
    // EXECUTION
    // ========================================================================

    /// Execute an action; a successful advance by a unit with an `Assault`
    /// weapon is followed by a minor shot when the minor slot is free
    pub fn execute<R: Rng + ?Sized>(
        &self,
        world: &mut World,
        action: Action,
        rng: &mut R,
    ) -> Vec<ActionRecord> {
        let result = rules::apply(world, &action, rng);
        let advanced = matches!(action, Action::Advance { .. }) && result.is_ok();
        let unit_id = action.unit();
        let mut records = vec![ActionRecord { action, result }];

        if advanced && world.minor_available {
            if let Some(follow_up) = self.assault_follow_up(world, unit_id) {
                let result = rules::apply(world, &follow_up, rng);
                records.push(ActionRecord {
                    action: follow_up,
                    result,
                });
            }
        }

        records
    }

    fn assault_follow_up(&self, world: &World, unit_id: UnitId) -> Option<Action> {
        let unit = world.unit(unit_id)?;
        let (weapon, target) =
            self.best_target(world, unit, |i| unit.weapons[i].has_keyword(KW_ASSAULT))?;
        Some(Action::MinorShot {
            unit: unit_id,
            weapon,
            target,
        })
    }

    /// Play one turn: a major attempt, then a minor attempt
    pub fn take_turn<R: Rng + ?Sized>(&self, world: &mut World, rng: &mut R) -> TurnReport {
        let mut report = TurnReport::default();

        if world.major_available {
            if let Some(c) = self.decide(world, Slot::Major) {
                report.records.extend(self.execute(world, c.action, rng));
            }
        }

        if world.minor_available {
            if let Some(c) = self.decide(world, Slot::Minor) {
                report.records.extend(self.execute(world, c.action, rng));
            }
        }

        report
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{ArmorClass, Weapon};
    use crate::world::Building;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rifle(keywords: &[&str]) -> Weapon {
        Weapon {
            name: "Rifle".into(),
            range: 2,
            penetration: [(ArmorClass::None, Penetration::AtLeast(3))].into(),
            fortification_damage: 0,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            ammo: None,
        }
    }

    fn unit(id: UnitId, owner: Player, pos: Hex) -> Unit {
        let mut u = Unit::new(id, format!("Unit {id}"), owner);
        u.movement = 2;
        u.control = 2;
        u.max_health = 4;
        u.current_health = 4;
        u.position = Some(pos);
        u
    }

    #[test]
    fn test_record_result_incremental() {
        let mut agent = HeuristicAgent::new(Player::One);
        agent.record_result(true);
        agent.record_result(false);
        agent.record_result(true);
        assert_eq!(agent.games_played(), 3);
        assert!((agent.win_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_capture_value_on_neutral_building() {
        let mut world = World::new(6);
        world.add_unit(unit(0, Player::One, Hex::new(0, 0)));
        world.add_unit(unit(1, Player::Two, Hex::new(0, -5)));
        world.add_building(Building::new(Hex::new(0, 0), 5));

        let agent = HeuristicAgent::new(Player::One);
        let candidates = agent.candidates(&world, Slot::Major);
        assert!(matches!(candidates[0].action, Action::Capture { unit: 0 }));
        // (0*2 + 5*4) * 80 / 100
        assert!((candidates[0].value - 16.0).abs() < 1e-9);

        // Advance at 50 * 0.8 outscores it
        let c = agent.decide(&world, Slot::Major).unwrap();
        assert!(matches!(c.action, Action::Advance { .. }));
        assert!((c.value - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_salvo_on_wounded_target() {
        let mut world = World::new(6);
        let mut shooter = unit(0, Player::One, Hex::new(0, 0));
        shooter.weapons = vec![rifle(&[])];
        world.add_unit(shooter);
        let mut target = unit(1, Player::Two, Hex::new(2, 0));
        target.current_health = 1;
        target.weapons = vec![rifle(&[])];
        world.add_unit(target);

        let agent = HeuristicAgent::new(Player::One);
        let c = agent.decide(&world, Slot::Major).unwrap();
        assert_eq!(
            c.action,
            Action::Salvo {
                unit: 0,
                shots: vec![(0, 1)]
            }
        );
        // 60 * 2 * 3 + 100 * 0.5
        assert!((c.value - 410.0).abs() < 1e-9);
    }

    #[test]
    fn test_minor_slot_only_minor_actions() {
        let mut world = World::new(6);
        let mut shooter = unit(0, Player::One, Hex::new(0, 0));
        shooter.weapons = vec![rifle(&[])];
        world.add_unit(shooter);
        world.add_unit(unit(1, Player::Two, Hex::new(1, 0)));

        let agent = HeuristicAgent::new(Player::One);
        for c in agent.candidates(&world, Slot::Minor) {
            assert_ne!(c.action.slot(), Slot::Major);
        }
        let c = agent.decide(&world, Slot::Minor).unwrap();
        // 60 * 1.5 = 90 beats minor move 15
        assert!(matches!(c.action, Action::MinorShot { weapon: 0, target: 1, .. }));
        assert!((c.value - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_candidates_when_slot_spent() {
        let mut world = World::new(6);
        world.add_unit(unit(0, Player::One, Hex::new(0, 0)));
        world.add_unit(unit(1, Player::Two, Hex::new(0, -5)));
        world.major_available = false;
        let agent = HeuristicAgent::new(Player::One);
        assert!(agent.decide(&world, Slot::Major).is_none());
    }

    #[test]
    fn test_advance_heads_for_building() {
        let mut world = World::new(6);
        world.add_unit(unit(0, Player::One, Hex::new(0, 3)));
        world.add_unit(unit(1, Player::Two, Hex::new(0, -5)));
        world.add_building(Building::new(Hex::new(0, 1), 4));

        let agent = HeuristicAgent::new(Player::One);
        assert_eq!(
            agent.choose_move_position(&world, world.unit(0).unwrap()),
            Some(Hex::new(0, 1))
        );
    }

    #[test]
    fn test_take_turn_assault_follow_up() {
        let mut world = World::new(6);
        let mut runner = unit(0, Player::One, Hex::new(0, 4));
        runner.weapons = vec![rifle(&["Assault"])];
        world.add_unit(runner);
        world.add_unit(unit(1, Player::Two, Hex::new(0, 0)));
        world.add_building(Building::new(Hex::new(0, 2), 4));

        let agent = HeuristicAgent::new(Player::One);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let report = agent.take_turn(&mut world, &mut rng);

        assert!(matches!(report.records[0].action, Action::Advance { .. }));
        assert!(report.records[0].result.is_ok());
        assert_eq!(world.unit(0).unwrap().position, Some(Hex::new(0, 2)));
        assert!(matches!(report.records[1].action, Action::MinorShot { .. }));
        assert!(report.records[1].result.is_ok());
        assert!(!world.major_available && !world.minor_available);
        assert_eq!(report.failures().count(), 0);
    }

    #[test]
    fn test_preview_leaves_world_untouched() {
        let mut world = World::new(6);
        world.add_unit(unit(0, Player::One, Hex::new(0, 0)));
        world.add_unit(unit(1, Player::Two, Hex::new(0, -5)));
        world.add_building(Building::new(Hex::new(0, 0), 5));

        let agent = HeuristicAgent::new(Player::One);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let before = agent.evaluate(&world);
        let after = agent
            .preview(&world, &Action::Capture { unit: 0 }, &mut rng)
            .unwrap();
        assert!(after > before);
        assert_eq!(world.building_at(Hex::new(0, 0)).unwrap().neutral_pips, 5);
        assert!(world.major_available);

        assert!(agent
            .preview(&world, &Action::Capture { unit: 1 }, &mut rng)
            .is_err());
    }

    #[test]
    fn test_jitter_swaps_version() {
        let mut agent = HeuristicAgent::new(Player::Two);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        agent.jitter(DEFAULT_JITTER, &mut rng);
        assert_eq!(agent.weights().version, 1);
    }
}
