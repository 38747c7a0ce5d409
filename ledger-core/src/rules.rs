//! Action legality and execution
//!
//! Every entry point takes the world explicitly and returns
//! `Result<Outcome, RuleViolation>`. A refused action leaves the world
//! untouched. A shot that misses is still a successful action.

use std::collections::VecDeque;
use std::fmt;

use rand::Rng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::RuleViolation;
use crate::hex::Hex;
use crate::units::{Penetration, Unit, UnitId};
use crate::world::World;

// ============================================================================
// ACTIONS
// ============================================================================

/// Which per-turn action slot an action consumes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    Major,
    Minor,
    /// Overwatch takes the whole turn
    Both,
}

/// A fully specified action for the active player
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Move along `path` (starting at the unit's position), optionally turning
    Advance {
        unit: UnitId,
        path: Vec<Hex>,
        facing: Option<u8>,
    },
    /// Fire several weapons, one (weapon index, target) pair per shot
    Salvo {
        unit: UnitId,
        shots: Vec<(usize, UnitId)>,
    },
    Capture {
        unit: UnitId,
    },
    MinorMove {
        unit: UnitId,
        to: Hex,
    },
    Control {
        unit: UnitId,
    },
    MinorShot {
        unit: UnitId,
        weapon: usize,
        target: UnitId,
    },
    Overwatch {
        unit: UnitId,
        arc: u8,
    },
}

impl Action {
    pub fn slot(&self) -> Slot {
        match self {
            Action::Advance { .. } | Action::Salvo { .. } | Action::Capture { .. } => Slot::Major,
            Action::MinorMove { .. } | Action::Control { .. } | Action::MinorShot { .. } => {
                Slot::Minor
            }
            Action::Overwatch { .. } => Slot::Both,
        }
    }

    pub fn unit(&self) -> UnitId {
        match *self {
            Action::Advance { unit, .. }
            | Action::Salvo { unit, .. }
            | Action::Capture { unit }
            | Action::MinorMove { unit, .. }
            | Action::Control { unit }
            | Action::MinorShot { unit, .. }
            | Action::Overwatch { unit, .. } => unit,
        }
    }

    /// Short action name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Advance { .. } => "advance",
            Action::Salvo { .. } => "salvo",
            Action::Capture { .. } => "capture",
            Action::MinorMove { .. } => "minor move",
            Action::Control { .. } => "control",
            Action::MinorShot { .. } => "minor shot",
            Action::Overwatch { .. } => "overwatch",
        }
    }
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// Result of one resolved shot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotReport {
    pub weapon: usize,
    pub weapon_name: String,
    pub target: UnitId,
    pub roll: u8,
    pub requirement: Penetration,
    pub hit: bool,
    /// Target health after the shot
    pub target_health: i32,
}

impl fmt::Display for ShotReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hit {
            write!(
                f,
                "{} hit unit {} (rolled {} vs {}), health now {}",
                self.weapon_name, self.target, self.roll, self.requirement, self.target_health
            )
        } else {
            write!(
                f,
                "{} missed unit {} (rolled {} vs {})",
                self.weapon_name, self.target, self.roll, self.requirement
            )
        }
    }
}

/// What an executed action did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Moved {
        unit: UnitId,
        to: Hex,
        cost: i32,
    },
    Salvo {
        unit: UnitId,
        /// One entry per requested shot; refused shots carry their reason
        shots: Vec<Result<ShotReport, RuleViolation>>,
    },
    Captured {
        unit: UnitId,
        building: Hex,
        spent: i32,
    },
    Controlled {
        unit: UnitId,
        building: Hex,
        spent: i32,
    },
    Shot(ShotReport),
    Overwatch {
        unit: UnitId,
        arc: u8,
    },
}

impl Outcome {
    /// Number of hits landed by this action
    pub fn hits(&self) -> usize {
        match self {
            Outcome::Salvo { shots, .. } => shots
                .iter()
                .filter(|s| matches!(s, Ok(r) if r.hit))
                .count(),
            Outcome::Shot(r) => usize::from(r.hit),
            _ => 0,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Moved { unit, to, cost } => {
                write!(f, "unit {unit} moved to {to} (cost {cost})")
            }
            Outcome::Salvo { unit, shots } => {
                write!(f, "unit {unit} fired a salvo:")?;
                for shot in shots {
                    match shot {
                        Ok(report) => write!(f, " [{report}]")?,
                        Err(e) => write!(f, " [refused: {e}]")?,
                    }
                }
                Ok(())
            }
            Outcome::Captured { unit, building, spent } => {
                write!(f, "unit {unit} captured {spent} pips at {building}")
            }
            Outcome::Controlled { unit, building, spent } => {
                write!(f, "unit {unit} controlled {spent} pips at {building}")
            }
            Outcome::Shot(report) => write!(f, "minor shot: {report}"),
            Outcome::Overwatch { unit, arc } => {
                write!(f, "unit {unit} on overwatch, arc {arc}")
            }
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Look up a unit that the active player may act with
fn acting_unit(world: &World, id: UnitId) -> Result<&Unit, RuleViolation> {
    let unit = world.unit(id).ok_or(RuleViolation::UnknownUnit(id))?;
    if !unit.is_alive() {
        return Err(RuleViolation::DeadUnit(id));
    }
    if unit.owner != world.active_player() {
        return Err(RuleViolation::NotActivePlayer(id));
    }
    Ok(unit)
}

fn positioned(unit: &Unit) -> Result<Hex, RuleViolation> {
    unit.position.ok_or(RuleViolation::NoPosition(unit.id))
}

fn require_major(world: &World) -> Result<(), RuleViolation> {
    if world.major_available {
        Ok(())
    } else {
        Err(RuleViolation::MajorUnavailable)
    }
}

fn require_minor(world: &World) -> Result<(), RuleViolation> {
    if world.minor_available {
        Ok(())
    } else {
        Err(RuleViolation::MinorUnavailable)
    }
}

/// Cost of moving `unit` from `from` to `to`: the hex distance, doubled when
/// leaving a tile held by an enemy
pub fn move_cost(world: &World, unit: &Unit, from: Hex, to: Hex) -> i32 {
    let cost = from.distance(to);
    if world.is_enemy_tile(from, unit.owner) {
        cost * 2
    } else {
        cost
    }
}

/// Check a single step, returning its cost
fn check_step(
    world: &World,
    unit: &Unit,
    from: Hex,
    to: Hex,
    used: i32,
) -> Result<i32, RuleViolation> {
    if !world.is_valid_position(to) {
        return Err(RuleViolation::OutOfBounds(to));
    }
    if world.is_blocked(to) {
        return Err(RuleViolation::Blocked(to));
    }
    let cost = move_cost(world, unit, from, to);
    if cost > unit.movement - used {
        return Err(RuleViolation::InsufficientMovement);
    }
    Ok(cost)
}

// ============================================================================
// MOVEMENT
// ============================================================================

/// Tiles reachable with the unit's remaining movement.
///
/// Breadth-first; a tile is fixed at the cost of its first arrival and never
/// revisited. Occupied tiles are not excluded.
pub fn valid_moves(world: &World, unit: &Unit) -> Vec<Hex> {
    let Some(start) = unit.position else {
        return Vec::new();
    };
    let budget = unit.remaining_movement();

    let mut reachable = Vec::new();
    let mut visited = FxHashSet::default();
    visited.insert(start);
    let mut queue = VecDeque::from([(start, 0)]);

    while let Some((pos, cost)) = queue.pop_front() {
        let step = if world.is_enemy_tile(pos, unit.owner) { 2 } else { 1 };
        for next in pos.neighbors() {
            if visited.contains(&next) || !world.is_valid_position(next) || world.is_blocked(next) {
                continue;
            }
            let new_cost = cost + step;
            if new_cost <= budget {
                reachable.push(next);
                visited.insert(next);
                queue.push_back((next, new_cost));
            }
        }
    }

    reachable
}

/// Advance (major): walk a path, all steps validated before any is applied
pub fn advance(
    world: &mut World,
    unit_id: UnitId,
    path: &[Hex],
    facing: Option<u8>,
) -> Result<Outcome, RuleViolation> {
    require_major(world)?;
    let unit = acting_unit(world, unit_id)?;
    let start = positioned(unit)?;

    if path.first() != Some(&start) {
        return Err(RuleViolation::InvalidPath);
    }

    let raw: i32 = path.windows(2).map(|w| w[0].distance(w[1])).sum();
    if raw > unit.movement {
        return Err(RuleViolation::PathTooLong {
            cost: raw,
            allowance: unit.movement,
        });
    }

    let mut used = unit.movement_used;
    for step in path.windows(2) {
        used += check_step(world, unit, step[0], step[1], used)?;
    }
    let cost = used - unit.movement_used;
    let moved = path.len() > 1;
    let dest = path[path.len() - 1];

    if let Some(unit) = world.unit_mut(unit_id) {
        unit.position = Some(dest);
        unit.movement_used = used;
        if moved {
            unit.has_moved = true;
        }
        if let Some(f) = facing {
            unit.facing = f % 6;
        }
    }
    world.major_available = false;

    Ok(Outcome::Moved {
        unit: unit_id,
        to: dest,
        cost,
    })
}

/// Minor move: exactly one tile, only for units with movement above 1
pub fn minor_move(world: &mut World, unit_id: UnitId, to: Hex) -> Result<Outcome, RuleViolation> {
    require_minor(world)?;
    let unit = acting_unit(world, unit_id)?;
    let from = positioned(unit)?;

    if unit.movement == 1 {
        return Err(RuleViolation::CannotMinorMove);
    }
    if unit.has_moved {
        return Err(RuleViolation::AlreadyMoved);
    }
    if from.distance(to) != 1 {
        return Err(RuleViolation::MinorMoveTooFar);
    }
    let cost = check_step(world, unit, from, to, unit.movement_used)?;

    if let Some(unit) = world.unit_mut(unit_id) {
        unit.position = Some(to);
        unit.movement_used += cost;
        unit.has_moved = true;
    }
    world.minor_available = false;

    Ok(Outcome::Moved {
        unit: unit_id,
        to,
        cost,
    })
}

// ============================================================================
// BUILDINGS
// ============================================================================

/// Capture (major): neutral pips convert at 2x, then enemy pips
pub fn capture(world: &mut World, unit_id: UnitId) -> Result<Outcome, RuleViolation> {
    require_major(world)?;
    let unit = acting_unit(world, unit_id)?;
    let pos = positioned(unit)?;
    let (owner, control) = (unit.owner, unit.control);

    let building = world
        .building_mut(pos)
        .ok_or(RuleViolation::NoBuilding(pos))?;
    let spent = building.capture(owner, control);
    world.major_available = false;

    Ok(Outcome::Captured {
        unit: unit_id,
        building: pos,
        spent,
    })
}

/// Control (minor): neutral pips 1:1, then one bulk enemy transfer
pub fn control(world: &mut World, unit_id: UnitId) -> Result<Outcome, RuleViolation> {
    require_minor(world)?;
    let unit = acting_unit(world, unit_id)?;
    let pos = positioned(unit)?;
    let (owner, control) = (unit.owner, unit.control);

    let building = world
        .building_mut(pos)
        .ok_or(RuleViolation::NoBuilding(pos))?;
    let spent = building.control(owner, control);
    world.minor_available = false;

    Ok(Outcome::Controlled {
        unit: unit_id,
        building: pos,
        spent,
    })
}

// ============================================================================
// FIRE
// ============================================================================

/// Roll a d12
pub fn roll_d12<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.gen_range(1..=12)
}

/// Check that `weapon` of `shooter_id` may fire at `target_id`, returning
/// the requirement the roll must meet
pub fn check_shot(
    world: &World,
    shooter_id: UnitId,
    weapon: usize,
    target_id: UnitId,
    minor: bool,
) -> Result<Penetration, RuleViolation> {
    let shooter = world
        .unit(shooter_id)
        .ok_or(RuleViolation::UnknownUnit(shooter_id))?;
    let from = positioned(shooter)?;
    let w = shooter
        .weapons
        .get(weapon)
        .ok_or(RuleViolation::UnknownWeapon(weapon))?;

    let target = world
        .unit(target_id)
        .filter(|t| t.is_alive() && t.owner != shooter.owner)
        .ok_or(RuleViolation::InvalidTarget(target_id))?;
    let to = target
        .position
        .ok_or(RuleViolation::InvalidTarget(target_id))?;

    if shooter.weapons_fired.contains(&weapon) {
        return Err(RuleViolation::AlreadyFired(w.name.clone()));
    }
    if from.distance(to) > w.effective_range() {
        return Err(RuleViolation::OutOfRange);
    }
    if !world.has_line_of_sight(from, to, shooter.owner) {
        return Err(RuleViolation::NoLineOfSight);
    }
    if !World::in_firing_arc(shooter, w, to) {
        return Err(RuleViolation::NotInFrontalArc);
    }

    let requirement = w.requirement(target.armor);
    Ok(if minor {
        requirement.snap_shot()
    } else {
        requirement
    })
}

/// Apply a rolled die to a validated shot. The weapon counts as fired
/// whether or not it hits; a hit deals exactly 1 damage.
pub fn resolve_roll(
    world: &mut World,
    shooter_id: UnitId,
    weapon: usize,
    target_id: UnitId,
    requirement: Penetration,
    roll: u8,
) -> ShotReport {
    let hit = requirement.is_met(roll);

    let mut weapon_name = String::new();
    if let Some(shooter) = world.unit_mut(shooter_id) {
        shooter.weapons_fired.insert(weapon);
        if let Some(w) = shooter.weapons.get(weapon) {
            weapon_name = w.name.clone();
        }
    }

    let mut target_health = 0;
    if let Some(target) = world.unit_mut(target_id) {
        if hit {
            target.take_damage(1);
        }
        target_health = target.current_health;
    }

    ShotReport {
        weapon,
        weapon_name,
        target: target_id,
        roll,
        requirement,
        hit,
        target_health,
    }
}

/// Validate, roll, and resolve one shot
pub fn fire<R: Rng + ?Sized>(
    world: &mut World,
    shooter_id: UnitId,
    weapon: usize,
    target_id: UnitId,
    minor: bool,
    rng: &mut R,
) -> Result<ShotReport, RuleViolation> {
    let requirement = check_shot(world, shooter_id, weapon, target_id, minor)?;
    let roll = roll_d12(rng);
    Ok(resolve_roll(
        world,
        shooter_id,
        weapon,
        target_id,
        requirement,
        roll,
    ))
}

/// Salvo (major): every shot resolves independently. The slot is spent and
/// the unit marked as having shot even if every shot misses or is refused.
pub fn salvo<R: Rng + ?Sized>(
    world: &mut World,
    unit_id: UnitId,
    shots: &[(usize, UnitId)],
    rng: &mut R,
) -> Result<Outcome, RuleViolation> {
    require_major(world)?;
    acting_unit(world, unit_id)?;
    if shots.is_empty() {
        return Err(RuleViolation::EmptySalvo);
    }

    let results = shots
        .iter()
        .map(|&(weapon, target)| fire(world, unit_id, weapon, target, false, rng))
        .collect();

    if let Some(unit) = world.unit_mut(unit_id) {
        unit.has_shot = true;
    }
    world.major_available = false;

    Ok(Outcome::Salvo {
        unit: unit_id,
        shots: results,
    })
}

/// Minor shot: one weapon at a snap-shot requirement, only if the unit has
/// not fired anything this turn. A miss still spends the slot.
pub fn minor_shot<R: Rng + ?Sized>(
    world: &mut World,
    unit_id: UnitId,
    weapon: usize,
    target: UnitId,
    rng: &mut R,
) -> Result<Outcome, RuleViolation> {
    require_minor(world)?;
    let unit = acting_unit(world, unit_id)?;
    if unit.has_shot || !unit.weapons_fired.is_empty() {
        return Err(RuleViolation::AlreadyShot);
    }

    let report = fire(world, unit_id, weapon, target, true, rng)?;

    if let Some(unit) = world.unit_mut(unit_id) {
        unit.has_shot = true;
    }
    world.minor_available = false;

    Ok(Outcome::Shot(report))
}

// ============================================================================
// OVERWATCH
// ============================================================================

/// Overwatch: needs both slots and spends both
pub fn overwatch(world: &mut World, unit_id: UnitId, arc: u8) -> Result<Outcome, RuleViolation> {
    if !world.major_available || !world.minor_available {
        return Err(RuleViolation::OverwatchUnavailable);
    }
    acting_unit(world, unit_id)?;

    let arc = arc % 6;
    if let Some(unit) = world.unit_mut(unit_id) {
        unit.in_overwatch = true;
        unit.overwatch_arc = Some(arc);
    }
    world.major_available = false;
    world.minor_available = false;

    Ok(Outcome::Overwatch { unit: unit_id, arc })
}

// ============================================================================
// DISPATCH
// ============================================================================

/// Execute any action
pub fn apply<R: Rng + ?Sized>(
    world: &mut World,
    action: &Action,
    rng: &mut R,
) -> Result<Outcome, RuleViolation> {
    match action {
        Action::Advance { unit, path, facing } => advance(world, *unit, path, *facing),
        Action::Salvo { unit, shots } => salvo(world, *unit, shots, rng),
        Action::Capture { unit } => capture(world, *unit),
        Action::MinorMove { unit, to } => minor_move(world, *unit, *to),
        Action::Control { unit } => control(world, *unit),
        Action::MinorShot {
            unit,
            weapon,
            target,
        } => minor_shot(world, *unit, *weapon, *target, rng),
        Action::Overwatch { unit, arc } => overwatch(world, *unit, *arc),
    }
}

// ============================================================================
// TESTS
// ============================================================================
