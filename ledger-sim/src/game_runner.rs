//! Game runner - builds and plays single games
//!
//! Level 2/3 - Phase and step-level implementation

use ledger_core::agent::ActionRecord;
use ledger_core::{Action, Building, HeuristicAgent, Outcome, Player, Roster, UnitId, World};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::army::balanced_army;
use crate::config::SimConfig;
use crate::map_gen::{deployment_facing, deployment_zone, generate_map, BUILDING_PIPS};

const RULE: &str = "============================================================";

/// Final result of a single game
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Winning player, None for a tie
    pub winner: Option<Player>,
    /// Final scores, player 1 first
    pub final_scores: [i32; 2],
    pub turns_played: u32,
    pub p1_units_remaining: usize,
    pub p2_units_remaining: usize,
}

impl GameRecord {
    /// Summarize a finished world
    pub fn from_world(world: &World) -> Self {
        Self {
            winner: world.winner(),
            final_scores: [world.score(Player::One), world.score(Player::Two)],
            turns_played: world.turn,
            p1_units_remaining: world.living_count(Player::One),
            p2_units_remaining: world.living_count(Player::Two),
        }
    }

    pub fn is_tie(&self) -> bool {
        self.winner.is_none()
    }
}

/// A played game and, when requested, its narrative
#[derive(Clone, Debug)]
pub struct GameOutcome {
    pub record: GameRecord,
    /// Plain-text play-by-play; empty unless narration was enabled
    pub narrative: Vec<String>,
}

/// Collects narrative lines when enabled
struct Narrator {
    enabled: bool,
    lines: Vec<String>,
}

impl Narrator {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            lines: Vec::new(),
        }
    }

    fn line(&mut self, f: impl FnOnce() -> String) {
        if self.enabled {
            self.lines.push(f());
        }
    }
}

// ============================================================================
// SETUP
// ============================================================================

/// Build a fresh world: terrain, buildings, and both armies deployed.
///
/// Army names missing from the roster are skipped with a warning.
pub fn setup_game<R: Rng + ?Sized>(config: &SimConfig, roster: &Roster, rng: &mut R) -> World {
    let mut world = World::new(config.map_radius);
    world.max_turns = config.max_turns;
    world.cycle_length = config.cycle_length;

    let layout = generate_map(config.map_radius, rng);
    for pos in layout.buildings {
        world.add_building(Building::new(pos, rng.gen_range(BUILDING_PIPS)));
    }
    for pos in layout.blocked {
        world.block_tile(pos);
    }

    for player in [Player::One, Player::Two] {
        let fixed = match player {
            Player::One => config.army1.clone(),
            Player::Two => config.army2.clone(),
        };
        let army = fixed.unwrap_or_else(|| balanced_army(config.army_budget, rng));
        deploy_army(&mut world, roster, player, &army, rng);
    }

    world
}

/// Place an army in its deployment zone; unit i takes zone tile i, or a
/// random zone tile once the zone runs out
fn deploy_army<R: Rng + ?Sized>(
    world: &mut World,
    roster: &Roster,
    player: Player,
    army: &[String],
    rng: &mut R,
) {
    let zone = deployment_zone(player, world.radius);

    for (i, name) in army.iter().enumerate() {
        let id = world.next_unit_id();
        let Some(mut unit) = roster.instantiate(name, id, player) else {
            warn!("Unit unavailable: {name:?} (skipped for {player})");
            continue;
        };

        let pos = match zone.get(i) {
            Some(&pos) => Some(pos),
            None => zone.choose(rng).copied(),
        };
        unit.position = pos;
        unit.facing = deployment_facing(player);
        world.add_unit(unit);
    }
}

// ============================================================================
// PLAY
// ============================================================================

/// Play a world to completion.
///
/// Turns alternate until the game is over or `2 * max_turns` turns have been
/// handed out. Failed agent actions are logged and play continues.
pub fn run_game<R: Rng + ?Sized>(
    world: &mut World,
    ai1: &HeuristicAgent,
    ai2: &HeuristicAgent,
    narrate: bool,
    rng: &mut R,
) -> GameOutcome {
    let mut narrator = Narrator::new(narrate);
    narrate_start(&mut narrator, world);

    let cap = world.max_turns.saturating_mul(2);
    let mut iterations = 0;

    while !world.is_game_over() && iterations < cap {
        iterations += 1;
        let active = world.active_player();
        let agent = if active == Player::One { ai1 } else { ai2 };

        narrator.line(|| format!("\n{RULE}\nTurn {}, Player {}\n{RULE}", world.turn, active.number()));

        let report = agent.take_turn(world, rng);
        for record in &report.records {
            match &record.result {
                Ok(outcome) => {
                    debug!("{active}: {}", outcome);
                    narrator.line(|| describe(world, &record.action, outcome));
                }
                Err(e) => {
                    warn!("{active}: {} by unit {} failed: {e}", record.action.kind(), record.action.unit());
                    narrator.line(|| describe_failure(world, record));
                }
            }
        }
        if report.is_empty() {
            narrator.line(|| "  (no action)".to_string());
        }

        world.advance_turn();
    }

    world.calculate_score();
    let record = GameRecord::from_world(world);
    narrate_end(&mut narrator, &record);

    GameOutcome {
        record,
        narrative: narrator.lines,
    }
}

/// Set up and play one game, then update both agents' records
pub fn play_game<R: Rng + ?Sized>(
    config: &SimConfig,
    roster: &Roster,
    ai1: &mut HeuristicAgent,
    ai2: &mut HeuristicAgent,
    rng: &mut R,
) -> GameOutcome {
    let mut world = setup_game(config, roster, rng);
    let outcome = run_game(&mut world, ai1, ai2, config.narrative, rng);

    let winner = outcome.record.winner;
    ai1.record_result(winner == Some(Player::One));
    ai2.record_result(winner == Some(Player::Two));

    outcome
}

// ============================================================================
// NARRATIVE
// ============================================================================

fn name_of(world: &World, id: UnitId) -> String {
    world
        .unit(id)
        .map_or_else(|| format!("unit {id}"), |u| u.name.clone())
}

fn narrate_start(n: &mut Narrator, world: &World) {
    n.line(|| format!("{RULE}\nGAME START\n{RULE}"));
    n.line(|| format!("Map Size: {}", world.radius));
    n.line(|| format!("Max Turns: {}", world.max_turns));
    for player in [Player::One, Player::Two] {
        n.line(|| format!("\nPlayer {} Army:", player.number()));
        for unit in world.units_of(player) {
            n.line(|| {
                let pos = unit.position.map_or("undeployed".to_string(), |p| p.to_string());
                format!("  - {} (HP: {}) at {pos}", unit.name, unit.max_health)
            });
        }
    }
    let mut buildings: Vec<_> = world.buildings().collect();
    buildings.sort_by_key(|b| b.position);
    n.line(|| format!("\nBuildings: {}", buildings.len()));
    for b in buildings {
        n.line(|| format!("  - {} ({} pips)", b.position, b.total_pips));
    }
}

fn narrate_end(n: &mut Narrator, record: &GameRecord) {
    n.line(|| format!("\n{RULE}\nGAME END\n{RULE}"));
    n.line(|| match record.winner {
        Some(p) => format!("Winner: Player {}", p.number()),
        None => "Winner: TIE".to_string(),
    });
    n.line(|| {
        format!(
            "Final Scores: P1={}, P2={}",
            record.final_scores[0], record.final_scores[1]
        )
    });
    n.line(|| format!("Turns Played: {}", record.turns_played));
    n.line(|| format!("P1 Units Remaining: {}", record.p1_units_remaining));
    n.line(|| format!("P2 Units Remaining: {}", record.p2_units_remaining));
}

fn describe(world: &World, action: &Action, outcome: &Outcome) -> String {
    let actor = name_of(world, action.unit());
    match outcome {
        Outcome::Moved { to, cost, .. } => match action {
            Action::MinorMove { .. } => format!("  {actor} moves to {to}"),
            _ => format!("  {actor} advances to {to} (cost {cost})"),
        },
        Outcome::Salvo { shots, .. } => {
            let mut text = format!("  {actor} fires a salvo");
            for shot in shots {
                match shot {
                    Ok(s) => text.push_str(&format!(
                        "\n    {} at {}: {} (rolled {} vs {}), HP {}",
                        s.weapon_name,
                        name_of(world, s.target),
                        if s.hit { "hit" } else { "miss" },
                        s.roll,
                        s.requirement,
                        s.target_health,
                    )),
                    Err(e) => text.push_str(&format!("\n    shot refused: {e}")),
                }
            }
            text
        }
        Outcome::Captured { building, spent, .. } => {
            format!("  {actor} captures building at {building} ({spent} control)")
        }
        Outcome::Controlled { building, spent, .. } => {
            format!("  {actor} controls building at {building} ({spent} control)")
        }
        Outcome::Shot(s) => format!(
            "  {actor} (minor) shoots {} at {}: {} (rolled {} vs {}), HP {}",
            s.weapon_name,
            name_of(world, s.target),
            if s.hit { "hit" } else { "miss" },
            s.roll,
            s.requirement,
            s.target_health,
        ),
        Outcome::Overwatch { arc, .. } => format!("  {actor} goes on overwatch (arc {arc})"),
    }
}

fn describe_failure(world: &World, record: &ActionRecord) -> String {
    let reason = match &record.result {
        Err(e) => e.to_string(),
        Ok(_) => String::new(),
    };
    format!(
        "  {} {} FAILED: {reason}",
        name_of(world, record.action.unit()),
        record.action.kind()
    )
}

// ============================================================================
// TESTS
// ============================================================================
