//! Integration tests for the Lead Ledger simulator
//!
//! Tests the full stack: rules, agents, orchestration, and the `ledger` binary

use std::process::Command;

use ledger_core::{evaluate_world, Building, Factor, Hex, HeuristicAgent, Player, Roster, Slot, Weights, World};
use ledger_sim::{play_game, run_evaluation, run_training, setup_game, SimConfig};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// ============================================================================
// TEST FIXTURES
// ============================================================================

/// An infantry squad on a neutral building, the enemy squad out of range
fn skirmish() -> World {
    let roster = Roster::builtin();
    let mut world = World::new(8);
    world.add_building(Building::new(Hex::new(0, 0), 4));

    let id = world.next_unit_id();
    let mut a = roster.instantiate("Rookie Squad", id, Player::One).unwrap();
    a.position = Some(Hex::new(0, 0));
    a.facing = 2;
    world.add_unit(a);

    let id = world.next_unit_id();
    let mut b = roster.instantiate("Rookie Squad", id, Player::Two).unwrap();
    b.position = Some(Hex::new(0, -7));
    b.facing = 5;
    world.add_unit(b);

    world
}

fn ledger() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ledger"))
}

// ============================================================================
// LIBRARY STACK
// ============================================================================

#[test]
fn test_agent_captures_the_building_it_stands_on() {
    let mut world = skirmish();
    // Without positional value the agent has no reason to step off
    let weights = Weights::default().with(Factor::PositionAdvantage, 0.0);
    let agent = HeuristicAgent::with_weights(Player::One, weights);
    let before = evaluate_world(&world, Player::One, agent.weights());

    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let report = agent.take_turn(&mut world, &mut rng);

    assert_eq!(report.failures().count(), 0);
    assert!(!world.major_available);
    assert!(world.building_at(Hex::new(0, 0)).unwrap().pips_of(Player::One) > 0);
    assert!(agent.decide(&world, Slot::Major).is_none());
    assert!(evaluate_world(&world, Player::One, agent.weights()) > before);
}

#[test]
fn test_seeded_game_is_reproducible() {
    let config = SimConfig::default().with_seed(11).with_max_turns(10).with_narrative(true);
    let roster = Roster::builtin();

    let play = || {
        let mut ai1 = HeuristicAgent::new(Player::One);
        let mut ai2 = HeuristicAgent::new(Player::Two);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        play_game(&config, &roster, &mut ai1, &mut ai2, &mut rng)
    };

    let a = play();
    let b = play();
    assert_eq!(a.record, b.record);
    assert_eq!(a.narrative, b.narrative);
    assert!(a.narrative.iter().any(|l| l.contains("GAME END")));
}

#[test]
fn test_setup_deploys_both_armies() {
    let config = SimConfig::default().with_seed(3);
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let world = setup_game(&config, &Roster::builtin(), &mut rng);

    assert!(world.living_count(Player::One) >= 2);
    assert!(world.living_count(Player::Two) >= 2);
    for unit in world.units() {
        assert!(world.is_valid_position(unit.position.unwrap()));
    }
}

#[test]
fn test_training_then_evaluation() {
    let roster = Roster::builtin();
    let config = SimConfig::default().with_seed(21).with_max_turns(8).with_jitter(2, 0.1);
    let mut ai1 = HeuristicAgent::new(Player::One);
    let mut ai2 = HeuristicAgent::new(Player::Two);

    let trained = run_training(&config, &roster, &mut ai1, &mut ai2, 4, |_| {});
    assert_eq!(trained.games_played, 4);
    assert_eq!(ai1.weights().version, 2);
    assert_ne!(ai1.weights(), &Weights::default());

    let evaluated = run_evaluation(&config, &roster, &mut ai1, &mut ai2, 6);
    assert_eq!(evaluated.games_played, 6);
    assert_eq!(ai1.games_played(), 10);
    // Evaluation never jitters
    assert_eq!(ai1.weights().version, 2);
}

// ============================================================================
// BINARY
// ============================================================================

#[test]
fn test_play_json_output() {
    let output = ledger()
        .args(["--seed", "5", "play", "--max-turns", "6", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["seed"], 5);
    assert!(json["turns_played"].as_u64().unwrap() <= 12);
    assert!(json.get("final_scores").is_some());
}

#[test]
fn test_play_prints_narrative() {
    let output = ledger()
        .args(["--seed", "6", "play", "--max-turns", "4", "--army1", "Rookie Squad,M14 Puma"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("GAME START"));
    assert!(text.contains("M14 Puma"));
    assert!(text.contains("GAME END"));
}

#[test]
fn test_train_writes_session_files() {
    let tmp = tempfile::tempdir().unwrap();
    let weights = tmp.path().join("weights.json");
    let output = ledger()
        .args(["--seed", "7", "train", "--games", "3", "--max-turns", "5", "--jitter-interval", "1"])
        .arg("--output")
        .arg(tmp.path())
        .arg("--save-weights")
        .arg(&weights)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["games_played"], 3);

    let session = std::fs::read_dir(tmp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .find(|e| e.file_name().to_string_lossy().starts_with("session_"))
        .unwrap()
        .path();
    assert!(session.join("game_001.log").exists());
    assert!(session.join("game_003.log").exists());
    assert!(session.join("session_summary.txt").exists());

    let saved: Weights = serde_json::from_str(&std::fs::read_to_string(weights).unwrap()).unwrap();
    assert_eq!(saved.version, 3);
}

#[test]
fn test_evaluate_with_missing_roster_falls_back() {
    let output = ledger()
        .args(["--seed", "8", "evaluate", "--games", "4", "--max-turns", "5"])
        .args(["--roster", "/nonexistent/roster.json", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["games_played"], 4);
}

#[test]
fn test_non_positive_map_radius_is_rejected() {
    for radius in ["--map-radius=0", "--map-radius=-2"] {
        let output = ledger()
            .args(["play", radius])
            .output()
            .unwrap();
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("map-radius"));
    }
}

#[test]
fn test_bad_weights_file_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("weights.json");
    std::fs::write(&path, "not json").unwrap();

    let output = ledger()
        .args(["evaluate", "--games", "1"])
        .arg("--weights")
        .arg(&path)
        .output()
        .unwrap();
    assert!(!output.status.success());
}
