//! Determinism verification tests
//!
//! A run is a pure function of its configuration and seed.

use colony_core::{ColonyCommand, ColonyConfig, Simulation};
use colony_events::WorldSnapshot;
use uuid::Uuid;

/// Snapshot JSON with the per-run id blanked out
fn fingerprint(mut snapshot: WorldSnapshot) -> String {
    snapshot.run_id = Uuid::nil();
    snapshot.to_json().unwrap()
}

fn run(seed: u64, ticks: u64) -> Vec<String> {
    let mut sim = Simulation::new(ColonyConfig::default(), seed).unwrap();
    let mut prints = vec![fingerprint(sim.snapshot("start"))];
    for tick in 1..=ticks {
        sim.step(1.0 / 60.0);
        if tick % 100 == 0 {
            prints.push(fingerprint(sim.snapshot("periodic")));
        }
    }
    prints
}

#[test]
fn test_same_seed_same_snapshots() {
    let first = run(42, 600);
    let second = run(42, 600);
    assert_eq!(first.len(), 7);
    assert_eq!(first, second, "snapshots should be identical with the same seed");
}

#[test]
fn test_different_seeds_diverge() {
    let a = run(42, 100);
    let b = run(43, 100);
    assert_ne!(a, b, "different seeds should produce different runs");
}

#[test]
fn test_commands_replay_deterministically() {
    fn scripted(seed: u64) -> String {
        let mut sim = Simulation::new(ColonyConfig::default(), seed).unwrap();
        sim.run(50, 0.05);
        sim.apply(ColonyCommand::AddFlowers { count: 5 }).unwrap();
        sim.apply(ColonyCommand::AddBees {
            count: 3,
            kind: Default::default(),
        })
        .unwrap();
        sim.run(50, 0.05);
        fingerprint(sim.snapshot("end"))
    }
    assert_eq!(scripted(7), scripted(7));
}

#[test]
fn test_varying_dt_is_reproducible() {
    fn jittery(seed: u64) -> String {
        let mut sim = Simulation::new(ColonyConfig::default(), seed).unwrap();
        for i in 0..300 {
            // includes a spike that gets clamped
            let dt = if i == 150 { 2.0 } else { 0.01 + (i % 7) as f32 * 0.005 };
            sim.step(dt);
        }
        fingerprint(sim.snapshot("end"))
    }
    assert_eq!(jittery(5), jittery(5));
}
