//! End-to-end colony scenarios
//!
//! Each test builds a small `Simulation` by hand and checks one observable
//! behavior through the public API.

use colony_core::components::{AgentId, BeeKind, ForagerTrip, TripState};
use colony_core::environment::{FlowerField, FlowerSource, HiveIntake};
use colony_core::geometry::Vec2;
use colony_core::signals::{Signal, SignalKind, SignalPayload};
use colony_core::{ColonyConfig, Role, Simulation};
use std::collections::HashSet;

fn empty_colony(seed: u64) -> Simulation {
    let mut config = ColonyConfig::default();
    config.spawn.workers = 0;
    config.spawn.drones = 0;
    config.spawn.queens = 0;
    Simulation::new(config, seed).unwrap()
}

fn clear_flowers(sim: &mut Simulation) {
    let config = sim.config().clone();
    *sim.flowers_mut() = FlowerField::new(&config.arena, &config.flowers);
}

#[test]
fn test_waggle_recruits_wandering_forager() {
    let mut sim = empty_colony(1);
    clear_flowers(&mut sim);
    sim.flowers_mut().insert(Vec2::new(160.0, 80.0), 2.0);
    sim.flowers_mut().insert(Vec2::new(700.0, 450.0), 2.0);

    let start = Vec2::new(100.0, 100.0);
    let target = Vec2::new(150.0, 80.0);
    let dance = Signal::new(SignalKind::Waggle, start, 50.0, 2.0, 0.2, 3.0)
        .unwrap()
        .with_payload(SignalPayload::Waggle { target })
        .unwrap();
    sim.bus_mut().emit(dance);

    let bee = sim.spawn_bee(BeeKind::Worker, start);
    assert_eq!(sim.trip(bee).unwrap().state, TripState::Wander);

    sim.step(0.2);

    let kin = sim.kinematics(bee).unwrap();
    let toward = target - start;
    assert!(
        kin.velocity.dot(toward) > 0.0,
        "velocity {:?} points away from the dance target",
        kin.velocity
    );
    assert_eq!(sim.trip(bee).unwrap().state, TripState::ToFlower);
}

#[test]
fn test_congested_delivery_trembles_instead_of_dancing() {
    let mut sim = empty_colony(2);
    let threshold = sim.config().forager.tremble_threshold;
    let entrance = sim.hive().geometry().entrance;
    sim.hive_mut().enqueue_intake(threshold + 1.0);

    let bee = sim.spawn_bee(BeeKind::Worker, entrance);
    let mut trip = ForagerTrip::new(sim.config().forager.capacity);
    trip.state = TripState::ToHive;
    trip.carry = 1.5;
    trip.last_collection = Some(Vec2::new(200.0, 120.0));
    assert!(sim.set_trip(bee, trip));

    sim.step(0.05);

    assert_eq!(sim.bus().count(SignalKind::Tremble), 1);
    assert_eq!(sim.bus().count(SignalKind::Waggle), 0);
    assert_eq!(sim.trip(bee).unwrap().carry, 0.0);
}

#[test]
fn test_uncongested_delivery_dances() {
    let mut sim = empty_colony(3);
    let entrance = sim.hive().geometry().entrance;
    let bee = sim.spawn_bee(BeeKind::Worker, entrance);
    let mut trip = ForagerTrip::new(2.0);
    trip.state = TripState::ToHive;
    trip.carry = 1.5;
    trip.last_collection = Some(Vec2::new(200.0, 120.0));
    trip.last_yield = 1.5;
    sim.set_trip(bee, trip);

    sim.step(0.05);

    assert_eq!(sim.bus().count(SignalKind::Waggle), 1);
    assert_eq!(sim.bus().count(SignalKind::Tremble), 0);
    let dance = sim
        .bus()
        .iter()
        .find(|s| s.kind() == SignalKind::Waggle)
        .unwrap();
    assert_eq!(dance.recruit_target(), Some(Vec2::new(200.0, 120.0)));
    assert!((dance.intensity() - 2.5).abs() < 1e-6);
    assert!((sim.hive().read_queue_pressure() - 1.5).abs() < 1e-6);
}

#[test]
fn test_hive_drain_is_exact() {
    let mut sim = empty_colony(4);
    let mut hive = sim.hive_mut();
    hive.enqueue_intake(5.0);
    let drained = hive.service_intake(1.0, 2.0);

    assert!((drained - 2.0).abs() < 1e-6);
    assert!((hive.read_queue_pressure() - 3.0).abs() < 1e-6);
    assert!((hive.total_deposited() - 2.0).abs() < 1e-6);
}

#[test]
fn test_release_is_idempotent() {
    let mut sim = empty_colony(5);
    clear_flowers(&mut sim);
    let flower = sim.flowers_mut().insert(Vec2::new(300.0, 300.0), 2.0);
    let mut field = sim.flowers_mut();

    assert_eq!(field.reserve_nearest(Vec2::new(300.0, 300.0), &[]), Some(flower));
    field.release_reservation(flower);
    field.release_reservation(flower);
    field.release_reservation(9999);

    assert!(field.flower(flower).unwrap().available);
    assert_eq!(field.reserve_nearest(Vec2::new(0.0, 0.0), &[]), Some(flower));
}

#[test]
fn test_collect_always_clears_claim() {
    let mut sim = empty_colony(6);
    clear_flowers(&mut sim);
    let flower = sim.flowers_mut().insert(Vec2::new(300.0, 300.0), 0.3);
    let mut field = sim.flowers_mut();

    field.reserve_nearest(Vec2::new(300.0, 300.0), &[]);
    let taken = field.collect_from(flower, 0.6);
    assert!((taken - 0.3).abs() < 1e-6);
    assert!(!field.flower(flower).unwrap().reserved);

    // Empty flower: nothing taken, still unclaimed
    assert_eq!(field.collect_from(flower, 0.6), 0.0);
    assert!(!field.flower(flower).unwrap().reserved);
}

/// Every flower claim belongs to exactly one forager, every tick
#[test]
fn test_reservations_are_unique_over_a_run() {
    let mut config = ColonyConfig::default();
    config.spawn.workers = 60;
    config.flowers.patches = 2;
    config.flowers.flowers_per_patch = 5;
    let mut sim = Simulation::new(config, 77).unwrap();

    for _ in 0..600 {
        sim.step(1.0 / 30.0);

        let mut claims: Vec<u32> = Vec::new();
        let mut query = sim.world_mut().query::<&ForagerTrip>();
        for trip in query.iter(sim.world()) {
            if let Some(flower) = trip.reserved {
                claims.push(flower);
            }
        }
        let unique: HashSet<u32> = claims.iter().copied().collect();
        assert_eq!(unique.len(), claims.len(), "two foragers hold the same flower");

        let mut reserved = sim.flowers().reserved_ids();
        let mut held = claims.clone();
        reserved.sort_unstable();
        held.sort_unstable();
        assert_eq!(reserved, held, "field reservations and forager claims disagree");
    }
}

#[test]
fn test_no_role_switch_before_min_dwell() {
    let mut sim = empty_colony(8);
    let center = sim.hive().geometry().center;
    let bee = sim.spawn_bee(BeeKind::Worker, center);
    let min_dwell = sim.config().roles.min_dwell;

    // Flood the hive with alarm so the guard drive saturates at once
    for _ in 0..4 {
        let alarm = Signal::new(SignalKind::Alarm, center, 400.0, 3.0, 0.01, 100.0).unwrap();
        sim.bus_mut().emit(alarm);
    }

    let dt = 0.1;
    let mut elapsed = 0.0;
    let mut switched_at = None;
    for _ in 0..60 {
        sim.step(dt);
        elapsed += dt;
        if sim.role(bee) != Some(Role::Forager) {
            switched_at = Some(elapsed);
            break;
        }
    }
    let switched_at = switched_at.expect("alarm flood never moved the forager");
    assert!(switched_at >= min_dwell - 1e-4, "switched after {:.2}s", switched_at);
    assert_eq!(sim.role(bee), Some(Role::Guard));
}

#[test]
fn test_drones_and_queens_keep_fixed_roles() {
    let mut sim = empty_colony(9);
    let center = sim.hive().geometry().center;
    let queen = sim.spawn_bee(BeeKind::Queen, center);
    let drone = sim.spawn_bee(BeeKind::Drone, Vec2::new(100.0, 100.0));

    sim.run(120, 0.1);

    assert_eq!(sim.role(queen), Some(Role::Idle));
    assert_eq!(sim.role(drone), Some(Role::Idle));
    assert!(sim.drives(queen).is_none());
    assert!(sim.trip(drone).is_none());
    // 12 s of laying at 2 eggs per 5 s
    assert_eq!(sim.hive().brood_snapshot().total(), 4);
}

#[test]
fn test_population_grows_from_brood() {
    let mut sim = empty_colony(10);
    let center = sim.hive().geometry().center;
    for _ in 0..4 {
        let nurse = sim.spawn_bee(BeeKind::Worker, center);
        let mut policy = sim.policy(nurse).unwrap();
        policy.force(Role::Nurse);
        sim.set_policy(nurse, policy);
    }
    sim.hive_mut().add_eggs(3);

    // Brood pheromone keeps the nurse drive on top
    sim.run(3000, 0.2);

    assert_eq!(sim.hive().hatched_total(), 3);
    assert_eq!(sim.population(), 7);
    let newest = sim.agent_ids().into_iter().max().unwrap();
    assert_eq!(newest, AgentId(7));
}
