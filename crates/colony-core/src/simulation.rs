//! Simulation Driver
//!
//! Owns one colony's ECS world and its tick schedule. Simulations share no
//! global state, so any number of them can run side by side.

use bevy_ecs::prelude::*;
use colony_events::WorldSnapshot;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{info, warn};
use uuid::Uuid;

use crate::commands::{ColonyCommand, CommandError, CommandOutcome};
use crate::components::{
    AgentId, Bee, BeeKind, ForagerTrip, Kinematics, Role, RoleDrives, RolePolicy,
};
use crate::config::{ColonyConfig, ConfigError};
use crate::environment::{FlowerField, Hive};
use crate::geometry::Vec2;
use crate::output::{generate_snapshot, SnapshotGenerator};
use crate::setup::{insert_resources, spawn_bee, spawn_bees, spawn_colony};
use crate::signals::{Signal, SignalBus};
use crate::systems::{
    advance_clock, choose_roles, decay_flash, flush_outbox, run_behaviors, spawn_hatched_workers,
    step_environment, step_signal_bus, update_drives, Senses,
};
use crate::{SimClock, SimRng};

/// The tick schedule, in fixed order
pub fn build_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems(
        (
            advance_clock,
            step_signal_bus,
            step_environment,
            update_drives,
            choose_roles,
            run_behaviors,
            decay_flash,
            spawn_hatched_workers,
            flush_outbox,
        )
            .chain(),
    );
    schedule
}

/// Upper bound for the playback speed multiplier
pub const MAX_SPEED: f32 = 4.0;

pub struct Simulation {
    world: World,
    schedule: Schedule,
    paused: bool,
    speed: f32,
}

impl Simulation {
    /// Builds the arena, hive, flower field and starting population
    pub fn new(config: ColonyConfig, seed: u64) -> Result<Self, ConfigError> {
        let mut sim = Self::empty(config, seed)?;
        spawn_colony(&mut sim.world);
        info!(
            "Simulation built: seed {}, {} bees, {} flowers",
            seed,
            sim.population(),
            sim.flowers().len()
        );
        Ok(sim)
    }

    /// Same as `new` but with no bees; flowers and hive are still generated
    pub fn empty(config: ColonyConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut world = World::new();
        let interval = config.simulation.snapshot_interval;
        insert_resources(&mut world, config, SimRng(SmallRng::seed_from_u64(seed)));
        world.insert_resource(SnapshotGenerator::new(Uuid::new_v4(), interval));
        Ok(Self {
            world,
            schedule: build_schedule(),
            paused: false,
            speed: 1.0,
        })
    }

    /// Runs one tick unless paused. `dt` is clamped into [0, max_dt] and scaled
    /// by the speed, and the scaled dt never exceeds max_dt. A non-finite dt counts as 0.
    pub fn step(&mut self, dt: f32) {
        if self.paused {
            return;
        }
        let max_dt = self.config().simulation.max_dt;
        let dt = if dt.is_finite() { dt.clamp(0.0, max_dt) } else { 0.0 };
        self.world.resource_mut::<SimClock>().dt = (dt * self.speed).min(max_dt);
        self.schedule.run(&mut self.world);
    }

    /// Runs `ticks` ticks of the same dt
    pub fn run(&mut self, ticks: u64, dt: f32) {
        for _ in 0..ticks {
            self.step(dt);
        }
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Flips the pause flag and returns the new state
    pub fn toggle_paused(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Sets the dt multiplier, clamped into [0, MAX_SPEED]; returns the previous speed
    pub fn set_speed(&mut self, speed: f32) -> Result<f32, CommandError> {
        if !speed.is_finite() {
            return Err(CommandError::InvalidValue {
                name: "speed",
                value: speed,
            });
        }
        Ok(std::mem::replace(&mut self.speed, speed.clamp(0.0, MAX_SPEED)))
    }

    pub fn config(&self) -> &ColonyConfig {
        self.world.resource::<ColonyConfig>()
    }

    pub fn clock(&self) -> SimClock {
        *self.world.resource::<SimClock>()
    }

    pub fn bus(&self) -> &SignalBus {
        self.world.resource::<SignalBus>()
    }

    /// Direct bus access for drivers that inject signals
    pub fn bus_mut(&mut self) -> Mut<'_, SignalBus> {
        self.world.resource_mut::<SignalBus>()
    }

    pub fn hive(&self) -> &Hive {
        self.world.resource::<Hive>()
    }

    pub fn hive_mut(&mut self) -> Mut<'_, Hive> {
        self.world.resource_mut::<Hive>()
    }

    pub fn flowers(&self) -> &FlowerField {
        self.world.resource::<FlowerField>()
    }

    pub fn flowers_mut(&mut self) -> Mut<'_, FlowerField> {
        self.world.resource_mut::<FlowerField>()
    }

    pub fn run_id(&self) -> Uuid {
        self.world.resource::<SnapshotGenerator>().run_id()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Number of live bees of every caste
    pub fn population(&self) -> usize {
        self.world.iter_entities().filter(|e| e.contains::<Bee>()).count()
    }

    /// Ids of every bee, ascending
    pub fn agent_ids(&mut self) -> Vec<AgentId> {
        let mut query = self.world.query::<&AgentId>();
        let mut ids: Vec<AgentId> = query.iter(&self.world).copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Spawns one bee at an exact position
    pub fn spawn_bee(&mut self, kind: BeeKind, position: Vec2) -> AgentId {
        spawn_bee(&mut self.world, kind, position)
    }

    pub fn entity(&mut self, id: AgentId) -> Option<Entity> {
        let mut query = self.world.query::<(Entity, &AgentId)>();
        query
            .iter(&self.world)
            .find(|(_, agent)| **agent == id)
            .map(|(entity, _)| entity)
    }

    fn component<T: Component + Clone>(&mut self, id: AgentId) -> Option<T> {
        let entity = self.entity(id)?;
        self.world.get::<T>(entity).cloned()
    }

    fn set_component<T: Component>(&mut self, id: AgentId, value: T) -> bool {
        let Some(entity) = self.entity(id) else {
            return false;
        };
        match self.world.get_mut::<T>(entity) {
            Some(mut current) => {
                *current = value;
                true
            }
            None => false,
        }
    }

    pub fn kinematics(&mut self, id: AgentId) -> Option<Kinematics> {
        self.component::<Kinematics>(id)
    }

    pub fn set_kinematics(&mut self, id: AgentId, kinematics: Kinematics) -> bool {
        self.set_component(id, kinematics)
    }

    pub fn trip(&mut self, id: AgentId) -> Option<ForagerTrip> {
        self.component::<ForagerTrip>(id)
    }

    /// Replaces a worker's trip; false for unknown ids and non-workers
    pub fn set_trip(&mut self, id: AgentId, trip: ForagerTrip) -> bool {
        self.set_component(id, trip)
    }

    pub fn role(&mut self, id: AgentId) -> Option<Role> {
        self.component::<RolePolicy>(id).map(|p| p.current())
    }

    pub fn policy(&mut self, id: AgentId) -> Option<RolePolicy> {
        self.component::<RolePolicy>(id)
    }

    pub fn set_policy(&mut self, id: AgentId, policy: RolePolicy) -> bool {
        self.set_component(id, policy)
    }

    pub fn drives(&mut self, id: AgentId) -> Option<RoleDrives> {
        self.component::<RoleDrives>(id)
    }

    pub fn senses(&mut self, id: AgentId) -> Option<Senses> {
        self.component::<Senses>(id)
    }

    /// True when the snapshot cadence falls on the current tick
    pub fn snapshot_due(&self) -> bool {
        let tick = self.clock().time.tick;
        self.world.resource::<SnapshotGenerator>().should_snapshot(tick)
    }

    pub fn snapshot(&mut self, triggered_by: &str) -> WorldSnapshot {
        generate_snapshot(&mut self.world, triggered_by)
    }

    /// Applies a runtime command between ticks
    pub fn apply(&mut self, command: ColonyCommand) -> Result<CommandOutcome, CommandError> {
        let name = command.name();
        let result = self.apply_inner(command);
        match &result {
            Ok(outcome) => info!("Applied {}: {:?}", name, outcome),
            Err(e) => warn!("Rejected {}: {}", name, e),
        }
        result
    }

    fn apply_inner(&mut self, command: ColonyCommand) -> Result<CommandOutcome, CommandError> {
        match command {
            ColonyCommand::AddBees { count, kind } => {
                let cap = self.config().spawn.max_population;
                let room = cap.saturating_sub(self.population());
                if count > 0 && room == 0 {
                    return Err(CommandError::PopulationCap { cap });
                }
                let ids = spawn_bees(&mut self.world, kind, count.min(room));
                Ok(CommandOutcome::BeesAdded(ids))
            }
            ColonyCommand::AddFlowers { count } => {
                self.world.resource_scope(|world, mut rng: Mut<SimRng>| {
                    world.resource_mut::<FlowerField>().add_random(count, &mut rng.0);
                });
                Ok(CommandOutcome::FlowersAdded(count))
            }
            ColonyCommand::AddFlowerAt { x, y, count } => {
                let at = Vec2::new(x, y);
                if !at.is_finite() {
                    return Err(CommandError::InvalidPosition(x, y));
                }
                self.world.resource_scope(|world, mut rng: Mut<SimRng>| {
                    world.resource_mut::<FlowerField>().add_at(at, count, &mut rng.0);
                });
                Ok(CommandOutcome::FlowersAdded(count))
            }
            ColonyCommand::EmitSignal {
                kind,
                x,
                y,
                radius,
                intensity,
                decay,
                ttl,
            } => {
                let signal = Signal::new(kind, Vec2::new(x, y), radius, intensity, decay, ttl)?;
                self.bus_mut().emit(signal);
                Ok(CommandOutcome::SignalEmitted)
            }
            ColonyCommand::SetReceiverRate { value } => {
                let value = tunable("receiver_rate", value)?;
                let mut config = self.world.resource_mut::<ColonyConfig>();
                let previous = std::mem::replace(&mut config.duties.receiver_rate, value);
                Ok(CommandOutcome::TunableSet { previous, value })
            }
            ColonyCommand::SetTrembleThreshold { value } => {
                let value = tunable("tremble_threshold", value)?;
                let mut config = self.world.resource_mut::<ColonyConfig>();
                let previous = std::mem::replace(&mut config.forager.tremble_threshold, value);
                Ok(CommandOutcome::TunableSet { previous, value })
            }
            ColonyCommand::SetPaused { paused } => {
                self.set_paused(paused);
                Ok(CommandOutcome::Paused(paused))
            }
            ColonyCommand::TogglePaused => Ok(CommandOutcome::Paused(self.toggle_paused())),
            ColonyCommand::SetSpeed { speed } => {
                let previous = self.set_speed(speed)?;
                Ok(CommandOutcome::SpeedSet {
                    previous,
                    value: self.speed,
                })
            }
        }
    }
}

fn tunable(name: &'static str, value: f32) -> Result<f32, CommandError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(CommandError::InvalidValue { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TripState;
    use crate::environment::{FlowerSource, HiveIntake};
    use crate::signals::SignalKind;

    fn quiet_config() -> ColonyConfig {
        let mut config = ColonyConfig::default();
        config.spawn.workers = 0;
        config.spawn.drones = 0;
        config.spawn.queens = 0;
        config
    }

    #[test]
    fn test_new_spawns_configured_population() {
        let sim = Simulation::new(ColonyConfig::default(), 1).unwrap();
        let spawn = &sim.config().spawn;
        assert_eq!(sim.population(), spawn.workers + spawn.drones + spawn.queens);
        assert_eq!(sim.flowers().len(), 36);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = ColonyConfig::default();
        config.arena.width = 0.0;
        assert!(matches!(Simulation::new(config, 1), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_signal_profile_is_rejected() {
        let mut config = quiet_config();
        config.forager.tremble.decay = 0.0;
        assert!(matches!(Simulation::empty(config, 1), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_step_clamps_dt() {
        let mut sim = Simulation::new(quiet_config(), 1).unwrap();
        sim.step(5.0);
        assert_eq!(sim.clock().dt, 0.2);
        sim.step(-1.0);
        assert_eq!(sim.clock().dt, 0.0);
        sim.step(f32::NAN);
        assert_eq!(sim.clock().dt, 0.0);

        let time = sim.clock().time;
        assert_eq!(time.tick, 3);
        assert!((time.elapsed - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_paused_simulation_does_not_tick() {
        let mut sim = Simulation::new(quiet_config(), 1).unwrap();
        sim.step(0.1);
        assert_eq!(
            sim.apply(ColonyCommand::SetPaused { paused: true }).unwrap(),
            CommandOutcome::Paused(true)
        );
        sim.run(10, 0.1);
        assert_eq!(sim.clock().time.tick, 1);
        assert!((sim.clock().time.elapsed - 0.1).abs() < 1e-6);

        assert_eq!(
            sim.apply(ColonyCommand::TogglePaused).unwrap(),
            CommandOutcome::Paused(false)
        );
        assert!(!sim.paused());
        sim.step(0.1);
        assert_eq!(sim.clock().time.tick, 2);
    }

    #[test]
    fn test_speed_scales_dt() {
        let mut sim = Simulation::new(quiet_config(), 1).unwrap();
        let outcome = sim.apply(ColonyCommand::SetSpeed { speed: 2.0 }).unwrap();
        assert_eq!(
            outcome,
            CommandOutcome::SpeedSet {
                previous: 1.0,
                value: 2.0
            }
        );
        sim.run(5, 0.05);
        assert_eq!(sim.clock().dt, 0.1);
        assert!((sim.clock().time.elapsed - 0.5).abs() < 1e-5);

        // the scaled dt is still capped by max_dt
        sim.step(0.15);
        assert_eq!(sim.clock().dt, 0.2);
    }

    #[test]
    fn test_speed_is_clamped() {
        let mut sim = Simulation::new(quiet_config(), 1).unwrap();
        sim.apply(ColonyCommand::SetSpeed { speed: 10.0 }).unwrap();
        assert_eq!(sim.speed(), MAX_SPEED);
        sim.apply(ColonyCommand::SetSpeed { speed: -3.0 }).unwrap();
        assert_eq!(sim.speed(), 0.0);

        // speed 0 still ticks, with no time passing
        sim.step(0.1);
        assert_eq!(sim.clock().time.tick, 1);
        assert_eq!(sim.clock().time.elapsed, 0.0);

        assert!(matches!(
            sim.apply(ColonyCommand::SetSpeed { speed: f32::NAN }),
            Err(CommandError::InvalidValue { name: "speed", .. })
        ));
        assert_eq!(sim.speed(), 0.0);
    }

    #[test]
    fn test_emissions_are_sensed_next_tick() {
        let mut sim = Simulation::empty(quiet_config(), 1).unwrap();
        let center = sim.hive().geometry().center;
        let fanner = sim.spawn_bee(BeeKind::Worker, center);
        let mut policy = RolePolicy::new(&sim.config().roles);
        policy.force(Role::Fanner);
        sim.set_policy(fanner, policy);

        // Fanning is due after 1.5 s, so 8 ticks of 0.2
        sim.run(8, 0.2);
        assert_eq!(sim.bus().count(SignalKind::Fanning), 1);
        assert_eq!(sim.senses(fanner).unwrap().get(SignalKind::Fanning), 0.0);

        sim.step(0.2);
        assert!(sim.senses(fanner).unwrap().get(SignalKind::Fanning) > 0.0);
    }

    #[test]
    fn test_role_change_mid_trip_releases_claim() {
        let mut sim = Simulation::empty(quiet_config(), 3).unwrap();
        let center = sim.hive().geometry().center;
        let bee = sim.spawn_bee(BeeKind::Worker, center);

        let flower = sim.flowers_mut().insert(Vec2::new(100.0, 100.0), 2.0);
        assert!(sim.flowers_mut().reserve_nearest(Vec2::new(100.0, 100.0), &[]).is_some());
        let mut trip = sim.trip(bee).unwrap();
        trip.begin_seek(flower);
        sim.set_trip(bee, trip);

        let mut policy = RolePolicy::new(&sim.config().roles);
        policy.tick(10.0);
        sim.set_policy(bee, policy);
        let entity = sim.entity(bee).unwrap();
        let mut drives = RoleDrives::new();
        drives.set(Role::Nurse, 5.0, 5.0);
        *sim.world_mut().get_mut::<RoleDrives>(entity).unwrap() = drives;

        sim.step(0.05);
        assert_eq!(sim.role(bee), Some(Role::Nurse));
        let trip = sim.trip(bee).unwrap();
        assert_eq!(trip.state, TripState::Wander);
        assert_eq!(trip.reserved, None);
        assert!(!sim.flowers().get(flower).unwrap().reserved);
    }

    #[test]
    fn test_add_bees_stops_at_cap() {
        let mut config = quiet_config();
        config.spawn.max_population = 3;
        let mut sim = Simulation::new(config, 1).unwrap();

        let outcome = sim
            .apply(ColonyCommand::AddBees {
                count: 5,
                kind: BeeKind::Worker,
            })
            .unwrap();
        assert_eq!(
            outcome,
            CommandOutcome::BeesAdded(vec![AgentId(1), AgentId(2), AgentId(3)])
        );
        assert!(matches!(
            sim.apply(ColonyCommand::AddBees {
                count: 1,
                kind: BeeKind::Drone
            }),
            Err(CommandError::PopulationCap { cap: 3 })
        ));
    }

    #[test]
    fn test_flower_commands() {
        let mut sim = Simulation::new(quiet_config(), 1).unwrap();
        let before = sim.flowers().len();
        sim.apply(ColonyCommand::AddFlowers { count: 4 }).unwrap();
        sim.apply(ColonyCommand::AddFlowerAt {
            x: 480.0,
            y: 270.0,
            count: 1,
        })
        .unwrap();
        assert_eq!(sim.flowers().len(), before + 5);
        assert!(sim
            .flowers()
            .iter()
            .any(|f| f.position == Vec2::new(480.0, 270.0)));

        assert!(matches!(
            sim.apply(ColonyCommand::AddFlowerAt {
                x: f32::NAN,
                y: 0.0,
                count: 1
            }),
            Err(CommandError::InvalidPosition(..))
        ));
    }

    #[test]
    fn test_emit_signal_is_validated() {
        let mut sim = Simulation::new(quiet_config(), 1).unwrap();
        let bad = ColonyCommand::EmitSignal {
            kind: SignalKind::Alarm,
            x: 10.0,
            y: 10.0,
            radius: 50.0,
            intensity: 1.0,
            decay: 0.0,
            ttl: 2.0,
        };
        assert!(matches!(sim.apply(bad), Err(CommandError::Signal(_))));
        assert!(sim.bus().is_empty());

        let good = ColonyCommand::EmitSignal {
            kind: SignalKind::Alarm,
            x: 10.0,
            y: 10.0,
            radius: 50.0,
            intensity: 1.0,
            decay: 0.5,
            ttl: 2.0,
        };
        assert_eq!(sim.apply(good).unwrap(), CommandOutcome::SignalEmitted);
        assert_eq!(sim.bus().count(SignalKind::Alarm), 1);
    }

    #[test]
    fn test_tunables() {
        let mut sim = Simulation::new(quiet_config(), 1).unwrap();
        let outcome = sim.apply(ColonyCommand::SetReceiverRate { value: 2.0 }).unwrap();
        assert_eq!(
            outcome,
            CommandOutcome::TunableSet {
                previous: 1.2,
                value: 2.0
            }
        );
        assert_eq!(sim.config().duties.receiver_rate, 2.0);

        assert!(sim.apply(ColonyCommand::SetTrembleThreshold { value: -1.0 }).is_err());
        assert_eq!(sim.config().forager.tremble_threshold, 6.0);
    }

    #[test]
    fn test_snapshot_reflects_world() {
        let mut sim = Simulation::new(ColonyConfig::default(), 11).unwrap();
        sim.hive_mut().enqueue_intake(2.5);
        sim.run(10, 1.0 / 60.0);
        let snapshot = sim.snapshot("test");

        assert_eq!(snapshot.snapshot_id, "snap_000001");
        assert_eq!(snapshot.run_id, sim.run_id());
        assert_eq!(snapshot.time.tick, 10);
        assert_eq!(snapshot.agents.len(), sim.population());
        assert!(snapshot.agents.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(snapshot.flowers_remaining, sim.flowers().remaining_count());
        assert!(snapshot.hive.queue > 0.0);
        assert_eq!(snapshot.arena.width, 960.0);
    }
}
