//! Colony Setup
//!
//! Builds the starting world resources and spawns bees.

use bevy_ecs::prelude::*;
use rand::Rng;
use tracing::info;

use crate::components::{
    spawn_velocity, AgentId, Bee, BeeKind, DutyTimers, Flash, ForagerTrip, Kinematics, Role,
    RoleDrives, RolePolicy,
};
use crate::config::{ArenaConfig, ColonyConfig};
use crate::environment::{FlowerField, Hive, HiveGeometry, HiveIntake};
use crate::geometry::Vec2;
use crate::signals::{SignalBus, SignalOutbox};
use crate::systems::perception::Senses;
use crate::{SimClock, SimRng};

/// Hands out agent ids in spawn order, starting at 1
#[derive(Resource, Debug, Clone)]
pub struct AgentIds {
    next: u32,
}

impl AgentIds {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn allocate(&mut self) -> AgentId {
        let id = AgentId(self.next);
        self.next += 1;
        id
    }
}

impl Default for AgentIds {
    fn default() -> Self {
        Self::new()
    }
}

/// Components every bee carries
#[derive(Bundle)]
pub struct BeeBundle {
    pub bee: Bee,
    pub id: AgentId,
    pub kind: BeeKind,
    pub kinematics: Kinematics,
    pub flash: Flash,
    pub timers: DutyTimers,
    pub policy: RolePolicy,
}

/// Extra components for workers: drives, senses and a foraging trip
#[derive(Bundle)]
pub struct WorkerBundle {
    pub drives: RoleDrives,
    pub senses: Senses,
    pub trip: ForagerTrip,
}

/// Builds the components of a new bee moving off in a random direction.
///
/// Queens and drones get a fixed idle policy and no worker bundle.
pub fn bee_components<R: Rng + ?Sized>(
    id: AgentId,
    kind: BeeKind,
    position: Vec2,
    config: &ColonyConfig,
    rng: &mut R,
) -> (BeeBundle, Option<WorkerBundle>) {
    let motion = kind.motion(&config.castes);
    let kinematics = Kinematics::at(position).with_velocity(spawn_velocity(&motion, rng));
    let policy = if kind.has_drives() {
        RolePolicy::new(&config.roles)
    } else {
        RolePolicy::fixed(Role::Idle)
    };
    let bee = BeeBundle {
        bee: Bee,
        id,
        kind,
        kinematics,
        flash: Flash::default(),
        timers: DutyTimers::default(),
        policy,
    };
    let worker = kind.has_drives().then(|| WorkerBundle {
        drives: RoleDrives::new(),
        senses: Senses::new(),
        trip: ForagerTrip::new(config.forager.capacity),
    });
    (bee, worker)
}

/// Uniform point inside the arena margin
pub fn random_position<R: Rng + ?Sized>(arena: &ArenaConfig, rng: &mut R) -> Vec2 {
    let mut span = |size: f32| {
        let (lo, hi) = (arena.margin, size - arena.margin);
        if hi > lo {
            rng.gen_range(lo..hi)
        } else {
            size * 0.5
        }
    };
    let x = span(arena.width);
    let y = span(arena.height);
    Vec2::new(x, y)
}

/// Spawn position for a caste: queens start at the hive center, the rest anywhere
pub fn spawn_position<R: Rng + ?Sized>(
    kind: BeeKind,
    hive: &HiveGeometry,
    arena: &ArenaConfig,
    rng: &mut R,
) -> Vec2 {
    match kind {
        BeeKind::Queen => hive.center,
        BeeKind::Worker | BeeKind::Drone => random_position(arena, rng),
    }
}

/// Spawns one bee directly into the world and returns its id
pub fn spawn_bee(world: &mut World, kind: BeeKind, position: Vec2) -> AgentId {
    let id = world.resource_mut::<AgentIds>().allocate();
    let config = world.resource::<ColonyConfig>().clone();
    let (bee, worker) = {
        let mut rng = world.resource_mut::<SimRng>();
        bee_components(id, kind, position, &config, &mut rng.0)
    };
    let mut entity = world.spawn(bee);
    if let Some(worker) = worker {
        entity.insert(worker);
    }
    id
}

/// Spawns `count` bees of one caste at their caste's usual spot
pub fn spawn_bees(world: &mut World, kind: BeeKind, count: usize) -> Vec<AgentId> {
    let arena = world.resource::<ColonyConfig>().arena.clone();
    let hive = world.resource::<Hive>().geometry();
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let position = {
            let mut rng = world.resource_mut::<SimRng>();
            spawn_position(kind, &hive, &arena, &mut rng.0)
        };
        ids.push(spawn_bee(world, kind, position));
    }
    ids
}

/// Inserts every resource the tick schedule needs
pub fn insert_resources(world: &mut World, config: ColonyConfig, mut rng: SimRng) {
    let flowers = FlowerField::generate(&config.arena, &config.flowers, &mut rng.0);
    let hive = Hive::new(&config.arena, &config.hive);
    world.insert_resource(flowers);
    world.insert_resource(hive);
    world.insert_resource(SignalBus::new());
    world.insert_resource(SignalOutbox::new());
    world.insert_resource(SimClock::default());
    world.insert_resource(AgentIds::new());
    world.insert_resource(rng);
    world.insert_resource(config);
}

/// Spawns the starting population from `spawn` config, queens first
pub fn spawn_colony(world: &mut World) {
    let spawn = world.resource::<ColonyConfig>().spawn.clone();
    spawn_bees(world, BeeKind::Queen, spawn.queens);
    spawn_bees(world, BeeKind::Worker, spawn.workers);
    spawn_bees(world, BeeKind::Drone, spawn.drones);
    info!(
        "Spawned colony: {} workers, {} drones, {} queens",
        spawn.workers, spawn.drones, spawn.queens
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn world() -> World {
        let mut world = World::new();
        insert_resources(&mut world, ColonyConfig::default(), SimRng(SmallRng::seed_from_u64(5)));
        world
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut ids = AgentIds::new();
        assert_eq!(ids.allocate(), AgentId(1));
        assert_eq!(ids.allocate(), AgentId(2));
        assert_eq!(ids.allocate(), AgentId(3));
    }

    #[test]
    fn test_worker_gets_worker_bundle() {
        let mut world = world();
        spawn_bee(&mut world, BeeKind::Worker, Vec2::new(100.0, 100.0));
        spawn_bee(&mut world, BeeKind::Drone, Vec2::new(200.0, 100.0));

        let mut workers = world.query::<(&AgentId, &RolePolicy, &ForagerTrip, &Senses)>();
        let found: Vec<_> = workers
            .iter(&world)
            .map(|(id, policy, ..)| (*id, policy.current()))
            .collect();
        assert_eq!(found, vec![(AgentId(1), Role::Forager)]);

        let mut drones = world.query_filtered::<&RolePolicy, Without<RoleDrives>>();
        let policies: Vec<_> = drones.iter(&world).map(|p| p.current()).collect();
        assert_eq!(policies, vec![Role::Idle]);
    }

    #[test]
    fn test_spawn_colony_counts() {
        let mut world = world();
        spawn_colony(&mut world);
        let spawn = ColonyConfig::default().spawn;

        let mut bees = world.query::<&BeeKind>();
        let kinds: Vec<BeeKind> = bees.iter(&world).copied().collect();
        let count = |k: BeeKind| kinds.iter().filter(|&&x| x == k).count();
        assert_eq!(count(BeeKind::Worker), spawn.workers);
        assert_eq!(count(BeeKind::Drone), spawn.drones);
        assert_eq!(count(BeeKind::Queen), spawn.queens);
    }

    #[test]
    fn test_queen_starts_at_hive_center() {
        let mut world = world();
        spawn_bees(&mut world, BeeKind::Queen, 1);
        let center = world.resource::<Hive>().geometry().center;

        let mut query = world.query::<(&BeeKind, &Kinematics)>();
        let (kind, kin) = query.single(&world);
        assert_eq!(*kind, BeeKind::Queen);
        assert_eq!(kin.position, center);
    }

    #[test]
    fn test_random_position_respects_margin() {
        let arena = ArenaConfig::default();
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..200 {
            let p = random_position(&arena, &mut rng);
            assert!(p.x >= arena.margin && p.x <= arena.width - arena.margin);
            assert!(p.y >= arena.margin && p.y <= arena.height - arena.margin);
        }
    }
}
