//! World Systems
//!
//! Clock, bus aging, environment upkeep and end-of-tick bookkeeping.

use bevy_ecs::prelude::*;
use tracing::{info, warn};

use crate::components::{Bee, BeeKind};
use crate::config::ColonyConfig;
use crate::environment::{FlowerField, Hive, HiveIntake};
use crate::setup::{bee_components, AgentIds};
use crate::signals::{SignalBus, SignalOutbox};
use crate::{SimClock, SimRng};

/// System: move the clock forward by this tick's dt
pub fn advance_clock(mut clock: ResMut<SimClock>) {
    clock.advance();
}

/// System: decay and expire bus signals before anyone senses them
pub fn step_signal_bus(clock: Res<SimClock>, mut bus: ResMut<SignalBus>) {
    bus.step(clock.dt);
}

/// System: flower regrowth, brood aging and the hive's periodic fields.
///
/// Field signals go to the outbox like any bee emission.
pub fn step_environment(
    clock: Res<SimClock>,
    config: Res<ColonyConfig>,
    mut flowers: ResMut<FlowerField>,
    mut hive: ResMut<Hive>,
    mut outbox: ResMut<SignalOutbox>,
) {
    flowers.step(clock.dt);
    hive.step_brood(clock.dt);
    match hive.field_emissions(clock.dt, &config.hive, config.forager.tremble_threshold) {
        Ok(signals) => outbox.extend(signals),
        Err(e) => warn!("Hive field emission rejected: {}", e),
    }
}

/// System: turn emerged brood into workers at the entrance.
///
/// Adults beyond `spawn.max_population` are dropped.
pub fn spawn_hatched_workers(
    mut commands: Commands,
    config: Res<ColonyConfig>,
    mut hive: ResMut<Hive>,
    mut ids: ResMut<AgentIds>,
    mut rng: ResMut<SimRng>,
    bees: Query<(), With<Bee>>,
) {
    let hatched = hive.take_hatched() as usize;
    if hatched == 0 {
        return;
    }
    let population = bees.iter().count();
    let room = config.spawn.max_population.saturating_sub(population);
    let born = hatched.min(room);
    let entrance = hive.geometry().entrance;

    for _ in 0..born {
        let id = ids.allocate();
        let (bee, worker) = bee_components(id, BeeKind::Worker, entrance, &config, &mut rng.0);
        let mut entity = commands.spawn(bee);
        if let Some(worker) = worker {
            entity.insert(worker);
        }
    }
    if born < hatched {
        info!(
            "{} workers emerged, {} lost at population cap {}",
            born,
            hatched - born,
            config.spawn.max_population
        );
    } else {
        info!("{} workers emerged (population {})", born, population + born);
    }
}

/// System: publish everything staged this tick
pub fn flush_outbox(mut outbox: ResMut<SignalOutbox>, mut bus: ResMut<SignalBus>) {
    outbox.flush_into(&mut bus);
}
