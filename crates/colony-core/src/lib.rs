//! Bee Colony Stigmergy Engine
//!
//! Bees coordinate only through decaying spatial signals. Each worker turns
//! what it senses into role drives, picks a role with hysteresis, and runs
//! that role's routine against shared flower and hive collaborators.
//!
//! [`Simulation`] is the entry point: it owns the ECS world and the tick
//! schedule, and hands out [`colony_events::WorldSnapshot`] records.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;

pub mod commands;
pub mod components;
pub mod config;
pub mod environment;
pub mod geometry;
pub mod output;
pub mod setup;
pub mod signals;
pub mod simulation;
pub mod systems;

pub use colony_events::SimTime;
pub use commands::{ColonyCommand, CommandError};
pub use components::*;
pub use config::{ColonyConfig, ConfigError};
pub use environment::{FlowerField, FlowerId, FlowerSource, Hive, HiveGeometry, HiveIntake};
pub use geometry::Vec2;
pub use signals::{Signal, SignalBus, SignalError, SignalKind, SignalPayload, SignalSpec};
pub use simulation::Simulation;

/// Seeded random number generator resource
#[derive(Resource)]
pub struct SimRng(pub SmallRng);

/// Simulated time plus the delta of the tick being run
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct SimClock {
    pub time: SimTime,
    /// Seconds covered by the current tick, already clamped
    pub dt: f32,
}

impl SimClock {
    #[cfg(test)]
    pub(crate) fn with_dt(dt: f32) -> Self {
        Self {
            time: SimTime::default(),
            dt,
        }
    }

    pub fn advance(&mut self) {
        self.time = self.time.advanced(f64::from(self.dt));
    }
}
