//! Perception System
//!
//! Aggregates nearby signals into per-kind sensed strengths and maps them
//! into role drive deltas through a fixed weight table.

use bevy_ecs::prelude::*;

use crate::components::{Kinematics, Role, RoleDrives};
use crate::config::{ColonyConfig, PerceptionConfig};
use crate::geometry::Vec2;
use crate::signals::{SignalBus, SignalKind};
use crate::SimClock;

/// Role x signal weights. Unlisted pairs weigh 0.
pub mod weights {
    use super::{Role, SignalKind};

    pub const TABLE: &[(Role, SignalKind, f32)] = &[
        (Role::Forager, SignalKind::Waggle, 0.9),
        (Role::Forager, SignalKind::Round, 0.5),
        (Role::Forager, SignalKind::BroodPheromone, -0.3),
        (Role::Forager, SignalKind::ForagerPrimer, -0.3),
        (Role::Forager, SignalKind::Tremble, -0.4),
        (Role::Forager, SignalKind::Stop, -0.8),
        (Role::Forager, SignalKind::QueenMandibular, 0.05),
        (Role::Receiver, SignalKind::Tremble, 0.8),
        (Role::Receiver, SignalKind::BroodPheromone, 0.2),
        (Role::Receiver, SignalKind::ForagerPrimer, 0.2),
        (Role::Nurse, SignalKind::BroodPheromone, 0.9),
        (Role::Nurse, SignalKind::ForagerPrimer, 0.3),
        (Role::Nurse, SignalKind::QueenMandibular, 0.1),
        (Role::Fanner, SignalKind::Nasonov, 0.7),
        (Role::Fanner, SignalKind::Thermal, 0.3),
        (Role::Fanner, SignalKind::QueenMandibular, 0.1),
        (Role::Guard, SignalKind::Alarm, 1.0),
        (Role::Guard, SignalKind::QueenMandibular, -0.1),
    ];

    /// Weight for one role and kind
    #[cfg(test)]
    pub(crate) fn weight(role: Role, kind: SignalKind) -> f32 {
        TABLE
            .iter()
            .find(|(r, k, _)| *r == role && *k == kind)
            .map_or(0.0, |(_, _, w)| *w)
    }
}

/// Aggregate sensed strength per signal kind at one point
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct Senses {
    strengths: [f32; SignalKind::COUNT],
}

impl Senses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: SignalKind) -> f32 {
        self.strengths[kind.index()]
    }

    pub fn set(&mut self, kind: SignalKind, value: f32) {
        self.strengths[kind.index()] = value;
    }
}

/// Sums the strongest `max_per_kind` signals of every kind at `point`
pub fn sense(point: Vec2, bus: &SignalBus, config: &PerceptionConfig) -> Senses {
    let mut senses = Senses::new();
    if !point.is_finite() {
        return senses;
    }
    for kind in SignalKind::ALL {
        let only = Some(std::slice::from_ref(&kind));
        let total: f32 = bus
            .query(point, only, config.min_strength, config.max_per_kind)
            .iter()
            .map(|hit| hit.strength)
            .sum();
        senses.set(kind, total);
    }
    senses
}

/// Decays every drive, then adds the weighted senses scaled by `dt`
pub fn apply(drives: &mut RoleDrives, senses: &Senses, dt: f32, config: &PerceptionConfig) {
    if dt <= 0.0 {
        return;
    }
    drives.decay(config.drive_decay, dt);
    for role in Role::DRIVEN {
        let delta: f32 = weights::TABLE
            .iter()
            .filter(|(r, _, _)| *r == role)
            .map(|(_, kind, w)| w * senses.get(*kind) * dt)
            .sum();
        drives.add(role, delta, config.drive_max);
    }
}

/// System: sense the bus and update the drives of every bee that has them.
///
/// Senses are refreshed for every bee carrying them, drives or not.
pub fn update_drives(
    bus: Res<SignalBus>,
    clock: Res<SimClock>,
    config: Res<ColonyConfig>,
    mut bees: Query<(&Kinematics, &mut Senses, Option<&mut RoleDrives>)>,
) {
    for (kinematics, mut senses, drives) in bees.iter_mut() {
        *senses = sense(kinematics.position, &bus, &config.perception);
        if let Some(mut drives) = drives {
            apply(&mut drives, &senses, clock.dt, &config.perception);
        }
    }
}
