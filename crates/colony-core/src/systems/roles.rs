//! Role Selection System
//!
//! Runs every worker's role policy once per tick.

use bevy_ecs::prelude::*;
use tracing::debug;

use crate::components::{AgentId, ForagerTrip, Role, RoleDrives, RolePolicy};
use crate::environment::{FlowerField, FlowerSource};
use crate::SimClock;

/// System: tick dwell timers and apply the hysteresis gate.
///
/// A bee leaving the forager role gives up its flower claim. Carried nectar
/// stays on board.
pub fn choose_roles(
    clock: Res<SimClock>,
    mut flowers: ResMut<FlowerField>,
    mut bees: Query<(&AgentId, &RoleDrives, &mut RolePolicy, Option<&mut ForagerTrip>)>,
) {
    for (id, drives, mut policy, trip) in bees.iter_mut() {
        policy.tick(clock.dt);
        let previous = policy.current();
        let (role, switched) = policy.choose(drives);
        if !switched {
            continue;
        }
        debug!("Bee {} switched role {} -> {}", id.0, previous, role);

        if previous == Role::Forager {
            if let Some(mut trip) = trip {
                if let Some(flower) = trip.abandon() {
                    flowers.release_reservation(flower);
                    debug!("Bee {} released flower {} on role change", id.0, flower);
                }
            }
        }
    }
}
