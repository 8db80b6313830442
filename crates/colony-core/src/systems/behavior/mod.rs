//! Behavior System
//!
//! Runs the role routine of every bee against a staged copy of its state.
//! A routine that faults leaves the bee as it was at the start of the tick,
//! minus any flower claim, and the rest of the colony carries on.

pub mod castes;
pub mod forager;
pub mod hive_roles;

use bevy_ecs::prelude::*;
use rand::RngCore;
use thiserror::Error;
use tracing::warn;

use crate::components::{
    AgentId, BeeKind, DutyTimers, Flash, ForagerTrip, Kinematics, Role, RolePolicy,
};
use crate::config::{ColonyConfig, MotionConfig};
use crate::environment::{FlowerField, FlowerSource, Hive, HiveIntake};
use crate::geometry::Vec2;
use crate::signals::{Signal, SignalBus, SignalError, SignalOutbox};
use crate::systems::perception::Senses;
use crate::{SimClock, SimRng};

/// A single bee's update went wrong
#[derive(Debug, Error)]
pub enum BehaviorFault {
    #[error("bee {0} ended its update with a non-finite state")]
    NonFiniteState(u32),
    #[error("invalid emission: {0}")]
    InvalidSignal(#[from] SignalError),
}

/// Everything a role routine may read or touch during one tick
pub struct TickContext<'a> {
    pub dt: f32,
    pub config: &'a ColonyConfig,
    /// The bus as aged at the start of this tick
    pub bus: &'a SignalBus,
    pub flowers: &'a mut dyn FlowerSource,
    pub hive: &'a mut dyn HiveIntake,
    pub rng: &'a mut dyn RngCore,
    /// Signals emitted by the current bee, published only on success
    pub emitted: Vec<Signal>,
}

impl<'a> TickContext<'a> {
    /// Stage an emission and raise the emitter's flash pulse
    pub fn emit(&mut self, flash: &mut Flash, signal: Signal) {
        flash.trigger(signal.kind(), self.config.castes.flash_duration);
        self.emitted.push(signal);
    }

    pub fn steer(&self, kinematics: &mut Kinematics, target: Vec2, motion: &MotionConfig) {
        kinematics.steer_towards(target, motion, self.config.castes.steer_scale, self.dt);
    }

    pub fn wander(&mut self, kinematics: &mut Kinematics, motion: &MotionConfig) {
        kinematics.random_walk(motion, self.dt, &mut *self.rng);
    }
}

/// Staged copy of one bee's mutable state
#[derive(Debug, Clone, PartialEq)]
pub struct AgentFrame {
    pub id: AgentId,
    pub kind: BeeKind,
    pub role: Role,
    pub kinematics: Kinematics,
    pub flash: Flash,
    pub timers: DutyTimers,
    pub senses: Senses,
    pub trip: Option<ForagerTrip>,
}

#[cfg(test)]
impl AgentFrame {
    pub(crate) fn new(id: AgentId, kind: BeeKind, role: Role, kinematics: Kinematics) -> Self {
        Self {
            id,
            kind,
            role,
            kinematics,
            flash: Flash::default(),
            timers: DutyTimers::default(),
            senses: Senses::default(),
            trip: None,
        }
    }

    pub(crate) fn with_trip(mut self, trip: ForagerTrip) -> Self {
        self.trip = Some(trip);
        self
    }

    pub(crate) fn with_senses(mut self, senses: Senses) -> Self {
        self.senses = senses;
        self
    }
}

impl AgentFrame {
    pub fn is_finite(&self) -> bool {
        self.kinematics.is_finite()
            && self.flash.remaining.is_finite()
            && self
                .trip
                .as_ref()
                .map_or(true, |t| t.carry.is_finite() && t.seek_timer.is_finite())
    }
}

/// Runs one bee's routine for this tick. Closed dispatch over caste and role.
pub fn step_agent(frame: &mut AgentFrame, ctx: &mut TickContext<'_>) -> Result<(), BehaviorFault> {
    frame.timers.tick(ctx.dt);
    match frame.kind {
        BeeKind::Queen => castes::queen(frame, ctx)?,
        BeeKind::Drone => castes::drone(frame, ctx),
        BeeKind::Worker => match frame.role {
            Role::Forager => forager::step(frame, ctx)?,
            Role::Receiver => hive_roles::receiver(frame, ctx),
            Role::Nurse => hive_roles::nurse(frame, ctx),
            Role::Fanner => hive_roles::fanner(frame, ctx)?,
            Role::Guard => hive_roles::guard(frame, ctx)?,
            Role::Idle => hive_roles::idle(frame, ctx),
        },
    }
    frame.kinematics.clamp_to_arena(&ctx.config.arena);
    if !frame.is_finite() {
        return Err(BehaviorFault::NonFiniteState(frame.id.0));
    }
    Ok(())
}

type BeeQuery<'w, 's> = Query<
    'w,
    's,
    (
        Entity,
        &'static AgentId,
        &'static BeeKind,
        &'static RolePolicy,
        &'static mut Kinematics,
        &'static mut Flash,
        &'static mut DutyTimers,
        Option<&'static Senses>,
        Option<&'static mut ForagerTrip>,
    ),
>;

/// System: execute every bee's role routine in id order
#[allow(clippy::too_many_arguments)]
pub fn run_behaviors(
    clock: Res<SimClock>,
    config: Res<ColonyConfig>,
    bus: Res<SignalBus>,
    mut outbox: ResMut<SignalOutbox>,
    mut flowers: ResMut<FlowerField>,
    mut hive: ResMut<Hive>,
    mut rng: ResMut<SimRng>,
    mut bees: BeeQuery,
) {
    let mut order: Vec<(AgentId, Entity)> =
        bees.iter().map(|(entity, id, ..)| (*id, entity)).collect();
    order.sort_unstable();

    for (_, entity) in order {
        let Ok((_, id, kind, policy, mut kinematics, mut flash, mut timers, senses, trip)) =
            bees.get_mut(entity)
        else {
            continue;
        };
        let original_claim = trip.as_ref().and_then(|t| t.reserved);
        let mut frame = AgentFrame {
            id: *id,
            kind: *kind,
            role: policy.current(),
            kinematics: *kinematics,
            flash: *flash,
            timers: *timers,
            senses: senses.copied().unwrap_or_default(),
            trip: trip.as_deref().cloned(),
        };

        let mut ctx = TickContext {
            dt: clock.dt,
            config: &config,
            bus: &bus,
            flowers: &mut *flowers,
            hive: &mut *hive,
            rng: &mut rng.0,
            emitted: Vec::new(),
        };
        let result = step_agent(&mut frame, &mut ctx);
        let emitted = std::mem::take(&mut ctx.emitted);

        match result {
            Ok(()) => {
                *kinematics = frame.kinematics;
                *flash = frame.flash;
                *timers = frame.timers;
                if let (Some(mut trip), Some(staged)) = (trip, frame.trip) {
                    *trip = staged;
                }
                outbox.extend(emitted);
            }
            Err(fault) => {
                warn!("Bee {} update discarded: {}", id.0, fault);
                let staged_claim = frame.trip.as_ref().and_then(|t| t.reserved);
                for flower in [original_claim, staged_claim].into_iter().flatten() {
                    flowers.release_reservation(flower);
                }
                if let Some(mut trip) = trip {
                    trip.abandon();
                }
            }
        }
    }
}

/// System: run down emission pulses
pub fn decay_flash(clock: Res<SimClock>, mut pulses: Query<&mut Flash>) {
    for mut flash in pulses.iter_mut() {
        if flash.is_active() {
            flash.decay(clock.dt);
        }
    }
}
