//! Agent Components
//!
//! Components shared by every bee: identity, caste, kinematics, emission pulse.

use bevy_ecs::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{ArenaConfig, CastesConfig, MotionConfig};
use crate::geometry::Vec2;
use crate::signals::SignalKind;

/// Marker component identifying an entity as a bee
#[derive(Component, Debug, Clone, Default)]
pub struct Bee;

/// Unique identifier for a bee, also used as the signal source id.
///
/// Ids start at 1; 0 is reserved for colony-level emitters.
#[derive(
    Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct AgentId(pub u32);

/// Bee caste
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BeeKind {
    #[default]
    Worker,
    Queen,
    Drone,
}

impl BeeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BeeKind::Worker => "worker",
            BeeKind::Queen => "queen",
            BeeKind::Drone => "drone",
        }
    }

    /// Only workers carry drives and switch roles
    pub fn has_drives(self) -> bool {
        matches!(self, BeeKind::Worker)
    }

    pub fn motion(self, castes: &CastesConfig) -> MotionConfig {
        match self {
            BeeKind::Worker => castes.worker,
            BeeKind::Queen => castes.queen,
            BeeKind::Drone => castes.drone,
        }
    }
}

impl fmt::Display for BeeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BeeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "worker" => Ok(BeeKind::Worker),
            "queen" => Ok(BeeKind::Queen),
            "drone" => Ok(BeeKind::Drone),
            other => Err(format!("unknown bee kind: {}", other)),
        }
    }
}

/// Position, velocity and heading in arena space
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Radians
    pub heading: f32,
}

impl Kinematics {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            heading: 0.0,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self.heading = velocity.angle_or(self.heading);
        self
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.heading.is_finite()
    }

    /// Jitter the heading and move at a random cruising speed
    pub fn random_walk<R: Rng + ?Sized>(&mut self, motion: &MotionConfig, dt: f32, rng: &mut R) {
        self.heading += (rng.gen::<f32>() - 0.5) * motion.turn_noise;
        let speed = sample_speed(motion, rng) * 0.5;
        self.velocity = Vec2::from_angle(self.heading) * speed;
        self.position += self.velocity * dt;
    }

    /// Steer straight at `target` at a fraction of the caste's mean speed.
    ///
    /// A target at the current position keeps the previous heading.
    pub fn steer_towards(
        &mut self,
        target: Vec2,
        motion: &MotionConfig,
        speed_scale: f32,
        dt: f32,
    ) {
        let angle = (target - self.position).angle_or(self.heading);
        let speed = motion.mean_speed() * speed_scale;
        self.heading = angle;
        self.velocity = Vec2::from_angle(angle) * speed;
        self.position += self.velocity * dt;
    }

    pub fn clamp_to_arena(&mut self, arena: &ArenaConfig) {
        self.position = self.position.clamp_to(arena.width, arena.height, arena.margin);
    }
}

fn sample_speed<R: Rng + ?Sized>(motion: &MotionConfig, rng: &mut R) -> f32 {
    if motion.speed_max > motion.speed_min {
        rng.gen_range(motion.speed_min..motion.speed_max)
    } else {
        motion.speed_min
    }
}

/// Random initial velocity for a freshly spawned bee
pub fn spawn_velocity<R: Rng + ?Sized>(motion: &MotionConfig, rng: &mut R) -> Vec2 {
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    Vec2::from_angle(angle) * sample_speed(motion, rng)
}

/// Short visual pulse raised whenever a bee emits a signal
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct Flash {
    pub remaining: f32,
    pub kind: Option<SignalKind>,
}

impl Flash {
    pub fn trigger(&mut self, kind: SignalKind, duration: f32) {
        self.remaining = duration.max(0.0);
        self.kind = Some(kind);
    }

    pub fn decay(&mut self, dt: f32) {
        if self.remaining <= 0.0 {
            return;
        }
        self.remaining = (self.remaining - dt.max(0.0)).max(0.0);
        if self.remaining == 0.0 {
            self.kind = None;
        }
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }
}

/// Seconds since the bee last ran each periodic duty
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct DutyTimers {
    /// Since the last periodic emission (queen scent, fanning, alarm relay)
    pub since_emit: f32,
    /// Since the queen last laid
    pub since_lay: f32,
}

impl DutyTimers {
    pub fn tick(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        self.since_emit += dt;
        self.since_lay += dt;
    }
}
