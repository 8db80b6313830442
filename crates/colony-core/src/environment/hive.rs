//! Hive
//!
//! Hive geometry, the receiver intake queue, the brood pipeline and the
//! periodic hive-wide pheromone fields.

use bevy_ecs::prelude::*;
use colony_events::BroodCounts;
use tracing::debug;

use super::{HiveGeometry, HiveIntake};
use crate::config::{ArenaConfig, HiveConfig};
use crate::geometry::Vec2;
use crate::signals::{Signal, SignalError, SignalKind, COLONY_SOURCE};

/// Brood development constants, in simulated seconds
pub mod brood_constants {
    pub const EGG_DURATION: f32 = 40.0;
    pub const LARVA_DURATION: f32 = 80.0;
    pub const PUPA_DURATION: f32 = 120.0;
    /// Care per larva per second needed for full-speed development
    pub const CARE_PER_LARVA: f32 = 0.3;
    /// Fraction of full development speed with no care at all
    pub const BASELINE_SPEED: f32 = 0.25;
    /// Per-larva per-second death rate at zero care
    pub const UNCARED_HAZARD: f32 = 0.002;
}

use brood_constants::*;

#[derive(Debug, Clone, PartialEq)]
struct Cohort {
    count: u32,
    age: f32,
    /// Fractional expected deaths not yet applied
    mortality: f32,
}

impl Cohort {
    fn new(count: u32) -> Self {
        Self {
            count,
            age: 0.0,
            mortality: 0.0,
        }
    }
}

/// Eggs -> larvae -> pupae -> adults, tracked as same-age cohorts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Brood {
    eggs: Vec<Cohort>,
    larvae: Vec<Cohort>,
    pupae: Vec<Cohort>,
    care: f32,
}

impl Brood {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_eggs(&mut self, count: u32) {
        if count > 0 {
            self.eggs.push(Cohort::new(count));
        }
    }

    pub fn add_care(&mut self, units: f32) {
        if units.is_finite() && units > 0.0 {
            self.care += units;
        }
    }

    pub fn counts(&self) -> BroodCounts {
        fn total(cohorts: &[Cohort]) -> u32 {
            cohorts.iter().map(|c| c.count).sum()
        }
        BroodCounts {
            eggs: total(&self.eggs),
            larvae: total(&self.larvae),
            pupae: total(&self.pupae),
        }
    }

    /// Advances development by `dt` and returns the number of adults that emerged.
    ///
    /// Care delivered since the previous tick is consumed.
    pub fn tick(&mut self, dt: f32) -> u32 {
        let care = std::mem::take(&mut self.care);
        if dt <= 0.0 {
            return 0;
        }

        for cohort in &mut self.eggs {
            cohort.age += dt;
        }
        let (hatching, waiting): (Vec<_>, Vec<_>) =
            self.eggs.drain(..).partition(|c| c.age >= EGG_DURATION);
        self.eggs = waiting;
        self.larvae.extend(hatching.into_iter().map(|c| Cohort::new(c.count)));

        let larvae: u32 = self.larvae.iter().map(|c| c.count).sum();
        let care_per_larva = if larvae == 0 { 0.0 } else { care / larvae as f32 / dt };
        let speed = (care_per_larva / CARE_PER_LARVA).min(1.0);
        let hazard = if larvae > 0 && speed < 1.0 {
            UNCARED_HAZARD * (1.0 - speed)
        } else {
            0.0
        };
        for cohort in &mut self.larvae {
            cohort.age += dt * (BASELINE_SPEED + (1.0 - BASELINE_SPEED) * speed);
            if hazard > 0.0 {
                cohort.mortality += hazard * dt * cohort.count as f32;
                let deaths = (cohort.mortality.floor() as u32).min(cohort.count);
                cohort.mortality -= deaths as f32;
                cohort.count -= deaths;
            }
        }
        let (pupating, growing): (Vec<_>, Vec<_>) = self
            .larvae
            .drain(..)
            .filter(|c| c.count > 0)
            .partition(|c| c.age >= LARVA_DURATION);
        self.larvae = growing;
        self.pupae.extend(pupating.into_iter().map(|c| Cohort::new(c.count)));

        for cohort in &mut self.pupae {
            cohort.age += dt;
        }
        let (emerging, sealed): (Vec<_>, Vec<_>) =
            self.pupae.drain(..).partition(|c| c.age >= PUPA_DURATION);
        self.pupae = sealed;
        emerging.iter().map(|c| c.count).sum()
    }
}

/// Accumulators for the periodic hive fields
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct FieldTimers {
    brood: f32,
    primer: f32,
    thermal: f32,
}

#[derive(Resource, Debug, Clone)]
pub struct Hive {
    geometry: HiveGeometry,
    queue: f32,
    total_deposited: f32,
    brood: Brood,
    hatched_pending: u32,
    hatched_total: u32,
    timers: FieldTimers,
}

impl Hive {
    /// Hive centered at (0.5w, 0.55h) with its entrance at 12 o'clock
    pub fn new(arena: &ArenaConfig, config: &HiveConfig) -> Self {
        let center = Vec2::new(arena.width * 0.5, arena.height * 0.55);
        let radius = arena.width.min(arena.height) * config.radius_frac;
        Self::with_geometry(center, radius, config.brood_frac)
    }

    pub fn with_geometry(center: Vec2, radius: f32, brood_frac: f32) -> Self {
        Self {
            geometry: HiveGeometry {
                center,
                radius,
                entrance: Vec2::new(center.x, center.y - radius),
                brood_radius: radius * brood_frac,
            },
            queue: 0.0,
            total_deposited: 0.0,
            brood: Brood::new(),
            hatched_pending: 0,
            hatched_total: 0,
            timers: FieldTimers::default(),
        }
    }

    pub fn queue(&self) -> f32 {
        self.queue
    }

    pub fn total_deposited(&self) -> f32 {
        self.total_deposited
    }

    pub fn hatched_total(&self) -> u32 {
        self.hatched_total
    }

    /// Ages the brood; emerged adults wait in `take_hatched`
    pub fn step_brood(&mut self, dt: f32) {
        let hatched = self.brood.tick(dt);
        if hatched > 0 {
            debug!("{} adults emerged from brood", hatched);
            self.hatched_pending += hatched;
            self.hatched_total += hatched;
        }
    }

    /// Adults emerged since the last call
    pub fn take_hatched(&mut self) -> u32 {
        std::mem::take(&mut self.hatched_pending)
    }

    /// Advances the field timers and returns the hive-wide signals due this tick.
    ///
    /// Leftover time carries into the next period. Thermal only builds up
    /// while the intake queue is at least half of `tremble_threshold`.
    pub fn field_emissions(
        &mut self,
        dt: f32,
        config: &HiveConfig,
        tremble_threshold: f32,
    ) -> Result<Vec<Signal>, SignalError> {
        let mut out = Vec::new();
        if dt <= 0.0 {
            return Ok(out);
        }
        let center = self.geometry.center;

        self.timers.brood += dt;
        if self.timers.brood >= config.brood_interval {
            self.timers.brood -= config.brood_interval;
            let spec = config.brood_signal.with_radius(self.geometry.brood_radius);
            out.push(spec.build(SignalKind::BroodPheromone, center, COLONY_SOURCE)?);
        }

        self.timers.primer += dt;
        if self.timers.primer >= config.primer_interval {
            self.timers.primer -= config.primer_interval;
            let spec = config.primer_signal.with_radius(self.geometry.radius * 2.0);
            out.push(spec.build(SignalKind::ForagerPrimer, center, COLONY_SOURCE)?);
        }

        if self.queue >= tremble_threshold * 0.5 {
            self.timers.thermal += dt;
            if self.timers.thermal >= config.thermal_interval {
                self.timers.thermal -= config.thermal_interval;
                let spec = config.thermal_signal.with_radius(self.geometry.radius);
                out.push(spec.build(SignalKind::Thermal, center, COLONY_SOURCE)?);
            }
        } else {
            self.timers.thermal = 0.0;
        }

        Ok(out)
    }
}

impl HiveIntake for Hive {
    fn geometry(&self) -> HiveGeometry {
        self.geometry
    }

    fn enqueue_intake(&mut self, amount: f32) {
        if amount.is_finite() && amount > 0.0 {
            self.queue += amount;
        }
    }

    fn read_queue_pressure(&self) -> f32 {
        self.queue
    }

    fn service_intake(&mut self, dt: f32, rate: f32) -> f32 {
        if dt <= 0.0 || rate <= 0.0 || self.queue <= 1e-9 {
            return 0.0;
        }
        let drained = self.queue.min(rate * dt);
        self.queue -= drained;
        self.total_deposited += drained;
        drained
    }

    fn brood_snapshot(&self) -> BroodCounts {
        self.brood.counts()
    }

    fn add_eggs(&mut self, count: u32) {
        self.brood.add_eggs(count);
    }

    fn add_care(&mut self, units: f32) {
        self.brood.add_care(units);
    }
}
