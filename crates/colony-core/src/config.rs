//! Configuration System
//!
//! Loads colony tuning parameters from a TOML file. Every section falls back
//! to its defaults, so a file only needs the values it changes.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::signals::SignalSpec;

/// Default tuning file path
pub const DEFAULT_TUNING_PATH: &str = "colony.toml";

/// Top-level configuration structure
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ColonyConfig {
    pub simulation: SimulationConfig,
    pub arena: ArenaConfig,
    pub perception: PerceptionConfig,
    pub roles: RolesConfig,
    pub forager: ForagerConfig,
    pub duties: DutiesConfig,
    pub hive: HiveConfig,
    pub flowers: FlowersConfig,
    pub castes: CastesConfig,
    pub spawn: SpawnConfig,
}

/// Simulation driver parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub default_ticks: u64,
    /// Delta-time used by the headless driver, in seconds
    pub default_dt: f32,
    /// Larger deltas are clamped to this
    pub max_dt: f32,
    /// Ticks between snapshots written by the driver
    pub snapshot_interval: u64,
    /// Maximum signals included in a snapshot
    pub snapshot_signal_limit: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            default_ticks: 3600,
            default_dt: 1.0 / 60.0,
            max_dt: 0.2,
            snapshot_interval: 60,
            snapshot_signal_limit: 64,
        }
    }
}

/// Arena bounds in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub width: f32,
    pub height: f32,
    /// Agents are clamped this far inside the edges
    pub margin: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 540.0,
            margin: 4.0,
        }
    }
}

/// Signal sensing and drive dynamics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Max signals summed per kind
    pub max_per_kind: usize,
    /// Signals weaker than this at the bee are not sensed
    pub min_strength: f32,
    /// Linear drive decay per second
    pub drive_decay: f32,
    /// Upper clamp for every drive
    pub drive_max: f32,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            max_per_kind: 8,
            min_strength: 0.05,
            drive_decay: 0.15,
            drive_max: 5.0,
        }
    }
}

/// Role switching gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    /// Margin a challenger drive must clear over the current role's drive
    pub hysteresis: f32,
    /// Seconds a bee must stay in a role before switching again
    pub min_dwell: f32,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            hysteresis: 0.25,
            min_dwell: 3.0,
        }
    }
}

/// Foraging trip parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForagerConfig {
    /// Nectar a forager can carry
    pub capacity: f32,
    /// Nectar requested per flower visit
    pub collect_per_visit: f32,
    /// Distance at which a target counts as reached
    pub arrival_radius: f32,
    /// Seconds a reservation may be held while travelling
    pub seek_timeout: f32,
    /// A delivery is advertised only when the last visit yielded more than this
    pub advert_threshold: f32,
    /// Intake queue at or above which deliveries tremble instead of waggle
    pub tremble_threshold: f32,
    pub waggle: SignalSpec,
    /// Saturation cap for waggle intensity
    pub waggle_max_intensity: f32,
    pub tremble: SignalSpec,
}

impl Default for ForagerConfig {
    fn default() -> Self {
        Self {
            capacity: 2.0,
            collect_per_visit: 0.6,
            arrival_radius: 8.0,
            seek_timeout: 12.0,
            advert_threshold: 0.5,
            tremble_threshold: 6.0,
            waggle: SignalSpec::new(60.0, 1.0, 0.25, 4.0),
            waggle_max_intensity: 3.0,
            tremble: SignalSpec::new(80.0, 1.0, 0.3, 3.0),
        }
    }
}

/// In-hive duties: receiving, nursing, fanning, guarding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DutiesConfig {
    /// Intake drained per receiver per second
    pub receiver_rate: f32,
    /// Care delivered per nurse per second
    pub care_per_nurse: f32,
    pub fanning_interval: f32,
    pub fanning: SignalSpec,
    /// Sensed alarm strength that makes a guard re-broadcast
    pub guard_alarm_threshold: f32,
    pub guard_alarm_interval: f32,
    pub guard_alarm: SignalSpec,
    /// Distance from the entrance at which guards patrol
    pub guard_orbit_radius: f32,
}

impl Default for DutiesConfig {
    fn default() -> Self {
        Self {
            receiver_rate: 1.2,
            care_per_nurse: 1.0,
            fanning_interval: 1.5,
            fanning: SignalSpec::new(40.0, 0.4, 0.5, 1.5),
            guard_alarm_threshold: 0.3,
            guard_alarm_interval: 2.0,
            guard_alarm: SignalSpec::new(60.0, 0.5, 0.4, 2.0),
            guard_orbit_radius: 20.0,
        }
    }
}

/// Hive geometry and periodic hive-wide emissions.
///
/// Field emission radii are derived from the hive geometry; the radius in
/// each signal profile is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HiveConfig {
    /// Hive radius as a fraction of the shorter arena side
    pub radius_frac: f32,
    /// Brood zone radius as a fraction of the hive radius
    pub brood_frac: f32,
    pub brood_interval: f32,
    pub brood_signal: SignalSpec,
    pub primer_interval: f32,
    pub primer_signal: SignalSpec,
    pub thermal_interval: f32,
    pub thermal_signal: SignalSpec,
}

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            radius_frac: 0.12,
            brood_frac: 0.55,
            brood_interval: 1.0,
            brood_signal: SignalSpec::new(0.0, 0.5, 0.12, 3.0),
            primer_interval: 2.0,
            primer_signal: SignalSpec::new(0.0, 0.25, 0.05, 6.0),
            thermal_interval: 2.0,
            thermal_signal: SignalSpec::new(0.0, 0.4, 0.2, 3.0),
        }
    }
}

/// Flower field generation and regrowth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowersConfig {
    pub patches: usize,
    pub flowers_per_patch: usize,
    /// Nectar regained per flower per second
    pub regrowth_rate: f32,
    /// Flowers at or below this nectar level are not offered for reservation
    pub min_nectar: f32,
}

impl Default for FlowersConfig {
    fn default() -> Self {
        Self {
            patches: 3,
            flowers_per_patch: 12,
            regrowth_rate: 0.02,
            min_nectar: 0.05,
        }
    }
}

/// Speed and wander noise for one caste
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    pub speed_min: f32,
    pub speed_max: f32,
    pub turn_noise: f32,
}

impl MotionConfig {
    pub const fn new(speed_min: f32, speed_max: f32, turn_noise: f32) -> Self {
        Self {
            speed_min,
            speed_max,
            turn_noise,
        }
    }

    pub fn mean_speed(&self) -> f32 {
        (self.speed_min + self.speed_max) * 0.5
    }
}

/// Per-caste movement plus queen behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CastesConfig {
    pub worker: MotionConfig,
    pub queen: MotionConfig,
    pub drone: MotionConfig,
    /// Fraction of mean speed used when steering toward a target
    pub steer_scale: f32,
    /// Seconds an emission pulse stays visible
    pub flash_duration: f32,
    pub queen_signal_interval: f32,
    pub queen_signal: SignalSpec,
    pub lay_interval: f32,
    pub eggs_per_lay: u32,
    /// Queen stops laying while total brood is at or above this
    pub brood_cap: u32,
}

impl Default for CastesConfig {
    fn default() -> Self {
        Self {
            worker: MotionConfig::new(40.0, 120.0, 0.4),
            queen: MotionConfig::new(10.0, 40.0, 0.2),
            drone: MotionConfig::new(60.0, 160.0, 0.35),
            steer_scale: 0.6,
            flash_duration: 0.35,
            queen_signal_interval: 1.0,
            queen_signal: SignalSpec::new(90.0, 0.6, 0.2, 2.5),
            lay_interval: 5.0,
            eggs_per_lay: 2,
            brood_cap: 60,
        }
    }
}

/// Initial population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub workers: usize,
    pub drones: usize,
    pub queens: usize,
    /// Hatching stops adding workers beyond this many bees
    pub max_population: usize,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            workers: 40,
            drones: 4,
            queens: 1,
            max_population: 120,
        }
    }
}

impl ColonyConfig {
    /// Loads and validates configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_str(&content)
    }

    /// Parses and validates configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads from the default path, or uses defaults if it is missing or broken
    pub fn load_or_default() -> Self {
        Self::from_file(DEFAULT_TUNING_PATH).unwrap_or_else(|e| {
            tracing::warn!("Could not load {}: {}. Using defaults.", DEFAULT_TUNING_PATH, e);
            Self::default()
        })
    }

    /// Returns this configuration as a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Rejects values that would break the simulation's math
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(name: &str, value: f32) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{} must be positive, got {}", name, value)))
            }
        }
        fn non_negative(name: &str, value: f32) -> Result<(), ConfigError> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{} must be non-negative, got {}", name, value)))
            }
        }

        fn signal(name: &str, spec: &SignalSpec) -> Result<(), ConfigError> {
            non_negative(&format!("{}.radius", name), spec.radius)?;
            non_negative(&format!("{}.intensity", name), spec.intensity)?;
            positive(&format!("{}.decay", name), spec.decay)?;
            positive(&format!("{}.ttl", name), spec.ttl)
        }

        positive("arena.width", self.arena.width)?;
        positive("arena.height", self.arena.height)?;
        non_negative("arena.margin", self.arena.margin)?;
        if self.arena.margin * 2.0 >= self.arena.width.min(self.arena.height) {
            return Err(ConfigError::Invalid("arena.margin leaves no room to move".to_string()));
        }
        positive("simulation.max_dt", self.simulation.max_dt)?;
        non_negative("perception.drive_decay", self.perception.drive_decay)?;
        positive("perception.drive_max", self.perception.drive_max)?;
        non_negative("roles.hysteresis", self.roles.hysteresis)?;
        positive("roles.min_dwell", self.roles.min_dwell)?;
        positive("forager.capacity", self.forager.capacity)?;
        positive("forager.collect_per_visit", self.forager.collect_per_visit)?;
        positive("forager.arrival_radius", self.forager.arrival_radius)?;
        positive("forager.seek_timeout", self.forager.seek_timeout)?;
        positive("hive.radius_frac", self.hive.radius_frac)?;
        non_negative("duties.receiver_rate", self.duties.receiver_rate)?;
        non_negative("flowers.regrowth_rate", self.flowers.regrowth_rate)?;
        non_negative("forager.waggle_max_intensity", self.forager.waggle_max_intensity)?;
        for (name, interval) in [
            ("duties.fanning_interval", self.duties.fanning_interval),
            ("duties.guard_alarm_interval", self.duties.guard_alarm_interval),
            ("hive.brood_interval", self.hive.brood_interval),
            ("hive.primer_interval", self.hive.primer_interval),
            ("hive.thermal_interval", self.hive.thermal_interval),
            ("castes.queen_signal_interval", self.castes.queen_signal_interval),
            ("castes.lay_interval", self.castes.lay_interval),
        ] {
            positive(name, interval)?;
        }
        for (name, spec) in [
            ("forager.waggle", &self.forager.waggle),
            ("forager.tremble", &self.forager.tremble),
            ("duties.fanning", &self.duties.fanning),
            ("duties.guard_alarm", &self.duties.guard_alarm),
            ("hive.brood_signal", &self.hive.brood_signal),
            ("hive.primer_signal", &self.hive.primer_signal),
            ("hive.thermal_signal", &self.hive.thermal_signal),
            ("castes.queen_signal", &self.castes.queen_signal),
        ] {
            signal(name, spec)?;
        }
        for (name, motion) in [
            ("castes.worker", &self.castes.worker),
            ("castes.queen", &self.castes.queen),
            ("castes.drone", &self.castes.drone),
        ] {
            non_negative(name, motion.speed_min)?;
            if motion.speed_max < motion.speed_min {
                return Err(ConfigError::Invalid(format!("{}: speed_max below speed_min", name)));
            }
        }
        Ok(())
    }
}

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
