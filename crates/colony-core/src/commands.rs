//! Runtime Commands
//!
//! Changes a driver can make to a running colony: more bees, more flowers,
//! injected signals, live tunables and the pause and speed controls.
//! Commands are plain serde data so a transport can deliver them as JSON.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::{AgentId, BeeKind};
use crate::signals::{SignalError, SignalKind};

/// A command the simulation applies between ticks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColonyCommand {
    /// Spawn bees of one caste at their caste's usual spot
    AddBees {
        count: usize,
        #[serde(default)]
        kind: BeeKind,
    },
    /// Scatter flowers uniformly over the arena
    AddFlowers { count: usize },
    /// Add flowers around a point; a single flower lands exactly on it
    AddFlowerAt {
        x: f32,
        y: f32,
        #[serde(default = "default_flower_count")]
        count: usize,
    },
    /// Inject a signal into the bus; the next tick ages it and senses it
    EmitSignal {
        kind: SignalKind,
        x: f32,
        y: f32,
        radius: f32,
        intensity: f32,
        decay: f32,
        ttl: f32,
    },
    /// Nectar each receiver drains per second
    SetReceiverRate { value: f32 },
    /// Queue pressure at which returning foragers tremble instead of dancing
    SetTrembleThreshold { value: f32 },
    SetPaused { paused: bool },
    /// Flips the pause flag
    TogglePaused,
    /// Multiplier applied to every tick's dt, clamped into [0, 4]
    SetSpeed { speed: f32 },
}

fn default_flower_count() -> usize {
    1
}

impl ColonyCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ColonyCommand::AddBees { .. } => "add_bees",
            ColonyCommand::AddFlowers { .. } => "add_flowers",
            ColonyCommand::AddFlowerAt { .. } => "add_flower_at",
            ColonyCommand::EmitSignal { .. } => "emit_signal",
            ColonyCommand::SetReceiverRate { .. } => "set_receiver_rate",
            ColonyCommand::SetTrembleThreshold { .. } => "set_tremble_threshold",
            ColonyCommand::SetPaused { .. } => "set_paused",
            ColonyCommand::TogglePaused => "toggle_paused",
            ColonyCommand::SetSpeed { .. } => "set_speed",
        }
    }
}

/// What a command changed
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    BeesAdded(Vec<AgentId>),
    FlowersAdded(usize),
    SignalEmitted,
    TunableSet { previous: f32, value: f32 },
    /// Pause flag after the command
    Paused(bool),
    SpeedSet { previous: f32, value: f32 },
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid signal: {0}")]
    Signal(#[from] SignalError),
    #[error("{name} must be a finite, non-negative number (got {value})")]
    InvalidValue { name: &'static str, value: f32 },
    #[error("position ({0}, {1}) is not finite")]
    InvalidPosition(f32, f32),
    #[error("population cap {cap} reached")]
    PopulationCap { cap: usize },
}

/// Parses a command from its JSON form
pub fn parse_command(json: &str) -> serde_json::Result<ColonyCommand> {
    serde_json::from_str(json)
}
