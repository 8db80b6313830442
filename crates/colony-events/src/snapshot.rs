//! Snapshot Types
//!
//! Serialization structs for per-tick world snapshots.
//!
//! Snapshots are the only thing the simulation hands to the outside world.
//! They make no assumption about transport, cadence or framing; a renderer
//! can push them over a socket, a recorder can append them to a file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::SimTime;

/// Generates a snapshot ID with the given sequence number.
pub fn generate_snapshot_id(sequence: u64) -> String {
    format!("snap_{:06}", sequence)
}

/// One bee as seen by the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    /// Heading in radians
    pub heading: f32,
    /// Caste: "worker", "queen" or "drone"
    pub kind: String,
    pub role: String,
    /// Remaining seconds of the emission pulse (0 when not flashing)
    #[serde(default)]
    pub flash: f32,
    /// Kind of the signal that triggered the pulse
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flash_kind: Option<String>,
}

impl AgentSnapshot {
    pub fn new(id: u32, kind: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id,
            x: 0.0,
            y: 0.0,
            heading: 0.0,
            kind: kind.into(),
            role: role.into(),
            flash: 0.0,
            flash_kind: None,
        }
    }

    pub fn with_pose(mut self, x: f32, y: f32, heading: f32) -> Self {
        self.x = x;
        self.y = y;
        self.heading = heading;
        self
    }

    pub fn is_flashing(&self) -> bool {
        self.flash > 0.0
    }
}

/// Brood pipeline counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroodCounts {
    pub eggs: u32,
    pub larvae: u32,
    pub pupae: u32,
}

impl BroodCounts {
    pub fn total(&self) -> u32 {
        self.eggs + self.larvae + self.pupae
    }
}

/// Hive geometry and intake metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HiveMetrics {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Nectar waiting for receivers
    pub queue: f32,
    /// Nectar processed by receivers since the run started
    pub total_deposited: f32,
    #[serde(default)]
    pub brood: BroodCounts,
    #[serde(default)]
    pub hatched_total: u32,
}

/// Flower snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowerSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub nectar: f32,
    /// Fill fraction in [0, 1]
    pub frac: f32,
    #[serde(default)]
    pub reserved: bool,
}

/// A live signal, trimmed for drawing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub intensity: f32,
    /// Recruitment target, when the signal carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<(f32, f32)>,
}

/// Arena bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArenaSnapshot {
    pub width: f32,
    pub height: f32,
}

/// Complete world snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub snapshot_id: String,
    /// Identifies the simulation run this snapshot belongs to
    pub run_id: Uuid,
    pub time: SimTime,
    pub triggered_by: String,
    pub arena: ArenaSnapshot,
    pub hive: HiveMetrics,
    pub flowers_remaining: usize,
    /// Live signal count keyed by kind name; kinds with no live signals are omitted
    pub signal_counts: BTreeMap<String, usize>,
    pub agents: Vec<AgentSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flowers: Vec<FlowerSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signals: Vec<SignalSnapshot>,
}

impl WorldSnapshot {
    /// Creates a new WorldSnapshot with minimal data.
    pub fn new(
        snapshot_id: impl Into<String>,
        run_id: Uuid,
        time: SimTime,
        triggered_by: impl Into<String>,
    ) -> Self {
        Self {
            snapshot_id: snapshot_id.into(),
            run_id,
            time,
            triggered_by: triggered_by.into(),
            arena: ArenaSnapshot::default(),
            hive: HiveMetrics::default(),
            flowers_remaining: 0,
            signal_counts: BTreeMap::new(),
            agents: Vec::new(),
            flowers: Vec::new(),
            signals: Vec::new(),
        }
    }

    /// Number of live signals of one kind
    pub fn signal_count(&self, kind: &str) -> usize {
        self.signal_counts.get(kind).copied().unwrap_or(0)
    }

    /// Number of agents currently in a role
    pub fn role_count(&self, role: &str) -> usize {
        self.agents.iter().filter(|a| a.role == role).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
