//! Shared snapshot types for the bee colony simulation.
//!
//! This crate contains pure data structures with no simulation logic.
//! It is the only thing a renderer or telemetry sink needs to depend on.

pub mod snapshot;
pub mod timestamp;

// Re-export timestamp types
pub use timestamp::SimTime;

// Re-export snapshot types
pub use snapshot::{
    generate_snapshot_id, AgentSnapshot, ArenaSnapshot, BroodCounts, FlowerSnapshot, HiveMetrics,
    SignalSnapshot, WorldSnapshot,
};
