//! Forager Components
//!
//! Trip state carried by every worker. Only the forager role drives it, but
//! carried nectar survives role changes.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::environment::FlowerId;
use crate::geometry::Vec2;

/// Flowers remembered to avoid immediate re-visits
pub const VISIT_MEMORY: usize = 6;

/// Forager FSM sub-state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TripState {
    #[default]
    Wander,
    ToFlower,
    ToHive,
}

impl TripState {
    pub fn as_str(self) -> &'static str {
        match self {
            TripState::Wander => "wander",
            TripState::ToFlower => "to_flower",
            TripState::ToHive => "to_hive",
        }
    }
}

/// Bounded ring of recently visited flower ids, oldest first
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VisitMemory {
    ids: Vec<FlowerId>,
}

impl VisitMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: FlowerId) {
        self.ids.retain(|&existing| existing != id);
        if self.ids.len() == VISIT_MEMORY {
            self.ids.remove(0);
        }
        self.ids.push(id);
    }

    pub fn contains(&self, id: FlowerId) -> bool {
        self.ids.contains(&id)
    }

    pub fn as_slice(&self) -> &[FlowerId] {
        &self.ids
    }
}

/// Multi-step foraging trip
#[derive(Component, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForagerTrip {
    pub state: TripState,
    /// Flower this bee holds a claim on in the flower field
    pub reserved: Option<FlowerId>,
    pub carry: f32,
    pub capacity: f32,
    pub recent: VisitMemory,
    /// Target adopted from a sensed recruitment dance
    pub recruit_target: Option<Vec2>,
    /// Where nectar was last collected, advertised after delivery
    pub last_collection: Option<Vec2>,
    /// Nectar taken on that visit
    #[serde(default)]
    pub last_yield: f32,
    /// Seconds the current reservation has been held
    pub seek_timer: f32,
}

impl Default for ForagerTrip {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl ForagerTrip {
    pub fn new(capacity: f32) -> Self {
        Self {
            state: TripState::Wander,
            reserved: None,
            carry: 0.0,
            capacity,
            recent: VisitMemory::new(),
            recruit_target: None,
            last_collection: None,
            last_yield: 0.0,
            seek_timer: 0.0,
        }
    }

    pub fn spare_capacity(&self) -> f32 {
        (self.capacity - self.carry).max(0.0)
    }

    pub fn has_spare_capacity(&self) -> bool {
        self.spare_capacity() > 1e-6
    }

    /// Claim a flower and head for it
    pub fn begin_seek(&mut self, id: FlowerId) {
        self.state = TripState::ToFlower;
        self.reserved = Some(id);
        self.seek_timer = 0.0;
        self.recruit_target = None;
    }

    /// Drop the claim without releasing it; callers release through the field.
    pub fn take_reservation(&mut self) -> Option<FlowerId> {
        self.seek_timer = 0.0;
        self.reserved.take()
    }

    /// Record a successful visit
    pub fn record_collection(&mut self, at: Vec2, taken: f32) {
        self.carry += taken;
        self.last_collection = Some(at);
        self.last_yield = taken;
    }

    /// Back to wandering; returns the claim the caller must release
    pub fn abandon(&mut self) -> Option<FlowerId> {
        self.state = TripState::Wander;
        self.take_reservation()
    }
}
