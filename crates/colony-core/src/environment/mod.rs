//! Environment Collaborators
//!
//! The flower field and the hive. Behaviors reach them only through the
//! `FlowerSource` and `HiveIntake` traits.

pub mod flowers;
pub mod hive;

pub use flowers::{Flower, FlowerField};
pub use hive::{Brood, Hive};

use colony_events::BroodCounts;

use crate::geometry::Vec2;

/// Identifier of a flower in the field. Ids start at 1.
pub type FlowerId = u32;

/// Read-only view of a single flower
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowerView {
    pub id: FlowerId,
    pub position: Vec2,
    pub nectar: f32,
    pub reserved: bool,
    /// Unreserved and carrying enough nectar to be worth a trip
    pub available: bool,
}

/// Reservation protocol over the flowers
pub trait FlowerSource {
    /// Reserves the nearest available flower not in `avoid` and returns its id
    fn reserve_nearest(&mut self, point: Vec2, avoid: &[FlowerId]) -> Option<FlowerId>;

    /// Clears a reservation. No-op for unreserved or unknown ids.
    fn release_reservation(&mut self, id: FlowerId);

    /// Takes up to `amount` nectar and clears the reservation, whatever the yield
    fn collect_from(&mut self, id: FlowerId, amount: f32) -> f32;

    /// Flowers that still carry nectar
    fn remaining_count(&self) -> usize;

    fn flower(&self, id: FlowerId) -> Option<FlowerView>;
}

/// Fixed hive geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HiveGeometry {
    pub center: Vec2,
    pub radius: f32,
    pub entrance: Vec2,
    pub brood_radius: f32,
}

impl HiveGeometry {
    pub fn contains(&self, point: Vec2) -> bool {
        point.distance(self.center) <= self.radius
    }

    pub fn in_brood_zone(&self, point: Vec2) -> bool {
        point.distance(self.center) <= self.brood_radius
    }
}

/// Hive operations used by bees
pub trait HiveIntake {
    fn geometry(&self) -> HiveGeometry;

    /// Adds nectar to the receiver queue; non-positive amounts are ignored
    fn enqueue_intake(&mut self, amount: f32);

    /// Nectar currently waiting for receivers
    fn read_queue_pressure(&self) -> f32;

    /// Drains up to `rate * dt` from the queue into storage and returns it
    fn service_intake(&mut self, dt: f32, rate: f32) -> f32;

    fn brood_snapshot(&self) -> BroodCounts;

    fn add_eggs(&mut self, count: u32);

    /// Nurse care delivered this tick
    fn add_care(&mut self, units: f32);
}
