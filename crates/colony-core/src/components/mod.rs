//! ECS Components
//!
//! Per-bee state: identity, kinematics, roles and foraging trips.

pub mod agent;
pub mod forager;
pub mod role;

pub use agent::*;
pub use forager::*;
pub use role::*;
