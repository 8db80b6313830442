//! ECS Systems
//!
//! Every step of the tick, in schedule order: clock, bus, environment,
//! perception, roles, behaviors, flash decay, hatching, outbox flush.

pub mod behavior;
pub mod perception;
pub mod roles;
pub mod world;

pub use behavior::{decay_flash, run_behaviors, step_agent, AgentFrame, BehaviorFault, TickContext};
pub use perception::{update_drives, Senses};
pub use roles::choose_roles;
pub use world::{
    advance_clock, flush_outbox, spawn_hatched_workers, step_environment, step_signal_bus,
};
