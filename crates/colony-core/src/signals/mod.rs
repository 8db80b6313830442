//! Stigmergic signal layer
//!
//! Signals and the bus that owns them.

pub mod bus;
pub mod signal;

pub use bus::{query_defaults, SignalBus, SignalHit, SignalOutbox};
pub use signal::{
    Signal, SignalError, SignalKind, SignalPayload, SignalSpec, ALIVE_EPSILON, COLONY_SOURCE,
};
