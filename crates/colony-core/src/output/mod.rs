//! Output Generation
//!
//! Snapshot generation for renderers and recorders.

pub mod snapshot;

pub use snapshot::*;
