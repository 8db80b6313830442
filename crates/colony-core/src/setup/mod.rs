//! World Setup
//!
//! Resource initialization and bee spawning.

pub mod colony;

pub use colony::*;
