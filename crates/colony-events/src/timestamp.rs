//! Simulation Time
//!
//! Tick counter plus elapsed simulated seconds.
//!
//! # Example
//!
//! ```
//! use colony_events::SimTime;
//!
//! let t = SimTime::new(120, 2.0);
//! assert_eq!(t.tick, 120);
//! assert_eq!(t.to_string(), "tick_120@2.00s");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Point in simulated time.
///
/// Ticks are not a fixed duration: each tick carries whatever delta-time the
/// driver supplied, so `elapsed` is tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimTime {
    pub tick: u64,
    /// Seconds of simulated time since the run started.
    pub elapsed: f64,
}

impl SimTime {
    pub fn new(tick: u64, elapsed: f64) -> Self {
        Self { tick, elapsed }
    }

    /// Returns the time after one more tick of `dt` seconds.
    pub fn advanced(self, dt: f64) -> Self {
        Self {
            tick: self.tick + 1,
            elapsed: self.elapsed + dt.max(0.0),
        }
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick_{}@{:.2}s", self.tick, self.elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advanced_increments_tick_and_elapsed() {
        let t = SimTime::default().advanced(0.25).advanced(0.5);
        assert_eq!(t.tick, 2);
        assert!((t.elapsed - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_negative_dt_does_not_rewind() {
        let t = SimTime::new(3, 1.0).advanced(-4.0);
        assert_eq!(t.tick, 4);
        assert_eq!(t.elapsed, 1.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(SimTime::new(7, 0.25).to_string(), "tick_7@0.25s");
    }
}
