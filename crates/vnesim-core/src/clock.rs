//! Virtual clock for discrete-event simulation.
//!
//! The [`SimClock`] tracks simulation time independently of wall-clock time,
//! advancing only when events are processed. This enables deterministic,
//! repeatable simulations regardless of host machine speed.

use serde::{Deserialize, Serialize};

/// Virtual simulation clock.
///
/// Time is a dimensionless tick count; network files express arrival times
/// and durations in the same unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimClock {
    /// Current simulation time in ticks.
    current: u64,
}

impl SimClock {
    /// Create a new clock starting at time zero.
    pub fn new() -> Self {
        Self { current: 0 }
    }

    /// Create a clock starting at a specific time.
    pub fn starting_at(time: u64) -> Self {
        Self { current: time }
    }

    /// Current simulation time.
    pub fn now(&self) -> u64 {
        self.current
    }

    /// Advance the clock to a specific time.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if `time` is in the past.
    pub fn advance_to(&mut self, time: u64) {
        debug_assert!(
            time >= self.current,
            "Cannot move clock backwards: current={}, target={}",
            self.current,
            time,
        );
        self.current = time;
    }

    /// Advance the clock by a duration.
    pub fn advance_by(&mut self, delta: u64) {
        self.current += delta;
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}
