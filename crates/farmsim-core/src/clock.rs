//! Virtual clock for tick-based simulation.
//!
//! The [`SimClock`] counts discrete ticks independently of wall-clock time.
//! It only moves forward, one step per simulation step, which keeps runs
//! deterministic regardless of host machine speed.

use serde::{Deserialize, Serialize};

/// Virtual simulation clock, in ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimClock {
    current: u64,
}

impl SimClock {
    /// Create a new clock starting at tick zero.
    pub fn new() -> Self {
        Self { current: 0 }
    }

    /// Current tick.
    pub fn now(&self) -> u64 {
        self.current
    }

    /// Advance by one tick and return the new time.
    pub fn advance(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    /// Progress through `horizon` in tenths. Keeps counting past the
    /// horizon, so the drain phase still moves through new tenths.
    pub fn decile_of(&self, horizon: u64) -> u64 {
        if horizon == 0 {
            return 10;
        }
        self.current.saturating_mul(10) / horizon
    }
}
