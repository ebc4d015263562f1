//! Shared types for dispatch policies.
//!
//! Policies only see a [`RequestInfo`] and a slice of [`ServerLoad`] views;
//! they never touch the simulated servers directly.

use serde::{Deserialize, Serialize};

/// Read-only view of a server's load at the moment of dispatch.
///
/// This is the dispatch crate's view of a server. The engine rebuilds the
/// entry of a server right after enqueueing to it, so later arrivals of the
/// same tick see the updated queue depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerLoad {
    pub id: usize,
    pub queue_depth: usize,
    pub slots_in_use: usize,
}

impl ServerLoad {
    /// An idle server.
    pub fn idle(id: usize) -> Self {
        Self {
            id,
            queue_depth: 0,
            slots_in_use: 0,
        }
    }

    /// Queued plus in-flight requests.
    pub fn outstanding(&self) -> usize {
        self.queue_depth + self.slots_in_use
    }
}

/// Information about an arriving request, provided to policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestInfo {
    /// Popularity key of the requested item.
    pub item: u64,
    /// Tick at which the request was generated.
    pub sent: u64,
}

/// Source of uniform random choices for randomized policies.
///
/// Implemented by the simulation's random process so that every random draw
/// comes from the single seeded stream.
pub trait UniformSource {
    /// Uniform integer in `[0, n)`. `n` is never zero.
    fn choose_uniform(&mut self, n: usize) -> usize;
}

/// Tunables shared by all policies, fixed at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySettings {
    /// Margin by which the second candidate of `mod_choose2` must beat the
    /// first before it is picked.
    pub choose2_bias: usize,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self { choose2_bias: 16 }
    }
}
