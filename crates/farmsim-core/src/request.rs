//! Request model for the server-farm simulation.
//!
//! A [`Request`] is created at arrival with only its item key and send tick.
//! Admission stamps `accepted`, `completed` and `cached` exactly once; the
//! completed request is then handed to the statistics collector and dropped.

use farmsim_dispatch::RequestInfo;
use serde::{Deserialize, Serialize};

/// A single request flowing through the simulated farm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Request {
    /// Popularity key of the requested item.
    pub item: u64,
    /// Tick the request was generated.
    pub sent: u64,
    /// Tick the request entered a processing slot.
    pub accepted: u64,
    /// Tick the request finishes (set at admission, reached at release).
    pub completed: u64,
    /// Whether the item was in the server's cache at admission.
    pub cached: bool,
}

impl Request {
    pub fn new(item: u64, sent: u64) -> Self {
        Self {
            item,
            sent,
            accepted: 0,
            completed: 0,
            cached: false,
        }
    }

    /// Ticks spent waiting in the admission queue.
    pub fn queue_delay(&self) -> u64 {
        self.accepted.saturating_sub(self.sent)
    }

    /// Ticks from generation to completion.
    pub fn latency(&self) -> u64 {
        self.completed.saturating_sub(self.sent)
    }

    /// Ticks spent in a processing slot.
    pub fn service_time(&self) -> u64 {
        self.completed.saturating_sub(self.accepted)
    }

    /// The dispatch crate's view of this request.
    pub fn info(&self) -> RequestInfo {
        RequestInfo {
            item: self.item,
            sent: self.sent,
        }
    }
}
