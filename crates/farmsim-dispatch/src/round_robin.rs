//! Round-robin dispatch.
//!
//! Distributes requests across servers in a strict cycle. The counter is
//! shared by every request regardless of its key, so the rotation ignores
//! both popularity and server load.

use crate::traits::*;

/// Round-robin dispatcher.
#[derive(Debug, Clone, Default)]
pub struct RoundRobin {
    /// Index handed out to the next request.
    next: usize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    pub fn route(&mut self, _request: &RequestInfo, servers: &[ServerLoad]) -> Option<usize> {
        if servers.is_empty() {
            return None;
        }
        // The server count is fixed for a run; the modulo also covers a
        // counter left over from a larger farm.
        let chosen = self.next % servers.len();
        self.next = (chosen + 1) % servers.len();
        Some(chosen)
    }
}
