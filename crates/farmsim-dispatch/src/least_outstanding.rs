//! Least outstanding requests dispatch.
//!
//! Routes each request to the server with the fewest queued and in-flight
//! requests. It balances load perfectly but scatters keys, so it serves as
//! the cache-oblivious baseline next to the key-aware policies.

use crate::traits::*;

/// Least outstanding requests dispatcher. Ties go to the lowest index.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastOutstanding;

impl LeastOutstanding {
    pub fn new() -> Self {
        Self
    }

    pub fn route(&self, _request: &RequestInfo, servers: &[ServerLoad]) -> Option<usize> {
        servers
            .iter()
            .enumerate()
            .min_by_key(|(i, s)| (s.outstanding(), *i))
            .map(|(i, _)| i)
    }
}
