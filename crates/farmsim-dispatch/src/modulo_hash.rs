//! Key-modulo dispatch.
//!
//! Sends every request for the same item to the same server, which
//! maximizes cache reuse but concentrates the hottest keys (those near zero
//! under an exponential popularity curve) on a few servers.

use crate::traits::*;

/// `item mod server_count`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuloHash;

impl ModuloHash {
    pub fn new() -> Self {
        Self
    }

    pub fn route(&self, request: &RequestInfo, servers: &[ServerLoad]) -> Option<usize> {
        if servers.is_empty() {
            return None;
        }
        Some(home_server(request.item, servers.len()))
    }
}

/// Home server of a key in a farm of `n` servers. `n` must be non-zero.
pub(crate) fn home_server(item: u64, n: usize) -> usize {
    (item % n as u64) as usize
}
