//! Power-of-two-choices dispatch with mod-derived candidates.
//!
//! The first candidate is the key's home server (`item mod n`), the second
//! is derived from it as `(first * item + 1) mod n`. Both are deterministic
//! per key, so a hot key keeps hitting the caches of at most two servers
//! while still being able to spill off an overloaded home server.
//!
//! The second candidate only wins when its outstanding count is lower than
//! the first's by more than `bias`.

use crate::modulo_hash::home_server;
use crate::traits::*;

/// Biased two-choice dispatcher.
#[derive(Debug, Clone, Copy)]
pub struct ModChooseTwo {
    bias: usize,
}

impl ModChooseTwo {
    pub fn new(bias: usize) -> Self {
        Self { bias }
    }

    pub fn bias(&self) -> usize {
        self.bias
    }

    /// The two candidate servers for `item` in a farm of `n` servers.
    pub fn candidates(item: u64, n: usize) -> (usize, usize) {
        let first = home_server(item, n);
        let second = (first as u64).wrapping_mul(item).wrapping_add(1) % n as u64;
        (first, second as usize)
    }

    pub fn route(&self, request: &RequestInfo, servers: &[ServerLoad]) -> Option<usize> {
        if servers.is_empty() {
            return None;
        }
        let (first, second) = Self::candidates(request.item, servers.len());
        let first_load = servers[first].outstanding();
        let second_load = servers[second].outstanding();

        if second_load.saturating_add(self.bias) < first_load {
            Some(second)
        } else {
            Some(first)
        }
    }
}

impl Default for ModChooseTwo {
    fn default() -> Self {
        Self::new(PolicySettings::default().choose2_bias)
    }
}
