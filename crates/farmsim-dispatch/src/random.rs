//! Uniform random dispatch.

use crate::traits::*;

/// Picks a server uniformly at random, ignoring key and load.
#[derive(Debug, Clone, Copy, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }

    pub fn route(
        &self,
        _request: &RequestInfo,
        servers: &[ServerLoad],
        uniform: &mut dyn UniformSource,
    ) -> Option<usize> {
        if servers.is_empty() {
            return None;
        }
        Some(uniform.choose_uniform(servers.len()))
    }
}
