//! The closed set of dispatch policies.
//!
//! A policy is chosen once, by name, when the simulation is configured. The
//! engine then holds a [`DispatchPolicy`] value and calls [`DispatchPolicy::route`]
//! for every arrival; there is no lookup by string after start-up.

use crate::choose_two::ModChooseTwo;
use crate::least_outstanding::LeastOutstanding;
use crate::modulo_hash::ModuloHash;
use crate::random::Random;
use crate::round_robin::RoundRobin;
use crate::traits::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a policy name does not match any known policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown dispatch policy '{name}', expected one of: {}", crate::available_policies().join(", "))]
pub struct UnknownPolicy {
    pub name: String,
}

/// Names of the available policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Random,
    RoundRobin,
    ModuloHash,
    #[serde(rename = "mod_choose2")]
    ModChooseTwo,
    LeastOutstanding,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 5] = [
        PolicyKind::Random,
        PolicyKind::RoundRobin,
        PolicyKind::ModuloHash,
        PolicyKind::ModChooseTwo,
        PolicyKind::LeastOutstanding,
    ];

    /// Canonical name, as accepted on the command line and in config files.
    pub fn name(self) -> &'static str {
        match self {
            PolicyKind::Random => "random",
            PolicyKind::RoundRobin => "round_robin",
            PolicyKind::ModuloHash => "modulo_hash",
            PolicyKind::ModChooseTwo => "mod_choose2",
            PolicyKind::LeastOutstanding => "least_outstanding",
        }
    }

    /// Instantiate a fresh policy of this kind.
    pub fn build(self, settings: &PolicySettings) -> DispatchPolicy {
        match self {
            PolicyKind::Random => DispatchPolicy::Random(Random::new()),
            PolicyKind::RoundRobin => DispatchPolicy::RoundRobin(RoundRobin::new()),
            PolicyKind::ModuloHash => DispatchPolicy::ModuloHash(ModuloHash::new()),
            PolicyKind::ModChooseTwo => {
                DispatchPolicy::ModChooseTwo(ModChooseTwo::new(settings.choose2_bias))
            }
            PolicyKind::LeastOutstanding => {
                DispatchPolicy::LeastOutstanding(LeastOutstanding::new())
            }
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyKind {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The unseparated spellings are kept for older scripts.
        match s {
            "random" => Ok(PolicyKind::Random),
            "round_robin" | "roundrobin" => Ok(PolicyKind::RoundRobin),
            "modulo_hash" | "modulohash" => Ok(PolicyKind::ModuloHash),
            "mod_choose2" | "modchoose2" => Ok(PolicyKind::ModChooseTwo),
            "least_outstanding" => Ok(PolicyKind::LeastOutstanding),
            _ => Err(UnknownPolicy {
                name: s.to_string(),
            }),
        }
    }
}

/// A configured dispatch policy together with its private state.
#[derive(Debug, Clone)]
pub enum DispatchPolicy {
    Random(Random),
    RoundRobin(RoundRobin),
    ModuloHash(ModuloHash),
    ModChooseTwo(ModChooseTwo),
    LeastOutstanding(LeastOutstanding),
}

impl DispatchPolicy {
    /// Pick the index of the server that should receive `request`.
    ///
    /// Returns `None` only when `servers` is empty.
    pub fn route(
        &mut self,
        request: &RequestInfo,
        servers: &[ServerLoad],
        uniform: &mut dyn UniformSource,
    ) -> Option<usize> {
        match self {
            DispatchPolicy::Random(p) => p.route(request, servers, uniform),
            DispatchPolicy::RoundRobin(p) => p.route(request, servers),
            DispatchPolicy::ModuloHash(p) => p.route(request, servers),
            DispatchPolicy::ModChooseTwo(p) => p.route(request, servers),
            DispatchPolicy::LeastOutstanding(p) => p.route(request, servers),
        }
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            DispatchPolicy::Random(_) => PolicyKind::Random,
            DispatchPolicy::RoundRobin(_) => PolicyKind::RoundRobin,
            DispatchPolicy::ModuloHash(_) => PolicyKind::ModuloHash,
            DispatchPolicy::ModChooseTwo(_) => PolicyKind::ModChooseTwo,
            DispatchPolicy::LeastOutstanding(_) => PolicyKind::LeastOutstanding,
        }
    }

    /// Human-readable name for reports.
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }
}
