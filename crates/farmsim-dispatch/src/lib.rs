//! Dispatch policies for FarmSim.
//!
//! This crate provides the [`DispatchPolicy`] enum and the policies it can
//! hold. Every policy maps an arriving request and a read-only view of the
//! servers' load to the index of the server that should queue it:
//!
//! | Policy | Strategy | Trade-off |
//! |--------|----------|-----------|
//! | [`Random`] | Uniform choice | No hot spots, cold caches |
//! | [`RoundRobin`] | Cycle through servers | Even counts, cold caches |
//! | [`ModuloHash`] | `item mod n` | Warm caches, hot spots on skewed keys |
//! | [`ModChooseTwo`] | Home server or a derived alternate | Warm caches, bounded hot spots |
//! | [`LeastOutstanding`] | Fewest outstanding requests | Balanced load, cold caches |

pub mod choose_two;
pub mod least_outstanding;
pub mod modulo_hash;
pub mod policy;
pub mod random;
pub mod round_robin;
pub mod traits;

pub use choose_two::ModChooseTwo;
pub use least_outstanding::LeastOutstanding;
pub use modulo_hash::ModuloHash;
pub use policy::{DispatchPolicy, PolicyKind, UnknownPolicy};
pub use random::Random;
pub use round_robin::RoundRobin;
pub use traits::*;

/// List all available policy names.
pub fn available_policies() -> Vec<&'static str> {
    PolicyKind::ALL.iter().map(|kind| kind.name()).collect()
}
