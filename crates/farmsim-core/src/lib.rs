//! FarmSim: tick-based simulator for load-balanced server farms.
//!
//! This crate provides the simulation engine that models servers with
//! bounded admission queues, a fixed number of processing slots and a small
//! per-server LRU cache of recently served item keys. Dispatch policies from
//! `farmsim-dispatch` decide which server queues each arriving request.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐     ┌───────────┐     ┌──────────────┐
//! │ Arrivals │────▶│  Engine   │────▶│  Statistics  │
//! │ (Poisson)│     │  (Ticks)  │     │  Collection  │
//! └──────────┘     └─────┬─────┘     └──────────────┘
//!                        │
//!                ┌───────┴───────┐
//!                │    Policy     │
//!                │  (Dispatch)   │
//!                └───────┬───────┘
//!                        │
//!          ┌─────────────┼─────────────┐
//!          ▼             ▼             ▼
//!    ┌──────────┐  ┌──────────┐  ┌──────────┐
//!    │ Server 0 │  │ Server 1 │  │ Server N │
//!    │  Queue   │  │  Queue   │  │  Queue   │
//!    │  Slots   │  │  Slots   │  │  Slots   │
//!    │   LRU    │  │   LRU    │  │   LRU    │
//!    └──────────┘  └──────────┘  └──────────┘
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod random;
pub mod request;
pub mod server;
pub mod stats;

// Re-export key types for convenience.
pub use cache::{CacheStats, ItemCache};
pub use clock::SimClock;
pub use config::{ConfigError, SimConfig};
pub use engine::Simulation;
pub use error::SimError;
pub use random::RandomProcess;
pub use request::Request;
pub use server::{Server, ServerSummary, ServiceModel};
pub use stats::{Counters, RunSummary, StatsCollector, StatsSnapshot};

/// Run a complete simulation with the given config.
pub fn run_simulation(config: SimConfig) -> Result<RunSummary, SimError> {
    Simulation::new(config)?.run()
}

/// Run the same configuration once per policy.
///
/// Every run uses the same seed: the configured one, or a single wall-clock
/// seed drawn up front. Unknown names fail before anything runs.
pub fn compare_policies(
    config: &SimConfig,
    policy_names: &[&str],
) -> Result<Vec<RunSummary>, SimError> {
    let seed = config.simulation.seed.unwrap_or_else(random::clock_seed);
    let configs = policy_names
        .iter()
        .map(|name| {
            let mut cfg = config.clone();
            cfg.simulation.seed = Some(seed);
            cfg.simulation.policy = name.to_string();
            cfg.validate()?;
            Ok(cfg)
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    configs.into_iter().map(run_simulation).collect()
}

/// Run the same configuration and seed at each arrival rate.
pub fn sweep_rates(config: &SimConfig, rates: &[f64]) -> Result<Vec<RunSummary>, SimError> {
    let seed = config.simulation.seed.unwrap_or_else(random::clock_seed);
    rates
        .iter()
        .map(|&rate| {
            let mut cfg = config.clone();
            cfg.simulation.seed = Some(seed);
            cfg.simulation.arrival_rate = rate;
            run_simulation(cfg)
        })
        .collect()
}
