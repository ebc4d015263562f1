//! TOML configuration parsing for FarmSim.
//!
//! Defines the configuration schema for simulation runs: workload and run
//! length, farm shape, and dispatch tunables. Every field has a default, so
//! an empty file (or no file at all) describes the reference farm.

use crate::server::ServiceModel;
use farmsim_dispatch::{PolicyKind, PolicySettings, UnknownPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Validation(String),
    #[error(transparent)]
    UnknownPolicy(#[from] UnknownPolicy),
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub simulation: SimulationSection,
    #[serde(default)]
    pub cluster: ClusterSection,
    #[serde(default)]
    pub dispatch: DispatchSection,
}

/// Workload and run-length parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSection {
    /// Human-readable name for this simulation.
    #[serde(default = "default_sim_name")]
    pub name: String,
    /// Random seed for reproducibility; seeded from the wall clock if unset.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Last tick at which new requests are generated.
    #[serde(default = "default_horizon_ticks")]
    pub horizon_ticks: u64,
    /// Mean number of arrivals per tick.
    #[serde(default = "default_arrival_rate")]
    pub arrival_rate: f64,
    /// Scale of the exponential item-key distribution.
    #[serde(default = "default_item_parameter")]
    pub item_parameter: f64,
    /// Dispatch policy name.
    #[serde(default = "default_policy")]
    pub policy: String,
    /// Completed requests needed in the window before progress is reported.
    #[serde(default = "default_report_threshold")]
    pub report_threshold: u64,
}

fn default_sim_name() -> String {
    "farm".to_string()
}
fn default_horizon_ticks() -> u64 {
    4_000_000
}
fn default_arrival_rate() -> f64 {
    60.0
}
fn default_item_parameter() -> f64 {
    10_000.0
}
fn default_policy() -> String {
    PolicyKind::ModChooseTwo.name().to_string()
}
fn default_report_threshold() -> u64 {
    1000
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            name: default_sim_name(),
            seed: None,
            horizon_ticks: default_horizon_ticks(),
            arrival_rate: default_arrival_rate(),
            item_parameter: default_item_parameter(),
            policy: default_policy(),
            report_threshold: default_report_threshold(),
        }
    }
}

/// Farm shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSection {
    /// Number of servers.
    #[serde(default = "default_num_servers")]
    pub num_servers: usize,
    /// Concurrent processing slots per server.
    #[serde(default = "default_slots_per_server")]
    pub slots_per_server: usize,
    /// Item keys cached per server.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Maximum admission queue depth per server.
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: usize,
    /// Base service time of a cache hit.
    #[serde(default = "default_cached_service_ticks")]
    pub cached_service_ticks: u64,
    /// Base service time of a cache miss.
    #[serde(default = "default_uncached_service_ticks")]
    pub uncached_service_ticks: u64,
}

fn default_num_servers() -> usize {
    100
}
fn default_slots_per_server() -> usize {
    8
}
// 1.8 * item_parameter / num_servers with the default workload.
fn default_cache_capacity() -> usize {
    180
}
fn default_max_queue_depth() -> usize {
    50
}
fn default_cached_service_ticks() -> u64 {
    10
}
fn default_uncached_service_ticks() -> u64 {
    100
}

impl Default for ClusterSection {
    fn default() -> Self {
        Self {
            num_servers: default_num_servers(),
            slots_per_server: default_slots_per_server(),
            cache_capacity: default_cache_capacity(),
            max_queue_depth: default_max_queue_depth(),
            cached_service_ticks: default_cached_service_ticks(),
            uncached_service_ticks: default_uncached_service_ticks(),
        }
    }
}

/// Dispatch policy tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSection {
    /// Margin the second `mod_choose2` candidate must beat the first by.
    #[serde(default = "default_choose2_bias")]
    pub choose2_bias: usize,
}

fn default_choose2_bias() -> usize {
    PolicySettings::default().choose2_bias
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            choose2_bias: default_choose2_bias(),
        }
    }
}

impl SimConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency.
    ///
    /// Called by the parsers; call it again after overriding fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        let cluster = &self.cluster;

        if cluster.num_servers == 0 {
            return Err(ConfigError::Validation(
                "num_servers must be > 0".to_string(),
            ));
        }
        if cluster.slots_per_server == 0 {
            return Err(ConfigError::Validation(
                "slots_per_server must be > 0".to_string(),
            ));
        }
        if cluster.cached_service_ticks == 0 {
            return Err(ConfigError::Validation(
                "cached_service_ticks must be > 0".to_string(),
            ));
        }
        if cluster.uncached_service_ticks == 0 {
            return Err(ConfigError::Validation(
                "uncached_service_ticks must be > 0".to_string(),
            ));
        }
        if sim.horizon_ticks == 0 {
            return Err(ConfigError::Validation(
                "horizon_ticks must be > 0".to_string(),
            ));
        }
        if !sim.arrival_rate.is_finite() || sim.arrival_rate < 0.0 {
            return Err(ConfigError::Validation(format!(
                "arrival_rate must be a finite number >= 0, got {}",
                sim.arrival_rate
            )));
        }
        if !sim.item_parameter.is_finite() || sim.item_parameter < 0.0 {
            return Err(ConfigError::Validation(format!(
                "item_parameter must be a finite number >= 0, got {}",
                sim.item_parameter
            )));
        }
        self.policy_kind()?;
        Ok(())
    }

    /// Parse the policy name.
    pub fn policy_kind(&self) -> Result<PolicyKind, ConfigError> {
        Ok(self.simulation.policy.parse::<PolicyKind>()?)
    }

    pub fn policy_settings(&self) -> PolicySettings {
        PolicySettings {
            choose2_bias: self.dispatch.choose2_bias,
        }
    }

    pub fn service_model(&self) -> ServiceModel {
        ServiceModel {
            cached_ticks: self.cluster.cached_service_ticks,
            uncached_ticks: self.cluster.uncached_service_ticks,
        }
    }
}
