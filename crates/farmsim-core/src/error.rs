//! Error types for simulation runs.

use crate::config::ConfigError;
use thiserror::Error;

/// Errors that abort a simulation.
///
/// Queue-full drops are not errors; they are counted as admission-control
/// outcomes by the statistics collector.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// Server state contradicts itself; the run cannot continue.
    #[error("Invariant violated on server {server}: {detail}")]
    InvariantViolation { server: usize, detail: String },
}
