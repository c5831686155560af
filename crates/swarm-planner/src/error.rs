//! Error types for model construction, configuration loading and export

use std::path::PathBuf;

use thiserror::Error;

use swarm_core::SymbolicError;

use crate::config::PairAggregation;

/// Cost model construction errors
///
/// All of these are raised before any expression is built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Invalid {name} dimension {value}: at least {min} channels required")]
    InvalidDimension {
        name: &'static str,
        value: usize,
        min: usize,
    },
    #[error("Invalid horizon of {num_steps} steps: at least 1 required")]
    InvalidHorizon { num_steps: usize },
    #[error("Invalid time step {0}: must be finite and positive")]
    InvalidTimeStep(f64),
    #[error("Invalid weight {name} = {value}")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("Invalid input bounds [{min}, {max}]")]
    InvalidBounds { min: f64, max: f64 },
    #[error("Unsupported vehicle count {count} for {aggregation} collision aggregation")]
    UnsupportedVehicleCount {
        count: usize,
        aggregation: PairAggregation,
    },
    #[error("Problem too large: {what} length overflows usize")]
    ProblemTooLarge { what: &'static str },
    #[error("Invalid {what} length: expected {expected}, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Symbolic error: {0}")]
    Symbolic(#[from] SymbolicError),
}

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ModelError),
}

/// Problem export errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("Symbolic error: {0}")]
    Symbolic(#[from] SymbolicError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
