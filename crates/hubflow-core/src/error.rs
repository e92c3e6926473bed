//! Unified error type for dispatch model construction and solving
//!
//! Every failure in the pipeline is terminal for a run. Variants carry enough
//! context (series name, technology, solve phase) to locate the input or
//! topology defect without re-running.
//!
//! # Example
//!
//! ```ignore
//! use hubflow_core::{DispatchError, HubflowResult};
//!
//! fn check_horizon(horizon: usize) -> HubflowResult<()> {
//!     if horizon == 0 {
//!         return Err(DispatchError::Configuration("horizon must be positive".into()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all hubflow operations.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// An input series is missing, too short, or holds an invalid sample
    #[error("Data error in series '{series}': {detail}")]
    Data { series: String, detail: String },

    /// Degenerate conversion parameters or invalid run parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The assembled constraint system admits no feasible point
    #[error("Model infeasible while solving '{phase}': {context}")]
    Infeasible { phase: String, context: String },

    /// An objective is unbounded given the constraint set
    #[error("Objective unbounded while solving '{phase}'")]
    Unbounded { phase: String },

    /// Extraction attempted without a successful solve
    #[error("Results unavailable: solve status is {0}")]
    ResultUnavailable(String),

    /// Backend failures that are neither infeasibility nor unboundedness
    #[error("Solver error: {0}")]
    Solver(String),

    /// I/O errors (config files, result files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),
}

impl DispatchError {
    /// Shorthand for a [`DispatchError::Data`] error.
    pub fn data(series: impl Into<String>, detail: impl Into<String>) -> Self {
        DispatchError::Data {
            series: series.into(),
            detail: detail.into(),
        }
    }
}

/// Convenience type alias for Results using DispatchError.
pub type HubflowResult<T> = Result<T, DispatchError>;

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for DispatchError {
    fn from(err: toml::de::Error) -> Self {
        DispatchError::Parse(err.to_string())
    }
}
