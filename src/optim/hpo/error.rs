//! HPO error types

use thiserror::Error;

/// Errors raised by the sampling handle and the search oracles
#[derive(Debug, Error)]
pub enum HPOError {
    #[error("Empty search space")]
    EmptySpace,

    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    #[error("Invalid parameter value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Invalid domain for {0}: {1}")]
    InvalidDomain(String, String),

    #[error("Unknown trial: {0}")]
    UnknownTrial(usize),

    #[error("No trials completed")]
    NoTrials,

    #[error("HPO error: {0}")]
    Internal(String),
}

/// Result type for HPO operations
pub type Result<T> = std::result::Result<T, HPOError>;
