//! Crate-wide error type

use thiserror::Error;

use crate::optim::hpo::HPOError;
use crate::tracking::TrackingError;

/// Result type alias for afinar operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring, building, training or searching
#[derive(Debug, Error)]
pub enum Error {
    /// A required field was never provided
    #[error("Missing required configuration: {0}")]
    MissingConfiguration(&'static str),

    /// A sequence was indexed past its end
    #[error("Index out of range: {what}[{index}] but only {len} entries available")]
    IndexOutOfRange {
        what: String,
        index: usize,
        len: usize,
    },

    /// The requested variant exists only as a placeholder
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Training error: {0}")]
    Training(String),

    /// Errors from the sampling handle or an oracle, passed through untouched
    #[error(transparent)]
    Search(#[from] HPOError),

    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
