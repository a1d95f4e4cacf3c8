//! Search configuration
//!
//! A [`SearchConfiguration`] is loaded from YAML (or built in code), validated
//! once, and then shared read-only by every hypermodel call of a session.

mod schema;
mod validate;


use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

pub use schema::{ActivationPolicy, BatchSizeRange, SearchConfiguration, StepRange, UnitRange};
pub use validate::{validate_config, ValidationError};

impl SearchConfiguration {
    /// Check every bound, mapping failures to [`Error::ConfigError`]
    pub fn validate(&self) -> Result<()> {
        validate_config(self).map_err(|e| Error::ConfigError(format!("Invalid config: {e}")))
    }

    /// Parse and validate a YAML document
    ///
    /// Malformed YAML surfaces as [`Error::Yaml`], bad bounds as
    /// [`Error::ConfigError`].
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: SearchConfiguration = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load, parse and validate a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_yaml_str(&yaml)
    }
}
