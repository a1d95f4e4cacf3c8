//! Hyperparameter search space

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::optim::hpo::error::{HPOError, Result};

use super::parameter::{ParameterDomain, ParameterValue};

/// Parameter name -> value assignment
pub type ParameterMap = BTreeMap<String, ParameterValue>;

/// Hyperparameter search space
///
/// Parameters keep their registration order, which is also the column order
/// used when encoding configurations for surrogate models.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterSpace {
    params: Vec<(String, ParameterDomain)>,
}

impl HyperparameterSpace {
    /// Create an empty search space
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter unless the name is already registered
    ///
    /// Returns `false` when the name existed; the first domain is kept.
    pub fn add(&mut self, name: &str, domain: ParameterDomain) -> bool {
        if self.contains(name) {
            return false;
        }
        self.params.push((name.to_string(), domain));
        true
    }

    /// Get a parameter domain
    pub fn get(&self, name: &str) -> Option<&ParameterDomain> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.iter().any(|(n, _)| n == name)
    }

    /// Check if space is empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Get number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Iterate over parameters in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterDomain)> {
        self.params.iter().map(|(n, d)| (n, d))
    }

    /// Add every parameter of `other` not yet present; returns how many were added
    pub fn merge(&mut self, other: &HyperparameterSpace) -> usize {
        let mut added = 0;
        for (name, domain) in other.iter() {
            if self.add(name, domain.clone()) {
                added += 1;
            }
        }
        added
    }

    /// Number of distinct configurations, `None` if any domain is continuous
    pub fn cardinality(&self) -> Option<usize> {
        self.params
            .iter()
            .try_fold(1usize, |acc, (_, d)| d.cardinality().map(|c| acc.saturating_mul(c)))
    }

    /// Sample a random configuration
    pub fn sample_random<R: Rng>(&self, rng: &mut R) -> ParameterMap {
        self.params.iter().map(|(name, domain)| (name.clone(), domain.sample(rng))).collect()
    }

    /// Default value of every parameter
    pub fn defaults(&self) -> ParameterMap {
        self.params
            .iter()
            .filter_map(|(name, domain)| domain.default_value().map(|v| (name.clone(), v)))
            .collect()
    }

    /// Encode a configuration into unit-cube coordinates
    ///
    /// Missing or invalid values fall back to the domain default.
    pub fn encode(&self, config: &ParameterMap) -> Vec<f64> {
        self.params
            .iter()
            .map(|(name, domain)| {
                config
                    .get(name)
                    .and_then(|v| domain.to_unit(v))
                    .or_else(|| domain.default_value().and_then(|v| domain.to_unit(&v)))
                    .unwrap_or(0.5)
            })
            .collect()
    }

    /// Validate a configuration
    pub fn validate(&self, config: &ParameterMap) -> Result<()> {
        for (name, domain) in &self.params {
            match config.get(name) {
                Some(value) if domain.is_valid(value) => {}
                Some(value) => {
                    return Err(HPOError::InvalidValue(name.clone(), format!("{value:?}")))
                }
                None => return Err(HPOError::ParameterNotFound(name.clone())),
            }
        }
        Ok(())
    }
}
