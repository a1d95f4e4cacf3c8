//! Per-trial sampling handle

use serde::{Deserialize, Serialize};

use crate::optim::hpo::error::{HPOError, Result};

use super::parameter::{ParameterDomain, ParameterValue};
use super::space::{HyperparameterSpace, ParameterMap};

/// Sampling handle handed to hypermodels
///
/// Hypermodels ask for values by name. The first registration of a name
/// fixes its domain; later calls with a different domain get the original
/// one. A value already assigned (by an oracle) is returned as is,
/// otherwise the domain default is assigned and returned. Building a
/// hypermodel against an empty handle therefore discovers the search space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HyperParameters {
    space: HyperparameterSpace,
    values: ParameterMap,
}

impl HyperParameters {
    /// Empty handle: no domains, no values
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle carrying values chosen by an oracle
    pub fn from_values(space: HyperparameterSpace, values: ParameterMap) -> Self {
        Self { space, values }
    }

    /// Integer in `[min, max]` on a `step` grid
    pub fn int(&mut self, name: &str, min: i64, max: i64, step: i64) -> Result<i64> {
        let value = self.register(name, ParameterDomain::Int { min, max, step })?;
        value
            .as_int()
            .ok_or_else(|| HPOError::InvalidValue(name.to_string(), value.to_string()))
    }

    /// One of an ordered list of values
    pub fn choice(&mut self, name: &str, values: Vec<ParameterValue>) -> Result<ParameterValue> {
        self.register(name, ParameterDomain::Choice { values })
    }

    /// Float choice
    pub fn choice_f64(&mut self, name: &str, values: &[f64]) -> Result<f64> {
        let choices = values.iter().map(|v| ParameterValue::Float(*v)).collect();
        let value = self.choice(name, choices)?;
        value
            .as_float()
            .ok_or_else(|| HPOError::InvalidValue(name.to_string(), value.to_string()))
    }

    /// String choice
    pub fn choice_str(&mut self, name: &str, values: &[&str]) -> Result<String> {
        let choices = values.iter().map(|v| ParameterValue::from(*v)).collect();
        let value = self.choice(name, choices)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| HPOError::InvalidValue(name.to_string(), value.to_string()))
    }

    fn register(&mut self, name: &str, domain: ParameterDomain) -> Result<ParameterValue> {
        domain.validate(name)?;
        self.space.add(name, domain);
        let domain = self
            .space
            .get(name)
            .ok_or_else(|| HPOError::ParameterNotFound(name.to_string()))?;

        if let Some(value) = self.values.get(name) {
            if !domain.is_valid(value) {
                return Err(HPOError::InvalidValue(name.to_string(), value.to_string()));
            }
            return Ok(value.clone());
        }

        let value = domain
            .default_value()
            .ok_or_else(|| HPOError::InvalidDomain(name.to_string(), "no default".into()))?;
        self.values.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Current value of a parameter
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    /// Assign a value, overriding any previous one
    pub fn set(&mut self, name: &str, value: ParameterValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn values(&self) -> &ParameterMap {
        &self.values
    }

    /// Domains registered so far
    pub fn space(&self) -> &HyperparameterSpace {
        &self.space
    }
}
