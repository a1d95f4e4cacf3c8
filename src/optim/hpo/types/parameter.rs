//! Parameter value and domain types

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::optim::hpo::error::{HPOError, Result};

/// Parameter value (sampled from domain)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Float(f64),
    Int(i64),
    Categorical(String),
}

impl ParameterValue {
    /// Get as float (converts int to float if needed)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            ParameterValue::Categorical(_) => None,
        }
    }

    /// Get as int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            ParameterValue::Float(v) => Some(*v as i64),
            ParameterValue::Categorical(_) => None,
        }
    }

    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::Categorical(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Float(v) => write!(f, "{v}"),
            ParameterValue::Int(v) => write!(f, "{v}"),
            ParameterValue::Categorical(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Float(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Int(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::Categorical(v.to_string())
    }
}

/// Parameter domain (search space)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterDomain {
    /// Integers `min, min + step, ..., <= max`
    Int { min: i64, max: i64, step: i64 },
    /// Continuous range [min, max], optionally log-scaled
    Float { min: f64, max: f64, log_scale: bool },
    /// Ordered discrete choices; the first is the default
    Choice { values: Vec<ParameterValue> },
}

impl ParameterDomain {
    /// Check that the domain is well formed
    pub fn validate(&self, name: &str) -> Result<()> {
        let invalid = |msg: &str| Err(HPOError::InvalidDomain(name.to_string(), msg.to_string()));
        match self {
            ParameterDomain::Int { min, max, step } => {
                if *step < 1 {
                    return invalid("step must be >= 1");
                }
                if min > max {
                    return invalid("min must not exceed max");
                }
            }
            ParameterDomain::Float { min, max, log_scale } => {
                if !min.is_finite() || !max.is_finite() {
                    return invalid("bounds must be finite");
                }
                if min > max {
                    return invalid("min must not exceed max");
                }
                if *log_scale && *min <= 0.0 {
                    return invalid("log-scaled bounds must be positive");
                }
            }
            ParameterDomain::Choice { values } => {
                if values.is_empty() {
                    return invalid("choice list is empty");
                }
            }
        }
        Ok(())
    }

    /// Number of distinct values, `None` for continuous domains
    pub fn cardinality(&self) -> Option<usize> {
        match self {
            ParameterDomain::Int { min, max, .. } if max < min => Some(0),
            ParameterDomain::Int { min, max, step } => {
                Some(((max - min) / (*step).max(1)) as usize + 1)
            }
            ParameterDomain::Float { .. } => None,
            ParameterDomain::Choice { values } => Some(values.len()),
        }
    }

    /// Value assigned when the oracle has not chosen one
    pub fn default_value(&self) -> Option<ParameterValue> {
        match self {
            ParameterDomain::Int { min, .. } => Some(ParameterValue::Int(*min)),
            ParameterDomain::Float { min, .. } => Some(ParameterValue::Float(*min)),
            ParameterDomain::Choice { values } => values.first().cloned(),
        }
    }

    /// Sample a random value from this domain
    ///
    /// The domain must have passed [`validate`](Self::validate).
    pub fn sample<R: Rng>(&self, rng: &mut R) -> ParameterValue {
        match self {
            ParameterDomain::Int { min, step, .. } => {
                let n = self.cardinality().unwrap_or(1).max(1);
                let idx = rng.random_range(0..n) as i64;
                ParameterValue::Int(min + idx * step)
            }
            ParameterDomain::Float { min, max, log_scale } => {
                let value = if *log_scale {
                    let log_low = min.ln();
                    let log_high = max.ln();
                    let log_val = log_low + rng.random::<f64>() * (log_high - log_low);
                    log_val.exp()
                } else {
                    min + rng.random::<f64>() * (max - min)
                };
                ParameterValue::Float(value)
            }
            ParameterDomain::Choice { values } => {
                let idx = rng.random_range(0..values.len().max(1));
                values.get(idx).cloned().unwrap_or(ParameterValue::Int(0))
            }
        }
    }

    /// Check if a value is valid for this domain
    pub fn is_valid(&self, value: &ParameterValue) -> bool {
        match (self, value) {
            (ParameterDomain::Int { min, max, step }, ParameterValue::Int(v)) => {
                v >= min && v <= max && (v - min) % (*step).max(1) == 0
            }
            (ParameterDomain::Float { min, max, .. }, value) => match value.as_float() {
                Some(v) => v >= *min && v <= *max,
                None => false,
            },
            (ParameterDomain::Choice { values }, value) => values.contains(value),
            _ => false,
        }
    }

    /// Map a value into [0, 1] for surrogate models
    ///
    /// Choices are placed at the centre of equal-width bins.
    pub fn to_unit(&self, value: &ParameterValue) -> Option<f64> {
        match self {
            ParameterDomain::Int { min, max, .. } => {
                let v = value.as_int()?;
                if max == min {
                    Some(0.5)
                } else {
                    Some((v - min) as f64 / (max - min) as f64)
                }
            }
            ParameterDomain::Float { min, max, log_scale } => {
                let v = value.as_float()?;
                if max <= min {
                    return Some(0.5);
                }
                if *log_scale {
                    Some((v.ln() - min.ln()) / (max.ln() - min.ln()))
                } else {
                    Some((v - min) / (max - min))
                }
            }
            ParameterDomain::Choice { values } => {
                let idx = values.iter().position(|c| c == value)?;
                Some((idx as f64 + 0.5) / values.len() as f64)
            }
        }
    }
}
