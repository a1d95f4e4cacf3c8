//! Activation functions for hidden layers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

const SELU_SCALE: f32 = 1.050_700_987_355_480_5;
const SELU_ALPHA: f32 = 1.673_263_242_354_377_3;

/// Element-wise activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Relu,
    Selu,
    Elu,
    Sigmoid,
}

impl Activation {
    /// Every searchable activation, in search order
    pub const ALL: [Activation; 4] =
        [Activation::Relu, Activation::Selu, Activation::Elu, Activation::Sigmoid];

    pub fn name(self) -> &'static str {
        match self {
            Activation::Relu => "relu",
            Activation::Selu => "selu",
            Activation::Elu => "elu",
            Activation::Sigmoid => "sigmoid",
        }
    }

    pub fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Selu => {
                if x > 0.0 {
                    SELU_SCALE * x
                } else {
                    SELU_SCALE * SELU_ALPHA * (x.exp() - 1.0)
                }
            }
            Activation::Elu => {
                if x > 0.0 {
                    x
                } else {
                    x.exp() - 1.0
                }
            }
            Activation::Sigmoid => sigmoid(x),
        }
    }

    /// Derivative at pre-activation `x` with output `y = apply(x)`
    pub fn derivative(self, x: f32, y: f32) -> f32 {
        match self {
            Activation::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Selu => {
                if x > 0.0 {
                    SELU_SCALE
                } else {
                    y + SELU_SCALE * SELU_ALPHA
                }
            }
            Activation::Elu => {
                if x > 0.0 {
                    1.0
                } else {
                    y + 1.0
                }
            }
            Activation::Sigmoid => y * (1.0 - y),
        }
    }
}

/// Logistic sigmoid, shared with the LSTM gates
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relu" => Ok(Activation::Relu),
            "selu" => Ok(Activation::Selu),
            "elu" => Ok(Activation::Elu),
            "sigmoid" => Ok(Activation::Sigmoid),
            other => Err(Error::ConfigError(format!(
                "unknown activation '{other}' (expected relu, selu, elu or sigmoid)"
            ))),
        }
    }
}
