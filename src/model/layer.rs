//! Layer descriptions for sequential regression networks

use serde::{Deserialize, Serialize};

use super::activation::Activation;
use super::regularizer::L1L2;
use crate::error::{Error, Result};

/// One layer of a sequential network
///
/// Shapes exclude the batch dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Layer {
    Input {
        name: String,
        shape: Vec<usize>,
    },
    Dense {
        name: String,
        units: usize,
        /// `None` is the identity (linear output)
        activation: Option<Activation>,
        /// Penalty on the layer output
        activity_regularizer: Option<L1L2>,
    },
    Dropout {
        name: String,
        rate: f32,
    },
    /// Forward and backward LSTM, outputs concatenated
    Bidirectional {
        name: String,
        units: usize,
        recurrent_dropout: f32,
        /// Penalty on the input kernels
        kernel_regularizer: Option<L1L2>,
        return_sequences: bool,
    },
}

impl Layer {
    pub fn name(&self) -> &str {
        match self {
            Layer::Input { name, .. }
            | Layer::Dense { name, .. }
            | Layer::Dropout { name, .. }
            | Layer::Bidirectional { name, .. } => name,
        }
    }

    /// Output shape given the input shape
    pub fn output_shape(&self, input: &[usize]) -> Result<Vec<usize>> {
        match self {
            Layer::Input { shape, .. } => Ok(shape.clone()),
            Layer::Dense { name, units, .. } => match input {
                [_] => Ok(vec![*units]),
                _ => Err(Error::ShapeMismatch(format!(
                    "{name}: dense layer expects a flat input, got {input:?}"
                ))),
            },
            Layer::Dropout { .. } => Ok(input.to_vec()),
            Layer::Bidirectional { name, units, return_sequences, .. } => match input {
                [timesteps, _] if *return_sequences => Ok(vec![*timesteps, 2 * units]),
                [_, _] => Ok(vec![2 * units]),
                _ => Err(Error::ShapeMismatch(format!(
                    "{name}: recurrent layer expects [timesteps, features], got {input:?}"
                ))),
            },
        }
    }

    /// Trainable parameter count given the input shape
    pub fn param_count(&self, input: &[usize]) -> usize {
        let in_features = input.last().copied().unwrap_or(0);
        match self {
            Layer::Input { .. } | Layer::Dropout { .. } => 0,
            Layer::Dense { units, .. } => in_features * units + units,
            Layer::Bidirectional { units, .. } => {
                let gates = 4 * units;
                2 * (in_features * gates + units * gates + gates)
            }
        }
    }

    /// Short type label for summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Layer::Input { .. } => "InputLayer",
            Layer::Dense { .. } => "Dense",
            Layer::Dropout { .. } => "Dropout",
            Layer::Bidirectional { .. } => "Bidirectional(LSTM)",
        }
    }
}
