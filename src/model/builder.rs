//! ParameterSet -> compiled network

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use super::compile::{AdamSpec, CompiledModel, MetricKind};
use super::graph::Model;
use super::layer::Layer;
use super::regularizer::L1L2;
use crate::config::SearchConfiguration;
use crate::error::{Error, Result};
use crate::params::ParameterSet;
use crate::train::AsymmetricLoss;

/// Network family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Stacked fully connected layers
    #[default]
    Dense,
    /// Stacked bidirectional LSTMs
    #[serde(alias = "bilstm", alias = "lstm")]
    Recurrent,
    /// Reserved; building fails with `NotImplemented`
    #[serde(alias = "cnn")]
    Convolutional,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelKind::Dense => "dense",
            ModelKind::Recurrent => "recurrent",
            ModelKind::Convolutional => "convolutional",
        })
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "dense" => Ok(ModelKind::Dense),
            "recurrent" | "bilstm" | "lstm" => Ok(ModelKind::Recurrent),
            "convolutional" | "cnn" => Ok(ModelKind::Convolutional),
            other => Err(Error::ConfigError(format!("unknown model kind '{other}'"))),
        }
    }
}

/// Builds and compiles regression networks for a fixed input/output shape
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBuilder {
    input_shape: Vec<usize>,
    num_outputs: usize,
}

impl ModelBuilder {
    pub fn new(input_shape: Vec<usize>, num_outputs: usize) -> Self {
        Self { input_shape, num_outputs }
    }

    pub fn from_config(config: &SearchConfiguration) -> Self {
        Self::new(config.input_shape.clone(), config.num_outputs)
    }

    pub fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    /// Dispatch on the network family
    pub fn build(&self, kind: ModelKind, params: &ParameterSet, seed: u64) -> Result<CompiledModel> {
        match kind {
            ModelKind::Dense => self.build_dense(params, seed),
            ModelKind::Recurrent => self.build_recurrent(params, seed),
            ModelKind::Convolutional => self.build_convolutional(params, seed),
        }
    }

    /// `in1` -> (`hidden_i` + dropout) x layers -> linear output
    ///
    /// Hidden layers carry an L1/L2 activity regularizer.
    pub fn build_dense(&self, params: &ParameterSet, seed: u64) -> Result<CompiledModel> {
        let regularizer = L1L2::new(params.l1(), params.l2());
        let mut layers = vec![Layer::Input { name: "in1".into(), shape: self.input_shape.clone() }];
        for i in 0..params.layers() {
            layers.push(Layer::Dense {
                name: format!("hidden_{i}"),
                units: params.units_at(i)?,
                activation: Some(params.activation()),
                activity_regularizer: Some(regularizer),
            });
            layers.push(Layer::Dropout { name: format!("dropout_{i}"), rate: params.dropout_rate() });
        }
        layers.push(self.output_layer());

        let model = Model::sequential("dense", layers)?;
        self.compile(ModelKind::Dense, model, params, seed)
    }

    /// `inp1` -> (`hdn_i` [+ dropout]) x layers -> linear output
    ///
    /// Every recurrent layer but the last returns full sequences. Dropout
    /// layers are only inserted for a positive rate.
    pub fn build_recurrent(&self, params: &ParameterSet, seed: u64) -> Result<CompiledModel> {
        let regularizer = L1L2::new(params.l1(), params.l2());
        let n = params.layers();
        let mut layers =
            vec![Layer::Input { name: "inp1".into(), shape: self.input_shape.clone() }];
        for i in 0..n {
            layers.push(Layer::Bidirectional {
                name: format!("hdn_{i}"),
                units: params.units_at(i)?,
                recurrent_dropout: params.recurrent_dropout(),
                kernel_regularizer: Some(regularizer),
                return_sequences: i + 1 < n,
            });
            if params.dropout_rate() > 0.0 {
                layers.push(Layer::Dropout {
                    name: format!("dropout_{i}"),
                    rate: params.dropout_rate(),
                });
            }
        }
        layers.push(self.output_layer());

        let model = Model::sequential("bidirectional_lstm", layers)?;
        self.compile(ModelKind::Recurrent, model, params, seed)
    }

    pub fn build_convolutional(&self, _params: &ParameterSet, _seed: u64) -> Result<CompiledModel> {
        Err(Error::NotImplemented("convolutional model".into()))
    }

    fn output_layer(&self) -> Layer {
        Layer::Dense {
            name: "output".into(),
            units: self.num_outputs,
            activation: None,
            activity_regularizer: None,
        }
    }

    fn compile(
        &self,
        kind: ModelKind,
        model: Model,
        params: &ParameterSet,
        seed: u64,
    ) -> Result<CompiledModel> {
        debug!(
            model = %kind,
            params = model.param_count(),
            config = %params,
            "compiled model"
        );
        Ok(CompiledModel {
            kind,
            model,
            optimizer: AdamSpec::new(params.learning_rate()),
            loss: AsymmetricLoss::new(self.num_outputs)?,
            metrics: vec![MetricKind::RootMeanSquaredError],
            params: params.clone(),
            seed,
        })
    }
}
