//! Compilation: a model plus its optimizer, loss and metrics

use serde::{Deserialize, Serialize};
use std::fmt;

use super::builder::ModelKind;
use super::graph::Model;
use crate::optim::Adam;
use crate::params::ParameterSet;
use crate::train::{AsymmetricLoss, Metric, RootMeanSquaredError};

/// Adam hyperparameters attached at compile time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdamSpec {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
}

impl AdamSpec {
    /// Adam with β1 = 0.9, β2 = 0.999, ε = 1e-7
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate, beta1: 0.9, beta2: 0.999, epsilon: 1e-7 }
    }

    /// Fresh optimizer state
    pub fn build(&self) -> Adam {
        Adam::new(self.learning_rate, self.beta1, self.beta2, self.epsilon)
    }
}

/// Metrics reported per epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    RootMeanSquaredError,
}

impl MetricKind {
    pub fn name(self) -> &'static str {
        match self {
            MetricKind::RootMeanSquaredError => "root_mean_squared_error",
        }
    }

    /// Implementation of this metric
    pub fn metric(self) -> Box<dyn Metric> {
        match self {
            MetricKind::RootMeanSquaredError => Box::new(RootMeanSquaredError),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A network ready for training
///
/// Compiling never trains: weights are initialized by the fitter from
/// [`seed`](Self::seed).
#[derive(Debug, Clone)]
pub struct CompiledModel {
    pub kind: ModelKind,
    pub model: Model,
    pub optimizer: AdamSpec,
    pub loss: AsymmetricLoss,
    pub metrics: Vec<MetricKind>,
    pub params: ParameterSet,
    pub seed: u64,
}

impl CompiledModel {
    pub fn metric_names(&self) -> Vec<&'static str> {
        self.metrics.iter().map(|m| m.name()).collect()
    }
}
