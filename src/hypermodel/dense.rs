//! Dense (fully connected) hypermodel

use super::{sample_architecture, sample_learning_rate, sample_regularization, HyperModel};
use crate::config::{ActivationPolicy, SearchConfiguration};
use crate::error::Result;
use crate::model::{Activation, ModelKind};
use crate::optim::hpo::HyperParameters;
use crate::params::ParameterSet;

/// Stacked dense layers with activity regularization
#[derive(Debug, Clone)]
pub struct DenseHyperModel {
    config: SearchConfiguration,
}

impl DenseHyperModel {
    /// Validates `config` once; later builds trust it
    pub fn new(config: SearchConfiguration) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    fn sample_activation(&self, hp: &mut HyperParameters) -> Result<Activation> {
        match self.config.activation {
            ActivationPolicy::Fixed(activation) => Ok(activation),
            ActivationPolicy::Search => {
                let names: Vec<&str> = Activation::ALL.iter().map(|a| a.name()).collect();
                hp.choice_str("activation", &names)?.parse()
            }
        }
    }
}

impl HyperModel for DenseHyperModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Dense
    }

    fn config(&self) -> &SearchConfiguration {
        &self.config
    }

    fn sample_parameters(&self, hp: &mut HyperParameters) -> Result<ParameterSet> {
        let (layers, units) = sample_architecture(hp, &self.config, self.config.dense_units)?;
        let (dropout_rate, l1, l2) = sample_regularization(hp)?;
        let activation = self.sample_activation(hp)?;
        let learning_rate = sample_learning_rate(hp)?;

        ParameterSet::builder()
            .layers(layers)
            .units(units)
            .dropout_rate(dropout_rate)
            .recurrent_dropout(0.0)
            .l1(l1)
            .l2(l2)
            .learning_rate(learning_rate)
            .activation(activation)
            .build()
    }
}
