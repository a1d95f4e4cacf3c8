//! Bidirectional LSTM hypermodel

use super::{
    sample_architecture, sample_learning_rate, sample_regularization, HyperModel,
    RECURRENT_DROPOUT_RATES,
};
use crate::config::SearchConfiguration;
use crate::error::Result;
use crate::model::ModelKind;
use crate::optim::hpo::HyperParameters;
use crate::params::ParameterSet;

/// Stacked bidirectional LSTMs with kernel regularization
///
/// Widths come from `min_units..=max_units` in steps of `unit_step`. The
/// activation is not searched: LSTM gates use their fixed nonlinearities.
#[derive(Debug, Clone)]
pub struct RecurrentHyperModel {
    config: SearchConfiguration,
}

impl RecurrentHyperModel {
    pub fn new(config: SearchConfiguration) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl HyperModel for RecurrentHyperModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Recurrent
    }

    fn config(&self) -> &SearchConfiguration {
        &self.config
    }

    fn sample_parameters(&self, hp: &mut HyperParameters) -> Result<ParameterSet> {
        let (layers, units) =
            sample_architecture(hp, &self.config, self.config.recurrent_units())?;
        let (dropout_rate, l1, l2) = sample_regularization(hp)?;
        let learning_rate = sample_learning_rate(hp)?;
        let recurrent_dropout = hp.choice_f64("recurrent_dropout", &RECURRENT_DROPOUT_RATES)?;

        ParameterSet::builder()
            .layers(layers)
            .units(units)
            .dropout_rate(dropout_rate)
            .recurrent_dropout(recurrent_dropout as f32)
            .l1(l1)
            .l2(l2)
            .learning_rate(learning_rate)
            .build()
    }
}
