//! Convolutional hypermodel placeholder

use super::HyperModel;
use crate::config::SearchConfiguration;
use crate::error::{Error, Result};
use crate::model::{CompiledModel, ModelKind};
use crate::optim::hpo::HyperParameters;
use crate::params::ParameterSet;

/// Reserved network family; every build fails with [`Error::NotImplemented`]
#[derive(Debug, Clone)]
pub struct ConvolutionalHyperModel {
    config: SearchConfiguration,
}

impl ConvolutionalHyperModel {
    pub fn new(config: SearchConfiguration) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl HyperModel for ConvolutionalHyperModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Convolutional
    }

    fn config(&self) -> &SearchConfiguration {
        &self.config
    }

    fn sample_parameters(&self, _hp: &mut HyperParameters) -> Result<ParameterSet> {
        Err(Error::NotImplemented("convolutional hypermodel".into()))
    }

    fn build(&self, _hp: &mut HyperParameters, _seed: u64) -> Result<CompiledModel> {
        Err(Error::NotImplemented("convolutional hypermodel".into()))
    }
}
