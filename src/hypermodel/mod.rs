//! Hypermodels: sample a [`ParameterSet`] from a trial and build it
//!
//! A hypermodel never trains anything. Given a trial's
//! [`HyperParameters`] handle it asks for every searchable value by a stable
//! name, assembles a validated [`ParameterSet`] and hands it to the
//! [`ModelBuilder`](crate::model::ModelBuilder) together with the trial
//! seed. Calling [`HyperModel::build`] against an empty handle registers the
//! whole search space with default values.
//!
//! Sampling order:
//!
//! 1. `layers`
//! 2. `units_0 .. units_{max_layers - 1}`
//! 3. `dropout_rate`
//! 4. `l1`, `l2`
//! 5. `activation` (dense, when searched)
//! 6. `learning_rate`
//! 7. `recurrent_dropout` (recurrent)

mod convolutional;
mod dense;
mod recurrent;


pub use convolutional::ConvolutionalHyperModel;
pub use dense::DenseHyperModel;
pub use recurrent::RecurrentHyperModel;

use tracing::debug;

use crate::config::{SearchConfiguration, UnitRange};
use crate::error::{Error, Result};
use crate::model::{CompiledModel, ModelBuilder, ModelKind};
use crate::optim::hpo::HyperParameters;
use crate::params::ParameterSet;

pub const DROPOUT_RATES: [f64; 3] = [0.2, 0.25, 0.4];
pub const REGULARIZATION_RATES: [f64; 4] = [0.0, 1e-5, 1e-4, 5e-4];
pub const LEARNING_RATES: [f64; 5] = [1e-4, 5e-4, 1e-3, 2.5e-3, 5e-3];
pub const RECURRENT_DROPOUT_RATES: [f64; 4] = [0.0, 0.1, 0.25, 0.4];

/// Builds one network family from sampled hyperparameters
pub trait HyperModel {
    fn kind(&self) -> ModelKind;

    fn config(&self) -> &SearchConfiguration;

    /// Sample a fresh parameter set from `hp`
    fn sample_parameters(&self, hp: &mut HyperParameters) -> Result<ParameterSet>;

    /// Sample and build an untrained, compiled model
    fn build(&self, hp: &mut HyperParameters, seed: u64) -> Result<CompiledModel> {
        let params = self.sample_parameters(hp)?;
        debug!(kind = %self.kind(), params = %params, seed, "sampled parameter set");
        ModelBuilder::from_config(self.config()).build(self.kind(), &params, seed)
    }
}

/// Hypermodel for the family named in `config.model`
pub fn hypermodel_for(config: SearchConfiguration) -> Result<Box<dyn HyperModel>> {
    Ok(match config.model {
        ModelKind::Dense => Box::new(DenseHyperModel::new(config)?),
        ModelKind::Recurrent => Box::new(RecurrentHyperModel::new(config)?),
        ModelKind::Convolutional => Box::new(ConvolutionalHyperModel::new(config)?),
    })
}

impl<T: HyperModel + ?Sized> HyperModel for Box<T> {
    fn kind(&self) -> ModelKind {
        (**self).kind()
    }

    fn config(&self) -> &SearchConfiguration {
        (**self).config()
    }

    fn sample_parameters(&self, hp: &mut HyperParameters) -> Result<ParameterSet> {
        (**self).sample_parameters(hp)
    }

    fn build(&self, hp: &mut HyperParameters, seed: u64) -> Result<CompiledModel> {
        (**self).build(hp, seed)
    }
}

pub(crate) fn as_count(name: &str, value: i64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| Error::ConfigError(format!("{name} sampled a negative value {value}")))
}

pub(crate) fn as_int(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// `layers` and one width per possible layer
///
/// Widths are registered for `max_layers` layers regardless of the sampled
/// depth, so every trial sees the same space.
fn sample_architecture(
    hp: &mut HyperParameters,
    config: &SearchConfiguration,
    units: UnitRange,
) -> Result<(usize, Vec<usize>)> {
    let layers = hp.int("layers", as_int(config.min_layers), as_int(config.max_layers), 1)?;
    let layers = as_count("layers", layers)?;

    let widths = (0..config.max_layers)
        .map(|i| {
            let name = format!("units_{i}");
            let width = hp.int(&name, as_int(units.min), as_int(units.max), as_int(units.step))?;
            as_count(&name, width)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((layers, widths))
}

/// `dropout_rate`, `l1`, `l2`
fn sample_regularization(hp: &mut HyperParameters) -> Result<(f32, f32, f32)> {
    let dropout = hp.choice_f64("dropout_rate", &DROPOUT_RATES)?;
    let l1 = hp.choice_f64("l1", &REGULARIZATION_RATES)?;
    let l2 = hp.choice_f64("l2", &REGULARIZATION_RATES)?;
    Ok((dropout as f32, l1 as f32, l2 as f32))
}

fn sample_learning_rate(hp: &mut HyperParameters) -> Result<f32> {
    Ok(hp.choice_f64("learning_rate", &LEARNING_RATES)? as f32)
}
