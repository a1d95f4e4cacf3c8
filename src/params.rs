//! Sampled network configuration
//!
//! A [`ParameterSet`] is the immutable snapshot a hypermodel hands to the
//! model builder: depth, per-layer widths, regularization, learning rate and
//! activation. It can only be obtained through [`ParameterSetBuilder::build`]
//! (directly or via deserialization), which checks every field.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::model::Activation;

/// One sampled configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ParameterSetBuilder")]
pub struct ParameterSet {
    layers: usize,
    units: Vec<usize>,
    dropout_rate: f32,
    recurrent_dropout: f32,
    l1: f32,
    l2: f32,
    learning_rate: f32,
    activation: Activation,
    #[serde(skip_serializing_if = "Option::is_none")]
    metric: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
}

impl ParameterSet {
    pub fn builder() -> ParameterSetBuilder {
        ParameterSetBuilder::default()
    }

    pub fn layers(&self) -> usize {
        self.layers
    }

    /// Per-layer widths; may be longer than `layers`
    pub fn units(&self) -> &[usize] {
        &self.units
    }

    /// Width of hidden layer `index`
    pub fn units_at(&self, index: usize) -> Result<usize> {
        self.units.get(index).copied().ok_or_else(|| Error::IndexOutOfRange {
            what: "units".to_string(),
            index,
            len: self.units.len(),
        })
    }

    pub fn dropout_rate(&self) -> f32 {
        self.dropout_rate
    }

    pub fn recurrent_dropout(&self) -> f32 {
        self.recurrent_dropout
    }

    pub fn l1(&self) -> f32 {
        self.l1
    }

    pub fn l2(&self) -> f32 {
        self.l2
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn metric(&self) -> Option<&str> {
        self.metric.as_deref()
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    /// Copy annotated with the objective it was scored on
    pub fn with_result(&self, metric: impl Into<String>, score: f64) -> Self {
        Self { metric: Some(metric.into()), score: Some(score), ..self.clone() }
    }
}

/// Fractional digits of a learning rate: `0.001` -> `001`
fn learning_rate_digits(lr: f32) -> String {
    let rendered = lr.to_string();
    match rendered.split_once('.') {
        Some((_, frac)) => frac.to_string(),
        None => "0".to_string(),
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-layers_{:?}-units_{}_learningRate",
            self.layers,
            self.units,
            learning_rate_digits(self.learning_rate)
        )
    }
}

/// Builder for [`ParameterSet`]
///
/// Every field except `activation` (default relu) and the result
/// annotations must be provided.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParameterSetBuilder {
    layers: Option<usize>,
    units: Option<Vec<usize>>,
    dropout_rate: Option<f32>,
    recurrent_dropout: Option<f32>,
    l1: Option<f32>,
    l2: Option<f32>,
    learning_rate: Option<f32>,
    activation: Option<Activation>,
    metric: Option<String>,
    score: Option<f64>,
}

impl ParameterSetBuilder {
    pub fn layers(mut self, layers: usize) -> Self {
        self.layers = Some(layers);
        self
    }

    pub fn units(mut self, units: Vec<usize>) -> Self {
        self.units = Some(units);
        self
    }

    pub fn dropout_rate(mut self, rate: f32) -> Self {
        self.dropout_rate = Some(rate);
        self
    }

    pub fn recurrent_dropout(mut self, rate: f32) -> Self {
        self.recurrent_dropout = Some(rate);
        self
    }

    pub fn l1(mut self, l1: f32) -> Self {
        self.l1 = Some(l1);
        self
    }

    pub fn l2(mut self, l2: f32) -> Self {
        self.l2 = Some(l2);
        self
    }

    pub fn learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = Some(lr);
        self
    }

    pub fn activation(mut self, activation: Activation) -> Self {
        self.activation = Some(activation);
        self
    }

    /// Build the parameter set.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingConfiguration`] naming the first missing field
    /// - [`Error::ConfigError`] when a value is out of bounds
    pub fn build(self) -> Result<ParameterSet> {
        let layers = self.layers.ok_or(Error::MissingConfiguration("layers"))?;
        let units = self.units.ok_or(Error::MissingConfiguration("units"))?;
        let dropout_rate = self.dropout_rate.ok_or(Error::MissingConfiguration("dropout_rate"))?;
        let recurrent_dropout =
            self.recurrent_dropout.ok_or(Error::MissingConfiguration("recurrent_dropout"))?;
        let l1 = self.l1.ok_or(Error::MissingConfiguration("l1"))?;
        let l2 = self.l2.ok_or(Error::MissingConfiguration("l2"))?;
        let learning_rate =
            self.learning_rate.ok_or(Error::MissingConfiguration("learning_rate"))?;

        if layers == 0 {
            return Err(Error::ConfigError("layers must be >= 1".into()));
        }
        if let Some(pos) = units.iter().position(|u| *u == 0) {
            return Err(Error::ConfigError(format!("units[{pos}] must be >= 1")));
        }
        for (name, rate) in [("dropout_rate", dropout_rate), ("recurrent_dropout", recurrent_dropout)]
        {
            if !(0.0..1.0).contains(&rate) {
                return Err(Error::ConfigError(format!("{name} must be in [0, 1), got {rate}")));
            }
        }
        for (name, coeff) in [("l1", l1), ("l2", l2)] {
            if !coeff.is_finite() || coeff < 0.0 {
                return Err(Error::ConfigError(format!("{name} must be >= 0, got {coeff}")));
            }
        }
        if !learning_rate.is_finite() || learning_rate <= 0.0 {
            return Err(Error::ConfigError(format!(
                "learning_rate must be > 0, got {learning_rate}"
            )));
        }

        Ok(ParameterSet {
            layers,
            units,
            dropout_rate,
            recurrent_dropout,
            l1,
            l2,
            learning_rate,
            activation: self.activation.unwrap_or_default(),
            metric: self.metric,
            score: self.score,
        })
    }
}

impl TryFrom<ParameterSetBuilder> for ParameterSet {
    type Error = Error;

    fn try_from(builder: ParameterSetBuilder) -> Result<Self> {
        builder.build()
    }
}
