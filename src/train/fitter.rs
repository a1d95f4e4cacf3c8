//! Model-training contract

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::dataset::Dataset;
use crate::error::Result;
use crate::model::CompiledModel;

/// Options for one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    pub epochs: usize,
    pub batch_size: usize,
    /// Trailing fraction of the data held out for `val_*` metrics
    pub validation_split: f32,
    pub shuffle: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self { epochs: 1, batch_size: 32, validation_split: 0.0, shuffle: true }
    }
}

impl FitOptions {
    pub fn new(epochs: usize, batch_size: usize) -> Self {
        Self { epochs, batch_size, ..Self::default() }
    }

    pub fn with_validation_split(mut self, fraction: f32) -> Self {
        self.validation_split = fraction;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }
}

/// Per-epoch metric series
///
/// Keys follow the usual naming: `loss`, the metric names, and the same
/// names prefixed with `val_` when a validation split is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    metrics: BTreeMap<String, Vec<f64>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one epoch's value
    pub fn record(&mut self, name: impl Into<String>, value: f64) {
        self.metrics.entry(name.into()).or_default().push(value);
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(Vec::as_slice)
    }

    /// Value recorded for the last epoch
    pub fn last(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|v| v.last().copied())
    }

    /// Number of epochs recorded for `loss`
    pub fn epochs(&self) -> usize {
        self.get("loss").map_or(0, <[f64]>::len)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }
}

/// Something that can train a compiled model
///
/// The search layer only depends on this trait; [`CpuFitter`](super::CpuFitter)
/// is the reference implementation.
pub trait ModelFitter {
    fn fit(&mut self, model: &CompiledModel, data: &Dataset, options: &FitOptions)
        -> Result<History>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_record() {
        let mut history = History::new();
        history.record("loss", 2.0);
        history.record("loss", 1.0);
        history.record("val_loss", 3.0);

        assert_eq!(history.get("loss"), Some(&[2.0, 1.0][..]));
        assert_eq!(history.last("loss"), Some(1.0));
        assert_eq!(history.epochs(), 2);
        assert_eq!(history.get("missing"), None);
        assert_eq!(history.names().collect::<Vec<_>>(), vec!["loss", "val_loss"]);
    }

    #[test]
    fn test_fit_options_yaml_defaults() {
        let options: FitOptions = serde_yaml::from_str("epochs: 5").unwrap();
        assert_eq!(options.epochs, 5);
        assert_eq!(options.batch_size, 32);
        assert!(options.shuffle);
    }
}
