//! In-memory regression dataset

use ndarray::{Array2, ArrayD, Axis};

use crate::error::{Error, Result};

/// Features and targets sharing a leading sample axis
///
/// Features are `[samples, ...input_shape]`; targets are `[samples, outputs]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: ArrayD<f32>,
    targets: Array2<f32>,
}

impl Dataset {
    pub fn new(features: ArrayD<f32>, targets: Array2<f32>) -> Result<Self> {
        if features.ndim() < 2 {
            return Err(Error::ShapeMismatch(format!(
                "features need a sample axis and at least one feature axis, got {:?}",
                features.shape()
            )));
        }
        if features.len_of(Axis(0)) != targets.nrows() {
            return Err(Error::ShapeMismatch(format!(
                "{} feature rows vs {} target rows",
                features.len_of(Axis(0)),
                targets.nrows()
            )));
        }
        if targets.ncols() == 0 {
            return Err(Error::ShapeMismatch("targets have no columns".into()));
        }
        Ok(Self { features, targets })
    }

    pub fn features(&self) -> &ArrayD<f32> {
        &self.features
    }

    pub fn targets(&self) -> &Array2<f32> {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-sample feature shape
    pub fn sample_shape(&self) -> &[usize] {
        &self.features.shape()[1..]
    }

    pub fn num_outputs(&self) -> usize {
        self.targets.ncols()
    }

    /// Rows at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.select(Axis(0), indices),
            targets: self.targets.select(Axis(0), indices),
        }
    }

    /// Hold out the last `fraction` of the samples for validation
    ///
    /// The split happens before any shuffling. A fraction of zero returns no
    /// validation set.
    pub fn split_validation(&self, fraction: f32) -> Result<(Self, Option<Self>)> {
        if !(0.0..1.0).contains(&fraction) {
            return Err(Error::ConfigError(format!(
                "validation_split must be in [0, 1), got {fraction}"
            )));
        }
        if fraction == 0.0 {
            return Ok((self.clone(), None));
        }

        let n = self.len();
        let split_at = (n as f64 * (1.0 - f64::from(fraction))).floor() as usize;
        if split_at == 0 || split_at == n {
            return Err(Error::ConfigError(format!(
                "validation_split {fraction} leaves an empty split of {n} samples"
            )));
        }

        let train: Vec<usize> = (0..split_at).collect();
        let validation: Vec<usize> = (split_at..n).collect();
        Ok((self.select(&train), Some(self.select(&validation))))
    }
}
