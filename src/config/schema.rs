//! Search configuration schema

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::model::{Activation, ModelKind};

/// Activation handling for dense hypermodels
///
/// Serialized as a plain string: an activation name, or `search` to let the
/// tuner pick one per trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActivationPolicy {
    /// Use this activation for every trial
    Fixed(Activation),
    /// Sample from every known activation
    Search,
}

impl Default for ActivationPolicy {
    fn default() -> Self {
        ActivationPolicy::Fixed(Activation::Relu)
    }
}

impl FromStr for ActivationPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("search") {
            Ok(ActivationPolicy::Search)
        } else {
            s.parse().map(ActivationPolicy::Fixed)
        }
    }
}

impl TryFrom<String> for ActivationPolicy {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ActivationPolicy> for String {
    fn from(policy: ActivationPolicy) -> Self {
        policy.to_string()
    }
}

impl fmt::Display for ActivationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationPolicy::Fixed(act) => write!(f, "{act}"),
            ActivationPolicy::Search => f.write_str("search"),
        }
    }
}

/// Integer range `min..=max` walked in `step` increments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRange {
    pub min: usize,
    pub max: usize,
    pub step: usize,
}

impl StepRange {
    pub const fn new(min: usize, max: usize, step: usize) -> Self {
        Self { min, max, step }
    }
}

/// Per-layer width range for dense hypermodels
pub type UnitRange = StepRange;

/// Batch-size range sampled before each trial
pub type BatchSizeRange = StepRange;

fn default_min_layers() -> usize {
    1
}

fn default_max_layers() -> usize {
    3
}

fn default_min_units() -> usize {
    8
}

fn default_max_units() -> usize {
    96
}

fn default_unit_step() -> usize {
    8
}

fn default_dense_units() -> UnitRange {
    StepRange::new(32, 512, 32)
}

fn default_batch_size() -> BatchSizeRange {
    StepRange::new(64, 512, 64)
}

/// Everything a hypermodel needs to describe its search space
///
/// Built once per session and shared read-only by every hypermodel call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfiguration {
    /// Shape of one sample: `[features]` for dense, `[timesteps, features]` for recurrent
    pub input_shape: Vec<usize>,

    /// Width of the regression output
    pub num_outputs: usize,

    /// Network family to search over
    #[serde(default)]
    pub model: ModelKind,

    /// Hidden-layer activation (dense only)
    #[serde(default)]
    pub activation: ActivationPolicy,

    #[serde(default = "default_min_layers")]
    pub min_layers: usize,

    #[serde(default = "default_max_layers")]
    pub max_layers: usize,

    /// Recurrent width bounds
    #[serde(default = "default_min_units")]
    pub min_units: usize,

    #[serde(default = "default_max_units")]
    pub max_units: usize,

    #[serde(default = "default_unit_step")]
    pub unit_step: usize,

    /// Dense width range
    #[serde(default = "default_dense_units")]
    pub dense_units: UnitRange,

    #[serde(default = "default_batch_size")]
    pub batch_size: BatchSizeRange,

    /// Oracle seed; entropy when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl SearchConfiguration {
    /// Configuration with every optional field at its default
    pub fn new(input_shape: Vec<usize>, num_outputs: usize) -> Self {
        Self {
            input_shape,
            num_outputs,
            model: ModelKind::default(),
            activation: ActivationPolicy::default(),
            min_layers: default_min_layers(),
            max_layers: default_max_layers(),
            min_units: default_min_units(),
            max_units: default_max_units(),
            unit_step: default_unit_step(),
            dense_units: default_dense_units(),
            batch_size: default_batch_size(),
            seed: None,
        }
    }

    pub fn with_model(mut self, model: ModelKind) -> Self {
        self.model = model;
        self
    }

    pub fn with_activation(mut self, activation: ActivationPolicy) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_layers(mut self, min_layers: usize, max_layers: usize) -> Self {
        self.min_layers = min_layers;
        self.max_layers = max_layers;
        self
    }

    /// Recurrent width bounds
    pub fn with_units(mut self, min_units: usize, max_units: usize, unit_step: usize) -> Self {
        self.min_units = min_units;
        self.max_units = max_units;
        self.unit_step = unit_step;
        self
    }

    pub fn with_dense_units(mut self, range: UnitRange) -> Self {
        self.dense_units = range;
        self
    }

    pub fn with_batch_size(mut self, range: BatchSizeRange) -> Self {
        self.batch_size = range;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Recurrent width range as a [`StepRange`]
    pub fn recurrent_units(&self) -> UnitRange {
        StepRange::new(self.min_units, self.max_units, self.unit_step)
    }
}
