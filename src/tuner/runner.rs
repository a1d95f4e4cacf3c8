//! Trial execution: a base executor wrapped by a before-trial hook

use serde::{Deserialize, Serialize};

use crate::config::BatchSizeRange;
use crate::error::Result;
use crate::hypermodel::{as_count, as_int};
use crate::model::CompiledModel;
use crate::optim::hpo::Trial;
use crate::train::{Dataset, FitOptions, History};

/// Training arguments shared by every trial of a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitArgs {
    /// Epochs when the oracle does not assign a budget
    pub epochs: usize,
    /// Fixed batch size; `None` lets the before-trial hook sample one
    pub batch_size: Option<usize>,
    pub validation_split: f32,
    pub shuffle: bool,
}

impl Default for FitArgs {
    fn default() -> Self {
        Self { epochs: 10, batch_size: None, validation_split: 0.2, shuffle: true }
    }
}

impl FitArgs {
    /// Batch size used when nothing sampled or fixed one
    pub const DEFAULT_BATCH_SIZE: usize = 32;

    pub fn new(epochs: usize, validation_split: f32) -> Self {
        Self { epochs, validation_split, ..Self::default() }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Fit options for one trial; a budget overrides `epochs`
    pub fn fit_options(&self, budget_epochs: Option<usize>) -> FitOptions {
        FitOptions {
            epochs: budget_epochs.unwrap_or(self.epochs),
            batch_size: self.batch_size.unwrap_or(Self::DEFAULT_BATCH_SIZE),
            validation_split: self.validation_split,
            shuffle: self.shuffle,
        }
    }
}

/// What a trial produced
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    /// Mean over executions of the best objective value per execution
    pub score: f64,
    /// Epochs each execution trained for
    pub epochs: usize,
    pub histories: Vec<History>,
}

/// Runs trials for a tuner
pub trait TrialExecutor {
    /// Register every parameter a trial would sample, without training
    fn declare_space(&mut self, trial: &mut Trial, args: &FitArgs) -> Result<()>;

    /// Build, train and score one trial
    fn run_trial(&mut self, trial: &mut Trial, data: &Dataset, args: &FitArgs)
        -> Result<TrialOutcome>;

    /// Rebuild the untrained model a trial trained
    fn build_model(&self, trial: &Trial) -> Result<CompiledModel>;
}

/// Hook run before the wrapped executor sees a trial
pub trait BeforeTrial {
    fn before_trial(&mut self, trial: &mut Trial, args: &mut FitArgs) -> Result<()>;
}

/// Samples `batch_size` from the trial unless the caller fixed one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchSizeSampler {
    range: BatchSizeRange,
}

impl Default for BatchSizeSampler {
    fn default() -> Self {
        Self { range: BatchSizeRange::new(64, 512, 64) }
    }
}

impl BatchSizeSampler {
    pub fn new(range: BatchSizeRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> BatchSizeRange {
        self.range
    }
}

impl BeforeTrial for BatchSizeSampler {
    fn before_trial(&mut self, trial: &mut Trial, args: &mut FitArgs) -> Result<()> {
        if args.batch_size.is_some() {
            return Ok(());
        }
        let sampled = trial.hyperparameters.int(
            "batch_size",
            as_int(self.range.min),
            as_int(self.range.max),
            as_int(self.range.step),
        )?;
        args.batch_size = Some(as_count("batch_size", sampled)?);
        Ok(())
    }
}

/// A base executor composed with a before-trial hook
///
/// The hook sees the trial and a private copy of the arguments first; the
/// executor then runs with whatever the hook produced.
#[derive(Debug, Clone)]
pub struct TrialRunner<E, H = BatchSizeSampler> {
    inner: E,
    hook: H,
}

impl<E, H> TrialRunner<E, H> {
    pub fn new(inner: E, hook: H) -> Self {
        Self { inner, hook }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn hook(&self) -> &H {
        &self.hook
    }
}

impl<E: TrialExecutor, H: BeforeTrial> TrialExecutor for TrialRunner<E, H> {
    fn declare_space(&mut self, trial: &mut Trial, args: &FitArgs) -> Result<()> {
        let mut args = args.clone();
        self.hook.before_trial(trial, &mut args)?;
        self.inner.declare_space(trial, &args)
    }

    fn run_trial(
        &mut self,
        trial: &mut Trial,
        data: &Dataset,
        args: &FitArgs,
    ) -> Result<TrialOutcome> {
        let mut args = args.clone();
        self.hook.before_trial(trial, &mut args)?;
        self.inner.run_trial(trial, data, &args)
    }

    fn build_model(&self, trial: &Trial) -> Result<CompiledModel> {
        self.inner.build_model(trial)
    }
}
