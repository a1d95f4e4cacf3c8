//! Random, bayesian and hyperband entry points

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::controller::Tuner;
use super::executor::BaseExecutor;
use super::logger::TrialLogger;
use super::runner::{BatchSizeSampler, FitArgs, TrialRunner};
use crate::config::SearchConfiguration;
use crate::error::Result;
use crate::hypermodel::{hypermodel_for, HyperModel};
use crate::optim::hpo::{
    BayesianOptimizationOracle, HyperbandOracle, Objective, Oracle, RandomSearchOracle,
};
use crate::train::{CpuFitter, Dataset, ModelFitter};

/// Executor every driver search uses
pub type SearchExecutor<F> = TrialRunner<BaseExecutor<Box<dyn HyperModel>, F>, BatchSizeSampler>;

/// Random search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomSearchOptions {
    pub objective: Objective,
    pub max_trials: usize,
    pub epochs: usize,
    pub executions_per_trial: usize,
    pub validation_split: f32,
    /// Fixed batch size; sampled per trial when unset
    pub batch_size: Option<usize>,
}

impl Default for RandomSearchOptions {
    fn default() -> Self {
        Self {
            objective: Objective::default(),
            max_trials: 256,
            epochs: 10,
            executions_per_trial: 3,
            validation_split: 0.2,
            batch_size: None,
        }
    }
}

/// Bayesian optimization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BayesianSearchOptions {
    pub objective: Objective,
    pub max_trials: usize,
    pub epochs: usize,
    /// Observation noise of the surrogate
    pub alpha: f64,
    /// Exploration weight
    pub beta: f64,
    /// Random trials before the surrogate is used; 3 per parameter when unset
    pub num_initial_points: Option<usize>,
    pub executions_per_trial: usize,
    pub validation_split: f32,
    pub batch_size: Option<usize>,
}

impl Default for BayesianSearchOptions {
    fn default() -> Self {
        Self {
            objective: Objective::default(),
            max_trials: 256,
            epochs: 2,
            alpha: 2.5e-4,
            beta: 2.75,
            num_initial_points: None,
            executions_per_trial: 3,
            validation_split: 0.1,
            batch_size: None,
        }
    }
}

/// Hyperband settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperbandSearchOptions {
    pub objective: Objective,
    pub max_epochs: usize,
    /// Reduction factor between rounds
    pub factor: usize,
    pub hyperband_iterations: usize,
    pub executions_per_trial: usize,
    pub validation_split: f32,
    pub batch_size: Option<usize>,
}

impl Default for HyperbandSearchOptions {
    fn default() -> Self {
        Self {
            objective: Objective::default(),
            max_epochs: 10,
            factor: 2,
            hyperband_iterations: 3,
            executions_per_trial: 3,
            validation_split: 0.2,
            batch_size: None,
        }
    }
}

/// Builds and runs a tuner for the configured network family
///
/// # Example
///
/// ```ignore
/// let config = SearchConfiguration::from_yaml_file("search.yaml")?;
/// let tuner = SearchDriver::new(config)?
///     .with_project("tuning", "dense")
///     .random_search(&dataset, &RandomSearchOptions::default())?;
/// println!("{}", tuner.results_summary(5));
/// ```
pub struct SearchDriver<F = CpuFitter> {
    config: SearchConfiguration,
    fitter: F,
    logger: Option<Box<dyn TrialLogger>>,
    project: Option<(PathBuf, String)>,
}

impl SearchDriver<CpuFitter> {
    /// Driver training with the CPU fitter
    pub fn new(config: SearchConfiguration) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, fitter: CpuFitter::new(), logger: None, project: None })
    }
}

impl<F: ModelFitter> SearchDriver<F> {
    /// Swap the model-training collaborator
    pub fn with_fitter<G: ModelFitter>(self, fitter: G) -> SearchDriver<G> {
        SearchDriver { config: self.config, fitter, logger: self.logger, project: self.project }
    }

    pub fn with_logger(mut self, logger: Box<dyn TrialLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_project(mut self, directory: impl Into<PathBuf>, project_name: &str) -> Self {
        self.project = Some((directory.into(), project_name.to_string()));
        self
    }

    pub fn config(&self) -> &SearchConfiguration {
        &self.config
    }

    pub fn random_search(
        self,
        data: &Dataset,
        options: &RandomSearchOptions,
    ) -> Result<Tuner<RandomSearchOracle, SearchExecutor<F>>> {
        let oracle =
            RandomSearchOracle::new(options.objective.clone(), options.max_trials, self.config.seed);
        let args = fit_args(options.epochs, options.validation_split, options.batch_size);
        self.run(oracle, options.executions_per_trial, args, data)
    }

    pub fn bayesian_search(
        self,
        data: &Dataset,
        options: &BayesianSearchOptions,
    ) -> Result<Tuner<BayesianOptimizationOracle, SearchExecutor<F>>> {
        let mut oracle = BayesianOptimizationOracle::new(
            options.objective.clone(),
            options.max_trials,
            self.config.seed,
        )
        .with_alpha(options.alpha)
        .with_beta(options.beta);
        if let Some(n) = options.num_initial_points {
            oracle = oracle.with_num_initial_points(n);
        }
        let args = fit_args(options.epochs, options.validation_split, options.batch_size);
        self.run(oracle, options.executions_per_trial, args, data)
    }

    pub fn hyperband_search(
        self,
        data: &Dataset,
        options: &HyperbandSearchOptions,
    ) -> Result<Tuner<HyperbandOracle, SearchExecutor<F>>> {
        let oracle = HyperbandOracle::new(
            options.objective.clone(),
            options.max_epochs,
            options.factor,
            self.config.seed,
        )
        .with_hyperband_iterations(options.hyperband_iterations);
        let args = fit_args(options.max_epochs, options.validation_split, options.batch_size);
        self.run(oracle, options.executions_per_trial, args, data)
    }

    fn run<O: Oracle>(
        self,
        oracle: O,
        executions_per_trial: usize,
        args: FitArgs,
        data: &Dataset,
    ) -> Result<Tuner<O, SearchExecutor<F>>> {
        info!(
            model = %self.config.model,
            oracle = oracle.name(),
            executions_per_trial,
            "starting search"
        );
        let hypermodel = hypermodel_for(self.config.clone())?;
        let executor = BaseExecutor::new(hypermodel, self.fitter, oracle.objective().clone())
            .with_executions_per_trial(executions_per_trial);
        let runner = TrialRunner::new(executor, BatchSizeSampler::new(self.config.batch_size));

        let mut tuner = Tuner::new(oracle, runner, args);
        if let Some(logger) = self.logger {
            tuner = tuner.with_logger(logger);
        }
        if let Some((directory, project_name)) = &self.project {
            tuner = tuner.with_project(directory, project_name);
        }
        tuner.search(data)?;
        Ok(tuner)
    }
}

fn fit_args(epochs: usize, validation_split: f32, batch_size: Option<usize>) -> FitArgs {
    FitArgs { epochs, batch_size, validation_split, shuffle: true }
}
