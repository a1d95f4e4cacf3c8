//! Search controller

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use super::logger::TrialLogger;
use super::runner::{FitArgs, TrialExecutor};
use crate::error::{Error, Result};
use crate::model::CompiledModel;
use crate::optim::hpo::{HyperParameters, Objective, Oracle, Trial, TrialStatus};
use crate::params::ParameterSet;
use crate::train::Dataset;

/// Trials persisted to `trials.json`
#[derive(Serialize)]
struct TrialsFile<'a> {
    oracle: &'a str,
    objective: &'a Objective,
    trials: &'a [Trial],
}

/// Drives an oracle and a trial executor through a search
///
/// # Example
///
/// ```ignore
/// let executor = BaseExecutor::new(hypermodel, CpuFitter::new(), objective.clone());
/// let runner = TrialRunner::new(executor, BatchSizeSampler::default());
/// let oracle = RandomSearchOracle::new(objective, 20, Some(0));
/// let mut tuner = Tuner::new(oracle, runner, FitArgs::new(10, 0.2));
/// tuner.search(&dataset)?;
/// let best = tuner.best_parameter_set()?;
/// ```
pub struct Tuner<O, E> {
    oracle: O,
    executor: E,
    args: FitArgs,
    loggers: Vec<Box<dyn TrialLogger>>,
    project_dir: Option<PathBuf>,
    max_consecutive_failed_trials: usize,
}

impl<O: Oracle, E: TrialExecutor> Tuner<O, E> {
    pub fn new(oracle: O, executor: E, args: FitArgs) -> Self {
        Self {
            oracle,
            executor,
            args,
            loggers: Vec::new(),
            project_dir: None,
            max_consecutive_failed_trials: 3,
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn TrialLogger>) -> Self {
        self.loggers.push(logger);
        self
    }

    /// Write `trials.json` under `directory/project_name` after the search
    pub fn with_project(mut self, directory: impl AsRef<Path>, project_name: &str) -> Self {
        self.project_dir = Some(directory.as_ref().join(project_name));
        self
    }

    pub fn with_max_consecutive_failed_trials(mut self, n: usize) -> Self {
        self.max_consecutive_failed_trials = n.max(1);
        self
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn args(&self) -> &FitArgs {
        &self.args
    }

    pub fn project_dir(&self) -> Option<&Path> {
        self.project_dir.as_deref()
    }

    /// Register the full search space with the oracle without training
    pub fn populate_space(&mut self) -> Result<()> {
        let mut probe = Trial::new(0, HyperParameters::new(), 0);
        self.executor.declare_space(&mut probe, &self.args)?;
        self.oracle.update_space(probe.hyperparameters.space());
        Ok(())
    }

    /// Run trials until the oracle is exhausted
    ///
    /// A failed trial is recorded and the search moves on. After
    /// `max_consecutive_failed_trials` failures in a row the search stops
    /// with the last error.
    pub fn search(&mut self, data: &Dataset) -> Result<()> {
        self.populate_space()?;
        info!(
            oracle = self.oracle.name(),
            objective = %self.oracle.objective(),
            parameters = self.oracle.space().len(),
            "search begin"
        );
        let (name, objective) = (self.oracle.name(), self.oracle.objective().clone());
        notify(&mut self.loggers, |l| l.on_search_begin(name, &objective));

        let mut consecutive_failures = 0;
        while let Some(mut trial) = self.oracle.create_trial()? {
            info!(trial = trial.id, budget = ?trial.budget, "trial begin");
            notify(&mut self.loggers, |l| l.on_trial_begin(&trial));

            match self.executor.run_trial(&mut trial, data, &self.args) {
                Ok(outcome) => {
                    consecutive_failures = 0;
                    trial.complete(outcome.score, outcome.epochs);
                    info!(trial = trial.id, score = outcome.score, "trial end");
                    notify(&mut self.loggers, |l| l.on_trial_end(&trial, Some(&outcome)));
                    self.oracle.end_trial(trial)?;
                }
                Err(err) => {
                    consecutive_failures += 1;
                    trial.fail();
                    warn!(trial = trial.id, error = %err, consecutive_failures, "trial failed");
                    notify(&mut self.loggers, |l| l.on_trial_end(&trial, None));
                    self.oracle.end_trial(trial)?;
                    if consecutive_failures >= self.max_consecutive_failed_trials {
                        self.save()?;
                        return Err(err);
                    }
                }
            }
        }

        let best = self.oracle.best_trials(1).into_iter().next();
        info!(
            trials = self.oracle.trials().len(),
            best_trial = best.map(|t| t.id),
            best_score = best.and_then(|t| t.score),
            "search end"
        );
        notify(&mut self.loggers, |l| l.on_search_end(best));
        self.save()
    }

    /// Write `trials.json` when a project directory is set
    pub fn save(&self) -> Result<()> {
        let Some(dir) = &self.project_dir else {
            return Ok(());
        };
        fs::create_dir_all(dir)?;
        let file = TrialsFile {
            oracle: self.oracle.name(),
            objective: self.oracle.objective(),
            trials: self.oracle.trials(),
        };
        fs::write(dir.join("trials.json"), serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    pub fn trials(&self) -> &[Trial] {
        self.oracle.trials()
    }

    /// Top `n` completed trials, best first
    pub fn best_trials(&self, n: usize) -> Vec<&Trial> {
        self.oracle.best_trials(n)
    }

    pub fn best_hyperparameters(&self, n: usize) -> Vec<&HyperParameters> {
        self.best_trials(n).into_iter().map(|t| &t.hyperparameters).collect()
    }

    /// Untrained model of the best trial, rebuilt with its seed
    pub fn best_model(&self) -> Result<Option<CompiledModel>> {
        self.best_trials(1).first().map(|t| self.executor.build_model(t)).transpose()
    }

    /// Parameter set of the best trial annotated with its score
    pub fn best_parameter_set(&self) -> Result<Option<ParameterSet>> {
        let Some(best) = self.best_trials(1).into_iter().next() else {
            return Ok(None);
        };
        let score = best.score.ok_or_else(|| Error::Training("best trial has no score".into()))?;
        let model = self.executor.build_model(best)?;
        Ok(Some(model.params.with_result(self.oracle.objective().name.clone(), score)))
    }

    /// Human-readable ranking of the top `n` trials
    pub fn results_summary(&self, n: usize) -> String {
        let completed =
            self.trials().iter().filter(|t| t.status == TrialStatus::Completed).count();
        let failed = self.trials().iter().filter(|t| t.status == TrialStatus::Failed).count();

        let mut out = String::from("Results summary\n");
        let _ = writeln!(out, "Oracle: {}", self.oracle.name());
        let _ = writeln!(out, "Objective: {}", self.oracle.objective());
        let _ = writeln!(out, "Trials: {completed} completed, {failed} failed");
        for (rank, trial) in self.best_trials(n).into_iter().enumerate() {
            let _ = writeln!(
                out,
                "#{} trial {} score {:.6} epochs {}",
                rank + 1,
                trial.id,
                trial.score.unwrap_or(f64::NAN),
                trial.iterations
            );
            for (name, value) in trial.hyperparameters.values() {
                let _ = writeln!(out, "    {name}: {value}");
            }
        }
        out
    }
}

fn notify(
    loggers: &mut [Box<dyn TrialLogger>],
    mut event: impl FnMut(&mut dyn TrialLogger) -> Result<()>,
) {
    for logger in loggers {
        if let Err(err) = event(logger.as_mut()) {
            warn!(error = %err, "trial logger failed");
        }
    }
}
