//! Base trial executor: build, fit, score

use tracing::debug;

use super::runner::{FitArgs, TrialExecutor, TrialOutcome};
use crate::error::{Error, Result};
use crate::hypermodel::HyperModel;
use crate::model::CompiledModel;
use crate::optim::hpo::{Objective, Trial};
use crate::train::{Dataset, History, ModelFitter};

/// Builds the trial's model through a hypermodel and fits it
///
/// Each of the `executions_per_trial` executions builds a fresh model with
/// its own seed (trial seed plus execution index) and contributes the best
/// objective value of its history. The trial score is their mean.
#[derive(Debug, Clone)]
pub struct BaseExecutor<H, F> {
    hypermodel: H,
    fitter: F,
    objective: Objective,
    executions_per_trial: usize,
}

impl<H: HyperModel, F: ModelFitter> BaseExecutor<H, F> {
    pub fn new(hypermodel: H, fitter: F, objective: Objective) -> Self {
        Self { hypermodel, fitter, objective, executions_per_trial: 1 }
    }

    pub fn with_executions_per_trial(mut self, executions: usize) -> Self {
        self.executions_per_trial = executions.max(1);
        self
    }

    pub fn hypermodel(&self) -> &H {
        &self.hypermodel
    }

    pub fn fitter(&self) -> &F {
        &self.fitter
    }

    pub fn executions_per_trial(&self) -> usize {
        self.executions_per_trial
    }

    fn best_value(&self, history: &History) -> Result<f64> {
        let series = history.get(&self.objective.name).ok_or_else(|| {
            Error::Training(format!(
                "objective '{}' missing from history (have: {})",
                self.objective.name,
                history.names().collect::<Vec<_>>().join(", ")
            ))
        })?;
        self.objective.best_of(series).ok_or_else(|| {
            Error::Training(format!("objective '{}' has no finite value", self.objective.name))
        })
    }
}

impl<H: HyperModel, F: ModelFitter> TrialExecutor for BaseExecutor<H, F> {
    fn declare_space(&mut self, trial: &mut Trial, _args: &FitArgs) -> Result<()> {
        self.hypermodel.build(&mut trial.hyperparameters, trial.seed).map(|_| ())
    }

    fn run_trial(
        &mut self,
        trial: &mut Trial,
        data: &Dataset,
        args: &FitArgs,
    ) -> Result<TrialOutcome> {
        let options = args.fit_options(trial.budget.map(|b| b.epochs));
        let mut scores = Vec::with_capacity(self.executions_per_trial);
        let mut histories = Vec::with_capacity(self.executions_per_trial);

        for execution in 0..self.executions_per_trial {
            let seed = trial.seed.wrapping_add(execution as u64);
            let model = self.hypermodel.build(&mut trial.hyperparameters, seed)?;
            let history = self.fitter.fit(&model, data, &options)?;
            let best = self.best_value(&history)?;
            debug!(trial = trial.id, execution, best, "execution finished");
            scores.push(best);
            histories.push(history);
        }

        let score = scores.iter().sum::<f64>() / scores.len().max(1) as f64;
        Ok(TrialOutcome { score, epochs: options.epochs, histories })
    }

    fn build_model(&self, trial: &Trial) -> Result<CompiledModel> {
        let mut hp = trial.hyperparameters.clone();
        self.hypermodel.build(&mut hp, trial.seed)
    }
}
