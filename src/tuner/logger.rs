//! Search event hooks

use std::collections::BTreeMap;

use tracing::debug;

use super::runner::TrialOutcome;
use crate::error::Result;
use crate::optim::hpo::{Objective, Trial};
use crate::tracking::storage::TrackingBackend;
use crate::tracking::{ExperimentTracker, RunStatus};

/// Receives search and trial events from a tuner
///
/// A failing logger is reported with `warn!` and never stops the search.
pub trait TrialLogger {
    fn on_search_begin(&mut self, _oracle: &str, _objective: &Objective) -> Result<()> {
        Ok(())
    }

    fn on_trial_begin(&mut self, trial: &Trial) -> Result<()>;

    /// `outcome` is `None` for a failed trial
    fn on_trial_end(&mut self, trial: &Trial, outcome: Option<&TrialOutcome>) -> Result<()>;

    fn on_search_end(&mut self, _best: Option<&Trial>) -> Result<()> {
        Ok(())
    }
}

/// Records every trial as a run of an [`ExperimentTracker`]
#[derive(Debug)]
pub struct TrackingLogger<B: TrackingBackend> {
    tracker: ExperimentTracker<B>,
    runs: BTreeMap<usize, String>,
}

impl<B: TrackingBackend> TrackingLogger<B> {
    pub fn new(tracker: ExperimentTracker<B>) -> Self {
        Self { tracker, runs: BTreeMap::new() }
    }

    pub fn tracker(&self) -> &ExperimentTracker<B> {
        &self.tracker
    }

    /// Run ID assigned to a trial
    pub fn run_id(&self, trial_id: usize) -> Option<&str> {
        self.runs.get(&trial_id).map(String::as_str)
    }
}

impl<B: TrackingBackend> TrialLogger for TrackingLogger<B> {
    fn on_search_begin(&mut self, oracle: &str, objective: &Objective) -> Result<()> {
        self.tracker.add_tag("oracle", oracle);
        self.tracker.add_tag("objective", objective.to_string());
        Ok(())
    }

    fn on_trial_begin(&mut self, trial: &Trial) -> Result<()> {
        let run_id = self.tracker.start_run(Some(&format!("trial-{}", trial.id)))?;
        self.tracker.log_param(&run_id, "seed", &trial.seed.to_string())?;
        if let Some(budget) = trial.budget {
            self.tracker.log_param(&run_id, "budget_epochs", &budget.epochs.to_string())?;
            self.tracker.log_param(&run_id, "bracket", &budget.bracket.to_string())?;
            self.tracker.log_param(&run_id, "round", &budget.round.to_string())?;
        }
        debug!(trial = trial.id, run = %run_id, "tracking run started");
        self.runs.insert(trial.id, run_id);
        Ok(())
    }

    fn on_trial_end(&mut self, trial: &Trial, outcome: Option<&TrialOutcome>) -> Result<()> {
        let Some(run_id) = self.runs.get(&trial.id).cloned() else {
            return Ok(());
        };
        // Values sampled during the trial (e.g. batch_size) only exist now
        self.tracker.log_hyperparameters(&run_id, trial.hyperparameters.values())?;
        if let Some(outcome) = outcome {
            for history in &outcome.histories {
                self.tracker.log_history(&run_id, history)?;
            }
            self.tracker.set_score(&run_id, outcome.score)?;
        }
        self.tracker.end_run(&run_id, RunStatus::from(trial.status))?;
        Ok(())
    }

    fn on_search_end(&mut self, best: Option<&Trial>) -> Result<()> {
        if let Some(best) = best {
            debug!(trial = best.id, run = ?self.run_id(best.id), "best tracked run");
        }
        Ok(())
    }
}
