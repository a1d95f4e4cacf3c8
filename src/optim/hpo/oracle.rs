//! Oracle contract shared by all search strategies

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::error::{HPOError, Result};
use super::types::{
    HyperParameters, HyperparameterSpace, Objective, ParameterMap, Trial, TrialBudget,
};

/// Proposes trials and learns from their results
///
/// Trials are run one at a time: each trial returned by
/// [`create_trial`](Oracle::create_trial) is handed back through
/// [`end_trial`](Oracle::end_trial) before the next one is requested.
pub trait Oracle {
    /// Strategy name for logs
    fn name(&self) -> &'static str;

    fn objective(&self) -> &Objective;

    fn space(&self) -> &HyperparameterSpace;

    /// Learn parameters registered by a hypermodel
    fn update_space(&mut self, space: &HyperparameterSpace);

    /// Next trial, or `None` once the budget or the space is exhausted
    fn create_trial(&mut self) -> Result<Option<Trial>>;

    /// Record a finished (completed or failed) trial
    fn end_trial(&mut self, trial: Trial) -> Result<()>;

    /// Every trial created so far, in creation order
    fn trials(&self) -> &[Trial];

    /// Top `n` scored trials, best first
    fn best_trials(&self, n: usize) -> Vec<&Trial> {
        let objective = self.objective();
        let mut scored: Vec<&Trial> = self.trials().iter().filter(|t| t.is_scored()).collect();
        scored.sort_by(|a, b| {
            objective.compare(a.score.unwrap_or(f64::NAN), b.score.unwrap_or(f64::NAN))
        });
        scored.truncate(n);
        scored
    }
}

/// Bookkeeping shared by the oracle implementations
#[derive(Debug, Clone)]
pub(crate) struct TrialLedger {
    pub(crate) objective: Objective,
    pub(crate) space: HyperparameterSpace,
    pub(crate) trials: Vec<Trial>,
    pub(crate) rng: StdRng,
}

impl TrialLedger {
    pub(crate) fn new(objective: Objective, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        Self { objective, space: HyperparameterSpace::new(), trials: Vec::new(), rng }
    }

    /// Register a new running trial and return a copy for the caller
    pub(crate) fn open(&mut self, values: ParameterMap, budget: Option<TrialBudget>) -> Trial {
        let seed = self.rng.random::<u64>();
        let hp = HyperParameters::from_values(self.space.clone(), values);
        let mut trial = Trial::new(self.trials.len(), hp, seed);
        trial.budget = budget;
        trial.start();
        self.trials.push(trial.clone());
        trial
    }

    /// Store the final state of a trial and learn its parameters
    pub(crate) fn close(&mut self, trial: Trial) -> Result<()> {
        let id = trial.id;
        let slot = self.trials.get_mut(id).ok_or(HPOError::UnknownTrial(id))?;
        self.space.merge(trial.hyperparameters.space());
        *slot = trial;
        Ok(())
    }

    /// Was this exact configuration already proposed
    pub(crate) fn seen(&self, values: &ParameterMap) -> bool {
        self.trials.iter().any(|t| t.hyperparameters.values() == values)
    }

    /// Sample a configuration not proposed before, giving up after `attempts`
    pub(crate) fn sample_unique(&mut self, attempts: usize) -> Option<ParameterMap> {
        for _ in 0..attempts.max(1) {
            let values = self.space.sample_random(&mut self.rng);
            if !self.seen(&values) {
                return Some(values);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::hpo::types::{ParameterDomain, TrialStatus};

    fn ledger() -> TrialLedger {
        let mut ledger = TrialLedger::new(Objective::default(), Some(1));
        ledger.space.add("x", ParameterDomain::Int { min: 0, max: 1, step: 1 });
        ledger
    }

    #[test]
    fn test_ledger_open_and_close() {
        let mut ledger = ledger();
        let values = ledger.sample_unique(10).unwrap();
        let mut trial = ledger.open(values, None);
        assert_eq!(trial.id, 0);
        assert_eq!(ledger.trials[0].status, TrialStatus::Running);

        trial.complete(0.3, 2);
        ledger.close(trial).unwrap();
        assert_eq!(ledger.trials[0].score, Some(0.3));
    }

    #[test]
    fn test_ledger_close_unknown_trial() {
        let mut ledger = ledger();
        let trial = Trial::new(5, HyperParameters::new(), 0);
        assert!(matches!(ledger.close(trial), Err(HPOError::UnknownTrial(5))));
    }

    #[test]
    fn test_ledger_exhausts_small_space() {
        let mut ledger = ledger();
        for _ in 0..2 {
            let values = ledger.sample_unique(50).unwrap();
            ledger.open(values, None);
        }
        assert!(ledger.sample_unique(50).is_none());
    }

    #[test]
    fn test_ledger_close_learns_space() {
        let mut ledger = ledger();
        let values = ledger.sample_unique(10).unwrap();
        let mut trial = ledger.open(values, None);
        trial.hyperparameters.int("batch_size", 64, 512, 64).unwrap();
        trial.complete(1.0, 1);
        ledger.close(trial).unwrap();
        assert!(ledger.space.contains("batch_size"));
    }
}
