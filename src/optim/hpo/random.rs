//! Random search oracle

use super::error::Result;
use super::oracle::{Oracle, TrialLedger};
use super::types::{HyperparameterSpace, Objective, Trial};

/// Consecutive duplicate samples tolerated before the space counts as exhausted
pub const MAX_COLLISIONS: usize = 20;

/// Independent uniform samples from the search space
#[derive(Debug, Clone)]
pub struct RandomSearchOracle {
    ledger: TrialLedger,
    max_trials: usize,
}

impl RandomSearchOracle {
    pub fn new(objective: Objective, max_trials: usize, seed: Option<u64>) -> Self {
        Self { ledger: TrialLedger::new(objective, seed), max_trials }
    }

    pub fn max_trials(&self) -> usize {
        self.max_trials
    }
}

impl Oracle for RandomSearchOracle {
    fn name(&self) -> &'static str {
        "random"
    }

    fn objective(&self) -> &Objective {
        &self.ledger.objective
    }

    fn space(&self) -> &HyperparameterSpace {
        &self.ledger.space
    }

    fn update_space(&mut self, space: &HyperparameterSpace) {
        self.ledger.space.merge(space);
    }

    fn create_trial(&mut self) -> Result<Option<Trial>> {
        if self.ledger.trials.len() >= self.max_trials {
            return Ok(None);
        }
        Ok(self.ledger.sample_unique(MAX_COLLISIONS).map(|values| self.ledger.open(values, None)))
    }

    fn end_trial(&mut self, trial: Trial) -> Result<()> {
        self.ledger.close(trial)
    }

    fn trials(&self) -> &[Trial] {
        &self.ledger.trials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::hpo::types::ParameterDomain;

    fn space() -> HyperparameterSpace {
        let mut space = HyperparameterSpace::new();
        space.add("layers", ParameterDomain::Int { min: 1, max: 3, step: 1 });
        space.add("lr", ParameterDomain::Choice { values: vec![1e-4.into(), 1e-3.into()] });
        space
    }

    #[test]
    fn test_random_respects_max_trials() {
        let mut oracle = RandomSearchOracle::new(Objective::default(), 4, Some(0));
        oracle.update_space(&space());

        let mut n = 0;
        while let Some(mut trial) = oracle.create_trial().unwrap() {
            trial.complete(n as f64, 1);
            oracle.end_trial(trial).unwrap();
            n += 1;
        }
        assert_eq!(n, 4);
        assert_eq!(oracle.trials().len(), 4);
    }

    #[test]
    fn test_random_stops_when_space_exhausted() {
        let mut oracle = RandomSearchOracle::new(Objective::default(), 100, Some(3));
        oracle.update_space(&space());

        let mut n = 0;
        while let Some(mut trial) = oracle.create_trial().unwrap() {
            trial.complete(0.0, 1);
            oracle.end_trial(trial).unwrap();
            n += 1;
        }
        // 3 layers x 2 learning rates
        assert!(n <= 6);
        assert!(n >= 1);
    }

    #[test]
    fn test_random_values_are_unique_and_valid() {
        let mut oracle = RandomSearchOracle::new(Objective::default(), 6, Some(11));
        let space = space();
        oracle.update_space(&space);

        let mut seen = Vec::new();
        while let Some(mut trial) = oracle.create_trial().unwrap() {
            let values = trial.hyperparameters.values().clone();
            assert!(space.validate(&values).is_ok());
            assert!(!seen.contains(&values));
            seen.push(values);
            trial.complete(1.0, 1);
            oracle.end_trial(trial).unwrap();
        }
    }

    #[test]
    fn test_random_best_trials_sorted() {
        let mut oracle = RandomSearchOracle::new(Objective::default(), 3, Some(5));
        oracle.update_space(&space());
        for score in [0.7, 0.2, 0.5] {
            let mut trial = oracle.create_trial().unwrap().unwrap();
            trial.complete(score, 1);
            oracle.end_trial(trial).unwrap();
        }
        let best: Vec<f64> = oracle.best_trials(2).iter().filter_map(|t| t.score).collect();
        assert_eq!(best, vec![0.2, 0.5]);
    }

    #[test]
    fn test_random_failed_trials_not_ranked() {
        let mut oracle = RandomSearchOracle::new(Objective::default(), 2, Some(5));
        oracle.update_space(&space());
        let mut trial = oracle.create_trial().unwrap().unwrap();
        trial.fail();
        oracle.end_trial(trial).unwrap();
        assert!(oracle.best_trials(1).is_empty());
    }
}
