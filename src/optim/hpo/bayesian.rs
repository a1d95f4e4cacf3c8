//! Bayesian optimization oracle (GP-UCB)
//!
//! Random trials until `num_initial_points` are scored, then a Gaussian
//! process is fitted to the scored trials and the candidate minimizing the
//! lower confidence bound `mean - beta * std` is proposed.

use tracing::debug;

use super::error::Result;
use super::gaussian_process::GaussianProcess;
use super::oracle::{Oracle, TrialLedger};
use super::random::MAX_COLLISIONS;
use super::types::{HyperparameterSpace, Objective, ParameterMap, Trial};

/// Random candidates scored per proposal
const NUM_CANDIDATES: usize = 500;

/// Gaussian-process guided search
#[derive(Debug, Clone)]
pub struct BayesianOptimizationOracle {
    ledger: TrialLedger,
    max_trials: usize,
    num_initial_points: Option<usize>,
    alpha: f64,
    beta: f64,
}

impl BayesianOptimizationOracle {
    pub fn new(objective: Objective, max_trials: usize, seed: Option<u64>) -> Self {
        Self {
            ledger: TrialLedger::new(objective, seed),
            max_trials,
            num_initial_points: None,
            alpha: 2.5e-4,
            beta: 2.75,
        }
    }

    /// Random trials before the surrogate is used (default: 3 per parameter)
    pub fn with_num_initial_points(mut self, n: usize) -> Self {
        self.num_initial_points = Some(n);
        self
    }

    /// Observation noise added to the kernel diagonal
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Exploration weight on the posterior standard deviation
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn num_initial_points(&self) -> usize {
        self.num_initial_points.unwrap_or(3 * self.ledger.space.len()).max(1)
    }

    fn propose(&mut self) -> Result<Option<ParameterMap>> {
        let scored: Vec<&Trial> = self.ledger.trials.iter().filter(|t| t.is_scored()).collect();
        if scored.len() < self.num_initial_points() {
            return Ok(self.ledger.sample_unique(MAX_COLLISIONS));
        }

        let objective = &self.ledger.objective;
        let space = &self.ledger.space;
        let x: Vec<Vec<f64>> =
            scored.iter().map(|t| space.encode(t.hyperparameters.values())).collect();
        let y: Vec<f64> =
            scored.iter().map(|t| objective.as_loss(t.score.unwrap_or(f64::NAN))).collect();
        let gp = GaussianProcess::fit(x, &y, self.alpha)?;

        let mut best: Option<(f64, ParameterMap)> = None;
        for _ in 0..NUM_CANDIDATES {
            let candidate = self.ledger.space.sample_random(&mut self.ledger.rng);
            if self.ledger.seen(&candidate) {
                continue;
            }
            let (mean, std) = gp.predict(&self.ledger.space.encode(&candidate));
            let lcb = mean - self.beta * std;
            if best.as_ref().map_or(true, |(b, _)| lcb < *b) {
                best = Some((lcb, candidate));
            }
        }

        match best {
            Some((lcb, values)) => {
                debug!(acquisition = lcb, "bayesian oracle proposal");
                Ok(Some(values))
            }
            None => Ok(self.ledger.sample_unique(MAX_COLLISIONS)),
        }
    }
}

impl Oracle for BayesianOptimizationOracle {
    fn name(&self) -> &'static str {
        "bayesian"
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
        Ok(self.propose()?.map(|values| self.ledger.open(values, None)))
    }

    fn end_trial(&mut self, trial: Trial) -> Result<()> {
        self.ledger.close(trial)
    }

    fn trials(&self) -> &[Trial] {
        &self.ledger.trials
    }
}
