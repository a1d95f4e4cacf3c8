//! Hyperband scheduler and oracle
//!
//! Based on Li et al. (2018) - Hyperband: A Novel Bandit-Based Approach

use std::collections::VecDeque;

use tracing::debug;

use super::error::{HPOError, Result};
use super::oracle::{Oracle, TrialLedger};
use super::random::MAX_COLLISIONS;
use super::types::{
    HyperparameterSpace, Objective, ParameterMap, Trial, TrialBudget, TrialStatus,
};

/// Bracket arithmetic for Hyperband
///
/// # Toyota Way: Muda (Waste Elimination)
///
/// Aggressive early stopping eliminates poorly performing configurations,
/// focusing resources on promising candidates.
#[derive(Debug, Clone)]
pub struct HyperbandScheduler {
    /// Maximum iterations per configuration
    pub(crate) max_iter: usize,
    /// Reduction factor
    pub(crate) eta: f64,
}

impl HyperbandScheduler {
    pub fn new(max_iter: usize) -> Self {
        Self { max_iter: max_iter.max(1), eta: 3.0 }
    }

    /// Set reduction factor
    pub fn with_eta(mut self, eta: f64) -> Self {
        self.eta = eta.max(2.0);
        self
    }

    /// Get s_max (number of successive halving brackets)
    pub fn s_max(&self) -> usize {
        (self.max_iter as f64).log(self.eta).floor() as usize
    }

    /// Get total budget B
    pub fn budget(&self) -> usize {
        (self.s_max() + 1) * self.max_iter
    }

    /// Rungs of bracket `s`
    ///
    /// Returns Vec of (n_configs, n_iterations) for each rung in the bracket.
    /// Rung `i` trains for `ceil(max_iter / eta^(s - i))` iterations, so the
    /// last rung of every bracket trains for the full `max_iter`.
    pub fn bracket(&self, s: usize) -> Vec<(usize, usize)> {
        let s_max = self.s_max();
        if s > s_max {
            return Vec::new();
        }

        let n = ((self.budget() as f64 / self.max_iter as f64)
            * (self.eta.powi(s as i32) / (s + 1) as f64))
            .ceil() as usize;

        (0..=s)
            .map(|i| {
                let n_i = (n as f64 / self.eta.powi(i as i32)).floor() as usize;
                let r_i = (self.max_iter as f64 / self.eta.powi((s - i) as i32)).ceil() as usize;
                (n_i.max(1), r_i.clamp(1, self.max_iter))
            })
            .collect()
    }
}

/// Progress through one bracket
#[derive(Debug, Clone)]
struct BracketState {
    s: usize,
    rungs: Vec<(usize, usize)>,
    round: usize,
    /// Fresh configurations still to sample (round 0 only)
    to_sample: usize,
    /// Configurations promoted into the current round, not yet issued
    promoted: VecDeque<ParameterMap>,
    /// Trial ids issued in the current round
    issued: Vec<usize>,
}

/// Multi-fidelity oracle running successive halving over Hyperband brackets
///
/// Brackets run from most aggressive (`s_max`) to plain full-budget
/// training (`s = 0`), repeated `hyperband_iterations` times. Promoted
/// configurations are retrained from scratch with the larger epoch budget.
#[derive(Debug, Clone)]
pub struct HyperbandOracle {
    ledger: TrialLedger,
    scheduler: HyperbandScheduler,
    hyperband_iterations: usize,
    brackets_started: usize,
    current: Option<BracketState>,
}

impl HyperbandOracle {
    pub fn new(objective: Objective, max_epochs: usize, factor: usize, seed: Option<u64>) -> Self {
        Self {
            ledger: TrialLedger::new(objective, seed),
            scheduler: HyperbandScheduler::new(max_epochs).with_eta(factor as f64),
            hyperband_iterations: 1,
            brackets_started: 0,
            current: None,
        }
    }

    pub fn with_hyperband_iterations(mut self, iterations: usize) -> Self {
        self.hyperband_iterations = iterations.max(1);
        self
    }

    pub fn scheduler(&self) -> &HyperbandScheduler {
        &self.scheduler
    }

    fn start_next_bracket(&mut self) -> bool {
        let per_iteration = self.scheduler.s_max() + 1;
        if self.brackets_started >= per_iteration * self.hyperband_iterations {
            return false;
        }
        let s = self.scheduler.s_max() - self.brackets_started % per_iteration;
        self.brackets_started += 1;

        let rungs = self.scheduler.bracket(s);
        let to_sample = rungs.first().map_or(0, |(n, _)| *n);
        debug!(bracket = s, configs = to_sample, "hyperband bracket start");
        self.current = Some(BracketState {
            s,
            rungs,
            round: 0,
            to_sample,
            promoted: VecDeque::new(),
            issued: Vec::new(),
        });
        true
    }

    /// Best `n` completed configurations of the given trial ids
    fn top_configs(&self, ids: &[usize], n: usize) -> VecDeque<ParameterMap> {
        let objective = &self.ledger.objective;
        let mut done: Vec<&Trial> = ids
            .iter()
            .filter_map(|id| self.ledger.trials.get(*id))
            .filter(|t| t.is_scored())
            .collect();
        done.sort_by(|a, b| {
            objective.compare(a.score.unwrap_or(f64::NAN), b.score.unwrap_or(f64::NAN))
        });
        done.into_iter().take(n).map(|t| t.hyperparameters.values().clone()).collect()
    }
}

impl Oracle for HyperbandOracle {
    fn name(&self) -> &'static str {
        "hyperband"
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
        loop {
            let Some(state) = self.current.as_mut() else {
                if !self.start_next_bracket() {
                    return Ok(None);
                }
                continue;
            };

            let epochs = state.rungs.get(state.round).map_or(1, |(_, r)| *r);
            let budget = TrialBudget { epochs, bracket: state.s, round: state.round };

            if state.to_sample > 0 {
                state.to_sample -= 1;
                if let Some(values) = self.ledger.sample_unique(MAX_COLLISIONS) {
                    let trial = self.ledger.open(values, Some(budget));
                    state.issued.push(trial.id);
                    return Ok(Some(trial));
                }
                // Space exhausted: stop sampling fresh configurations
                state.to_sample = 0;
                continue;
            }

            if let Some(values) = state.promoted.pop_front() {
                let trial = self.ledger.open(values, Some(budget));
                state.issued.push(trial.id);
                return Ok(Some(trial));
            }

            let running = state.issued.iter().any(|id| {
                self.ledger.trials.get(*id).is_some_and(|t| t.status == TrialStatus::Running)
            });
            if running {
                return Err(HPOError::Internal(
                    "hyperband round advanced while trials are still running".to_string(),
                ));
            }

            let next_round = state.round + 1;
            let Some(&(n_next, _)) = state.rungs.get(next_round) else {
                self.current = None;
                continue;
            };
            let issued = std::mem::take(&mut state.issued);
            let promoted = self.top_configs(&issued, n_next);
            match self.current.as_mut() {
                Some(state) if !promoted.is_empty() => {
                    state.round = next_round;
                    state.promoted = promoted;
                }
                _ => self.current = None,
            }
        }
    }

    fn end_trial(&mut self, trial: Trial) -> Result<()> {
        self.ledger.close(trial)
    }

    fn trials(&self) -> &[Trial] {
        &self.ledger.trials
    }
}
