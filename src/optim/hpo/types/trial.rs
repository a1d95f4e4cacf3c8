//! Trial types for HPO

use serde::{Deserialize, Serialize};

use super::hyperparameters::HyperParameters;

/// Epoch budget assigned by a multi-fidelity oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBudget {
    /// Training epochs for this trial
    pub epochs: usize,
    /// Bracket index `s`
    pub bracket: usize,
    /// Successive-halving round within the bracket
    pub round: usize,
}

/// A single trial (configuration + score)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trial {
    /// Trial ID
    pub id: usize,
    /// Parameter configuration and the domains seen while building it
    pub hyperparameters: HyperParameters,
    /// Objective score, set once completed
    pub score: Option<f64>,
    /// Number of epochs/iterations used
    pub iterations: usize,
    /// Trial status
    pub status: TrialStatus,
    /// Hyperband budget, if any
    pub budget: Option<TrialBudget>,
    /// Seed for weight init, shuffling and dropout
    pub seed: u64,
}

impl Trial {
    /// Create a new trial
    pub fn new(id: usize, hyperparameters: HyperParameters, seed: u64) -> Self {
        Self {
            id,
            hyperparameters,
            score: None,
            iterations: 0,
            status: TrialStatus::Pending,
            budget: None,
            seed,
        }
    }

    pub fn with_budget(mut self, budget: TrialBudget) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Mark trial as running
    pub fn start(&mut self) {
        self.status = TrialStatus::Running;
    }

    /// Mark trial as complete with score
    pub fn complete(&mut self, score: f64, iterations: usize) {
        self.score = Some(score);
        self.iterations = iterations;
        self.status = TrialStatus::Completed;
    }

    /// Mark trial as failed
    pub fn fail(&mut self) {
        self.status = TrialStatus::Failed;
    }

    /// Completed with a finite score
    pub fn is_scored(&self) -> bool {
        self.status == TrialStatus::Completed && self.score.is_some_and(f64::is_finite)
    }
}

/// Trial status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialStatus {
    Pending,
    Running,
    Completed,
    Failed,
}
