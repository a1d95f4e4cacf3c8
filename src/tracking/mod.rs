//! Experiment tracking for hyperparameter searches
//!
//! Every search trial becomes a [`Run`] under a named experiment: its sampled
//! hyperparameters, its per-epoch training history and the objective score it
//! reached. Runs are persisted through a pluggable
//! [`TrackingBackend`](storage::TrackingBackend).
//!
//! # Architecture
//!
//! - **`ExperimentTracker`**: Top-level handle that manages runs for a named experiment
//! - **`Run`**: One trial with hyperparameters, epoch metrics and a score
//! - **`TrackingBackend`**: Pluggable persistence (JSON files, in-memory)
//!
//! # Example
//!
//! ```
//! use afinar::tracking::{ExperimentTracker, RunStatus};
//! use afinar::tracking::storage::InMemoryBackend;
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let mut tracker = ExperimentTracker::new("dense-search", InMemoryBackend::new());
//! tracker.add_tag("strategy", "random");
//!
//! let run_id = tracker.start_run(Some("trial-0"))?;
//! tracker.log_param(&run_id, "learning_rate", "0.001")?;
//! tracker.log_metric(&run_id, "val_loss", 0.5, 0)?;
//! tracker.log_metric(&run_id, "val_loss", 0.3, 1)?;
//! tracker.set_score(&run_id, 0.3)?;
//! tracker.end_run(&run_id, RunStatus::Completed)?;
//!
//! let run = tracker.get_run(&run_id)?;
//! assert_eq!(run.score, Some(0.3));
//! assert_eq!(tracker.list_runs()?.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod storage;


use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::optim::hpo::{Objective, ParameterMap, TrialStatus};
use crate::train::History;
use storage::{TrackingBackend, TrackingStorageError};

/// Status of a tracked run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Run is actively recording
    Active,
    /// Trial completed with a score
    Completed,
    /// Trial failed
    Failed,
    /// Search stopped before the trial finished
    Cancelled,
}

impl From<TrialStatus> for RunStatus {
    fn from(status: TrialStatus) -> Self {
        match status {
            TrialStatus::Pending | TrialStatus::Running => RunStatus::Active,
            TrialStatus::Completed => RunStatus::Completed,
            TrialStatus::Failed => RunStatus::Failed,
        }
    }
}

/// One metric observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub value: f64,
    pub step: u64,
}

/// A single tracked trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_name: Option<String>,
    pub experiment_name: String,
    pub status: RunStatus,
    /// Hyperparameters, string-encoded
    pub params: BTreeMap<String, String>,
    /// Metric name -> observations in logging order
    pub metrics: BTreeMap<String, Vec<MetricPoint>>,
    /// Objective value the trial reached
    pub score: Option<f64>,
    pub tags: BTreeMap<String, String>,
    /// Unix timestamp (ms) when the run started
    pub start_time_ms: Option<u64>,
    /// Unix timestamp (ms) when the run ended
    pub end_time_ms: Option<u64>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl Run {
    fn new(run_id: String, run_name: Option<String>, experiment_name: String) -> Self {
        Self {
            run_id,
            run_name,
            experiment_name,
            status: RunStatus::Active,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            score: None,
            tags: BTreeMap::new(),
            start_time_ms: Some(now_ms()),
            end_time_ms: None,
        }
    }

    /// Last logged value of a metric
    pub fn last_metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).and_then(|points| points.last()).map(|p| p.value)
    }
}

/// Errors from experiment tracking operations
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Run is not active: {0}")]
    RunNotActive(String),

    #[error("Storage error: {0}")]
    Storage(#[from] TrackingStorageError),
}

/// Result alias for tracking operations
pub type Result<T> = std::result::Result<T, TrackingError>;

/// Experiment tracker
///
/// Manages the runs of one search under a single experiment name. Active runs
/// live in memory; ending a run persists it through the backend.
#[derive(Debug)]
pub struct ExperimentTracker<B: TrackingBackend> {
    experiment_name: String,
    tags: BTreeMap<String, String>,
    backend: B,
    active_runs: BTreeMap<String, Run>,
    next_run_id: u64,
}

impl<B: TrackingBackend> ExperimentTracker<B> {
    pub fn new(experiment_name: impl Into<String>, backend: B) -> Self {
        Self {
            experiment_name: experiment_name.into(),
            tags: BTreeMap::new(),
            backend,
            active_runs: BTreeMap::new(),
            next_run_id: 1,
        }
    }

    /// Add an experiment-level tag, inherited by runs started afterwards
    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    #[must_use]
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Start a new run, optionally with a human-readable name
    ///
    /// Returns the run ID.
    pub fn start_run(&mut self, run_name: Option<&str>) -> Result<String> {
        let run_id = format!("run-{:04}", self.next_run_id);
        self.next_run_id += 1;

        let mut run =
            Run::new(run_id.clone(), run_name.map(String::from), self.experiment_name.clone());
        run.tags.extend(self.tags.iter().map(|(k, v)| (k.clone(), v.clone())));

        self.active_runs.insert(run_id.clone(), run);
        Ok(run_id)
    }

    /// End a run with the given status, persisting it to the backend
    pub fn end_run(&mut self, run_id: &str, status: RunStatus) -> Result<()> {
        let mut run = self
            .active_runs
            .remove(run_id)
            .ok_or_else(|| TrackingError::RunNotFound(run_id.to_string()))?;

        run.status = status;
        run.end_time_ms = Some(now_ms());

        self.backend.save_run(&run)?;
        Ok(())
    }

    fn active(&mut self, run_id: &str) -> Result<&mut Run> {
        self.active_runs
            .get_mut(run_id)
            .ok_or_else(|| TrackingError::RunNotActive(run_id.to_string()))
    }

    pub fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.active(run_id)?.params.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Log a trial's hyperparameter assignment
    pub fn log_hyperparameters(&mut self, run_id: &str, values: &ParameterMap) -> Result<()> {
        let run = self.active(run_id)?;
        for (name, value) in values {
            run.params.insert(name.clone(), value.to_string());
        }
        Ok(())
    }

    /// Log a metric value at a given step
    pub fn log_metric(&mut self, run_id: &str, key: &str, value: f64, step: u64) -> Result<()> {
        self.active(run_id)?
            .metrics
            .entry(key.to_string())
            .or_default()
            .push(MetricPoint { value, step });
        Ok(())
    }

    /// Log every series of a training history, one step per epoch
    ///
    /// Steps continue after any points already logged for the same key, so
    /// several executions of one trial append rather than overwrite.
    pub fn log_history(&mut self, run_id: &str, history: &History) -> Result<()> {
        let run = self.active(run_id)?;
        for name in history.names() {
            let points = run.metrics.entry(name.to_string()).or_default();
            let offset = points.len() as u64;
            let series = history.get(name).unwrap_or_default();
            points.extend(
                series
                    .iter()
                    .enumerate()
                    .map(|(epoch, value)| MetricPoint { value: *value, step: offset + epoch as u64 }),
            );
        }
        Ok(())
    }

    pub fn set_score(&mut self, run_id: &str, score: f64) -> Result<()> {
        self.active(run_id)?.score = Some(score);
        Ok(())
    }

    /// Retrieve a run by ID
    ///
    /// Checks active (in-memory) runs first, then falls back to the backend.
    pub fn get_run(&self, run_id: &str) -> Result<Run> {
        if let Some(run) = self.active_runs.get(run_id) {
            return Ok(run.clone());
        }
        self.backend
            .load_run(run_id)
            .map_err(|e| TrackingError::RunNotFound(format!("{run_id}: {e}")))
    }

    /// List all runs (active + persisted), sorted by ID
    pub fn list_runs(&self) -> Result<Vec<Run>> {
        let mut runs: Vec<Run> = self.active_runs.values().cloned().collect();
        for run in self.backend.list_runs()? {
            if !self.active_runs.contains_key(&run.run_id) {
                runs.push(run);
            }
        }
        runs.sort_by(|a, b| a.run_id.cmp(&b.run_id));
        Ok(runs)
    }

    /// Completed run with the best score under `objective`
    pub fn best_run(&self, objective: &Objective) -> Result<Option<Run>> {
        Ok(self
            .list_runs()?
            .into_iter()
            .filter(|r| r.status == RunStatus::Completed)
            .filter_map(|r| r.score.filter(|s| s.is_finite()).map(|s| (s, r)))
            .min_by(|(a, _), (b, _)| objective.compare(*a, *b))
            .map(|(_, run)| run))
    }
}
