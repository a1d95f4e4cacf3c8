//! Tuner tests driven by a scripted fitter

use std::cell::RefCell;
use std::rc::Rc;

use ndarray::{Array2, ArrayD, IxDyn};

use super::*;
use crate::config::{SearchConfiguration, StepRange};
use crate::error::{Error, Result};
use crate::hypermodel::{hypermodel_for, HyperModel};
use crate::model::CompiledModel;
use crate::optim::hpo::{
    HyperbandOracle, Objective, Oracle, ParameterValue, RandomSearchOracle, Trial, TrialStatus,
};
use crate::tracking::storage::InMemoryBackend;
use crate::tracking::{ExperimentTracker, RunStatus};
use crate::train::{Dataset, FitOptions, History, ModelFitter};

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
struct FitCall {
    epochs: usize,
    batch_size: usize,
    seed: u64,
    layers: usize,
}

/// Loss falls with the learning rate; never trains anything
#[derive(Debug, Default)]
struct ScriptedFitter {
    calls: Vec<FitCall>,
    fail_single_layer: bool,
    fail_always: bool,
}

impl ScriptedFitter {
    fn failing() -> Self {
        Self { fail_always: true, ..Self::default() }
    }
}

impl ModelFitter for ScriptedFitter {
    fn fit(
        &mut self,
        model: &CompiledModel,
        _data: &Dataset,
        options: &FitOptions,
    ) -> Result<History> {
        self.calls.push(FitCall {
            epochs: options.epochs,
            batch_size: options.batch_size,
            seed: model.seed,
            layers: model.params.layers(),
        });
        if self.fail_always || (self.fail_single_layer && model.params.layers() == 1) {
            return Err(Error::Training("loss is NaN".into()));
        }

        let base = 1.0 / f64::from(model.params.learning_rate()) / 1000.0;
        let mut history = History::new();
        for epoch in 0..options.epochs {
            let value = base + 1.0 / (epoch + 1) as f64;
            history.record("loss", value);
            history.record("root_mean_squared_error", value);
        }
        Ok(history)
    }
}

fn dataset() -> Dataset {
    let features = ArrayD::from_shape_fn(IxDyn(&[12, 3]), |idx| (idx[0] + idx[1]) as f32 * 0.1);
    let targets = Array2::from_shape_fn((12, 1), |(i, _)| i as f32 * 0.5);
    Dataset::new(features, targets).unwrap()
}

fn config() -> SearchConfiguration {
    SearchConfiguration::new(vec![3], 1)
        .with_layers(1, 2)
        .with_dense_units(StepRange::new(8, 16, 8))
        .with_seed(7)
}

type ScriptedRunner = TrialRunner<BaseExecutor<Box<dyn HyperModel>, ScriptedFitter>>;

fn runner(fitter: ScriptedFitter, executions: usize) -> ScriptedRunner {
    let executor = BaseExecutor::new(hypermodel_for(config()).unwrap(), fitter, Objective::default())
        .with_executions_per_trial(executions);
    TrialRunner::new(executor, BatchSizeSampler::new(StepRange::new(16, 32, 16)))
}

fn random_tuner(
    fitter: ScriptedFitter,
    max_trials: usize,
) -> Tuner<RandomSearchOracle, ScriptedRunner> {
    let oracle = RandomSearchOracle::new(Objective::default(), max_trials, Some(3));
    Tuner::new(oracle, runner(fitter, 1), FitArgs::new(3, 0.25))
}

fn calls<O: Oracle>(tuner: &Tuner<O, ScriptedRunner>) -> &[FitCall] {
    &tuner.executor().inner().fitter().calls
}

/// Records event names into a shared log
struct RecordingLogger {
    events: Rc<RefCell<Vec<String>>>,
    fail: bool,
}

impl TrialLogger for RecordingLogger {
    fn on_search_begin(&mut self, oracle: &str, _objective: &Objective) -> Result<()> {
        self.events.borrow_mut().push(format!("begin:{oracle}"));
        Ok(())
    }

    fn on_trial_begin(&mut self, trial: &Trial) -> Result<()> {
        self.events.borrow_mut().push(format!("trial_begin:{}", trial.id));
        if self.fail {
            return Err(Error::Training("logger offline".into()));
        }
        Ok(())
    }

    fn on_trial_end(&mut self, trial: &Trial, outcome: Option<&TrialOutcome>) -> Result<()> {
        let tag = if outcome.is_some() { "ok" } else { "failed" };
        self.events.borrow_mut().push(format!("trial_end:{}:{tag}", trial.id));
        Ok(())
    }

    fn on_search_end(&mut self, best: Option<&Trial>) -> Result<()> {
        self.events.borrow_mut().push(format!("end:{:?}", best.map(|t| t.id)));
        Ok(())
    }
}

// =============================================================================
// FitArgs and the before-trial hook
// =============================================================================

#[test]
fn test_fit_args_budget_overrides_epochs() {
    let args = FitArgs::new(10, 0.2);
    let options = args.fit_options(None);
    assert_eq!(options.epochs, 10);
    assert_eq!(options.batch_size, FitArgs::DEFAULT_BATCH_SIZE);
    assert!((options.validation_split - 0.2).abs() < 1e-6);

    let options = args.clone().with_batch_size(48).fit_options(Some(4));
    assert_eq!(options.epochs, 4);
    assert_eq!(options.batch_size, 48);
}

#[test]
fn test_batch_size_sampler_registers_int() {
    let mut trial = Trial::new(0, Default::default(), 0);
    let mut args = FitArgs::new(1, 0.0);
    BatchSizeSampler::default().before_trial(&mut trial, &mut args).unwrap();

    // Unassigned values take the domain minimum
    assert_eq!(args.batch_size, Some(64));
    assert_eq!(trial.hyperparameters.get("batch_size"), Some(&ParameterValue::Int(64)));
}

#[test]
fn test_batch_size_sampler_rejects_out_of_range_value() {
    let mut trial = Trial::new(0, Default::default(), 0);
    trial.hyperparameters.set("batch_size", ParameterValue::Int(-64));
    let mut args = FitArgs::new(1, 0.0);

    assert!(BatchSizeSampler::default().before_trial(&mut trial, &mut args).is_err());
    assert_eq!(args.batch_size, None);
}

#[test]
fn test_batch_size_sampler_respects_fixed_batch() {
    let mut trial = Trial::new(0, Default::default(), 0);
    let mut args = FitArgs::new(1, 0.0).with_batch_size(20);
    BatchSizeSampler::default().before_trial(&mut trial, &mut args).unwrap();

    assert_eq!(args.batch_size, Some(20));
    assert!(trial.hyperparameters.get("batch_size").is_none());
}

#[test]
fn test_runner_does_not_leak_sampled_batch_into_shared_args() {
    let mut tuner = random_tuner(ScriptedFitter::default(), 2);
    tuner.search(&dataset()).unwrap();
    assert_eq!(tuner.args().batch_size, None);
}

// =============================================================================
// Search loop
// =============================================================================

#[test]
fn test_populate_space_registers_everything_before_training() {
    let mut tuner = random_tuner(ScriptedFitter::default(), 5);
    tuner.populate_space().unwrap();

    let space = tuner.oracle().space();
    for name in ["layers", "units_0", "units_1", "dropout_rate", "learning_rate", "batch_size"] {
        assert!(space.contains(name), "missing {name}");
    }
    assert!(calls(&tuner).is_empty());
}

#[test]
fn test_search_completes_every_trial() {
    let mut tuner = random_tuner(ScriptedFitter::default(), 5);
    tuner.search(&dataset()).unwrap();

    assert_eq!(tuner.trials().len(), 5);
    assert!(tuner.trials().iter().all(|t| t.status == TrialStatus::Completed));
    assert!(tuner.trials().iter().all(|t| t.iterations == 3));
    assert_eq!(calls(&tuner).len(), 5);
}

#[test]
fn test_sampled_batch_size_reaches_fitter() {
    let mut tuner = random_tuner(ScriptedFitter::default(), 4);
    tuner.search(&dataset()).unwrap();

    for (trial, call) in tuner.trials().iter().zip(calls(&tuner)) {
        let sampled = trial.hyperparameters.get("batch_size").and_then(ParameterValue::as_int);
        assert_eq!(sampled, Some(call.batch_size as i64));
        assert!(call.batch_size == 16 || call.batch_size == 32);
    }
}

#[test]
fn test_best_trials_ordered_by_objective() {
    let mut tuner = random_tuner(ScriptedFitter::default(), 6);
    tuner.search(&dataset()).unwrap();

    let best = tuner.best_trials(6);
    assert!(!best.is_empty());
    for pair in best.windows(2) {
        assert!(pair[0].score.unwrap() <= pair[1].score.unwrap());
    }
    assert_eq!(tuner.best_hyperparameters(1)[0], &best[0].hyperparameters);
}

#[test]
fn test_executions_use_consecutive_seeds_and_average() {
    let oracle = RandomSearchOracle::new(Objective::default(), 2, Some(11));
    let mut tuner = Tuner::new(oracle, runner(ScriptedFitter::default(), 3), FitArgs::new(2, 0.0));
    tuner.search(&dataset()).unwrap();

    let calls = calls(&tuner);
    assert_eq!(calls.len(), 6);
    for (trial, chunk) in tuner.trials().iter().zip(calls.chunks(3)) {
        let seeds: Vec<u64> = chunk.iter().map(|c| c.seed).collect();
        assert_eq!(seeds, vec![trial.seed, trial.seed.wrapping_add(1), trial.seed.wrapping_add(2)]);
    }

    // Every execution scores the same in the scripted fitter, so the mean equals one of them
    let trial = &tuner.trials()[0];
    let lr = trial.hyperparameters.get("learning_rate").and_then(ParameterValue::as_float);
    let expected = 1.0 / f64::from(lr.unwrap() as f32) / 1000.0 + 0.5;
    assert!((trial.score.unwrap() - expected).abs() < 1e-9);
}

#[test]
fn test_failed_trials_are_recorded_and_search_continues() {
    let fitter = ScriptedFitter { fail_single_layer: true, ..ScriptedFitter::default() };
    let mut tuner = random_tuner(fitter, 8).with_max_consecutive_failed_trials(100);
    tuner.search(&dataset()).unwrap();

    for trial in tuner.trials() {
        let layers = trial.hyperparameters.get("layers").and_then(ParameterValue::as_int);
        if layers == Some(1) {
            assert_eq!(trial.status, TrialStatus::Failed);
            assert!(trial.score.is_none());
        } else {
            assert_eq!(trial.status, TrialStatus::Completed);
        }
    }
    assert!(tuner.best_trials(10).iter().all(|t| t.status == TrialStatus::Completed));

    let failed = tuner.trials().iter().filter(|t| t.status == TrialStatus::Failed).count();
    assert_eq!(calls(&tuner).iter().filter(|c| c.layers == 1).count(), failed);
}

#[test]
fn test_consecutive_failures_abort_search() {
    let mut tuner = random_tuner(ScriptedFitter::failing(), 10);
    let err = tuner.search(&dataset()).unwrap_err();

    assert!(matches!(err, Error::Training(_)));
    assert_eq!(tuner.trials().len(), 3);
    assert!(tuner.trials().iter().all(|t| t.status == TrialStatus::Failed));

    let mut tuner = random_tuner(ScriptedFitter::failing(), 10).with_max_consecutive_failed_trials(1);
    assert!(tuner.search(&dataset()).is_err());
    assert_eq!(tuner.trials().len(), 1);
}

#[test]
fn test_hyperband_budget_sets_epochs() {
    let oracle = HyperbandOracle::new(Objective::default(), 4, 2, Some(5))
        .with_hyperband_iterations(1);
    let mut tuner = Tuner::new(oracle, runner(ScriptedFitter::default(), 1), FitArgs::new(99, 0.0));
    tuner.search(&dataset()).unwrap();

    assert!(!tuner.trials().is_empty());
    for (trial, call) in tuner.trials().iter().zip(calls(&tuner)) {
        let budget = trial.budget.expect("hyperband assigns budgets");
        assert_eq!(call.epochs, budget.epochs);
        assert_eq!(trial.iterations, budget.epochs);
        assert!(budget.epochs <= 4);
    }
}

// =============================================================================
// Results
// =============================================================================

#[test]
fn test_best_parameter_set_carries_score() {
    let mut tuner = random_tuner(ScriptedFitter::default(), 4);
    tuner.search(&dataset()).unwrap();

    let best = tuner.best_trials(1)[0].clone();
    let params = tuner.best_parameter_set().unwrap().unwrap();
    assert_eq!(params.metric(), Some("root_mean_squared_error"));
    assert_eq!(params.score(), best.score);

    let model = tuner.best_model().unwrap().unwrap();
    assert_eq!(model.seed, best.seed);
    assert_eq!(model.params.layers() as i64, best.hyperparameters.get("layers").unwrap().as_int().unwrap());
}

#[test]
fn test_results_without_trials() {
    let tuner = random_tuner(ScriptedFitter::default(), 4);
    assert!(tuner.best_trials(3).is_empty());
    assert!(tuner.best_model().unwrap().is_none());
    assert!(tuner.best_parameter_set().unwrap().is_none());
}

#[test]
fn test_results_summary() {
    let mut tuner = random_tuner(ScriptedFitter::default(), 6);
    tuner.search(&dataset()).unwrap();

    let summary = tuner.results_summary(2);
    assert!(summary.starts_with("Results summary"));
    assert!(summary.contains("Oracle: random"));
    assert!(summary.contains("Trials: 6 completed, 0 failed"));
    assert!(summary.contains("#2 trial"));
    assert!(!summary.contains("#3 trial"));
    assert!(summary.contains("Objective: root_mean_squared_error (min)"));
    assert!(summary.contains("#1 trial"));
    assert!(summary.contains("learning_rate:"));
}

#[test]
fn test_save_writes_trials_json() {
    let dir = tempfile::tempdir().unwrap();
    let mut tuner = random_tuner(ScriptedFitter::default(), 3).with_project(dir.path(), "dense");
    tuner.search(&dataset()).unwrap();

    let path = dir.path().join("dense").join("trials.json");
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json["oracle"], "random");
    assert_eq!(json["objective"]["name"], "root_mean_squared_error");
    assert_eq!(json["trials"].as_array().unwrap().len(), 3);

    let trials: Vec<Trial> = serde_json::from_value(json["trials"].clone()).unwrap();
    assert_eq!(trials[0].id, 0);
}

#[test]
fn test_save_after_abort() {
    let dir = tempfile::tempdir().unwrap();
    let mut tuner = random_tuner(ScriptedFitter::failing(), 5).with_project(dir.path(), "p");
    assert!(tuner.search(&dataset()).is_err());
    assert!(dir.path().join("p").join("trials.json").exists());
}

#[test]
fn test_save_without_project_is_noop() {
    let tuner = random_tuner(ScriptedFitter::default(), 1);
    assert!(tuner.project_dir().is_none());
    tuner.save().unwrap();
}

// =============================================================================
// Loggers
// =============================================================================

#[test]
fn test_logger_sees_events_in_order() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let logger = RecordingLogger { events: Rc::clone(&events), fail: false };
    let mut tuner = random_tuner(ScriptedFitter::default(), 2).with_logger(Box::new(logger));
    tuner.search(&dataset()).unwrap();

    let best = tuner.best_trials(1)[0].id;
    assert_eq!(
        *events.borrow(),
        vec![
            "begin:random".to_string(),
            "trial_begin:0".to_string(),
            "trial_end:0:ok".to_string(),
            "trial_begin:1".to_string(),
            "trial_end:1:ok".to_string(),
            format!("end:Some({best})"),
        ]
    );
}

#[test]
fn test_failing_logger_never_stops_search() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let logger = RecordingLogger { events: Rc::clone(&events), fail: true };
    let mut tuner = random_tuner(ScriptedFitter::default(), 3).with_logger(Box::new(logger));
    tuner.search(&dataset()).unwrap();

    assert_eq!(tuner.trials().len(), 3);
    assert!(events.borrow().iter().any(|e| e == "trial_end:2:ok"));
}

#[test]
fn test_logger_reports_failed_trial() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let logger = RecordingLogger { events: Rc::clone(&events), fail: false };
    let mut tuner = random_tuner(ScriptedFitter::failing(), 3)
        .with_max_consecutive_failed_trials(1)
        .with_logger(Box::new(logger));
    assert!(tuner.search(&dataset()).is_err());

    assert!(events.borrow().contains(&"trial_end:0:failed".to_string()));
}

#[test]
fn test_tracking_logger_records_trial_run() {
    let mut logger =
        TrackingLogger::new(ExperimentTracker::new("search", InMemoryBackend::new()));
    logger.on_search_begin("random", &Objective::default()).unwrap();

    let mut trial = Trial::new(4, Default::default(), 99);
    trial.hyperparameters.int("layers", 1, 3, 1).unwrap();
    trial.start();
    logger.on_trial_begin(&trial).unwrap();
    let run_id = logger.run_id(4).unwrap().to_string();

    let mut history = History::new();
    history.record("root_mean_squared_error", 0.9);
    history.record("root_mean_squared_error", 0.4);
    let outcome = TrialOutcome { score: 0.4, epochs: 2, histories: vec![history] };
    trial.complete(0.4, 2);
    logger.on_trial_end(&trial, Some(&outcome)).unwrap();

    let run = logger.tracker().get_run(&run_id).unwrap();
    assert_eq!(run.run_name.as_deref(), Some("trial-4"));
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.score, Some(0.4));
    assert_eq!(run.params.get("seed").map(String::as_str), Some("99"));
    assert_eq!(run.params.get("layers").map(String::as_str), Some("1"));
    assert_eq!(run.last_metric("root_mean_squared_error"), Some(0.4));
    assert_eq!(logger.tracker().tags().get("oracle").map(String::as_str), Some("random"));
}

#[test]
fn test_tracking_logger_marks_failed_run() {
    let mut logger =
        TrackingLogger::new(ExperimentTracker::new("search", InMemoryBackend::new()));
    let mut trial = Trial::new(0, Default::default(), 1);
    logger.on_trial_begin(&trial).unwrap();
    trial.fail();
    logger.on_trial_end(&trial, None).unwrap();

    let run = logger.tracker().get_run(logger.run_id(0).unwrap()).unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.score.is_none());
}

// =============================================================================
// Driver
// =============================================================================

#[test]
fn test_options_defaults() {
    let random = RandomSearchOptions::default();
    assert_eq!((random.max_trials, random.epochs, random.executions_per_trial), (256, 10, 3));
    assert_eq!(random.objective, Objective::default());

    let bayes = BayesianSearchOptions::default();
    assert_eq!((bayes.max_trials, bayes.epochs), (256, 2));
    assert!((bayes.alpha - 2.5e-4).abs() < 1e-12);
    assert!((bayes.beta - 2.75).abs() < 1e-12);
    assert!(bayes.num_initial_points.is_none());
    assert!((bayes.validation_split - 0.1).abs() < 1e-6);

    let hyper = HyperbandSearchOptions::default();
    assert_eq!((hyper.max_epochs, hyper.factor, hyper.hyperband_iterations), (10, 2, 3));
}

#[test]
fn test_options_fill_defaults_from_yaml() {
    let options: BayesianSearchOptions = serde_yaml::from_str("max_trials: 4\n").unwrap();
    assert_eq!(options.max_trials, 4);
    assert_eq!(options.epochs, 2);
    assert_eq!(options.executions_per_trial, 3);
}

#[test]
fn test_driver_rejects_invalid_config() {
    let config = config().with_layers(3, 1);
    assert!(matches!(SearchDriver::new(config), Err(Error::ConfigError(_))));
}

#[test]
fn test_driver_random_search() {
    let options = RandomSearchOptions {
        max_trials: 4,
        epochs: 2,
        executions_per_trial: 1,
        ..RandomSearchOptions::default()
    };
    let tuner = SearchDriver::new(config())
        .unwrap()
        .with_fitter(ScriptedFitter::default())
        .random_search(&dataset(), &options)
        .unwrap();

    assert_eq!(tuner.trials().len(), 4);
    assert_eq!(tuner.oracle().name(), "random");
    assert!(tuner.executor().inner().fitter().calls.iter().all(|c| c.epochs == 2));
    assert!(tuner.best_parameter_set().unwrap().is_some());
}

#[test]
fn test_driver_fixed_batch_size_skips_sampling() {
    let options = RandomSearchOptions {
        max_trials: 2,
        epochs: 1,
        executions_per_trial: 1,
        batch_size: Some(6),
        ..RandomSearchOptions::default()
    };
    let tuner = SearchDriver::new(config())
        .unwrap()
        .with_fitter(ScriptedFitter::default())
        .random_search(&dataset(), &options)
        .unwrap();

    assert!(!tuner.oracle().space().contains("batch_size"));
    assert!(tuner.executor().inner().fitter().calls.iter().all(|c| c.batch_size == 6));
}

#[test]
fn test_driver_bayesian_search() {
    let options = BayesianSearchOptions {
        max_trials: 5,
        executions_per_trial: 1,
        num_initial_points: Some(2),
        ..BayesianSearchOptions::default()
    };
    let tuner = SearchDriver::new(config())
        .unwrap()
        .with_fitter(ScriptedFitter::default())
        .bayesian_search(&dataset(), &options)
        .unwrap();

    assert_eq!(tuner.oracle().name(), "bayesian");
    assert!(tuner.trials().len() <= 5);
    assert!(tuner.trials().iter().all(|t| t.status == TrialStatus::Completed));
}

#[test]
fn test_driver_hyperband_search_with_project() {
    let dir = tempfile::tempdir().unwrap();
    let options = HyperbandSearchOptions {
        max_epochs: 4,
        hyperband_iterations: 1,
        executions_per_trial: 1,
        ..HyperbandSearchOptions::default()
    };
    let tuner = SearchDriver::new(config())
        .unwrap()
        .with_fitter(ScriptedFitter::default())
        .with_project(dir.path(), "hb")
        .hyperband_search(&dataset(), &options)
        .unwrap();

    assert_eq!(tuner.oracle().name(), "hyperband");
    assert!(tuner.trials().iter().all(|t| t.budget.is_some()));
    assert!(dir.path().join("hb").join("trials.json").exists());
}

#[test]
fn test_driver_forwards_logger() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let logger = RecordingLogger { events: Rc::clone(&events), fail: false };
    let options = RandomSearchOptions {
        max_trials: 1,
        epochs: 1,
        executions_per_trial: 1,
        ..RandomSearchOptions::default()
    };
    SearchDriver::new(config())
        .unwrap()
        .with_fitter(ScriptedFitter::default())
        .with_logger(Box::new(logger))
        .random_search(&dataset(), &options)
        .unwrap();

    assert_eq!(events.borrow().first().map(String::as_str), Some("begin:random"));
}
