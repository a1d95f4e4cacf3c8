//! Hyperparameter search oracles
//!
//! Random search, Gaussian-process bayesian optimization and Hyperband,
//! all behind the [`Oracle`] trait. Hypermodels describe the search space
//! implicitly by asking a [`HyperParameters`] handle for named values.
//!
//! # Toyota Way: Kaizen
//!
//! Continuous improvement through intelligent search. Each trial informs the next,
//! building knowledge iteratively rather than wasteful exhaustive search.
//!
//! # Example
//!
//! ```ignore
//! use afinar::optim::hpo::{HyperParameters, Objective, Oracle, RandomSearchOracle};
//!
//! let mut hp = HyperParameters::new();
//! hp.int("layers", 1, 3, 1)?;
//! hp.choice_f64("learning_rate", &[1e-4, 1e-3])?;
//!
//! let mut oracle = RandomSearchOracle::new(Objective::default(), 10, Some(42));
//! oracle.update_space(hp.space());
//! let trial = oracle.create_trial()?;
//! ```
//!
//! # References
//!
//! \[1\] Bergstra & Bengio (2012) - Random Search for Hyper-Parameter Optimization
//! \[2\] Srinivas et al. (2010) - Gaussian Process Optimization in the Bandit Setting
//! \[3\] Li et al. (2018) - Hyperband: A Novel Bandit-Based Approach

mod bayesian;
mod error;
mod gaussian_process;
mod hyperband;
mod oracle;
mod random;
mod types;

pub use bayesian::BayesianOptimizationOracle;
pub use error::{HPOError, Result};
pub use gaussian_process::GaussianProcess;
pub use hyperband::{HyperbandOracle, HyperbandScheduler};
pub use oracle::Oracle;
pub use random::RandomSearchOracle;
pub use types::{
    Direction, HyperParameters, HyperparameterSpace, Objective, ParameterDomain, ParameterMap,
    ParameterValue, Trial, TrialBudget, TrialStatus,
};
