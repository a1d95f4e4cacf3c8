//! Afinar: hyperparameter search for regression networks
//!
//! Afinar searches over the architecture and training hyperparameters of
//! fully-connected and bidirectional-LSTM regression networks trained with an
//! asymmetric loss:
//! - Hypermodels that turn sampled values into validated parameter sets and
//!   compiled models
//! - Random, Gaussian-process bayesian and Hyperband search oracles
//! - A CPU fitter with tape-based gradients and Adam
//! - Experiment tracking of every trial
//!
//! # Toyota Way Principles
//!
//! - **Jidoka**: Invalid configurations and parameter sets are rejected at construction
//! - **Kaizen**: Each trial informs the next
//! - **Genchi Genbutsu**: Every trial is recorded and can be inspected after the search
//!
//! # Example
//!
//! ```ignore
//! use afinar::{RandomSearchOptions, SearchConfiguration, SearchDriver};
//!
//! let config = SearchConfiguration::from_yaml_file("search.yaml")?;
//! let tuner = SearchDriver::new(config)?
//!     .random_search(&dataset, &RandomSearchOptions::default())?;
//! let best = tuner.best_parameter_set()?;
//! ```

pub mod autograd;
pub mod config;
pub mod error;
pub mod hypermodel;
pub mod model;
pub mod optim;
pub mod params;
pub mod tracking;
pub mod train;
pub mod tuner;

pub use autograd::Tensor;
pub use config::{ActivationPolicy, SearchConfiguration, StepRange};
pub use error::{Error, Result};
pub use hypermodel::{hypermodel_for, HyperModel};
pub use model::{Activation, CompiledModel, ModelBuilder, ModelKind};
pub use optim::hpo::{HyperParameters, Objective, Oracle, Trial};
pub use params::{ParameterSet, ParameterSetBuilder};
pub use train::{CpuFitter, Dataset, FitOptions, History, ModelFitter};
pub use tuner::{
    BayesianSearchOptions, HyperbandSearchOptions, RandomSearchOptions, SearchDriver, Tuner,
};
