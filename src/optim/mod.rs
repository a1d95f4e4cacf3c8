//! Optimizers for training networks and for searching hyperparameters

mod adam;
pub mod hpo;
mod optimizer;

pub use adam::Adam;
pub use hpo::{
    BayesianOptimizationOracle, HPOError, HyperParameters, HyperbandOracle, HyperparameterSpace,
    Objective, Oracle, ParameterDomain, ParameterValue, RandomSearchOracle, Trial, TrialStatus,
};
pub use optimizer::Optimizer;
