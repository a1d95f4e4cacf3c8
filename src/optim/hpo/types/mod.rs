//! Core HPO types

mod hyperparameters;
mod objective;
mod parameter;
mod space;
mod trial;

#[cfg(test)]
mod tests;

pub use hyperparameters::HyperParameters;
pub use objective::{Direction, Objective};
pub use parameter::{ParameterDomain, ParameterValue};
pub use space::{HyperparameterSpace, ParameterMap};
pub use trial::{Trial, TrialBudget, TrialStatus};
