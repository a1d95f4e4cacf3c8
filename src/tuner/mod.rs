//! Search orchestration
//!
//! [`SearchDriver`] is the entry point: it picks the hypermodel for the
//! configured network family, wires an oracle, a [`TrialRunner`] and the
//! fitter into a [`Tuner`], and runs the search.
//!
//! Per trial the tuner asks the oracle for a [`Trial`](crate::optim::hpo::Trial),
//! lets the runner's before-trial hook inject a batch size, has the
//! [`BaseExecutor`] build and fit the model `executions_per_trial` times,
//! and hands the scored trial back to the oracle.
//!
//! # Toyota Way: Jidoka
//!
//! A failing trial stops itself, not the line: it is recorded as failed and
//! the search moves on, unless failures keep repeating.

mod controller;
mod driver;
mod executor;
mod logger;
mod runner;

#[cfg(test)]
mod tests;

pub use controller::Tuner;
pub use driver::{
    BayesianSearchOptions, HyperbandSearchOptions, RandomSearchOptions, SearchDriver,
    SearchExecutor,
};
pub use executor::BaseExecutor;
pub use logger::{TrackingLogger, TrialLogger};
pub use runner::{BatchSizeSampler, BeforeTrial, FitArgs, TrialExecutor, TrialOutcome, TrialRunner};
