//! Training layer
//!
//! The search side only needs [`ModelFitter`]: something that takes a
//! [`CompiledModel`](crate::model::CompiledModel), a [`Dataset`] and
//! [`FitOptions`] and returns a per-epoch [`History`]. [`CpuFitter`] is the
//! reference implementation.
//!
//! # Example
//!
//! ```ignore
//! use afinar::train::{CpuFitter, FitOptions, ModelFitter};
//!
//! let mut fitter = CpuFitter::new();
//! let history = fitter.fit(&compiled, &dataset, &FitOptions::new(10, 64))?;
//! let best = history.get("val_root_mean_squared_error");
//! ```

mod cpu;
mod dataset;
mod fitter;
pub mod loss;
mod metrics;

pub use cpu::{CpuFitter, ForwardPass, Network};
pub use dataset::Dataset;
pub use fitter::{FitOptions, History, ModelFitter};
pub use loss::{AsymmetricLoss, LossFn};
pub use metrics::{Metric, RootMeanSquaredError};
