//! Regression network descriptions
//!
//! [`ModelBuilder`] turns a [`ParameterSet`](crate::ParameterSet) into a
//! [`CompiledModel`]: a validated layer graph plus the Adam settings, the
//! asymmetric loss and the RMSE metric. Training happens elsewhere.

mod activation;
mod builder;
mod compile;
mod graph;
mod layer;
mod regularizer;


pub(crate) use activation::sigmoid;
pub use activation::Activation;
pub use builder::{ModelBuilder, ModelKind};
pub use compile::{AdamSpec, CompiledModel, MetricKind};
pub use graph::Model;
pub use layer::Layer;
pub use regularizer::L1L2;
