//! Loss functions for training
//!
//! - [`AsymmetricLoss`] - MSE plus an exponential penalty that punishes
//!   under-prediction harder than over-prediction

mod asymmetric;
mod traits;


pub use asymmetric::AsymmetricLoss;
pub use traits::LossFn;
