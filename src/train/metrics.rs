//! Evaluation metrics

use crate::Tensor;

/// Trait for evaluation metrics
pub trait Metric {
    /// Compute the metric value given predictions and targets
    fn compute(&self, predictions: &Tensor, targets: &Tensor) -> f32;

    /// Name of the metric, used as the history key
    fn name(&self) -> &str;
}

/// Root Mean Squared Error over every element
///
/// RMSE = sqrt(mean((pred - target)²))
#[derive(Debug, Clone, Copy, Default)]
pub struct RootMeanSquaredError;

impl Metric for RootMeanSquaredError {
    fn compute(&self, predictions: &Tensor, targets: &Tensor) -> f32 {
        assert_eq!(
            predictions.len(),
            targets.len(),
            "Predictions and targets must have same length"
        );
        if predictions.is_empty() {
            return 0.0;
        }
        let sq: f32 = predictions
            .data()
            .iter()
            .zip(targets.data().iter())
            .map(|(p, t)| (p - t) * (p - t))
            .sum();
        (sq / predictions.len() as f32).sqrt()
    }

    fn name(&self) -> &'static str {
        "root_mean_squared_error"
    }
}
