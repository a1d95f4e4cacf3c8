//! Asymmetric residual loss for regression
//!
//! Under-prediction is penalized harder than over-prediction:
//!
//! ```text
//! d      = y_pred - y_true
//! p(d)   = exp(|d| / 10) - 1   if d < 0
//!          exp(|d| / 13) - 1   otherwise
//! loss   = (Σ p(d) + Σ_rows mean_cols(d²)) / 2
//! ```
//!
//! The value is summed over instances, not averaged. Training reads the
//! prediction gradient back off the tape via [`AsymmetricLoss::value_and_gradient`].

use std::rc::Rc;

use ndarray::{Array, Array1, Array2, ArrayView2, Dimension, Zip};
use serde::{Deserialize, Serialize};

use super::LossFn;
use crate::autograd::{backward, BackwardOp, GradCell};
use crate::error::{Error, Result};
use crate::Tensor;

const UNDER_SCALE: f32 = 10.0;
const OVER_SCALE: f32 = 13.0;

/// MSE plus an asymmetric exponential residual penalty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsymmetricLoss {
    num_outputs: usize,
}

impl AsymmetricLoss {
    /// Loss for rows of `num_outputs` values
    pub fn new(num_outputs: usize) -> Result<Self> {
        if num_outputs == 0 {
            return Err(Error::ConfigError("loss needs at least one output per row".into()));
        }
        Ok(Self { num_outputs })
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    /// Penalty for a single residual
    pub fn penalty(d: f32) -> f32 {
        if d < 0.0 {
            (d.abs() / UNDER_SCALE).exp() - 1.0
        } else {
            (d.abs() / OVER_SCALE).exp() - 1.0
        }
    }

    /// d p / d d
    pub fn penalty_derivative(d: f32) -> f32 {
        if d < 0.0 {
            -(-d / UNDER_SCALE).exp() / UNDER_SCALE
        } else {
            (d / OVER_SCALE).exp() / OVER_SCALE
        }
    }

    /// Element-wise penalties: both branches evaluated, selected by the sign mask
    fn penalties<D: Dimension>(residuals: &Array<f32, D>) -> Array<f32, D> {
        let under = residuals.mapv(|d| (d.abs() / UNDER_SCALE).exp() - 1.0);
        let mut selected = residuals.mapv(|d| (d.abs() / OVER_SCALE).exp() - 1.0);
        Zip::from(&mut selected).and(residuals).and(&under).for_each(|s, &d, &u| {
            if d < 0.0 {
                *s = u;
            }
        });
        selected
    }

    fn value_of<D: Dimension>(&self, residuals: &Array<f32, D>) -> f32 {
        let s_score = Self::penalties(residuals).sum();
        let mse = residuals.mapv(|d| d * d).sum() / self.num_outputs as f32;
        (s_score + mse) / 2.0
    }

    fn gradient_of<D: Dimension>(&self, residuals: &Array<f32, D>) -> Array<f32, D> {
        let n = self.num_outputs as f32;
        residuals.mapv(|d| (Self::penalty_derivative(d) + 2.0 * d / n) / 2.0)
    }

    fn residuals(&self, y_true: ArrayView2<f32>, y_pred: ArrayView2<f32>) -> Result<Array2<f32>> {
        if y_true.dim() != y_pred.dim() {
            return Err(Error::ShapeMismatch(format!(
                "loss: targets {:?} vs predictions {:?}",
                y_true.dim(),
                y_pred.dim()
            )));
        }
        if y_true.ncols() != self.num_outputs {
            return Err(Error::ShapeMismatch(format!(
                "loss: expected {} outputs per row, got {}",
                self.num_outputs,
                y_true.ncols()
            )));
        }
        Ok(&y_pred - &y_true)
    }

    /// Loss over a batch of rows
    pub fn value(&self, y_true: ArrayView2<f32>, y_pred: ArrayView2<f32>) -> Result<f32> {
        Ok(self.value_of(&self.residuals(y_true, y_pred)?))
    }

    /// Loss and ∂loss/∂y_pred for one batch
    ///
    /// Runs [`LossFn::forward`] over the flattened rows and walks the tape
    /// back into the predictions. The gradient has the shape of the inputs.
    pub fn value_and_gradient(
        &self,
        y_true: ArrayView2<f32>,
        y_pred: ArrayView2<f32>,
    ) -> Result<(f32, Array2<f32>)> {
        let dim = self.residuals(y_true, y_pred)?.dim();
        let predictions = Tensor::from_vec(y_pred.iter().copied().collect(), true);
        let targets = Tensor::from_vec(y_true.iter().copied().collect(), false);

        let mut loss = self.forward(&predictions, &targets)?;
        backward(&mut loss, None);

        let value = loss.data()[0];
        let grad = predictions
            .grad()
            .ok_or_else(|| Error::Training("loss tape produced no prediction gradient".into()))?
            .into_shape_with_order(dim)
            .map_err(|e| Error::ShapeMismatch(format!("loss gradient: {e}")))?;
        Ok((value, grad))
    }
}

struct AsymmetricBackward {
    pred_grad_cell: GradCell,
    loss_grad_cell: GradCell,
    grad: Array1<f32>,
}

impl BackwardOp for AsymmetricBackward {
    fn backward(&self) {
        let scale = self.loss_grad_cell.borrow().as_ref().map_or(1.0, |g| g[0]);
        let grad = &self.grad * scale;
        let mut pred_grad = self.pred_grad_cell.borrow_mut();
        match pred_grad.as_mut() {
            Some(existing) => *existing += &grad,
            None => *pred_grad = Some(grad),
        }
    }
}

impl LossFn for AsymmetricLoss {
    /// Flat tensors holding whole rows of `num_outputs` values
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Result<Tensor> {
        if predictions.len() != targets.len() {
            return Err(Error::ShapeMismatch(format!(
                "loss: {} predictions vs {} targets",
                predictions.len(),
                targets.len()
            )));
        }
        if predictions.len() % self.num_outputs != 0 {
            return Err(Error::ShapeMismatch(format!(
                "loss: {} values do not form rows of {}",
                predictions.len(),
                self.num_outputs
            )));
        }

        let residuals = predictions.data() - targets.data();
        let mut loss = Tensor::from_vec(vec![self.value_of(&residuals)], true);

        if predictions.requires_grad() {
            let op = AsymmetricBackward {
                pred_grad_cell: predictions.grad_cell(),
                loss_grad_cell: loss.grad_cell(),
                grad: self.gradient_of(&residuals),
            };
            loss.set_backward_op(Rc::new(op));
        }

        Ok(loss)
    }

    fn name(&self) -> &'static str {
        "Asymmetric"
    }
}
