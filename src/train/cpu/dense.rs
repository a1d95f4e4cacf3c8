//! Fully connected layer

use ndarray::{Array2, Axis, Zip};
use rand::rngs::StdRng;

use super::init::{flatten, glorot_uniform, matrix};
use crate::error::{Error, Result};
use crate::model::{Activation, L1L2};
use crate::Tensor;

pub(crate) struct DenseLayer {
    weight: Tensor,
    bias: Tensor,
    in_dim: usize,
    out_dim: usize,
    activation: Option<Activation>,
    activity_regularizer: Option<L1L2>,
}

pub(crate) struct DenseCache {
    input: Array2<f32>,
    pre_activation: Array2<f32>,
    output: Array2<f32>,
}

impl DenseLayer {
    pub(crate) fn new(
        in_dim: usize,
        out_dim: usize,
        activation: Option<Activation>,
        activity_regularizer: Option<L1L2>,
        rng: &mut StdRng,
    ) -> Self {
        Self {
            weight: glorot_uniform(in_dim, out_dim, rng),
            bias: Tensor::zeros(out_dim, true),
            in_dim,
            out_dim,
            activation,
            activity_regularizer: activity_regularizer.filter(|r| !r.is_zero()),
        }
    }

    /// Output, cache and the activity penalty (averaged over the batch)
    pub(crate) fn forward(&self, input: Array2<f32>) -> Result<(Array2<f32>, DenseCache, f32)> {
        if input.ncols() != self.in_dim {
            return Err(Error::ShapeMismatch(format!(
                "dense layer expects {} features, got {}",
                self.in_dim,
                input.ncols()
            )));
        }
        let w = matrix(&self.weight, self.in_dim, self.out_dim)?;
        let pre_activation = input.dot(&w) + self.bias.data();
        let output = match self.activation {
            Some(act) => pre_activation.mapv(|x| act.apply(x)),
            None => pre_activation.clone(),
        };
        let batch = input.nrows().max(1) as f32;
        let penalty = self.activity_regularizer.map_or(0.0, |r| r.penalty(output.iter()) / batch);
        Ok((output.clone(), DenseCache { input, pre_activation, output }, penalty))
    }

    /// Accumulate parameter gradients and return ∂loss/∂input
    pub(crate) fn backward(&self, cache: &DenseCache, mut grad: Array2<f32>) -> Result<Array2<f32>> {
        let batch = cache.input.nrows().max(1) as f32;
        if let Some(reg) = self.activity_regularizer {
            grad.zip_mut_with(&cache.output, |g, &y| *g += reg.gradient(y) / batch);
        }
        if let Some(act) = self.activation {
            Zip::from(&mut grad)
                .and(&cache.pre_activation)
                .and(&cache.output)
                .for_each(|g, &x, &y| *g *= act.derivative(x, y));
        }

        let w = matrix(&self.weight, self.in_dim, self.out_dim)?;
        self.weight.accumulate_grad(flatten(&cache.input.t().dot(&grad)));
        self.bias.accumulate_grad(grad.sum_axis(Axis(0)));
        Ok(grad.dot(&w.t()))
    }

    pub(crate) fn parameters_mut(&mut self) -> [&mut Tensor; 2] {
        [&mut self.weight, &mut self.bias]
    }

    pub(crate) fn parameters(&self) -> [&Tensor; 2] {
        [&self.weight, &self.bias]
    }
}
