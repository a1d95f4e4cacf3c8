//! Bidirectional LSTM
//!
//! Gate layout along the last kernel axis is `[input, forget, cell, output]`,
//! each `units` wide. The forget-gate bias starts at 1.

use ndarray::{concatenate, s, Array1, Array2, Array3, Axis};
use rand::rngs::StdRng;

use super::init::{dropout_mask, flatten, glorot_uniform, matrix};
use crate::error::{Error, Result};
use crate::model::{sigmoid, L1L2};
use crate::Tensor;

/// One direction of the recurrent layer
pub(crate) struct LstmCell {
    kernel: Tensor,
    recurrent_kernel: Tensor,
    bias: Tensor,
    in_dim: usize,
    units: usize,
}

struct StepCache {
    /// Time index this step read
    t: usize,
    x: Array2<f32>,
    /// Previous hidden state after the recurrent dropout mask
    h_prev: Array2<f32>,
    c_prev: Array2<f32>,
    i: Array2<f32>,
    f: Array2<f32>,
    g: Array2<f32>,
    o: Array2<f32>,
    tanh_c: Array2<f32>,
}

pub(crate) struct LstmCache {
    /// In processing order
    steps: Vec<StepCache>,
    mask: Option<Array2<f32>>,
}

impl LstmCell {
    fn new(in_dim: usize, units: usize, rng: &mut StdRng) -> Self {
        let gates = 4 * units;
        let mut bias = Array1::zeros(gates);
        bias.slice_mut(s![units..2 * units]).fill(1.0);
        Self {
            kernel: glorot_uniform(in_dim, gates, rng),
            recurrent_kernel: glorot_uniform(units, gates, rng),
            bias: Tensor::new(bias, true),
            in_dim,
            units,
        }
    }

    /// Run over `input` (`[batch, time, features]`), returning hidden states
    /// in processing order
    fn forward(
        &self,
        input: &Array3<f32>,
        reverse: bool,
        mask: Option<Array2<f32>>,
    ) -> Result<(Vec<Array2<f32>>, LstmCache)> {
        let (batch, timesteps, _) = input.dim();
        let u = self.units;
        let w = matrix(&self.kernel, self.in_dim, 4 * u)?;
        let r = matrix(&self.recurrent_kernel, u, 4 * u)?;

        let mut h = Array2::<f32>::zeros((batch, u));
        let mut c = Array2::<f32>::zeros((batch, u));
        let mut hidden = Vec::with_capacity(timesteps);
        let mut steps = Vec::with_capacity(timesteps);

        for step in 0..timesteps {
            let t = if reverse { timesteps - 1 - step } else { step };
            let x = input.index_axis(Axis(1), t).to_owned();
            let h_prev = match &mask {
                Some(m) => &h * m,
                None => h,
            };
            let z = x.dot(&w) + h_prev.dot(&r) + self.bias.data();

            let i = z.slice(s![.., 0..u]).mapv(sigmoid);
            let f = z.slice(s![.., u..2 * u]).mapv(sigmoid);
            let g = z.slice(s![.., 2 * u..3 * u]).mapv(f32::tanh);
            let o = z.slice(s![.., 3 * u..]).mapv(sigmoid);

            let c_next = &f * &c + &i * &g;
            let tanh_c = c_next.mapv(f32::tanh);
            h = &o * &tanh_c;
            hidden.push(h.clone());
            steps.push(StepCache { t, x, h_prev, c_prev: c, i, f, g, o, tanh_c });
            c = c_next;
        }

        Ok((hidden, LstmCache { steps, mask }))
    }

    /// Backpropagate through time; `grads[k]` is ∂loss/∂h at processing step k
    fn backward(
        &self,
        cache: &LstmCache,
        grads: &[Option<Array2<f32>>],
        input_grad: &mut Array3<f32>,
    ) -> Result<()> {
        let u = self.units;
        let w = matrix(&self.kernel, self.in_dim, 4 * u)?;
        let r = matrix(&self.recurrent_kernel, u, 4 * u)?;
        let batch = input_grad.len_of(Axis(0));

        let mut d_kernel = Array2::<f32>::zeros((self.in_dim, 4 * u));
        let mut d_recurrent = Array2::<f32>::zeros((u, 4 * u));
        let mut d_bias = Array1::<f32>::zeros(4 * u);
        let mut dh_next = Array2::<f32>::zeros((batch, u));
        let mut dc_next = Array2::<f32>::zeros((batch, u));

        for (step, sc) in cache.steps.iter().enumerate().rev() {
            let dh = match grads.get(step).and_then(Option::as_ref) {
                Some(g) => &dh_next + g,
                None => dh_next,
            };
            let d_o = &dh * &sc.tanh_c;
            let dc = dc_next + &dh * &sc.o * &sc.tanh_c.mapv(|v| 1.0 - v * v);

            let dz_i = &dc * &sc.g * &sc.i.mapv(|v| v * (1.0 - v));
            let dz_f = &dc * &sc.c_prev * &sc.f.mapv(|v| v * (1.0 - v));
            let dz_g = &dc * &sc.i * &sc.g.mapv(|v| 1.0 - v * v);
            let dz_o = d_o * &sc.o.mapv(|v| v * (1.0 - v));
            dc_next = &dc * &sc.f;

            let dz = concatenate(Axis(1), &[dz_i.view(), dz_f.view(), dz_g.view(), dz_o.view()])
                .map_err(|e| Error::ShapeMismatch(format!("lstm gates: {e}")))?;

            d_kernel += &sc.x.t().dot(&dz);
            d_recurrent += &sc.h_prev.t().dot(&dz);
            d_bias += &dz.sum_axis(Axis(0));

            let dx = dz.dot(&w.t());
            let mut slot = input_grad.index_axis_mut(Axis(1), sc.t);
            slot += &dx;

            dh_next = dz.dot(&r.t());
            if let Some(m) = &cache.mask {
                dh_next *= m;
            }
        }

        self.kernel.accumulate_grad(flatten(&d_kernel));
        self.recurrent_kernel.accumulate_grad(flatten(&d_recurrent));
        self.bias.accumulate_grad(d_bias);
        Ok(())
    }
}

/// Forward and backward LSTMs with concatenated outputs
pub(crate) struct BiLstmLayer {
    forward: LstmCell,
    backward: LstmCell,
    units: usize,
    return_sequences: bool,
    recurrent_dropout: f32,
    kernel_regularizer: Option<L1L2>,
}

pub(crate) struct BiLstmCache {
    forward: LstmCache,
    backward: LstmCache,
    timesteps: usize,
}

/// Either `[batch, 2u]` or `[batch, time, 2u]`
pub(crate) enum BiLstmOutput {
    Last(Array2<f32>),
    Sequence(Array3<f32>),
}

impl BiLstmLayer {
    pub(crate) fn new(
        in_dim: usize,
        units: usize,
        return_sequences: bool,
        recurrent_dropout: f32,
        kernel_regularizer: Option<L1L2>,
        rng: &mut StdRng,
    ) -> Self {
        Self {
            forward: LstmCell::new(in_dim, units, rng),
            backward: LstmCell::new(in_dim, units, rng),
            units,
            return_sequences,
            recurrent_dropout,
            kernel_regularizer: kernel_regularizer.filter(|r| !r.is_zero()),
        }
    }

    /// Output, cache and the kernel penalty; recurrent dropout only when
    /// training (an rng is supplied)
    pub(crate) fn forward(
        &self,
        input: &Array3<f32>,
        rng: Option<&mut StdRng>,
    ) -> Result<(BiLstmOutput, BiLstmCache, f32)> {
        let (batch, timesteps, features) = input.dim();
        if features != self.forward.in_dim {
            return Err(Error::ShapeMismatch(format!(
                "recurrent layer expects {} features, got {features}",
                self.forward.in_dim
            )));
        }
        let u = self.units;
        let (forward_mask, backward_mask) = match rng {
            Some(rng) if self.recurrent_dropout > 0.0 => (
                Some(dropout_mask((batch, u), self.recurrent_dropout, rng)),
                Some(dropout_mask((batch, u), self.recurrent_dropout, rng)),
            ),
            _ => (None, None),
        };

        let (fwd, forward_cache) = self.forward.forward(input, false, forward_mask)?;
        let (bwd, backward_cache) = self.backward.forward(input, true, backward_mask)?;

        let output = if self.return_sequences {
            let mut out = Array3::<f32>::zeros((batch, timesteps, 2 * u));
            for t in 0..timesteps {
                out.slice_mut(s![.., t, ..u]).assign(&fwd[t]);
                out.slice_mut(s![.., t, u..]).assign(&bwd[timesteps - 1 - t]);
            }
            BiLstmOutput::Sequence(out)
        } else {
            let zeros = Array2::<f32>::zeros((batch, u));
            let last_fwd = fwd.last().unwrap_or(&zeros);
            let last_bwd = bwd.last().unwrap_or(&zeros);
            let out = concatenate(Axis(1), &[last_fwd.view(), last_bwd.view()])
                .map_err(|e| Error::ShapeMismatch(format!("bidirectional concat: {e}")))?;
            BiLstmOutput::Last(out)
        };

        let penalty = self.kernel_regularizer.map_or(0.0, |reg| {
            reg.penalty(self.forward.kernel.data().iter())
                + reg.penalty(self.backward.kernel.data().iter())
        });

        let cache = BiLstmCache { forward: forward_cache, backward: backward_cache, timesteps };
        Ok((output, cache, penalty))
    }

    /// Accumulate parameter gradients and return ∂loss/∂input
    pub(crate) fn backward(
        &self,
        cache: &BiLstmCache,
        grad: BiLstmOutput,
        input_dim: (usize, usize, usize),
    ) -> Result<Array3<f32>> {
        let timesteps = cache.timesteps;
        let u = self.units;
        let mut forward_grads: Vec<Option<Array2<f32>>> = vec![None; timesteps];
        let mut backward_grads: Vec<Option<Array2<f32>>> = vec![None; timesteps];

        match grad {
            BiLstmOutput::Sequence(g) => {
                for t in 0..timesteps {
                    forward_grads[t] = Some(g.slice(s![.., t, ..u]).to_owned());
                    backward_grads[timesteps - 1 - t] = Some(g.slice(s![.., t, u..]).to_owned());
                }
            }
            BiLstmOutput::Last(g) => {
                if let Some(last) = timesteps.checked_sub(1) {
                    forward_grads[last] = Some(g.slice(s![.., ..u]).to_owned());
                    backward_grads[last] = Some(g.slice(s![.., u..]).to_owned());
                }
            }
        }

        let mut input_grad = Array3::<f32>::zeros(input_dim);
        self.forward.backward(&cache.forward, &forward_grads, &mut input_grad)?;
        self.backward.backward(&cache.backward, &backward_grads, &mut input_grad)?;

        if let Some(reg) = self.kernel_regularizer {
            for cell in [&self.forward, &self.backward] {
                cell.kernel.accumulate_grad(cell.kernel.data().mapv(|w| reg.gradient(w)));
            }
        }
        Ok(input_grad)
    }

    pub(crate) fn parameters_mut(&mut self) -> [&mut Tensor; 6] {
        [
            &mut self.forward.kernel,
            &mut self.forward.recurrent_kernel,
            &mut self.forward.bias,
            &mut self.backward.kernel,
            &mut self.backward.recurrent_kernel,
            &mut self.backward.bias,
        ]
    }

    pub(crate) fn parameters(&self) -> [&Tensor; 6] {
        [
            &self.forward.kernel,
            &self.forward.recurrent_kernel,
            &self.forward.bias,
            &self.backward.kernel,
            &self.backward.recurrent_kernel,
            &self.backward.bias,
        ]
    }
}
