//! Trainable network built from a [`Model`] description

use ndarray::{Array2, Array3, ArrayD, Ix2, Ix3};
use rand::rngs::StdRng;

use super::dense::{DenseCache, DenseLayer};
use super::init::dropout_mask;
use super::lstm::{BiLstmCache, BiLstmLayer, BiLstmOutput};
use crate::error::{Error, Result};
use crate::model::{Layer, Model};
use crate::Tensor;

/// Activations flowing between layers
enum Activations {
    Flat(Array2<f32>),
    Sequence(Array3<f32>),
}

impl Activations {
    fn from_input(input: &ArrayD<f32>) -> Result<Self> {
        match input.ndim() {
            2 => input
                .clone()
                .into_dimensionality::<Ix2>()
                .map(Activations::Flat)
                .map_err(|e| Error::ShapeMismatch(e.to_string())),
            3 => input
                .clone()
                .into_dimensionality::<Ix3>()
                .map(Activations::Sequence)
                .map_err(|e| Error::ShapeMismatch(e.to_string())),
            n => Err(Error::ShapeMismatch(format!(
                "expected [batch, features] or [batch, time, features], got rank {n}"
            ))),
        }
    }
}

enum NetLayer {
    Dense(DenseLayer),
    Dropout(f32),
    Bidirectional(BiLstmLayer),
}

enum LayerCache {
    Dense(DenseCache),
    /// `None` when the layer was inactive
    Dropout(Option<Activations>),
    Bidirectional(BiLstmCache, (usize, usize, usize)),
}

/// Result of a forward pass, kept for the backward pass
pub struct ForwardPass {
    output: Array2<f32>,
    caches: Vec<LayerCache>,
    penalty: f32,
}

impl ForwardPass {
    /// Network output, `[batch, outputs]`
    pub fn output(&self) -> &Array2<f32> {
        &self.output
    }

    /// Sum of activity and kernel regularization penalties
    pub fn penalty(&self) -> f32 {
        self.penalty
    }
}

/// Weights for every trainable layer of a model
pub struct Network {
    layers: Vec<NetLayer>,
}

impl Network {
    /// Allocate and initialize weights for `model`
    pub fn from_model(model: &Model, rng: &mut StdRng) -> Result<Self> {
        let mut layers = Vec::new();
        for (layer, input) in model.layers_with_inputs() {
            let in_dim = input.last().copied().unwrap_or(0);
            match layer {
                Layer::Input { .. } => {}
                Layer::Dense { units, activation, activity_regularizer, .. } => {
                    layers.push(NetLayer::Dense(DenseLayer::new(
                        in_dim,
                        *units,
                        *activation,
                        *activity_regularizer,
                        rng,
                    )));
                }
                Layer::Dropout { rate, .. } => layers.push(NetLayer::Dropout(*rate)),
                Layer::Bidirectional {
                    units,
                    recurrent_dropout,
                    kernel_regularizer,
                    return_sequences,
                    ..
                } => layers.push(NetLayer::Bidirectional(BiLstmLayer::new(
                    in_dim,
                    *units,
                    *return_sequences,
                    *recurrent_dropout,
                    *kernel_regularizer,
                    rng,
                ))),
            }
        }
        Ok(Self { layers })
    }

    /// Run the network on a batch
    ///
    /// Passing an rng selects training mode: dropout and recurrent dropout
    /// masks are drawn from it.
    pub fn forward(&self, input: &ArrayD<f32>, mut rng: Option<&mut StdRng>) -> Result<ForwardPass> {
        let mut x = Activations::from_input(input)?;
        let mut caches = Vec::with_capacity(self.layers.len());
        let mut penalty = 0.0;

        for layer in &self.layers {
            x = match (layer, x) {
                (NetLayer::Dense(dense), Activations::Flat(a)) => {
                    let (out, cache, p) = dense.forward(a)?;
                    penalty += p;
                    caches.push(LayerCache::Dense(cache));
                    Activations::Flat(out)
                }
                (NetLayer::Dropout(rate), x) => match rng.as_deref_mut() {
                    Some(rng) if *rate > 0.0 => {
                        let (out, mask) = match x {
                            Activations::Flat(a) => {
                                let mask = dropout_mask(a.dim(), *rate, rng);
                                (Activations::Flat(a * &mask), Activations::Flat(mask))
                            }
                            Activations::Sequence(a) => {
                                let mask = dropout_mask(a.dim(), *rate, rng);
                                (Activations::Sequence(a * &mask), Activations::Sequence(mask))
                            }
                        };
                        caches.push(LayerCache::Dropout(Some(mask)));
                        out
                    }
                    _ => {
                        caches.push(LayerCache::Dropout(None));
                        x
                    }
                },
                (NetLayer::Bidirectional(lstm), Activations::Sequence(a)) => {
                    let (out, cache, p) = lstm.forward(&a, rng.as_deref_mut())?;
                    penalty += p;
                    caches.push(LayerCache::Bidirectional(cache, a.dim()));
                    match out {
                        BiLstmOutput::Last(o) => Activations::Flat(o),
                        BiLstmOutput::Sequence(o) => Activations::Sequence(o),
                    }
                }
                (NetLayer::Dense(_), Activations::Sequence(_)) => {
                    return Err(Error::ShapeMismatch("dense layer received a sequence".into()))
                }
                (NetLayer::Bidirectional(_), Activations::Flat(_)) => {
                    return Err(Error::ShapeMismatch(
                        "recurrent layer received a flat input".into(),
                    ))
                }
            };
        }

        match x {
            Activations::Flat(output) => Ok(ForwardPass { output, caches, penalty }),
            Activations::Sequence(_) => {
                Err(Error::ShapeMismatch("network output must be [batch, outputs]".into()))
            }
        }
    }

    /// Accumulate gradients of every parameter given ∂loss/∂output
    pub fn backward(&self, pass: &ForwardPass, grad: Array2<f32>) -> Result<()> {
        let mut grad = Activations::Flat(grad);
        for (layer, cache) in self.layers.iter().zip(&pass.caches).rev() {
            grad = match (layer, cache, grad) {
                (NetLayer::Dense(dense), LayerCache::Dense(cache), Activations::Flat(g)) => {
                    Activations::Flat(dense.backward(cache, g)?)
                }
                (NetLayer::Dropout(_), LayerCache::Dropout(mask), g) => match (mask, g) {
                    (None, g) => g,
                    (Some(Activations::Flat(m)), Activations::Flat(g)) => Activations::Flat(g * m),
                    (Some(Activations::Sequence(m)), Activations::Sequence(g)) => {
                        Activations::Sequence(g * m)
                    }
                    _ => return Err(Error::ShapeMismatch("dropout mask shape".into())),
                },
                (NetLayer::Bidirectional(lstm), LayerCache::Bidirectional(cache, dim), g) => {
                    let g = match g {
                        Activations::Flat(g) => BiLstmOutput::Last(g),
                        Activations::Sequence(g) => BiLstmOutput::Sequence(g),
                    };
                    Activations::Sequence(lstm.backward(cache, g, *dim)?)
                }
                _ => return Err(Error::ShapeMismatch("layer cache does not match layer".into())),
            };
        }
        Ok(())
    }

    /// Inference-mode forward pass
    pub fn predict(&self, input: &ArrayD<f32>) -> Result<Array2<f32>> {
        Ok(self.forward(input, None)?.output)
    }

    /// Trainable tensors in a stable order
    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        let mut params = Vec::new();
        for layer in &mut self.layers {
            match layer {
                NetLayer::Dense(dense) => params.extend(dense.parameters_mut()),
                NetLayer::Bidirectional(lstm) => params.extend(lstm.parameters_mut()),
                NetLayer::Dropout(_) => {}
            }
        }
        params
    }

    pub fn parameters(&self) -> Vec<&Tensor> {
        let mut params = Vec::new();
        for layer in &self.layers {
            match layer {
                NetLayer::Dense(dense) => params.extend(dense.parameters()),
                NetLayer::Bidirectional(lstm) => params.extend(lstm.parameters()),
                NetLayer::Dropout(_) => {}
            }
        }
        params
    }

    pub fn param_count(&self) -> usize {
        self.parameters().iter().map(|t| t.len()).sum()
    }
}
