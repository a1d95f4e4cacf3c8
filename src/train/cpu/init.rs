//! Weight initialization and shared array helpers

use ndarray::{Array, Array1, Array2, ArrayView2, ShapeBuilder};
use rand::rngs::StdRng;
use rand::Rng;

use crate::error::{Error, Result};
use crate::Tensor;

/// Glorot/Xavier uniform for a `rows x cols` kernel, flattened row-major
pub(crate) fn glorot_uniform(rows: usize, cols: usize, rng: &mut StdRng) -> Tensor {
    let limit = (6.0 / (rows + cols).max(1) as f32).sqrt();
    let data: Vec<f32> = (0..rows * cols).map(|_| rng.random_range(-limit..limit)).collect();
    Tensor::from_vec(data, true)
}

/// Row-major matrix view over a flat parameter tensor
pub(crate) fn matrix(tensor: &Tensor, rows: usize, cols: usize) -> Result<ArrayView2<'_, f32>> {
    tensor
        .data()
        .view()
        .into_shape_with_order((rows, cols))
        .map_err(|e| Error::ShapeMismatch(format!("parameter as {rows}x{cols}: {e}")))
}

pub(crate) fn flatten(grad: &Array2<f32>) -> Array1<f32> {
    grad.iter().copied().collect()
}

/// Inverted dropout mask: zeros with probability `rate`, else `1 / (1 - rate)`
pub(crate) fn dropout_mask<Sh: ShapeBuilder>(
    shape: Sh,
    rate: f32,
    rng: &mut StdRng,
) -> Array<f32, Sh::Dim> {
    let keep = 1.0 / (1.0 - rate);
    Array::from_shape_fn(shape, |_| if rng.random::<f32>() < rate { 0.0 } else { keep })
}
