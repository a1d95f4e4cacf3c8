//! Optimizer trait

use crate::Tensor;

/// Trait for optimization algorithms
///
/// Parameters are usually owned by network layers, so the core update works
/// on borrowed tensors. Parameter positions must stay stable across steps:
/// per-parameter state is keyed by index.
pub trait Optimizer {
    /// Perform an optimization step on referenced parameters
    fn step_refs(&mut self, params: &mut [&mut Tensor]);

    /// Perform a single optimization step on owned parameters
    fn step(&mut self, params: &mut [Tensor]) {
        let mut refs: Vec<&mut Tensor> = params.iter_mut().collect();
        self.step_refs(&mut refs);
    }

    /// Zero gradients on referenced parameters
    fn zero_grad_refs(&mut self, params: &mut [&mut Tensor]) {
        for param in params.iter_mut() {
            param.zero_grad();
        }
    }

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);
}
