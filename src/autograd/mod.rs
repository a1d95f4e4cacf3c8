//! Tape-based autograd core
//!
//! Each differentiable operation returns a [`Tensor`] carrying a
//! [`BackwardOp`]; calling [`backward`] on the result seeds its gradient and
//! walks the tape into the inputs. Loss functions build on this to hand
//! prediction gradients to the trainer.

mod backward;
mod tensor;


pub use backward::BackwardOp;
pub use tensor::{GradCell, Tensor};

/// Perform backward pass on a tensor
pub fn backward(tensor: &mut Tensor, grad_output: Option<ndarray::Array1<f32>>) {
    if let Some(grad) = grad_output {
        tensor.set_grad(grad);
    } else {
        // Initialize with ones for scalar loss
        let ones = ndarray::Array1::ones(tensor.data().len());
        tensor.set_grad(ones);
    }

    if let Some(op) = tensor.backward_op() {
        op.backward();
    }
}
