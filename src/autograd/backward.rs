//! Backward operation trait

/// A node in the gradient tape
///
/// Implementations read the gradient of their output and accumulate the
/// corresponding gradients into their inputs.
pub trait BackwardOp {
    fn backward(&self);
}
