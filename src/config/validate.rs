//! Configuration validation

use super::schema::{SearchConfiguration, StepRange};

/// Validation error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Input shape must not be empty")]
    EmptyInputShape,

    #[error("Input shape {0:?} contains a zero dimension")]
    ZeroInputDim(Vec<usize>),

    #[error("Invalid num_outputs: {0} (must be >= 1)")]
    InvalidOutputs(usize),

    #[error("Invalid layer range: {min}..={max} (need 1 <= min <= max)")]
    InvalidLayers { min: usize, max: usize },

    #[error("Invalid {name} range: {min}..={max} step {step} (need 1 <= min <= max, step >= 1)")]
    InvalidRange { name: &'static str, min: usize, max: usize, step: usize },
}

fn check_range(name: &'static str, range: StepRange) -> Result<(), ValidationError> {
    if range.min == 0 || range.min > range.max || range.step == 0 {
        return Err(ValidationError::InvalidRange {
            name,
            min: range.min,
            max: range.max,
            step: range.step,
        });
    }
    Ok(())
}

/// Validate a search configuration
///
/// Checks:
/// - Input shape is non-empty with non-zero dimensions
/// - At least one output
/// - Layer bounds are ordered and positive
/// - Every step range is ordered, positive and has a positive step
pub fn validate_config(config: &SearchConfiguration) -> Result<(), ValidationError> {
    if config.input_shape.is_empty() {
        return Err(ValidationError::EmptyInputShape);
    }
    if config.input_shape.contains(&0) {
        return Err(ValidationError::ZeroInputDim(config.input_shape.clone()));
    }
    if config.num_outputs == 0 {
        return Err(ValidationError::InvalidOutputs(config.num_outputs));
    }
    if config.min_layers == 0 || config.min_layers > config.max_layers {
        return Err(ValidationError::InvalidLayers {
            min: config.min_layers,
            max: config.max_layers,
        });
    }
    check_range("units", config.recurrent_units())?;
    check_range("dense_units", config.dense_units)?;
    check_range("batch_size", config.batch_size)?;
    Ok(())
}
