//! Sequential network graph with shape inference

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;

use super::layer::Layer;
use crate::error::{Error, Result};

/// Sequential stack of layers starting with an input layer
///
/// Shapes are inferred once at construction; a model that exists is
/// consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    name: String,
    layers: Vec<Layer>,
    /// Output shape of each layer (batch dimension excluded)
    shapes: Vec<Vec<usize>>,
}

impl Model {
    /// Validate the layer stack and infer every shape
    pub fn sequential(name: impl Into<String>, layers: Vec<Layer>) -> Result<Self> {
        let name = name.into();
        let mut seen = HashSet::new();
        let mut shapes: Vec<Vec<usize>> = Vec::with_capacity(layers.len());

        for (i, layer) in layers.iter().enumerate() {
            if !seen.insert(layer.name().to_string()) {
                return Err(Error::ShapeMismatch(format!(
                    "{name}: duplicate layer name '{}'",
                    layer.name()
                )));
            }
            let is_input = matches!(layer, Layer::Input { .. });
            if is_input != (i == 0) {
                return Err(Error::ShapeMismatch(format!(
                    "{name}: the input layer must come first and only once"
                )));
            }
            let input = shapes.last().map(Vec::as_slice).unwrap_or(&[]);
            shapes.push(layer.output_shape(input)?);
        }

        if shapes.is_empty() {
            return Err(Error::ShapeMismatch(format!("{name}: model has no layers")));
        }
        Ok(Self { name, layers, shapes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Find a layer by name
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name() == name)
    }

    /// Layers paired with their input shapes
    pub fn layers_with_inputs(&self) -> impl Iterator<Item = (&Layer, &[usize])> {
        let inputs = std::iter::once(&[][..]).chain(self.shapes.iter().map(Vec::as_slice));
        self.layers.iter().zip(inputs)
    }

    pub fn input_shape(&self) -> &[usize] {
        self.shapes.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn output_shape(&self) -> &[usize] {
        self.shapes.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total trainable parameters
    pub fn param_count(&self) -> usize {
        self.layers_with_inputs().map(|(layer, input)| layer.param_count(input)).sum()
    }

    /// Keras-style text summary
    pub fn summary(&self) -> String {
        let mut out = format!("Model: \"{}\"\n", self.name);
        for ((layer, input), shape) in self.layers_with_inputs().zip(&self.shapes) {
            let _ = writeln!(
                out,
                "{:<12} {:<20} (None, {}) {:>8}",
                layer.name(),
                layer.kind(),
                shape.iter().map(usize::to_string).collect::<Vec<_>>().join(", "),
                layer.param_count(input)
            );
        }
        let _ = writeln!(out, "Total params: {}", self.param_count());
        out
    }
}
