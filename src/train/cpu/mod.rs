//! Reference CPU trainer
//!
//! Trains dense and bidirectional-LSTM regression networks with mini-batch
//! Adam and hand-written backpropagation. One rng seeded from the compiled
//! model drives weight init, shuffling and dropout masks, so a fit is fully
//! reproducible from the model's seed.

mod dense;
mod init;
mod lstm;
mod network;


pub use network::{ForwardPass, Network};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use super::dataset::Dataset;
use super::fitter::{FitOptions, History, ModelFitter};
use super::loss::LossFn;
use super::metrics::Metric;
use crate::error::{Error, Result};
use crate::model::CompiledModel;
use crate::optim::Optimizer;
use crate::Tensor;

/// Mini-batch trainer running on the CPU
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuFitter;

impl CpuFitter {
    pub fn new() -> Self {
        Self
    }

    /// Train and return the fitted network alongside its history
    pub fn train(
        &self,
        model: &CompiledModel,
        data: &Dataset,
        options: &FitOptions,
    ) -> Result<(Network, History)> {
        check_shapes(model, data)?;
        if options.epochs == 0 || options.batch_size == 0 {
            return Err(Error::ConfigError(format!(
                "epochs and batch_size must be >= 1, got {} and {}",
                options.epochs, options.batch_size
            )));
        }

        let (train, validation) = data.split_validation(options.validation_split)?;
        let mut rng = StdRng::seed_from_u64(model.seed);
        let mut network = Network::from_model(&model.model, &mut rng)?;
        let mut optimizer = model.optimizer.build();
        let metrics: Vec<Box<dyn Metric>> = model.metrics.iter().map(|m| m.metric()).collect();
        let mut history = History::new();
        let mut order: Vec<usize> = (0..train.len()).collect();

        for epoch in 0..options.epochs {
            if options.shuffle {
                order.shuffle(&mut rng);
            }

            let mut loss_sum = 0.0f64;
            let mut batches = 0usize;
            let mut predictions = Vec::with_capacity(train.targets().len());
            let mut targets = Vec::with_capacity(train.targets().len());

            for chunk in order.chunks(options.batch_size) {
                let batch = train.select(chunk);
                let pass = network.forward(batch.features(), Some(&mut rng))?;
                let (residual_loss, grad) =
                    model.loss.value_and_gradient(batch.targets().view(), pass.output().view())?;
                let loss = residual_loss + pass.penalty();
                if !loss.is_finite() {
                    return Err(Error::Training(format!(
                        "non-finite loss at epoch {epoch}, batch {batches}"
                    )));
                }

                network.backward(&pass, grad)?;
                let mut params = network.parameters_mut();
                optimizer.step_refs(&mut params);
                optimizer.zero_grad_refs(&mut params);

                loss_sum += f64::from(loss);
                batches += 1;
                predictions.extend(pass.output().iter());
                targets.extend(batch.targets().iter());
            }

            history.record("loss", loss_sum / batches.max(1) as f64);
            record_metrics(&mut history, "", &metrics, predictions, targets);

            if let Some(validation) = &validation {
                let (val_loss, val_predictions) =
                    evaluate(&network, model, validation, options.batch_size)?;
                history.record("val_loss", val_loss);
                let val_targets = validation.targets().iter().copied().collect();
                record_metrics(&mut history, "val_", &metrics, val_predictions, val_targets);
            }

            debug!(
                epoch,
                loss_fn = model.loss.name(),
                loss = history.last("loss"),
                val_loss = history.last("val_loss"),
                "epoch complete"
            );
        }

        Ok((network, history))
    }
}

impl ModelFitter for CpuFitter {
    fn fit(
        &mut self,
        model: &CompiledModel,
        data: &Dataset,
        options: &FitOptions,
    ) -> Result<History> {
        self.train(model, data, options).map(|(_, history)| history)
    }
}

fn check_shapes(model: &CompiledModel, data: &Dataset) -> Result<()> {
    if data.sample_shape() != model.model.input_shape() {
        return Err(Error::ShapeMismatch(format!(
            "dataset samples are {:?}, model expects {:?}",
            data.sample_shape(),
            model.model.input_shape()
        )));
    }
    if [data.num_outputs()] != model.model.output_shape() {
        return Err(Error::ShapeMismatch(format!(
            "dataset has {} targets, model outputs {:?}",
            data.num_outputs(),
            model.model.output_shape()
        )));
    }
    Ok(())
}

/// Mean batch loss and all predictions, in inference mode
fn evaluate(
    network: &Network,
    model: &CompiledModel,
    data: &Dataset,
    batch_size: usize,
) -> Result<(f64, Vec<f32>)> {
    let order: Vec<usize> = (0..data.len()).collect();
    let mut loss_sum = 0.0f64;
    let mut batches = 0usize;
    let mut predictions = Vec::with_capacity(data.targets().len());

    for chunk in order.chunks(batch_size) {
        let batch = data.select(chunk);
        let pass = network.forward(batch.features(), None)?;
        let loss =
            model.loss.value(batch.targets().view(), pass.output().view())? + pass.penalty();
        loss_sum += f64::from(loss);
        batches += 1;
        predictions.extend(pass.output().iter());
    }
    Ok((loss_sum / batches.max(1) as f64, predictions))
}

fn record_metrics(
    history: &mut History,
    prefix: &str,
    metrics: &[Box<dyn Metric>],
    predictions: Vec<f32>,
    targets: Vec<f32>,
) {
    let predictions = Tensor::from_vec(predictions, false);
    let targets = Tensor::from_vec(targets, false);
    for metric in metrics {
        let value = metric.compute(&predictions, &targets);
        history.record(format!("{prefix}{}", metric.name()), f64::from(value));
    }
}
