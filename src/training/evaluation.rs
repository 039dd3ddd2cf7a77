//! Model evaluation over a data generator
//!
//! Shared by the per-epoch validation pass and the `evaluate` command.

use burn::data::dataloader::batcher::Batcher;
use burn::nn::loss::BinaryCrossEntropyLossConfig;
use burn::prelude::*;
use burn::tensor::ElementConversion;

use crate::dataset::{DataGenerator, ImageBatch, ImageBatcher, ImageItem};
use crate::inference::predictor::decide;
use crate::model::ImageClassifier;
use crate::utils::metrics::{BinaryConfusion, Metrics};

/// Metrics plus the raw per-sample outputs
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub metrics: Metrics,
    /// Sigmoid outputs in generator order
    pub probabilities: Vec<f32>,
    pub labels: Vec<usize>,
}

impl Evaluation {
    pub fn loss(&self) -> f64 {
        self.metrics.loss.unwrap_or(f64::NAN)
    }

    pub fn accuracy(&self) -> f64 {
        self.metrics.accuracy
    }
}

/// Run the model over one full epoch of `generator` without gradients
///
/// Returns `None` when the generator holds no samples.
pub fn evaluate_model<B: Backend>(
    model: &ImageClassifier<B>,
    generator: &mut DataGenerator,
    batcher: &ImageBatcher,
    device: &B::Device,
) -> Option<Evaluation> {
    if generator.is_empty() {
        return None;
    }

    let loss_fn = BinaryCrossEntropyLossConfig::new()
        .with_logits(true)
        .init(device);

    let mut loss_sum = 0.0f64;
    let mut confusion = BinaryConfusion::default();
    let mut probabilities = Vec::with_capacity(generator.len());
    let mut labels = Vec::with_capacity(generator.len());

    for items in generator.epoch() {
        let batch_labels: Vec<usize> = items.iter().map(|item| item.label).collect();
        let batch = Batcher::<B, ImageItem, ImageBatch<B>>::batch(batcher, items, device);

        let logits = model.forward(batch.images);
        let loss = loss_fn.forward(logits.clone(), batch.targets);
        let loss_value: f64 = loss.into_scalar().elem();
        loss_sum += loss_value * batch_labels.len() as f64;

        let batch_probs: Vec<f32> = burn::tensor::activation::sigmoid(logits)
            .into_data()
            .convert::<f32>()
            .to_vec()
            .unwrap_or_default();

        for (&p, &label) in batch_probs.iter().zip(&batch_labels) {
            confusion.record(decide(p as f64), label);
        }

        probabilities.extend(batch_probs);
        labels.extend(batch_labels);
    }

    if labels.is_empty() {
        return None;
    }

    let metrics = Metrics::from_confusion(confusion).with_loss(loss_sum / labels.len() as f64);

    Some(Evaluation {
        metrics,
        probabilities,
        labels,
    })
}
