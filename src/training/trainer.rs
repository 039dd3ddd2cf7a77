//! Supervised Training Loop
//!
//! A hand-written Burn loop: per epoch, walk the shuffled and augmented
//! training generator, step Adam on binary cross-entropy, then score the
//! validation generator without gradients.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    module::AutodiffModule,
    nn::loss::BinaryCrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::evaluation::evaluate_model;
use crate::config::AppConfig;
use crate::dataset::{
    Augmenter, DataGenerator, ImageBatch, ImageBatcher, ImageFolder, ImageFolderDataset,
    ImageItem, Subset,
};
use crate::model::{ClassifierConfig, ImageClassifier, ModelArtifact, ModelMetadata, TrainingSummary};
use crate::utils::charts::{self, ChartPanel, DataSeries, COLOR_PRIMARY, COLOR_SECONDARY};
use crate::utils::error::ClassifierError;
use crate::utils::logging::TrainingLogger;
use crate::DECISION_THRESHOLD;

/// Metrics of one epoch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpochRecord {
    /// One-based epoch number
    pub epoch: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub val_loss: Option<f64>,
    pub val_accuracy: Option<f64>,
}

/// Per-epoch metrics of a full run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochRecord>,
}

impl TrainingHistory {
    pub fn push(&mut self, record: EpochRecord) {
        self.epochs.push(record);
    }

    pub fn last(&self) -> Option<&EpochRecord> {
        self.epochs.last()
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Err(ClassifierError::PathNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Accuracy and loss per epoch as two side-by-side SVG panels
    pub fn plot(&self, path: &Path) -> std::io::Result<()> {
        let train_acc: Vec<f64> = self.epochs.iter().map(|e| e.train_accuracy).collect();
        let train_loss: Vec<f64> = self.epochs.iter().map(|e| e.train_loss).collect();
        let val_acc: Vec<f64> = self.epochs.iter().filter_map(|e| e.val_accuracy).collect();
        let val_loss: Vec<f64> = self.epochs.iter().filter_map(|e| e.val_loss).collect();

        let mut accuracy_series = vec![DataSeries::from_epochs("Training", &train_acc, COLOR_PRIMARY)];
        let mut loss_series = vec![DataSeries::from_epochs("Training", &train_loss, COLOR_PRIMARY)];
        if !val_acc.is_empty() {
            accuracy_series.push(DataSeries::from_epochs("Validation", &val_acc, COLOR_SECONDARY));
            loss_series.push(DataSeries::from_epochs("Validation", &val_loss, COLOR_SECONDARY));
        }

        let panels = [
            ChartPanel {
                title: "Model accuracy".to_string(),
                x_label: "Epoch".to_string(),
                y_label: "Accuracy".to_string(),
                series: accuracy_series,
            },
            ChartPanel {
                title: "Model loss".to_string(),
                x_label: "Epoch".to_string(),
                y_label: "Loss".to_string(),
                series: loss_series,
            },
        ];

        charts::generate_panels(&panels, path)
    }
}

/// What a finished run leaves behind
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub metadata: ModelMetadata,
    pub history: TrainingHistory,
    /// `history.json` and `history.svg`, when written
    pub history_files: Option<(PathBuf, PathBuf)>,
}

/// Training and validation generators over one image folder
pub struct Generators {
    pub class_names: Vec<String>,
    pub train: DataGenerator,
    pub validation: DataGenerator,
}

/// Scan the dataset and build both generators from the same split
///
/// The training generator is augmented and shuffled; the validation one is
/// neither.
pub fn build_generators(config: &AppConfig) -> crate::Result<Generators> {
    let data = &config.data;
    let folder = ImageFolder::open_binary(&data.dataset_dir)?;

    let train_samples = folder.subset(Subset::Training, data.validation_split);
    let val_samples = folder.subset(Subset::Validation, data.validation_split);

    let train_dataset = ImageFolderDataset::load(&train_samples, data.image_size, data.seed)?
        .with_augmentation(Augmenter::new(config.augmentation.clone()));
    let val_dataset = ImageFolderDataset::load(&val_samples, data.image_size, data.seed)?;

    if train_dataset.is_empty() {
        return Err(ClassifierError::Dataset(format!(
            "no readable training images in {:?}",
            data.dataset_dir
        )));
    }

    Ok(Generators {
        class_names: folder.class_names,
        train: DataGenerator::new(train_dataset, data.batch_size, data.shuffle, data.seed),
        validation: DataGenerator::new(val_dataset, data.batch_size, false, data.seed),
    })
}

/// Train a classifier end to end and write the model artifact
///
/// # Type Parameters
/// * `B` - The autodiff backend to use (e.g., `Autodiff<NdArray>` or `Autodiff<Cuda>`)
pub fn run_training<B>(config: &AppConfig, device: &B::Device) -> Result<TrainingOutcome>
where
    B: AutodiffBackend,
{
    config.validate().context("Invalid configuration")?;

    if !config.data.dataset_dir.is_dir() {
        return Err(ClassifierError::PathNotFound(config.data.dataset_dir.clone()))
            .context("Dataset directory does not exist");
    }

    std::fs::create_dir_all(&config.output.model_dir)
        .with_context(|| format!("Failed to create {:?}", config.output.model_dir))?;

    println!("{}", "Loading Dataset...".cyan());
    let Generators {
        class_names,
        train: mut train_gen,
        validation: mut val_gen,
    } = build_generators(config).context("Failed to build data generators")?;

    let [neg, pos] = train_gen.dataset().class_distribution();
    info!(
        "Classes: 0 = '{}' ({} training images), 1 = '{}' ({} training images)",
        class_names[0], neg, class_names[1], pos
    );
    if val_gen.is_empty() {
        warn!("Validation subset is empty; validation metrics will be skipped");
    }

    let image_size = config.data.image_size;
    let batcher = ImageBatcher::new(image_size);

    println!("{}", "Creating Model...".cyan());
    let model_config = ClassifierConfig::new().with_input_size(image_size);
    let mut model = ImageClassifier::<B>::new(&model_config, device);
    let mut optimizer = AdamConfig::new().init();
    let loss_fn = BinaryCrossEntropyLossConfig::new()
        .with_logits(true)
        .init(device);

    let epochs = config.training.epochs;
    let learning_rate = config.training.learning_rate;

    println!();
    println!("{}", "Training Configuration:".cyan().bold());
    println!("  📊 Training samples:   {}", train_gen.len());
    println!("  ✅ Validation samples: {}", val_gen.len());
    println!("  🔄 Epochs:             {}", epochs);
    println!("  📦 Batch size:         {}", train_gen.batch_size());
    println!("  📈 Learning rate:      {}", learning_rate);
    println!("  🖼️  Image size:         {}x{}", image_size, image_size);
    println!();

    let started = Instant::now();
    let mut logger = TrainingLogger::new(epochs);
    let mut history = TrainingHistory::default();

    for epoch in 0..epochs {
        logger.start_epoch(epoch);
        println!("{}", format!("Epoch {}/{}", epoch + 1, epochs).yellow().bold());

        let num_batches = train_gen.num_batches();
        let pb = ProgressBar::new(num_batches as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .context("Invalid progress template")?
                .progress_chars("=>-"),
        );

        let mut loss_sum = 0.0f64;
        let mut correct = 0usize;
        let mut seen = 0usize;

        for items in train_gen.epoch() {
            let batch_len = items.len();
            let batch = Batcher::<B, ImageItem, ImageBatch<B>>::batch(&batcher, items, device);

            let logits = model.forward(batch.images);
            let loss = loss_fn.forward(logits.clone(), batch.targets.clone());

            let loss_value: f64 = loss.clone().into_scalar().elem();
            loss_sum += loss_value * batch_len as f64;

            let predictions = burn::tensor::activation::sigmoid(logits.detach())
                .greater_equal_elem(DECISION_THRESHOLD)
                .int();
            let batch_correct: i64 = predictions
                .equal(batch.targets)
                .int()
                .sum()
                .into_scalar()
                .elem();
            correct += batch_correct as usize;
            seen += batch_len;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(learning_rate, model, grads);

            pb.inc(1);
            pb.set_message(format!(
                "loss: {:.4} acc: {:.2}%",
                loss_sum / seen as f64,
                100.0 * correct as f64 / seen as f64
            ));
        }
        pb.finish_and_clear();

        let train_loss = loss_sum / seen.max(1) as f64;
        let train_accuracy = correct as f64 / seen.max(1) as f64;

        let valid_model = model.valid();
        let validation = evaluate_model(&valid_model, &mut val_gen, &batcher, device);
        let val_loss = validation.as_ref().map(|v| v.loss());
        let val_accuracy = validation.as_ref().map(|v| v.accuracy());

        logger.end_epoch(train_loss, train_accuracy, val_loss, val_accuracy);
        match (val_loss, val_accuracy) {
            (Some(vl), Some(va)) => println!(
                "  {} loss: {:.4} | acc: {:.2}% | val_loss: {:.4} | val_acc: {:.2}%",
                "→".cyan(),
                train_loss,
                train_accuracy * 100.0,
                vl,
                va * 100.0
            ),
            _ => println!(
                "  {} loss: {:.4} | acc: {:.2}%",
                "→".cyan(),
                train_loss,
                train_accuracy * 100.0
            ),
        }

        history.push(EpochRecord {
            epoch: epoch + 1,
            train_loss,
            train_accuracy,
            val_loss,
            val_accuracy,
        });
    }
    logger.log_complete();

    let summary = TrainingSummary {
        epochs,
        training_samples: train_gen.len(),
        validation_samples: val_gen.len(),
        final_train_loss: history.last().map(|e| e.train_loss).unwrap_or(f64::NAN),
        final_train_accuracy: history.last().map(|e| e.train_accuracy).unwrap_or(0.0),
        final_val_loss: history.last().and_then(|e| e.val_loss),
        final_val_accuracy: history.last().and_then(|e| e.val_accuracy),
        duration_secs: started.elapsed().as_secs_f64(),
    };
    let metadata = ModelMetadata::new(model_config, class_names).with_training(summary);

    println!();
    println!("{}", "Saving Model...".cyan());
    let artifact = ModelArtifact::from_config(&config.output);
    artifact
        .save(&model, &metadata)
        .context("Failed to save model artifact")?;
    println!("  💾 Saved to: {:?}", artifact.weights_path());

    let history_files = if config.output.save_history {
        let json_path = config.output.model_dir.join("history.json");
        let svg_path = config.output.model_dir.join("history.svg");
        history.save(&json_path).context("Failed to save history")?;
        history
            .plot(&svg_path)
            .with_context(|| format!("Failed to write {:?}", svg_path))?;
        println!("  📈 History: {:?}", svg_path);
        Some((json_path, svg_path))
    } else {
        None
    };

    println!();
    println!("{}", "Training Complete!".green().bold());

    Ok(TrainingOutcome {
        artifact,
        metadata,
        history,
        history_files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AugmentationConfig;
    use crate::dataset::loader::tests::write_class;
    use crate::inference::{FileClassification, Predictor};
    use burn::backend::Autodiff;
    use burn_ndarray::NdArray;

    type TestBackend = Autodiff<NdArray>;

    fn tiny_config(root: &Path) -> AppConfig {
        let dataset = root.join("dataset");
        write_class(&dataset, "hombre", 4, [20, 20, 200]);
        write_class(&dataset, "mujer", 4, [200, 20, 20]);

        let mut config = AppConfig::default();
        config.data.dataset_dir = dataset;
        config.data.image_size = 24;
        config.data.batch_size = 3;
        config.data.validation_split = 0.25;
        config.training.epochs = 2;
        config.output.model_dir = root.join("models");
        config.output.model_name = "tiny".to_string();
        config
    }

    #[test]
    fn test_end_to_end_training() {
        let dir = tempfile::tempdir().unwrap();
        let config = tiny_config(dir.path());

        let outcome = run_training::<TestBackend>(&config, &Default::default()).unwrap();

        assert!(outcome.artifact.exists());
        assert_eq!(outcome.history.len(), 2);
        assert_eq!(outcome.metadata.class_names, vec!["hombre", "mujer"]);

        let summary = outcome.metadata.training.as_ref().unwrap();
        assert_eq!(summary.training_samples, 6);
        assert_eq!(summary.validation_samples, 2);

        let last = outcome.history.last().unwrap();
        assert!(last.train_loss.is_finite());
        assert!(last.val_accuracy.is_some());

        let (json_path, svg_path) = outcome.history_files.unwrap();
        assert_eq!(TrainingHistory::load(&json_path).unwrap(), outcome.history);
        assert!(std::fs::read_to_string(svg_path).unwrap().contains("<svg"));
    }

    #[test]
    fn test_trained_model_separates_colours() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("dataset");
        write_class(&dataset, "blue", 8, [20, 20, 220]);
        write_class(&dataset, "red", 8, [220, 20, 20]);

        let mut config = AppConfig::default();
        config.data.dataset_dir = dataset;
        config.data.image_size = 24;
        config.data.batch_size = 4;
        config.data.validation_split = 0.25;
        config.training.epochs = 20;
        config.augmentation = AugmentationConfig::none();
        config.output.model_dir = dir.path().join("models");
        config.output.model_name = "colours".to_string();
        config.output.save_history = false;

        let outcome = run_training::<TestBackend>(&config, &Default::default()).unwrap();
        let last = outcome.history.last().unwrap();
        assert_eq!(last.val_accuracy, Some(1.0));

        let predictor = Predictor::<NdArray>::load(&outcome.artifact, &Default::default()).unwrap();
        for (colour, expected) in [([230, 10, 10], "red"), ([10, 10, 230], "blue")] {
            let path = dir.path().join(format!("{}.png", expected));
            image::RgbImage::from_pixel(30, 30, image::Rgb(colour)).save(&path).unwrap();

            match predictor.classify_file(&path).unwrap() {
                FileClassification::Predicted(result) => assert_eq!(result.label, expected),
                other => panic!("unexpected outcome: {:?}", other),
            }
        }
    }

    #[test]
    fn test_without_validation_split() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = tiny_config(dir.path());
        config.data.validation_split = 0.0;
        config.training.epochs = 1;
        config.augmentation = AugmentationConfig::none();
        config.output.save_history = false;

        let outcome = run_training::<TestBackend>(&config, &Default::default()).unwrap();
        let last = outcome.history.last().unwrap();
        assert!(last.val_loss.is_none());
        assert!(last.val_accuracy.is_none());
        assert!(outcome.history_files.is_none());
    }

    #[test]
    fn test_missing_dataset_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.data.dataset_dir = dir.path().join("nope");
        config.output.model_dir = dir.path().join("models");

        let err = run_training::<TestBackend>(&config, &Default::default()).unwrap_err();
        assert!(err.to_string().contains("Dataset directory does not exist"));
        assert!(!dir.path().join("models").exists());
    }

    #[test]
    fn test_history_plot_without_validation() {
        let dir = tempfile::tempdir().unwrap();
        let history = TrainingHistory {
            epochs: vec![EpochRecord {
                epoch: 1,
                train_loss: 0.7,
                train_accuracy: 0.5,
                val_loss: None,
                val_accuracy: None,
            }],
        };
        let path = dir.path().join("history.svg");
        history.plot(&path).unwrap();
        let svg = std::fs::read_to_string(path).unwrap();
        assert!(svg.contains("Model accuracy"));
        assert!(!svg.contains("Validation"));
    }
}
