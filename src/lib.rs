//! # Gender Classifier
//!
//! A small binary image classifier built with the Burn framework: train a
//! fixed CNN on a folder of labeled face images, then classify single image
//! files or live webcam frames.
//!
//! ## Modules
//!
//! - `config`: JSON configuration with defaults and validation
//! - `dataset`: Directory scanning, validation split, augmentation and batching
//! - `model`: CNN architecture and the on-disk model artifact
//! - `training`: Training loop, history and evaluation
//! - `inference`: File predictor and the webcam loop
//! - `utils`: Logging, metrics, charts and error types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gender_classifier::backend::{default_device, TrainingBackend};
//! use gender_classifier::config::AppConfig;
//! use gender_classifier::training::run_training;
//!
//! let config = AppConfig::default();
//! let outcome = run_training::<TrainingBackend>(&config, &default_device())?;
//! println!("saved to {:?}", outcome.artifact.weights_path());
//! ```

pub mod backend;
pub mod config;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::AppConfig;
pub use dataset::{DataGenerator, ImageBatcher, ImageFolder, ImageFolderDataset};
pub use inference::{PredictionResult, Predictor};
pub use model::{ClassifierConfig, ImageClassifier, ModelArtifact, ModelMetadata};
pub use training::{run_training, TrainingHistory};
pub use utils::error::{ClassifierError, Result};
pub use utils::metrics::Metrics;

/// Default square input size
pub const IMAGE_SIZE: usize = 128;

/// Probabilities at or above this are class 1
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
