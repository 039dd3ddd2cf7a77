//! Application Configuration
//!
//! All tunables for training and inference in one serde-serializable tree.
//! Defaults reproduce the classic setup: 128x128 RGB inputs, batches of 32,
//! 10 epochs, a 20% validation split and Keras-style affine augmentation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::cnn::feature_map_side;
use crate::utils::error::{ClassifierError, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub augmentation: AugmentationConfig,
    pub training: TrainingConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file; missing fields take defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ClassifierError::PathNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.data.validate()?;
        self.augmentation.validate()?;
        self.training.validate()?;
        Ok(())
    }
}

/// Where the images live and how they are batched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    /// Root directory with one subdirectory per class
    pub dataset_dir: PathBuf,
    /// Square side images are resized to
    pub image_size: usize,
    /// Images per batch
    pub batch_size: usize,
    /// Fraction of each class held out for validation, taken from the
    /// start of the sorted file list
    pub validation_split: f64,
    /// Reshuffle the training subset every epoch
    pub shuffle: bool,
    /// Seed for shuffling and augmentation
    pub seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("dataset"),
            image_size: crate::IMAGE_SIZE,
            batch_size: 32,
            validation_split: 0.2,
            shuffle: true,
            seed: 42,
        }
    }
}

impl DataConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ClassifierError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(ClassifierError::Config(
                "validation_split must be in range [0.0, 1.0)".to_string(),
            ));
        }

        if feature_map_side(self.image_size) == 0 {
            return Err(ClassifierError::Config(format!(
                "image_size {} is too small for three conv/pool blocks (minimum 22)",
                self.image_size
            )));
        }

        Ok(())
    }
}

/// Random affine augmentation applied to training images
///
/// Ranges follow the usual image-generator conventions: rotation and shear
/// in degrees, shifts as a fraction of width/height, zoom as the half-width
/// of the scale interval around 1.0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AugmentationConfig {
    pub rotation_range: f32,
    pub width_shift_range: f32,
    pub height_shift_range: f32,
    pub shear_range: f32,
    pub zoom_range: f32,
    pub horizontal_flip: bool,
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self {
            rotation_range: 30.0,
            width_shift_range: 0.2,
            height_shift_range: 0.2,
            shear_range: 0.2,
            zoom_range: 0.2,
            horizontal_flip: true,
        }
    }
}

impl AugmentationConfig {
    /// No augmentation (validation and inference)
    pub fn none() -> Self {
        Self {
            rotation_range: 0.0,
            width_shift_range: 0.0,
            height_shift_range: 0.0,
            shear_range: 0.0,
            zoom_range: 0.0,
            horizontal_flip: false,
        }
    }

    /// Whether any transform can fire
    pub fn is_enabled(&self) -> bool {
        self.rotation_range > 0.0
            || self.width_shift_range > 0.0
            || self.height_shift_range > 0.0
            || self.shear_range > 0.0
            || self.zoom_range > 0.0
            || self.horizontal_flip
    }

    pub fn validate(&self) -> Result<()> {
        let ranges = [
            ("rotation_range", self.rotation_range),
            ("width_shift_range", self.width_shift_range),
            ("height_shift_range", self.height_shift_range),
            ("shear_range", self.shear_range),
            ("zoom_range", self.zoom_range),
        ];

        for (name, value) in ranges {
            if value < 0.0 || !value.is_finite() {
                return Err(ClassifierError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if self.zoom_range >= 1.0 {
            return Err(ClassifierError::Config(
                "zoom_range must be below 1.0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Optimizer and loop settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    /// Adam learning rate
    pub learning_rate: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            learning_rate: 1e-3,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(ClassifierError::Config(
                "epochs must be greater than 0".to_string(),
            ));
        }

        if self.learning_rate <= 0.0 || !self.learning_rate.is_finite() {
            return Err(ClassifierError::Config(
                "learning_rate must be a positive number".to_string(),
            ));
        }

        Ok(())
    }
}

/// Where trained artifacts go
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub model_dir: PathBuf,
    /// Artifact file stem (`<name>.mpk` + `<name>.json`)
    pub model_name: String,
    /// Write history.json and history.svg next to the model
    pub save_history: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            model_name: "gender_classifier".to_string(),
            save_history: true,
        }
    }
}
