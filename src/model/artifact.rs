//! Model Artifact
//!
//! A trained model lives as two files sharing a stem:
//! - `<name>.mpk`: weights written by Burn's `CompactRecorder`
//! - `<name>.json`: metadata needed to rebuild and interpret the network

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::backend::Backend;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::cnn::{ClassifierConfig, ImageClassifier};
use crate::config::OutputConfig;
use crate::utils::error::{ClassifierError, Result};

/// Bumped whenever the metadata layout or network topology changes
pub const FORMAT_VERSION: u32 = 1;

/// Summary of the run that produced the weights
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingSummary {
    pub epochs: usize,
    pub training_samples: usize,
    pub validation_samples: usize,
    pub final_train_loss: f64,
    pub final_train_accuracy: f64,
    pub final_val_loss: Option<f64>,
    pub final_val_accuracy: Option<f64>,
    pub duration_secs: f64,
}

/// Everything besides the weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub format_version: u32,
    pub model: ClassifierConfig,
    /// Class names in label order; index 1 is the positive class
    pub class_names: Vec<String>,
    pub image_size: usize,
    pub training: Option<TrainingSummary>,
    pub created_at: DateTime<Utc>,
}

impl ModelMetadata {
    pub fn new(model: ClassifierConfig, class_names: Vec<String>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            image_size: model.input_size,
            model,
            class_names,
            training: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_training(mut self, summary: TrainingSummary) -> Self {
        self.training = Some(summary);
        self
    }

    /// Label for a class index, falling back to the index itself
    pub fn class_name(&self, index: usize) -> String {
        self.class_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("class {}", index))
    }

    pub fn validate(&self) -> Result<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(ClassifierError::Model(format!(
                "unsupported artifact format version {} (expected {})",
                self.format_version, FORMAT_VERSION
            )));
        }

        if self.class_names.len() != 2 {
            return Err(ClassifierError::Model(format!(
                "expected 2 class names, found {}",
                self.class_names.len()
            )));
        }

        if self.image_size != self.model.input_size {
            return Err(ClassifierError::Model(format!(
                "image_size {} does not match model input size {}",
                self.image_size, self.model.input_size
            )));
        }

        Ok(())
    }
}

/// Location of a model artifact on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifact {
    dir: PathBuf,
    name: String,
}

impl ModelArtifact {
    pub fn new<P: AsRef<Path>>(dir: P, name: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            name: name.to_string(),
        }
    }

    pub fn from_config(output: &OutputConfig) -> Self {
        Self::new(&output.model_dir, &output.model_name)
    }

    /// Accepts `models/foo`, `models/foo.mpk` or `models/foo.json`
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let stem_path = match path.extension().and_then(|e| e.to_str()) {
            Some("mpk") | Some("json") => path.with_extension(""),
            _ => path.to_path_buf(),
        };

        let dir = stem_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let name = stem_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Self { dir, name }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path handed to the recorder, which appends `.mpk` itself
    fn base_path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    pub fn weights_path(&self) -> PathBuf {
        self.base_path().with_extension("mpk")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.base_path().with_extension("json")
    }

    pub fn exists(&self) -> bool {
        self.weights_path().is_file() && self.metadata_path().is_file()
    }

    /// Write weights and metadata, creating the directory if needed
    pub fn save<B: Backend>(
        &self,
        model: &ImageClassifier<B>,
        metadata: &ModelMetadata,
    ) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let recorder = CompactRecorder::new();
        model
            .clone()
            .save_file(self.base_path(), &recorder)
            .map_err(|e| ClassifierError::Model(format!("Failed to save weights: {:?}", e)))?;

        let json = serde_json::to_string_pretty(metadata)?;
        std::fs::write(self.metadata_path(), json)?;

        info!("Model saved to {:?}", self.weights_path());
        Ok(())
    }

    /// Read and check the metadata file
    pub fn load_metadata(&self) -> Result<ModelMetadata> {
        let path = self.metadata_path();
        if !path.is_file() {
            return Err(ClassifierError::PathNotFound(path));
        }

        let json = std::fs::read_to_string(&path)?;
        let metadata: ModelMetadata = serde_json::from_str(&json).map_err(|e| {
            ClassifierError::Model(format!("Invalid metadata {:?}: {}", path, e))
        })?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Rebuild the network from metadata and load its weights
    pub fn load<B: Backend>(&self, device: &B::Device) -> Result<(ImageClassifier<B>, ModelMetadata)> {
        let metadata = self.load_metadata()?;

        let weights = self.weights_path();
        if !weights.is_file() {
            return Err(ClassifierError::PathNotFound(weights));
        }

        info!("Loading model from {:?}", weights);
        let recorder = CompactRecorder::new();
        let model = ImageClassifier::<B>::new(&metadata.model, device)
            .load_file(self.base_path(), &recorder, device)
            .map_err(|e| ClassifierError::Model(format!("Failed to load weights: {:?}", e)))?;

        Ok((model, metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Tensor;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    fn small_metadata() -> ModelMetadata {
        let config = ClassifierConfig::new().with_input_size(24).with_dense_units(8);
        ModelMetadata::new(config, vec!["hombre".to_string(), "mujer".to_string()])
    }

    #[test]
    fn test_paths() {
        let artifact = ModelArtifact::new("models", "gender_classifier");
        assert_eq!(artifact.weights_path(), PathBuf::from("models/gender_classifier.mpk"));
        assert_eq!(artifact.metadata_path(), PathBuf::from("models/gender_classifier.json"));
    }

    #[test]
    fn test_from_path_strips_extension() {
        let a = ModelArtifact::from_path("models/gender_classifier.mpk");
        let b = ModelArtifact::from_path("models/gender_classifier");
        assert_eq!(a, b);
        assert_eq!(a.name(), "gender_classifier");
        assert_eq!(a.dir(), Path::new("models"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ModelArtifact::new(dir.path().join("nested"), "tiny");

        let device = Default::default();
        let metadata = small_metadata();
        let model = ImageClassifier::<TestBackend>::new(&metadata.model, &device);
        artifact.save(&model, &metadata).unwrap();
        assert!(artifact.exists());

        let (loaded, loaded_meta) = artifact.load::<TestBackend>(&device).unwrap();
        assert_eq!(loaded_meta.class_names, metadata.class_names);
        assert_eq!(loaded_meta.image_size, 24);

        let input = Tensor::<TestBackend, 4>::ones([1, 3, 24, 24], &device);
        let before: Vec<f32> = model.forward_probability(input.clone()).into_data().to_vec().unwrap();
        let after: Vec<f32> = loaded.forward_probability(input).into_data().to_vec().unwrap();
        // CompactRecorder stores half precision
        assert!((before[0] - after[0]).abs() < 1e-2);
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ModelArtifact::new(dir.path(), "absent");
        let err = artifact.load::<TestBackend>(&Default::default()).unwrap_err();
        assert!(matches!(err, ClassifierError::PathNotFound(_)));
    }

    #[test]
    fn test_missing_weights() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ModelArtifact::new(dir.path(), "half");
        std::fs::write(
            artifact.metadata_path(),
            serde_json::to_string(&small_metadata()).unwrap(),
        )
        .unwrap();

        let err = artifact.load::<TestBackend>(&Default::default()).unwrap_err();
        assert!(matches!(err, ClassifierError::PathNotFound(p) if p.ends_with("half.mpk")));
    }

    #[test]
    fn test_corrupt_weights() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ModelArtifact::new(dir.path(), "broken");
        std::fs::write(
            artifact.metadata_path(),
            serde_json::to_string(&small_metadata()).unwrap(),
        )
        .unwrap();
        std::fs::write(artifact.weights_path(), b"not a model").unwrap();

        let err = artifact.load::<TestBackend>(&Default::default()).unwrap_err();
        assert!(matches!(err, ClassifierError::Model(_)));
    }

    #[test]
    fn test_metadata_validation() {
        let mut metadata = small_metadata();
        assert!(metadata.validate().is_ok());

        metadata.class_names.push("extra".to_string());
        assert!(metadata.validate().is_err());

        let mut metadata = small_metadata();
        metadata.format_version = 99;
        assert!(metadata.validate().is_err());
    }

    #[test]
    fn test_class_name_fallback() {
        let metadata = small_metadata();
        assert_eq!(metadata.class_name(1), "mujer");
        assert_eq!(metadata.class_name(5), "class 5");
    }
}
