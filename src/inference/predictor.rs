//! Inference Predictor Module
//!
//! Loads a trained artifact once and classifies single images, either from
//! disk or already decoded (webcam frames).

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use burn::prelude::*;
use image::imageops::FilterType;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::preprocess::{load_rgb, resize_rgb, to_chw};
use crate::model::{ImageClassifier, ModelArtifact, ModelMetadata};
use crate::utils::error::{ClassifierError, Result};
use crate::DECISION_THRESHOLD;

/// Printed when the user points at something that is not an image file
pub const INVALID_PATH_MESSAGE: &str = "image path does not exist or is not valid";

/// Class index for a probability of class 1: below the threshold is class 0
pub fn decide(probability: f64) -> usize {
    if probability < DECISION_THRESHOLD {
        0
    } else {
        1
    }
}

/// Result of a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Path to the input image (if applicable)
    pub image_path: Option<PathBuf>,

    /// Sigmoid output: probability of class 1
    pub probability: f32,

    /// Predicted class index
    pub class_index: usize,

    /// Predicted class name
    pub label: String,

    /// Inference time in milliseconds
    pub inference_time_ms: f64,
}

impl PredictionResult {
    pub fn new(
        probability: f32,
        metadata: &ModelMetadata,
        inference_time: Duration,
        image_path: Option<PathBuf>,
    ) -> Self {
        let class_index = decide(probability as f64);
        Self {
            image_path,
            probability,
            class_index,
            label: metadata.class_name(class_index),
            inference_time_ms: inference_time.as_secs_f64() * 1000.0,
        }
    }

    /// Confidence in the chosen class
    pub fn confidence(&self) -> f32 {
        if self.class_index == 1 {
            self.probability
        } else {
            1.0 - self.probability
        }
    }
}

/// Outcome of classifying a user-supplied path
#[derive(Debug, Clone)]
pub enum FileClassification {
    Predicted(PredictionResult),
    /// Not an existing file; nothing was predicted
    InvalidPath(PathBuf),
}

/// Predictor holding a loaded model
pub struct Predictor<B: Backend> {
    model: ImageClassifier<B>,
    metadata: ModelMetadata,
    device: B::Device,
}

impl<B: Backend> Predictor<B> {
    /// Load weights and metadata from an artifact
    pub fn load(artifact: &ModelArtifact, device: &B::Device) -> Result<Self> {
        let (model, metadata) = artifact.load::<B>(device)?;
        Ok(Self::from_parts(model, metadata, device))
    }

    pub fn from_parts(model: ImageClassifier<B>, metadata: ModelMetadata, device: &B::Device) -> Self {
        Self {
            model,
            metadata,
            device: device.clone(),
        }
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn model(&self) -> &ImageClassifier<B> {
        &self.model
    }

    pub fn image_size(&self) -> u32 {
        self.metadata.image_size as u32
    }

    /// Resize, rescale to [0, 1] and lay out as a [1, 3, H, W] tensor
    pub fn preprocess(&self, image: &RgbImage, filter: FilterType) -> Tensor<B, 4> {
        let size = self.image_size();
        let resized = resize_rgb(image, size, filter);
        let data = to_chw(&resized);

        Tensor::<B, 4>::from_data(
            TensorData::new(data, [1, 3, size as usize, size as usize]),
            &self.device,
        )
    }

    /// Classify a decoded RGB image
    pub fn predict_rgb(&self, image: &RgbImage, filter: FilterType) -> Result<PredictionResult> {
        let start = Instant::now();

        let input = self.preprocess(image, filter);
        let probability = self
            .model
            .forward_probability(input)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("{:?}", e)))?
            .first()
            .copied()
            .ok_or_else(|| ClassifierError::Inference("model returned no output".to_string()))?;

        debug!("p(class 1) = {:.4}", probability);
        Ok(PredictionResult::new(
            probability,
            &self.metadata,
            start.elapsed(),
            None,
        ))
    }

    /// Decode a file and classify it with the training-time resize
    pub fn predict_file(&self, path: &Path) -> Result<PredictionResult> {
        let image = load_rgb(path)?;
        let mut result = self.predict_rgb(&image, FilterType::Nearest)?;
        result.image_path = Some(path.to_path_buf());
        Ok(result)
    }

    /// Classify a user-supplied path, refusing anything that is not a file
    pub fn classify_file(&self, path: &Path) -> Result<FileClassification> {
        if !path.is_file() {
            return Ok(FileClassification::InvalidPath(path.to_path_buf()));
        }
        self.predict_file(path).map(FileClassification::Predicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassifierConfig;
    use burn_ndarray::NdArray;
    use image::Rgb;

    type TestBackend = NdArray;

    fn predictor() -> Predictor<TestBackend> {
        let device = Default::default();
        let config = ClassifierConfig::new().with_input_size(24).with_dense_units(8);
        let model = ImageClassifier::new(&config, &device);
        let metadata = ModelMetadata::new(config, vec!["hombre".to_string(), "mujer".to_string()]);
        Predictor::from_parts(model, metadata, &device)
    }

    #[test]
    fn test_decision_threshold() {
        assert_eq!(decide(0.0), 0);
        assert_eq!(decide(0.4999), 0);
        assert_eq!(decide(0.5), 1);
        assert_eq!(decide(0.93), 1);
    }

    #[test]
    fn test_result_label_and_confidence() {
        let metadata = ModelMetadata::new(
            ClassifierConfig::new(),
            vec!["hombre".to_string(), "mujer".to_string()],
        );
        let low = PredictionResult::new(0.2, &metadata, Duration::from_millis(1), None);
        assert_eq!(low.label, "hombre");
        assert!((low.confidence() - 0.8).abs() < 1e-6);

        let high = PredictionResult::new(0.7, &metadata, Duration::from_millis(1), None);
        assert_eq!(high.class_index, 1);
        assert_eq!(high.label, "mujer");
        assert!((high.confidence() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_shape_and_range() {
        let predictor = predictor();
        let image = RgbImage::from_pixel(50, 40, Rgb([255, 128, 0]));
        let tensor = predictor.preprocess(&image, FilterType::Triangle);
        assert_eq!(tensor.dims(), [1, 3, 24, 24]);

        let values: Vec<f32> = tensor.into_data().to_vec().unwrap();
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!((values[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_predict_rgb_any_size() {
        let predictor = predictor();
        let image = RgbImage::from_pixel(64, 48, Rgb([10, 20, 30]));
        let result = predictor.predict_rgb(&image, FilterType::Triangle).unwrap();
        assert!((0.0..=1.0).contains(&result.probability));
        assert_eq!(result.class_index, decide(result.probability as f64));
        assert!(result.label == "hombre" || result.label == "mujer");
    }

    #[test]
    fn test_classify_missing_path() {
        let predictor = predictor();
        let outcome = predictor.classify_file(Path::new("/no/such/face.jpg")).unwrap();
        assert!(matches!(outcome, FileClassification::InvalidPath(_)));
    }

    #[test]
    fn test_classify_directory_is_invalid() {
        let predictor = predictor();
        let dir = tempfile::tempdir().unwrap();
        let outcome = predictor.classify_file(dir.path()).unwrap();
        assert!(matches!(outcome, FileClassification::InvalidPath(_)));
    }

    #[test]
    fn test_classify_file() {
        let predictor = predictor();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        RgbImage::from_pixel(30, 30, Rgb([90, 60, 30])).save(&path).unwrap();

        match predictor.classify_file(&path).unwrap() {
            FileClassification::Predicted(result) => {
                assert_eq!(result.image_path.as_deref(), Some(path.as_path()));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_undecodable_file_is_an_error() {
        let predictor = predictor();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let err = predictor.classify_file(&path).unwrap_err();
        assert!(matches!(err, ClassifierError::ImageLoad(_, _)));
    }
}
