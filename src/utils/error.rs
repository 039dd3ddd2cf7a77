//! Error Handling Module
//!
//! Defines the error type shared by the dataset, model, training and
//! inference layers. Binaries wrap these in `anyhow` for context.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for classifier operations
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// Error decoding or reading an image
    #[error("Failed to load image at '{}': {}", .0.display(), .1)]
    ImageLoad(PathBuf, String),

    /// Error with the dataset layout or contents
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Error building, saving or loading the model
    #[error("Model error: {0}")]
    Model(String),

    /// Error during inference
    #[error("Inference error: {0}")]
    Inference(String),

    /// Camera capture or display error
    #[error("Camera error: {0}")]
    Camera(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Path not found
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),
}

impl From<serde_json::Error> for ClassifierError {
    fn from(err: serde_json::Error) -> Self {
        ClassifierError::Serialization(err.to_string())
    }
}

/// Convenience Result type for classifier operations
pub type Result<T> = std::result::Result<T, ClassifierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClassifierError::Dataset("expected 2 classes, found 3".to_string());
        assert_eq!(format!("{}", err), "Dataset error: expected 2 classes, found 3");
    }

    #[test]
    fn test_image_load_error() {
        let path = PathBuf::from("/path/to/face.jpg");
        let err = ClassifierError::ImageLoad(path, "unsupported format".to_string());
        assert!(format!("{}", err).contains("face.jpg"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ClassifierError = io_err.into();
        assert!(matches!(err, ClassifierError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: ClassifierError = json_err.into();
        assert!(matches!(err, ClassifierError::Serialization(_)));
    }
}
