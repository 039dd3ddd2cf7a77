//! Model module for the binary CNN using the Burn framework
//!
//! This module provides:
//! - The fixed three-block CNN and its configuration
//! - The on-disk model artifact (weights + metadata)

pub mod artifact;
pub mod cnn;

pub use artifact::{ModelArtifact, ModelMetadata, TrainingSummary};
pub use cnn::{ClassifierConfig, ImageClassifier};
