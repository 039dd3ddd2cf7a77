//! Inference module for classifying files and camera frames
//!
//! This module provides:
//! - A predictor that loads a trained artifact once
//! - A camera abstraction with OpenCV (feature `webcam`) and replay devices
//! - The live classification loop

pub mod camera;
#[cfg(feature = "webcam")]
pub mod opencv_camera;
pub mod predictor;
pub mod webcam;

pub use camera::{CameraDevice, Control, ReplayCamera};
#[cfg(feature = "webcam")]
pub use opencv_camera::OpenCvCamera;
pub use predictor::{decide, FileClassification, PredictionResult, Predictor};
pub use webcam::{run_webcam, StopReason, WebcamSummary};
