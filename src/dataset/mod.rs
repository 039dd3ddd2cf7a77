//! Dataset module for loading and batching labeled image folders
//!
//! This module provides:
//! - Directory scanning with a deterministic per-class validation split
//! - Random affine augmentation for training images
//! - Burn `Dataset`/`Batcher` integration and an epoch-wise data generator

pub mod augmentation;
pub mod burn_dataset;
pub mod loader;
pub mod preprocess;

pub use augmentation::{AffineParams, Augmenter};
pub use burn_dataset::{DataGenerator, ImageBatch, ImageBatcher, ImageFolderDataset, ImageItem};
pub use loader::{DatasetStats, ImageFolder, ImageSample, Subset};
