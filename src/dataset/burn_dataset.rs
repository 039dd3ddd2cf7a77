//! Burn Dataset Integration
//!
//! Implements Burn's `Dataset` and `Batcher` traits for the image folder and
//! a `DataGenerator` that walks a dataset in (optionally shuffled) batches,
//! applying augmentation on access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use image::imageops::FilterType;
use image::RgbImage;
use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{info, warn};

use super::augmentation::Augmenter;
use super::loader::ImageSample;
use super::preprocess::{load_resized, to_chw};
use crate::utils::error::{ClassifierError, Result};

/// A single image ready for batching
#[derive(Clone, Debug)]
pub struct ImageItem {
    /// Image data as flattened CHW float array [3 * H * W], values in [0, 1]
    pub image: Vec<f32>,
    /// Class label (0 or 1)
    pub label: usize,
    /// Source path (for logging)
    pub path: String,
}

impl ImageItem {
    pub fn from_rgb(img: &RgbImage, label: usize, path: String) -> Self {
        Self {
            image: to_chw(img),
            label,
            path,
        }
    }
}

/// Decoded, resized image kept in memory so augmentation can run per epoch
#[derive(Clone)]
struct RawImage {
    pixels: RgbImage,
    label: usize,
    path: String,
}

/// Image folder subset implementing Burn's Dataset trait
///
/// All images are decoded once up front (nearest-neighbour resize). When an
/// augmenter is attached, every `get` draws a fresh random transform.
pub struct ImageFolderDataset {
    items: Vec<RawImage>,
    image_size: usize,
    augmenter: Option<Augmenter>,
    rng: Mutex<ChaCha8Rng>,
}

impl std::fmt::Debug for ImageFolderDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageFolderDataset")
            .field("len", &self.items.len())
            .field("image_size", &self.image_size)
            .field("augmented", &self.augmenter.is_some())
            .finish()
    }
}

impl ImageFolderDataset {
    /// Load every sample into memory in parallel
    ///
    /// Unreadable files are skipped with a warning.
    pub fn load(samples: &[ImageSample], image_size: usize, seed: u64) -> Result<Self> {
        let total = samples.len();
        info!("Pre-loading {} images at {}x{}", total, image_size, image_size);

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
                .map_err(|e| ClassifierError::Dataset(e.to_string()))?
                .progress_chars("#>-"),
        );

        let loaded = AtomicUsize::new(0);

        let items: Vec<RawImage> = samples
            .par_iter()
            .filter_map(|sample| {
                let result = load_resized(&sample.path, image_size as u32, FilterType::Nearest);
                let count = loaded.fetch_add(1, Ordering::Relaxed) + 1;
                if count % 50 == 0 || count == total {
                    pb.set_position(count as u64);
                }
                match result {
                    Ok(pixels) => Some(RawImage {
                        pixels,
                        label: sample.label,
                        path: sample.path.to_string_lossy().to_string(),
                    }),
                    Err(e) => {
                        warn!("Skipping image: {}", e);
                        None
                    }
                }
            })
            .collect();

        pb.finish_and_clear();
        info!("Loaded {} of {} images", items.len(), total);

        Ok(Self {
            items,
            image_size,
            augmenter: None,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        })
    }

    /// Build from images already in memory
    pub fn from_images(images: Vec<(RgbImage, usize)>, image_size: usize, seed: u64) -> Self {
        let items = images
            .into_iter()
            .enumerate()
            .map(|(i, (pixels, label))| RawImage {
                pixels: super::preprocess::resize_rgb(&pixels, image_size as u32, FilterType::Nearest),
                label,
                path: format!("<memory:{}>", i),
            })
            .collect();

        Self {
            items,
            image_size,
            augmenter: None,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Attach random augmentation
    pub fn with_augmentation(mut self, augmenter: Augmenter) -> Self {
        if augmenter.config().is_enabled() {
            self.augmenter = Some(augmenter);
        }
        self
    }

    pub fn image_size(&self) -> usize {
        self.image_size
    }

    /// Count of images per label (binary)
    pub fn class_distribution(&self) -> [usize; 2] {
        let mut counts = [0usize; 2];
        for item in &self.items {
            if item.label < 2 {
                counts[item.label] += 1;
            }
        }
        counts
    }
}

impl Dataset<ImageItem> for ImageFolderDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        let raw = self.items.get(index)?;

        let pixels = match &self.augmenter {
            Some(augmenter) => {
                let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                augmenter.augment(&raw.pixels, &mut *rng)
            }
            None => raw.pixels.clone(),
        };

        Some(ImageItem::from_rgb(&pixels, raw.label, raw.path.clone()))
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// A batch of images for training or evaluation
#[derive(Clone, Debug)]
pub struct ImageBatch<B: Backend> {
    /// Images with shape [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
    /// Binary labels with shape [batch_size, 1]
    pub targets: Tensor<B, 2, Int>,
}

/// Batcher stacking `ImageItem`s into tensors
#[derive(Clone, Debug)]
pub struct ImageBatcher {
    image_size: usize,
}

impl ImageBatcher {
    pub fn new(image_size: usize) -> Self {
        Self { image_size }
    }
}

impl<B: Backend> Batcher<B, ImageItem, ImageBatch<B>> for ImageBatcher {
    fn batch(&self, items: Vec<ImageItem>, device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();

        let images_data: Vec<f32> = items
            .iter()
            .flat_map(|item| item.image.iter().copied())
            .collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(images_data, [batch_size, 3, self.image_size, self.image_size]),
            device,
        );

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets = Tensor::<B, 2, Int>::from_data(
            TensorData::new(targets_data, [batch_size, 1]),
            device,
        );

        ImageBatch { images, targets }
    }
}

/// Walks a dataset in batches, reshuffling each epoch when asked to
pub struct DataGenerator {
    dataset: ImageFolderDataset,
    batch_size: usize,
    shuffle: bool,
    rng: ChaCha8Rng,
}

impl DataGenerator {
    pub fn new(dataset: ImageFolderDataset, batch_size: usize, shuffle: bool, seed: u64) -> Self {
        Self {
            dataset,
            batch_size: batch_size.max(1),
            shuffle,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn dataset(&self) -> &ImageFolderDataset {
        &self.dataset
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Batches per epoch; the last one may be short
    pub fn num_batches(&self) -> usize {
        self.len().div_ceil(self.batch_size)
    }

    /// Start a new pass over the data
    pub fn epoch(&mut self) -> EpochBatches<'_> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            order.shuffle(&mut self.rng);
        }

        EpochBatches {
            dataset: &self.dataset,
            order,
            batch_size: self.batch_size,
            position: 0,
        }
    }
}

/// Iterator over the batches of one epoch
pub struct EpochBatches<'a> {
    dataset: &'a ImageFolderDataset,
    order: Vec<usize>,
    batch_size: usize,
    position: usize,
}

impl Iterator for EpochBatches<'_> {
    type Item = Vec<ImageItem>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.position < self.order.len() {
            let end = (self.position + self.batch_size).min(self.order.len());
            let items: Vec<ImageItem> = self.order[self.position..end]
                .iter()
                .filter_map(|&i| self.dataset.get(i))
                .collect();
            self.position = end;

            if !items.is_empty() {
                return Some(items);
            }
        }
        None
    }
}
