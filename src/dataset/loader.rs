//! Image Folder Loader
//!
//! Scans a dataset root where every immediate subdirectory is a class and
//! splits each class into training and validation subsets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::utils::error::{ClassifierError, Result};

/// File extensions recognised as images
pub const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "ppm", "tif", "tiff"];

/// A single image file with its class label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label index (position of the class directory in sort order)
    pub label: usize,
}

/// Which part of the split to take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subset {
    Training,
    Validation,
}

/// Labeled image folder for binary classification
#[derive(Debug, Clone)]
pub struct ImageFolder {
    /// Root directory of the dataset
    pub root_dir: PathBuf,
    /// Class names in label order
    pub class_names: Vec<String>,
    /// Files per class, sorted by path
    files_by_class: Vec<Vec<PathBuf>>,
}

impl ImageFolder {
    /// Scan a dataset directory
    ///
    /// The directory should be structured as:
    /// ```text
    /// root_dir/
    /// ├── hombre/
    /// │   ├── 0001.jpg
    /// │   └── ...
    /// └── mujer/
    ///     └── ...
    /// ```
    pub fn open<P: AsRef<Path>>(root_dir: P) -> Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        info!("Scanning image folder: {:?}", root_dir);

        if !root_dir.is_dir() {
            return Err(ClassifierError::PathNotFound(root_dir));
        }

        let mut class_names: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(&root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    class_names.push(name.to_string());
                }
            }
        }
        class_names.sort();

        let mut files_by_class = Vec::with_capacity(class_names.len());
        for class_name in &class_names {
            let mut files: Vec<PathBuf> = WalkDir::new(root_dir.join(class_name))
                .min_depth(1)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| is_image_file(p))
                .collect();
            files.sort();

            debug!("Class '{}': {} images", class_name, files.len());
            files_by_class.push(files);
        }

        info!(
            "Found {} images belonging to {} classes",
            files_by_class.iter().map(Vec::len).sum::<usize>(),
            class_names.len()
        );

        Ok(Self {
            root_dir,
            class_names,
            files_by_class,
        })
    }

    /// Scan a dataset directory and require exactly two classes
    pub fn open_binary<P: AsRef<Path>>(root_dir: P) -> Result<Self> {
        let folder = Self::open(root_dir)?;
        if folder.num_classes() != 2 {
            return Err(ClassifierError::Dataset(format!(
                "binary classification needs exactly 2 class directories in {:?}, found {} ({})",
                folder.root_dir,
                folder.num_classes(),
                folder.class_names.join(", ")
            )));
        }
        Ok(folder)
    }

    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Total number of images across classes
    pub fn len(&self) -> usize {
        self.files_by_class.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples of one subset, grouped by class in label order
    ///
    /// For a class with `n` files the first `floor(split * n)` files are
    /// validation and the rest training.
    pub fn subset(&self, subset: Subset, validation_split: f64) -> Vec<ImageSample> {
        let mut samples = Vec::new();

        for (label, files) in self.files_by_class.iter().enumerate() {
            let cut = split_index(files.len(), validation_split);
            let range = match subset {
                Subset::Validation => 0..cut,
                Subset::Training => cut..files.len(),
            };

            samples.extend(files[range].iter().map(|path| ImageSample {
                path: path.clone(),
                label,
            }));
        }

        samples
    }

    /// Per-class and per-subset counts
    pub fn stats(&self, validation_split: f64) -> DatasetStats {
        let class_counts: Vec<usize> = self.files_by_class.iter().map(Vec::len).collect();
        let validation_samples = class_counts
            .iter()
            .map(|&n| split_index(n, validation_split))
            .sum();

        DatasetStats {
            total_samples: self.len(),
            class_names: self.class_names.clone(),
            class_counts,
            training_samples: self.len() - validation_samples,
            validation_samples,
        }
    }
}

/// Number of files of a class that go to validation
fn split_index(n: usize, validation_split: f64) -> usize {
    ((validation_split * n as f64).floor() as usize).min(n)
}

/// Check the extension against [`IMAGE_EXTENSIONS`], ignoring case
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Statistics about an image folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub class_names: Vec<String>,
    pub class_counts: Vec<usize>,
    pub training_samples: usize,
    pub validation_samples: usize,
}

impl DatasetStats {
    /// Print statistics to console
    pub fn print(&self) {
        println!("\n📊 Dataset Statistics:");
        println!("  Total images:      {}", self.total_samples);
        println!("  Training subset:   {}", self.training_samples);
        println!("  Validation subset: {}", self.validation_samples);
        println!("\n  Images per class:");

        for (idx, (name, count)) in self.class_names.iter().zip(&self.class_counts).enumerate() {
            let share = if self.total_samples > 0 {
                *count as f32 / self.total_samples as f32
            } else {
                0.0
            };
            let bar: String = "█".repeat((share * 40.0) as usize);
            println!("    {:2}. {:30} {:6} {}", idx, name, count, bar);
        }
    }
}
