//! Camera abstraction for the live classifier
//!
//! The webcam loop only sees `CameraDevice`, so it runs the same against a
//! real OpenCV capture or a replay of still images.

use std::collections::VecDeque;
use std::path::Path;

use image::RgbImage;
use tracing::warn;
use walkdir::WalkDir;

use crate::dataset::loader::is_image_file;
use crate::dataset::preprocess::load_rgb;
use crate::utils::error::{ClassifierError, Result};

/// What the loop should do after a frame was presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// A source of RGB frames that can show an overlay for each one
pub trait CameraDevice {
    /// Next frame, or `None` when the device cannot deliver one
    fn read_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Show the last frame with `overlay` drawn on it and poll for quit
    fn present(&mut self, overlay: &str) -> Result<Control>;

    /// Free the device and any window
    fn release(&mut self) -> Result<()>;
}

/// Plays back a fixed list of frames
#[derive(Debug, Default)]
pub struct ReplayCamera {
    frames: VecDeque<RgbImage>,
    overlays: Vec<String>,
    quit_after: Option<usize>,
    released: bool,
}

impl ReplayCamera {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self {
            frames: frames.into(),
            ..Default::default()
        }
    }

    /// Every image file below `dir`, in path order
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(ClassifierError::PathNotFound(dir.to_path_buf()));
        }

        let mut paths: Vec<_> = WalkDir::new(dir)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| is_image_file(p))
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            match load_rgb(path) {
                Ok(frame) => frames.push(frame),
                Err(e) => warn!("Skipping frame: {}", e),
            }
        }

        Ok(Self::new(frames))
    }

    /// Simulate the user pressing quit after `n` presented frames
    pub fn quit_after(mut self, n: usize) -> Self {
        self.quit_after = Some(n);
        self
    }

    /// Overlays shown so far
    pub fn overlays(&self) -> &[String] {
        &self.overlays
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl CameraDevice for ReplayCamera {
    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        if self.released {
            return Err(ClassifierError::Camera("camera already released".to_string()));
        }
        Ok(self.frames.pop_front())
    }

    fn present(&mut self, overlay: &str) -> Result<Control> {
        self.overlays.push(overlay.to_string());
        match self.quit_after {
            Some(n) if self.overlays.len() >= n => Ok(Control::Quit),
            _ => Ok(Control::Continue),
        }
    }

    fn release(&mut self) -> Result<()> {
        self.released = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_replay_order_and_exhaustion() {
        let mut camera = ReplayCamera::new(vec![
            RgbImage::from_pixel(2, 2, Rgb([1, 1, 1])),
            RgbImage::from_pixel(2, 2, Rgb([2, 2, 2])),
        ]);

        assert_eq!(camera.read_frame().unwrap().unwrap().get_pixel(0, 0), &Rgb([1, 1, 1]));
        assert_eq!(camera.read_frame().unwrap().unwrap().get_pixel(0, 0), &Rgb([2, 2, 2]));
        assert!(camera.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_quit_after() {
        let mut camera = ReplayCamera::new(Vec::new()).quit_after(2);
        assert_eq!(camera.present("a").unwrap(), Control::Continue);
        assert_eq!(camera.present("b").unwrap(), Control::Quit);
        assert_eq!(camera.overlays(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_read_after_release_fails() {
        let mut camera = ReplayCamera::new(Vec::new());
        camera.release().unwrap();
        assert!(camera.is_released());
        assert!(matches!(camera.read_frame(), Err(ClassifierError::Camera(_))));
    }

    #[test]
    fn test_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(4, 4, Rgb([9, 9, 9]))
            .save(dir.path().join("b.png"))
            .unwrap();
        RgbImage::from_pixel(4, 4, Rgb([3, 3, 3]))
            .save(dir.path().join("a.png"))
            .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let mut camera = ReplayCamera::from_dir(dir.path()).unwrap();
        assert_eq!(camera.remaining(), 2);
        assert_eq!(camera.read_frame().unwrap().unwrap().get_pixel(0, 0), &Rgb([3, 3, 3]));
    }
}
