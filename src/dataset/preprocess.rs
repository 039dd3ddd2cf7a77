//! Image decoding and tensor layout helpers shared by training and inference.

use std::path::Path;

use image::imageops::FilterType;
use image::{ImageReader, RgbImage};

use crate::utils::error::{ClassifierError, Result};

/// Pixel rescale factor applied before the network
pub const RESCALE: f32 = 1.0 / 255.0;

/// Decode an image file into RGB
pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    let img = ImageReader::open(path)
        .map_err(|e| ClassifierError::ImageLoad(path.to_path_buf(), e.to_string()))?
        .with_guessed_format()
        .map_err(|e| ClassifierError::ImageLoad(path.to_path_buf(), e.to_string()))?
        .decode()
        .map_err(|e| ClassifierError::ImageLoad(path.to_path_buf(), e.to_string()))?;

    Ok(img.to_rgb8())
}

/// Decode and resize to a square of `image_size`
pub fn load_resized(path: &Path, image_size: u32, filter: FilterType) -> Result<RgbImage> {
    let rgb = load_rgb(path)?;
    Ok(resize_rgb(&rgb, image_size, filter))
}

/// Resize an RGB image to a square, skipping the copy when already sized
pub fn resize_rgb(img: &RgbImage, image_size: u32, filter: FilterType) -> RgbImage {
    if img.dimensions() == (image_size, image_size) {
        return img.clone();
    }
    image::imageops::resize(img, image_size, image_size, filter)
}

/// Flatten to CHW layout with values rescaled to [0, 1]
pub fn to_chw(img: &RgbImage) -> Vec<f32> {
    let (width, height) = img.dimensions();
    let num_pixels = (width * height) as usize;

    let mut data = vec![0.0f32; 3 * num_pixels];
    for (i, pixel) in img.pixels().enumerate() {
        data[i] = pixel[0] as f32 * RESCALE;
        data[num_pixels + i] = pixel[1] as f32 * RESCALE;
        data[2 * num_pixels + i] = pixel[2] as f32 * RESCALE;
    }

    data
}
