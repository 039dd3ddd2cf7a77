//! Data Augmentation Module
//!
//! Random affine augmentation for training images: rotation, shifts, shear,
//! zoom and horizontal flip, combined into one inverse mapping and sampled
//! bilinearly. Points that fall outside the source take the nearest edge
//! pixel.
//!
//! # Augmentation Strategy
//!
//! - **Training**: one random transform per image per epoch
//! - **Validation / inference**: no augmentation

use image::{Rgb, RgbImage};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::config::AugmentationConfig;

/// One concrete draw of the random transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineParams {
    /// Rotation in degrees
    pub rotation: f32,
    /// Horizontal shift in pixels
    pub shift_x: f32,
    /// Vertical shift in pixels
    pub shift_y: f32,
    /// Shear angle in degrees
    pub shear: f32,
    /// Horizontal zoom factor (1.0 = unchanged)
    pub zoom_x: f32,
    /// Vertical zoom factor
    pub zoom_y: f32,
    pub flip_horizontal: bool,
}

impl AffineParams {
    pub fn identity() -> Self {
        Self {
            rotation: 0.0,
            shift_x: 0.0,
            shift_y: 0.0,
            shear: 0.0,
            zoom_x: 1.0,
            zoom_y: 1.0,
            flip_horizontal: false,
        }
    }

    fn has_geometry(&self) -> bool {
        self.rotation != 0.0
            || self.shift_x != 0.0
            || self.shift_y != 0.0
            || self.shear != 0.0
            || self.zoom_x != 1.0
            || self.zoom_y != 1.0
    }
}

/// Image augmenter that applies random transformations
#[derive(Debug, Clone)]
pub struct Augmenter {
    config: AugmentationConfig,
}

impl Augmenter {
    pub fn new(config: AugmentationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AugmentationConfig {
        &self.config
    }

    /// Draw transform parameters for an image of the given size
    pub fn sample_params(&self, width: u32, height: u32, rng: &mut ChaCha8Rng) -> AffineParams {
        let c = &self.config;
        let mut params = AffineParams::identity();

        if c.rotation_range > 0.0 {
            params.rotation = rng.gen_range(-c.rotation_range..=c.rotation_range);
        }
        if c.width_shift_range > 0.0 {
            params.shift_x =
                rng.gen_range(-c.width_shift_range..=c.width_shift_range) * width as f32;
        }
        if c.height_shift_range > 0.0 {
            params.shift_y =
                rng.gen_range(-c.height_shift_range..=c.height_shift_range) * height as f32;
        }
        if c.shear_range > 0.0 {
            params.shear = rng.gen_range(-c.shear_range..=c.shear_range);
        }
        if c.zoom_range > 0.0 {
            params.zoom_x = rng.gen_range(1.0 - c.zoom_range..=1.0 + c.zoom_range);
            params.zoom_y = rng.gen_range(1.0 - c.zoom_range..=1.0 + c.zoom_range);
        }
        if c.horizontal_flip {
            params.flip_horizontal = rng.gen_bool(0.5);
        }

        params
    }

    /// Apply one random transform drawn from the configuration
    pub fn augment(&self, img: &RgbImage, rng: &mut ChaCha8Rng) -> RgbImage {
        let params = self.sample_params(img.width(), img.height(), rng);
        apply_affine(img, &params)
    }
}

/// Apply a concrete transform
///
/// Each output pixel is mapped back into the source around the image centre:
/// `src = centre + R(rotation) · Shear · Zoom · (dst - centre) + shift`.
pub fn apply_affine(img: &RgbImage, params: &AffineParams) -> RgbImage {
    let mut output = if params.has_geometry() {
        warp(img, params)
    } else {
        img.clone()
    };

    if params.flip_horizontal {
        image::imageops::flip_horizontal_in_place(&mut output);
    }

    output
}

fn warp(img: &RgbImage, params: &AffineParams) -> RgbImage {
    let (width, height) = img.dimensions();
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;

    let theta = params.rotation.to_radians();
    let (sin_t, cos_t) = theta.sin_cos();
    let shear = params.shear.to_radians();
    let (sin_s, cos_s) = shear.sin_cos();

    // Shear · Zoom
    let a = [
        [params.zoom_x, -sin_s * params.zoom_y],
        [0.0, cos_s * params.zoom_y],
    ];
    // R · (Shear · Zoom)
    let m = [
        [
            cos_t * a[0][0] - sin_t * a[1][0],
            cos_t * a[0][1] - sin_t * a[1][1],
        ],
        [
            sin_t * a[0][0] + cos_t * a[1][0],
            sin_t * a[0][1] + cos_t * a[1][1],
        ],
    ];

    RgbImage::from_fn(width, height, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;

        let src_x = cx + m[0][0] * dx + m[0][1] * dy + params.shift_x;
        let src_y = cy + m[1][0] * dx + m[1][1] * dy + params.shift_y;

        bilinear_sample(img, src_x, src_y)
    })
}

/// Bilinear sample with edge clamping
fn bilinear_sample(img: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (width, height) = img.dimensions();
    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;

    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = img.get_pixel(x0, y0);
    let p10 = img.get_pixel(x1, y0);
    let p01 = img.get_pixel(x0, y1);
    let p11 = img.get_pixel(x1, y1);

    let mut result = [0u8; 3];
    for c in 0..3 {
        let v = p00[c] as f32 * (1.0 - fx) * (1.0 - fy)
            + p10[c] as f32 * fx * (1.0 - fy)
            + p01[c] as f32 * (1.0 - fx) * fy
            + p11[c] as f32 * fx * fy;
        result[c] = v.round().clamp(0.0, 255.0) as u8;
    }

    Rgb(result)
}
