//! Source-image preparation before animation.

use std::io::Cursor;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbImage};

use super::settings::VIDEO_INPUT_SIZE;
use crate::error::GenerationError;

const BRIGHTNESS_FACTOR: f32 = 1.1;
const CONTRAST_FACTOR: f32 = 1.15;

/// Scale every channel by `factor`.
pub fn brighten(img: &mut RgbImage, factor: f32) {
    for px in img.pixels_mut() {
        px.0 = px.0.map(|c| scale(c as f32 * factor));
    }
}

/// Push every channel away from the image's mean grey level by `factor`.
pub fn contrast(img: &mut RgbImage, factor: f32) {
    let count = (img.width() as u64 * img.height() as u64).max(1) as f32;
    let mean = img
        .pixels()
        .map(|p| 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32)
        .sum::<f32>()
        / count;
    for px in img.pixels_mut() {
        px.0 = px.0.map(|c| scale(mean + (c as f32 - mean) * factor));
    }
}

fn scale(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Load, optionally brighten and contrast-stretch, then resize to the video
/// input size. Returns PNG bytes ready for upload. Blocking.
pub fn prepare_video_input(
    path: &Path,
    enhance_lighting: bool,
    adjust_contrast: bool,
) -> Result<Vec<u8>, GenerationError> {
    let mut img = image::open(path)?.to_rgb8();
    if enhance_lighting {
        brighten(&mut img, BRIGHTNESS_FACTOR);
    }
    if adjust_contrast {
        contrast(&mut img, CONTRAST_FACTOR);
    }
    let resized = image::imageops::resize(
        &img,
        VIDEO_INPUT_SIZE,
        VIDEO_INPUT_SIZE,
        FilterType::Lanczos3,
    );

    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(resized).write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}
