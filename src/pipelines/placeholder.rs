//! Placeholder image backend used when no inference API key is configured.
//!
//! Renders a solid random-coloured canvas with a white frame so the whole
//! job flow (queue, status, download) works without a model.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use rand::Rng;

use super::{ImageOutput, ImagePipeline, ImageRequest};
use crate::error::GenerationError;
use crate::jobs::files::file_size_mb;

const FRAME_WIDTH: u32 = 3;

pub struct PlaceholderImagePipeline;

impl PlaceholderImagePipeline {
    /// Draw the placeholder canvas.
    pub fn render(width: u32, height: u32) -> RgbImage {
        let mut rng = rand::thread_rng();
        let background = Rgb([
            rng.gen_range(50..=200),
            rng.gen_range(50..=200),
            rng.gen_range(50..=200),
        ]);
        let mut img = RgbImage::from_pixel(width, height, background);
        if width < 32 || height < 32 {
            return img;
        }

        // Frame inset by ~20% on each side (100px on a 512 canvas)
        let (x0, y0) = (width * 100 / 512, height * 100 / 512);
        let (x1, y1) = (width - 1 - x0, height - 1 - y0);
        let white = Rgb([255, 255, 255]);
        for t in 0..FRAME_WIDTH {
            for x in x0..=x1 {
                img.put_pixel(x, y0 + t, white);
                img.put_pixel(x, y1 - t, white);
            }
            for y in y0..=y1 {
                img.put_pixel(x0 + t, y, white);
                img.put_pixel(x1 - t, y, white);
            }
        }
        img
    }
}

#[async_trait]
impl ImagePipeline for PlaceholderImagePipeline {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn generate(
        &self,
        request: &ImageRequest,
        output: &Path,
    ) -> Result<ImageOutput, GenerationError> {
        let (width, height) = (request.width, request.height);
        let path: PathBuf = output.to_path_buf();
        tokio::task::spawn_blocking(move || {
            Self::render(width, height).save_with_format(&path, ImageFormat::Png)
        })
        .await
        .map_err(|e| GenerationError::RequestFailed {
            backend: "placeholder".to_string(),
            reason: e.to_string(),
        })??;

        tracing::debug!(prompt = %request.prompt, path = %output.display(), "Rendered placeholder image");
        Ok(ImageOutput {
            width,
            height,
            file_size_mb: file_size_mb(output).await,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_draws_white_frame() {
        let img = PlaceholderImagePipeline::render(512, 512);
        assert_eq!(img.dimensions(), (512, 512));
        assert_eq!(img.get_pixel(100, 100).0, [255, 255, 255]);
        assert_eq!(img.get_pixel(411, 411).0, [255, 255, 255]);
        let bg = img.get_pixel(10, 10).0;
        assert!(bg.iter().all(|c| (50..=200).contains(c)));
    }

    #[tokio::test]
    async fn generate_writes_png() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("x.png");
        let result = PlaceholderImagePipeline
            .generate(&ImageRequest::new("modern sofa"), &out)
            .await
            .unwrap();
        assert_eq!((result.width, result.height), (512, 512));
        assert!(result.file_size_mb > 0.0);

        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    }
}
