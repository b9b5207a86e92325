//! Decode-and-resize using the image crate.
//!
//! Images are fitted to a target width while preserving aspect ratio:
//! `height = round(original_height * width / original_width)`.

use std::io::Cursor;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::codecs::gif::GifDecoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, GenericImageView, ImageFormat, ImageReader};
use tracing::debug;

use super::RasterImage;
use crate::error::DecodeError;

/// Smallest width the pipeline will ever resize to.
pub const MIN_WIDTH: u32 = 1;

/// The decode-and-resize primitive consumed by the resize cache.
///
/// Implementations must be deterministic for a given (path, width) while the
/// file is unchanged.
pub trait Decoder: Send + Sync {
    fn decode_and_resize(&self, path: &Path, width: u32) -> Result<RasterImage, DecodeError>;
}

/// Default decoder backed by the image crate, using Lanczos3 resampling.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl Decoder for ImageDecoder {
    fn decode_and_resize(&self, path: &Path, width: u32) -> Result<RasterImage, DecodeError> {
        let bytes = std::fs::read(path).map_err(|e| DecodeError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let img = load_from_bytes(path, bytes).map_err(|e| DecodeError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("{:#}", e),
        })?;

        let (src_width, src_height) = img.dimensions();
        if src_width == 0 || src_height == 0 {
            return Err(DecodeError::Empty(path.to_path_buf()));
        }

        let width = width.max(MIN_WIDTH);
        let height = fitted_height(src_width, src_height, width);
        debug!(
            ?path,
            src_width, src_height, width, height, "Resizing image to fit width"
        );

        let resized = if (src_width, src_height) == (width, height) {
            img
        } else {
            img.resize_exact(width, height, FilterType::Lanczos3)
        };

        Ok(RasterImage::new(resized.to_rgba8()))
    }
}

/// Height that keeps the source aspect ratio at `target_width`, never below 1.
pub fn fitted_height(src_width: u32, src_height: u32, target_width: u32) -> u32 {
    if src_width == 0 || src_height == 0 {
        return target_width.max(MIN_WIDTH);
    }
    let height = (src_height as f64 * target_width as f64 / src_width as f64).round();
    (height as u32).max(1)
}

/// Decode an encoded image, sniffing the format from content rather than the
/// extension. Animated GIFs yield their first frame.
fn load_from_bytes(path: &Path, bytes: Vec<u8>) -> Result<DynamicImage> {
    let format = image::guess_format(&bytes).ok();

    if format == Some(ImageFormat::Gif) {
        let decoder = GifDecoder::new(Cursor::new(bytes))
            .with_context(|| format!("Failed to decode GIF: {:?}", path))?;
        let first = decoder
            .into_frames()
            .next()
            .ok_or_else(|| anyhow!("GIF has no frames: {:?}", path))?
            .context("Failed to decode GIF frame")?;
        return Ok(DynamicImage::ImageRgba8(first.into_buffer()));
    }

    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("Failed to guess image format")?
        .decode()
        .with_context(|| format!("Failed to decode image: {:?}", path))
}
