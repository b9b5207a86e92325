//! Raster pipeline for the stripview reader.
//!
//! This module provides:
//! - `RasterImage` - a decoded, width-fitted bitmap shared by reference
//! - `Decoder` / `ImageDecoder` - the decode-and-resize primitive
//! - `ResizeCache` - memoized decode keyed by (path, width), optional LRU bound
//! - `DecodeQueue` - worker pool that warms the cache off the caller's thread

pub mod cache;
pub mod queue;
pub mod resize;

use std::sync::Arc;

use image::RgbaImage;

pub use cache::{CacheKey, CacheStats, ResizeCache};
pub use queue::{DecodeQueue, DecodeRequest, DecodeResult, MAX_QUEUE_SIZE};
pub use resize::{fitted_height, Decoder, ImageDecoder};

/// A decoded bitmap resized to a target width.
///
/// Cloning shares the pixel buffer; the pixels are never mutated after decode.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pixels: Arc<RgbaImage>,
}

impl RasterImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Raw RGBA bytes, row-major, for upload to a toolkit texture.
    pub fn as_rgba_bytes(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Estimated memory usage in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.pixels.as_raw().len()
    }

    /// True when both handles point at the same decoded buffer.
    pub fn shares_buffer(&self, other: &RasterImage) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }
}

impl PartialEq for RasterImage {
    fn eq(&self, other: &Self) -> bool {
        self.shares_buffer(other) || *self.pixels == *other.pixels
    }
}
