//! Read-and-decode helper for input images

use crate::error::{AppError, ErrorContext, Result};
use ::image::DynamicImage;
use std::path::Path;

/// An 8-bit image with its native channel count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    /// Row-major interleaved pixel bytes
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }

    /// Mean value of every channel, in channel order
    pub fn channel_means(&self) -> Vec<f32> {
        let channels = self.channels.max(1) as usize;
        let mut sums = vec![0u64; channels];
        for px in self.pixels.chunks_exact(channels) {
            for (sum, value) in sums.iter_mut().zip(px) {
                *sum += *value as u64;
            }
        }
        let count = (self.pixels.len() / channels).max(1) as f32;
        sums.into_iter().map(|s| s as f32 / count).collect()
    }
}

impl From<DynamicImage> for DecodedImage {
    fn from(img: DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        let channels = img.color().channel_count();
        let pixels = match channels {
            1 => img.to_luma8().into_raw(),
            2 => img.to_luma_alpha8().into_raw(),
            3 => img.to_rgb8().into_raw(),
            _ => img.to_rgba8().into_raw(),
        };
        Self {
            width,
            height,
            channels: channels.min(4),
            pixels,
        }
    }
}

/// Decode an in-memory encoded image (bmp, jpeg, png, tiff)
pub fn decode_image_bytes(bytes: &[u8]) -> Result<DecodedImage> {
    if bytes.is_empty() {
        return Err(AppError::decode("image data is empty"));
    }
    let img = ::image::load_from_memory(bytes)?;
    Ok(DecodedImage::from(img))
}

/// Read the whole file at `path` and decode it
pub fn decode_image_file(path: &Path) -> Result<DecodedImage> {
    let bytes = std::fs::read(path)
        .map_err(|e| AppError::decode(format!("cannot read {}: {}", path.display(), e)))?;
    decode_image_bytes(&bytes).with_context(|| path.display().to_string())
}
