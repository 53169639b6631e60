// src/media/encode.rs
//
// JPEG helpers shared by the media backends. Frames travel to the
// analysis service inline, so they are kept small: anything wider than
// the configured width is downscaled before it leaves the surface.

use crate::types::ExtractionConfig;
use image::codecs::jpeg::JpegEncoder;
use image::{imageops::FilterType, DynamicImage, ImageBuffer, RgbImage};

/// Target shape for captured stills.
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoding {
    pub max_width: u32,
    pub quality: u8,
}

impl Default for FrameEncoding {
    fn default() -> Self {
        Self {
            max_width: 640,
            quality: 85,
        }
    }
}

impl FrameEncoding {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            max_width: config.max_frame_width,
            quality: config.jpeg_quality,
        }
    }
}

/// Downscale (if needed) and JPEG-encode a raw RGB buffer. Returns the
/// JPEG bytes and the final dimensions, or None when the buffer is short.
pub fn fit_rgb(
    rgb_data: &[u8],
    width: u32,
    height: u32,
    encoding: FrameEncoding,
) -> Option<(Vec<u8>, u32, u32)> {
    let needed = width as usize * height as usize * 3;
    let pixels = rgb_data.get(..needed)?.to_vec();
    let img: RgbImage = ImageBuffer::from_raw(width, height, pixels)?;
    fit_image(img, encoding)
}

fn fit_image(img: RgbImage, encoding: FrameEncoding) -> Option<(Vec<u8>, u32, u32)> {
    let img = if img.width() > encoding.max_width {
        DynamicImage::ImageRgb8(img)
            .resize(encoding.max_width, u32::MAX, FilterType::Triangle)
            .to_rgb8()
    } else {
        img
    };

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, encoding.quality)
        .encode_image(&img)
        .ok()?;
    Some((jpeg, img.width(), img.height()))
}

/// Decode an encoded still (JPEG/PNG), then fit it like `fit_rgb`.
pub fn fit_encoded(bytes: &[u8], encoding: FrameEncoding) -> Result<(Vec<u8>, u32, u32), String> {
    let decoded = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    fit_image(decoded.to_rgb8(), encoding).ok_or_else(|| "JPEG encoding failed".to_string())
}
