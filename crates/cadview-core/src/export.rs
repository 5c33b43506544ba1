//! Still-image export of the rendered frame

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder};

use crate::error::{Result, ViewportError};

/// Number of channels in RGBA8 format.
const RGBA8_CHANNELS: usize = 4;

pub const PNG_MIME_TYPE: &str = "image/png";

/// Tightly packed RGBA8 pixels, top row first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ViewportError::EmptyFrame);
        }
        let expected = expected_len(width, height)?;
        if pixels.len() != expected {
            return Err(ViewportError::FrameSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build from BGRA8 pixels, as swapchains commonly deliver them
    pub fn from_bgra(width: u32, height: u32, mut pixels: Vec<u8>) -> Result<Self> {
        for px in pixels.chunks_exact_mut(RGBA8_CHANNELS) {
            px.swap(0, 2);
        }
        Self::new(width, height, pixels)
    }

    /// True when every pixel is fully transparent (a cleared, unpreserved buffer)
    pub fn is_blank(&self) -> bool {
        self.pixels
            .chunks_exact(RGBA8_CHANNELS)
            .all(|px| px[3] == 0)
    }
}

fn expected_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(RGBA8_CHANNELS))
        .ok_or(ViewportError::FrameSize {
            expected: usize::MAX,
            actual: 0,
        })
}

/// Reads back the most recently rendered frame
pub trait FrameCapture {
    fn capture(&mut self) -> Result<RgbaFrame>;
}

/// Encoded image ready to hand to the host's download mechanism
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Encode a frame as PNG
pub fn encode_png(frame: &RgbaFrame) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut bytes, CompressionType::Fast, FilterType::Adaptive);
    encoder.write_image(
        &frame.pixels,
        frame.width,
        frame.height,
        ColorType::Rgba8.into(),
    )?;
    Ok(bytes)
}
