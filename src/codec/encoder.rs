//! JPEG encoder wrapper
//!
//! Wraps the `image` JPEG codec with a reusable output buffer and encode
//! statistics.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::error::CodecError;

/// JPEG encoder with per-stream configuration
pub struct JpegFrameEncoder {
    quality: u8,
    /// Encoding buffer (reused to avoid allocations)
    out: Vec<u8>,
    /// Frame counter for statistics
    frames_encoded: u64,
    /// Total bytes produced
    bytes_produced: u64,
}

impl JpegFrameEncoder {
    /// Create a new encoder with the specified quality (1-100)
    pub fn new(quality: u8) -> Result<Self, CodecError> {
        if !(1..=100).contains(&quality) {
            return Err(CodecError::InvalidQuality(quality));
        }
        Ok(Self {
            quality,
            out: Vec::with_capacity(64 * 1024),
            frames_encoded: 0,
            bytes_produced: 0,
        })
    }

    /// Encode an RGB frame (3 bytes per pixel) into a JPEG payload.
    pub fn encode_rgb(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<Bytes, CodecError> {
        if width == 0 || height == 0 || rgb.len() != (width as usize * height as usize * 3) {
            return Err(CodecError::InvalidDimensions(width, height));
        }
        self.out.clear();
        let encoder = JpegEncoder::new_with_quality(&mut self.out, self.quality);
        encoder
            .write_image(rgb, width, height, ExtendedColorType::Rgb8)
            .map_err(|e| CodecError::EncodingFailed(e.to_string()))?;
        self.frames_encoded += 1;
        self.bytes_produced += self.out.len() as u64;
        Ok(Bytes::copy_from_slice(&self.out))
    }

    /// Encoder statistics
    pub fn stats(&self) -> EncoderStats {
        EncoderStats {
            frames_encoded: self.frames_encoded,
            bytes_produced: self.bytes_produced,
            average_frame_size: if self.frames_encoded == 0 {
                0.0
            } else {
                self.bytes_produced as f64 / self.frames_encoded as f64
            },
        }
    }
}

/// Encoding statistics
#[derive(Debug, Clone, Copy)]
pub struct EncoderStats {
    pub frames_encoded: u64,
    pub bytes_produced: u64,
    pub average_frame_size: f64,
}
