//! Display pixel sources
//!
//! The capture session pulls raw RGB frames from a [`DisplaySource`]. The
//! platform pixel-grab mechanism stays behind this trait; the built-in
//! source renders a synthetic moving pattern so the pipeline runs on any
//! host.

use crate::error::CaptureError;

/// A raw RGB frame (3 bytes per pixel, row-major)
pub struct RawFrame {
    pub rgb: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Produces raw frames for the capture pipeline
pub trait DisplaySource: Send {
    /// Grab the next frame. Called at the configured frame rate.
    fn next_frame(&mut self) -> Result<RawFrame, CaptureError>;
}

/// Synthetic source: a gradient with a moving vertical bar
pub struct TestPatternSource {
    width: u32,
    height: u32,
    tick: u64,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tick: 0,
        }
    }
}

impl DisplaySource for TestPatternSource {
    fn next_frame(&mut self) -> Result<RawFrame, CaptureError> {
        let (w, h) = (self.width as usize, self.height as usize);
        let bar = (self.tick as usize * 4) % w.max(1);
        let mut rgb = vec![0u8; w * h * 3];
        for y in 0..h {
            for x in 0..w {
                let i = (y * w + x) * 3;
                rgb[i] = (x * 255 / w.max(1)) as u8;
                rgb[i + 1] = (y * 255 / h.max(1)) as u8;
                rgb[i + 2] = if x.abs_diff(bar) < 8 { 255 } else { 64 };
            }
        }
        self.tick = self.tick.wrapping_add(1);
        Ok(RawFrame {
            rgb,
            width: self.width,
            height: self.height,
        })
    }
}
