//! Status glyph rendering
//!
//! Renders fixed status glyphs as full frames for the feed. The engine
//! publishes them as a short pulse so connected browsers see lifecycle
//! changes (server started, settings reloaded, address changed) even while
//! no capture is running.

use bytes::Bytes;

use crate::codec::JpegFrameEncoder;
use crate::error::CodecError;

/// Which glyph to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Stream is ready to start (play triangle)
    Start,
    /// Stream stopped (square)
    Stop,
    /// Settings reloaded (ring with gap)
    Reload,
    /// Addresses changed (diamond)
    NewAddress,
}

impl SignalKind {
    fn color(self) -> [u8; 3] {
        match self {
            SignalKind::Start => [64, 200, 96],
            SignalKind::Stop => [220, 68, 68],
            SignalKind::Reload => [240, 180, 48],
            SignalKind::NewAddress => [80, 140, 240],
        }
    }
}

const BACKGROUND: [u8; 3] = [24, 26, 30];

/// Renders status glyphs at the stream's frame size
pub struct StatusSignaler {
    width: u32,
    height: u32,
    quality: u8,
}

impl StatusSignaler {
    pub fn new(width: u32, height: u32, quality: u8) -> Self {
        Self {
            width: width.max(16),
            height: height.max(16),
            quality: quality.clamp(1, 100),
        }
    }

    /// Render the glyph for `kind`. Pure: same input, same output.
    pub fn render_frame(&self, kind: SignalKind) -> Result<Bytes, CodecError> {
        let (w, h) = (self.width as usize, self.height as usize);
        let mut rgb = Vec::with_capacity(w * h * 3);
        for y in 0..h {
            for x in 0..w {
                let px = if glyph_covers(kind, x, y, w, h) {
                    kind.color()
                } else {
                    BACKGROUND
                };
                rgb.extend_from_slice(&px);
            }
        }
        let mut encoder = JpegFrameEncoder::new(self.quality)?;
        encoder.encode_rgb(&rgb, self.width, self.height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Whether the glyph covers pixel (x, y) on a w x h canvas
fn glyph_covers(kind: SignalKind, x: usize, y: usize, w: usize, h: usize) -> bool {
    // Normalized coordinates centered on the canvas, glyph fits a unit box
    let size = (w.min(h) as f64) * 0.4;
    let dx = x as f64 - w as f64 / 2.0;
    let dy = y as f64 - h as f64 / 2.0;
    match kind {
        SignalKind::Start => {
            // Right-pointing triangle
            let nx = dx / size;
            let ny = dy / size;
            nx >= -0.6 && nx <= 0.8 && ny.abs() <= (0.8 - nx) * 0.55
        }
        SignalKind::Stop => dx.abs() <= size * 0.6 && dy.abs() <= size * 0.6,
        SignalKind::Reload => {
            let r = (dx * dx + dy * dy).sqrt();
            let ring = r >= size * 0.55 && r <= size * 0.85;
            // Gap in the upper-right quadrant suggests rotation
            let angle = dy.atan2(dx);
            ring && !(-1.2..=-0.3).contains(&angle)
        }
        SignalKind::NewAddress => dx.abs() + dy.abs() <= size * 0.8,
    }
}
