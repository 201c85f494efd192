//! Shared latest-frame feed
//!
//! A watch-based cell holding the most recent encoded frame. Producers
//! (capture session, status glyphs) overwrite it; consumers (HTTP clients)
//! always observe the latest frame and never queue behind slow peers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::watch;

/// A single encoded video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// JPEG payload
    pub jpeg: Bytes,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Monotonic sequence number assigned by the hub
    pub sequence: u64,
}

/// Latest-frame cell shared between producers and consumers
pub struct FrameHub {
    tx: watch::Sender<Option<Arc<VideoFrame>>>,
    sequence: AtomicU64,
}

/// Thread-safe handle to a frame hub
pub type SharedFrameHub = Arc<FrameHub>;

/// Create a new shared frame hub
pub fn create_shared_hub() -> SharedFrameHub {
    Arc::new(FrameHub::new())
}

impl FrameHub {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx,
            sequence: AtomicU64::new(0),
        }
    }

    /// Publish a frame, assigning it the next sequence number.
    pub fn publish(&self, jpeg: Bytes, width: u32, height: u32) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let frame = Arc::new(VideoFrame {
            jpeg,
            width,
            height,
            sequence,
        });
        self.tx.send_replace(Some(frame));
        sequence
    }

    /// Subscribe to frame updates
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<VideoFrame>>> {
        self.tx.subscribe()
    }

    /// Most recently published frame, if any
    pub fn latest(&self) -> Option<Arc<VideoFrame>> {
        self.tx.borrow().clone()
    }

    /// Drop the current frame so new subscribers wait for a fresh one.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}

impl Default for FrameHub {
    fn default() -> Self {
        Self::new()
    }
}
