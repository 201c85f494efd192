//! Screen capture control
//!
//! The controller validates the capture grant and runs the capture pipeline
//! in a dedicated thread, publishing encoded frames into the shared feed at
//! the configured frame rate.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Sender};
use uuid::Uuid;

use crate::capture::frame::SharedFrameHub;
use crate::capture::source::{DisplaySource, TestPatternSource};
use crate::codec::JpegFrameEncoder;
use crate::config::StreamSettings;
use crate::error::CaptureError;

/// Opaque ownership handle to a screen-capture grant.
///
/// Issued outside the engine (by the platform permission flow) and retained
/// for as long as capture runs.
#[derive(Debug)]
pub struct CaptureGrant {
    id: Uuid,
}

impl CaptureGrant {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Default for CaptureGrant {
    fn default() -> Self {
        Self::new()
    }
}

/// Capture pipeline configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub display_id: u32,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub jpeg_quality: u8,
}

impl CaptureConfig {
    pub fn from_settings(settings: &StreamSettings) -> Self {
        Self {
            display_id: settings.display_id,
            width: settings.width,
            height: settings.height,
            frame_rate: settings.frame_rate.max(1),
            jpeg_quality: settings.jpeg_quality,
        }
    }
}

/// A running capture pipeline
pub trait CaptureSession: Send {
    /// Stop the pipeline and release its resources.
    fn stop(self: Box<Self>);
}

/// Starts capture pipelines against a display
pub trait CaptureController: Send {
    fn start(
        &mut self,
        config: &CaptureConfig,
        grant: &CaptureGrant,
    ) -> Result<Box<dyn CaptureSession>, CaptureError>;
}

/// Default controller: captures via a [`DisplaySource`] in a dedicated thread
pub struct DisplayCapturer {
    hub: SharedFrameHub,
}

impl DisplayCapturer {
    pub fn new(hub: SharedFrameHub) -> Self {
        Self { hub }
    }
}

impl CaptureController for DisplayCapturer {
    fn start(
        &mut self,
        config: &CaptureConfig,
        grant: &CaptureGrant,
    ) -> Result<Box<dyn CaptureSession>, CaptureError> {
        let mut encoder = JpegFrameEncoder::new(config.jpeg_quality)
            .map_err(|e| CaptureError::StartFailed(e.to_string()))?;
        let mut source = TestPatternSource::new(config.width, config.height);
        let hub = self.hub.clone();
        let interval = Duration::from_secs_f64(1.0 / f64::from(config.frame_rate));

        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name(format!("capture-display-{}", config.display_id))
            .spawn(move || loop {
                let started = Instant::now();
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }
                match source.next_frame() {
                    Ok(raw) => match encoder.encode_rgb(&raw.rgb, raw.width, raw.height) {
                        Ok(jpeg) => {
                            hub.publish(jpeg, raw.width, raw.height);
                        }
                        Err(err) => tracing::warn!(%err, "frame encoding failed"),
                    },
                    Err(err) => tracing::warn!(%err, "frame grab failed"),
                }
                let elapsed = started.elapsed();
                if elapsed < interval {
                    thread::sleep(interval - elapsed);
                }
            })
            .map_err(|e| CaptureError::StartFailed(e.to_string()))?;

        tracing::info!(
            grant = %grant.id(),
            display = config.display_id,
            fps = config.frame_rate,
            "capture started"
        );
        Ok(Box::new(ThreadSession {
            shutdown_tx,
            handle: Some(handle),
        }))
    }
}

/// Session backed by a dedicated capture thread
struct ThreadSession {
    shutdown_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureSession for ThreadSession {
    fn stop(mut self: Box<Self>) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        tracing::info!("capture stopped");
    }
}
