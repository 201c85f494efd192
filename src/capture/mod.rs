//! Screen capture subsystem
//!
//! Produces encoded frames into the shared feed the HTTP server serves.

pub mod controller;
pub mod frame;
pub mod indicator;
pub mod source;

pub use controller::{CaptureConfig, CaptureController, CaptureGrant, CaptureSession, DisplayCapturer};
pub use frame::{create_shared_hub, FrameHub, SharedFrameHub, VideoFrame};
pub use indicator::{SignalKind, StatusSignaler};
pub use source::{DisplaySource, RawFrame, TestPatternSource};
