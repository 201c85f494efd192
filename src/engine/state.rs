//! Lifecycle phases and the engine's mutable state
//!
//! One [`StreamState`] instance exists per engine and is owned exclusively
//! by the consumer loop; nothing outside the loop ever holds a reference.

use crate::capture::{CaptureGrant, CaptureSession};
use crate::engine::snapshot::PublicSnapshot;
use crate::error::AppError;
use crate::network::NetInterface;

/// Lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Phase {
    /// Created, addresses not yet discovered
    Initial = 0,
    /// Bindable addresses found, server about to start
    AddressDiscovered,
    /// HTTP server running, stream idle
    ServerStarted,
    /// Waiting for the platform capture grant
    PermissionPending,
    /// Capture running, frames flowing
    Streaming,
    /// Tearing down before rediscovery
    RestartPending,
    /// An error is active
    Error,
    /// Terminal
    Destroyed,
}

impl Phase {
    /// Number of phases
    pub const COUNT: usize = 8;

    /// Every phase, in discriminant order
    pub const ALL: [Phase; Self::COUNT] = [
        Phase::Initial,
        Phase::AddressDiscovered,
        Phase::ServerStarted,
        Phase::PermissionPending,
        Phase::Streaming,
        Phase::RestartPending,
        Phase::Error,
        Phase::Destroyed,
    ];
}

/// The capture grant and its running session, bundled so that they are
/// always both present or both absent.
pub struct ActiveCapture {
    pub grant: CaptureGrant,
    pub session: Box<dyn CaptureSession>,
}

/// Mutable engine state, owned by the consumer loop
pub struct StreamState {
    pub(crate) phase: Phase,
    pub(crate) interfaces: Vec<NetInterface>,
    pub(crate) discover_attempt: u32,
    pub(crate) capture: Option<ActiveCapture>,
    pub(crate) error: Option<AppError>,
    /// Client count reported by the server over the statistics channel
    pub(crate) connected_clients: usize,
}

impl StreamState {
    pub(crate) fn new() -> Self {
        Self {
            phase: Phase::Initial,
            interfaces: Vec::new(),
            discover_attempt: 0,
            capture: None,
            error: None,
            connected_clients: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn interfaces(&self) -> &[NetInterface] {
        &self.interfaces
    }

    pub fn discover_attempt(&self) -> u32 {
        self.discover_attempt
    }

    pub fn has_capture(&self) -> bool {
        self.capture.is_some()
    }

    pub fn error(&self) -> Option<&AppError> {
        self.error.as_ref()
    }

    /// Stop and release the capture pipeline, if running.
    pub(crate) fn stop_capture(&mut self) {
        if let Some(active) = self.capture.take() {
            active.session.stop();
            drop(active.grant);
        }
    }

    /// Derive the externally observable summary of this state.
    pub(crate) fn snapshot(&self) -> PublicSnapshot {
        PublicSnapshot {
            is_busy: matches!(
                self.phase,
                Phase::Initial | Phase::AddressDiscovered | Phase::RestartPending | Phase::Destroyed
            ),
            waiting_for_cast_permission: self.phase == Phase::PermissionPending,
            is_streaming: self.phase == Phase::Streaming,
            connected_clients: self.connected_clients,
            error: self.error.clone(),
        }
    }
}
