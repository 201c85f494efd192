//! Derived public state and observer callbacks

use crate::error::AppError;
use crate::ui::server::{ClientInfo, TrafficPoint};

/// Externally observable summary of the engine state.
///
/// Recomputed after every admitted event and published only when it differs
/// by value from the previously published snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicSnapshot {
    /// The engine is between stable phases (discovering, restarting)
    pub is_busy: bool,
    /// Waiting for the platform capture grant
    pub waiting_for_cast_permission: bool,
    /// Frames are flowing
    pub is_streaming: bool,
    /// Clients currently connected to the stream
    pub connected_clients: usize,
    /// Active error, if any
    pub error: Option<AppError>,
}

impl Default for PublicSnapshot {
    fn default() -> Self {
        Self {
            // A fresh engine starts mid-transition (pre-discovery)
            is_busy: true,
            waiting_for_cast_permission: false,
            is_streaming: false,
            connected_clients: 0,
            error: None,
        }
    }
}

/// Callbacks invoked from the engine's consumer loop.
///
/// Implementations must not block; hand off to a channel or task for any
/// real work.
pub trait Observer: Send + Sync {
    /// The public snapshot changed (or was explicitly requested).
    fn on_snapshot(&self, snapshot: PublicSnapshot);

    /// Periodic per-client statistics from the stream server.
    fn on_client_statistics(&self, clients: Vec<ClientInfo>, traffic: Vec<TrafficPoint>) {
        let _ = (clients, traffic);
    }

    /// Connectivity changed; a restart cycle is beginning.
    fn on_connection_changed(&self) {}
}
