//! Engine event vocabulary
//!
//! Every way the outside world (public API, web page, listeners) or the
//! engine itself can poke the lifecycle is one variant here. The closed enum
//! forces every dispatch site to handle new kinds exhaustively.

use crate::capture::CaptureGrant;
use crate::error::AppError;

/// Why the server is being restarted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    /// The interface set changed underneath us
    ConnectivityChanged,
    /// Stream or security settings changed
    SettingsChanged,
    /// Address selection settings changed
    NetworkSettingsChanged,
}

/// Events processed by the lifecycle engine
#[derive(Debug)]
pub enum Event {
    // Submitted from outside the engine
    /// Ask to start streaming (capture permission will be requested)
    StartStream,
    /// The platform denied the capture permission
    CastPermissionDenied,
    /// The platform granted capture; start projecting
    StartProjection(CaptureGrant),
    /// Ask to stop streaming
    StopStream,
    /// Republish the public snapshot
    RequestPublicState,
    /// Clear the active error and rediscover
    RecoverError,

    // Generated internally or by collaborators
    /// Enumerate bindable addresses
    DiscoverAddress,
    /// Start the HTTP server on the discovered addresses
    StartServer,
    /// A collaborator failed
    ComponentError(AppError),
    /// Start/stop pressed on the web page
    ToggleFromWebPage,
    /// Tear down and rediscover
    RestartServer(RestartReason),
    /// The device screen turned off
    ScreenOff,
    /// Final teardown
    Destroy,
}

/// Data-free event discriminant used for compatibility lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum EventKind {
    StartStream = 0,
    CastPermissionDenied,
    StartProjection,
    StopStream,
    RequestPublicState,
    RecoverError,
    DiscoverAddress,
    StartServer,
    ComponentError,
    ToggleFromWebPage,
    RestartServer,
    ScreenOff,
    Destroy,
}

impl EventKind {
    /// Number of event kinds
    pub const COUNT: usize = 13;

    /// Every kind, in discriminant order
    pub const ALL: [EventKind; Self::COUNT] = [
        EventKind::StartStream,
        EventKind::CastPermissionDenied,
        EventKind::StartProjection,
        EventKind::StopStream,
        EventKind::RequestPublicState,
        EventKind::RecoverError,
        EventKind::DiscoverAddress,
        EventKind::StartServer,
        EventKind::ComponentError,
        EventKind::ToggleFromWebPage,
        EventKind::RestartServer,
        EventKind::ScreenOff,
        EventKind::Destroy,
    ];
}

impl Event {
    /// The data-free discriminant of this event
    pub fn kind(&self) -> EventKind {
        match self {
            Event::StartStream => EventKind::StartStream,
            Event::CastPermissionDenied => EventKind::CastPermissionDenied,
            Event::StartProjection(_) => EventKind::StartProjection,
            Event::StopStream => EventKind::StopStream,
            Event::RequestPublicState => EventKind::RequestPublicState,
            Event::RecoverError => EventKind::RecoverError,
            Event::DiscoverAddress => EventKind::DiscoverAddress,
            Event::StartServer => EventKind::StartServer,
            Event::ComponentError(_) => EventKind::ComponentError,
            Event::ToggleFromWebPage => EventKind::ToggleFromWebPage,
            Event::RestartServer(_) => EventKind::RestartServer,
            Event::ScreenOff => EventKind::ScreenOff,
            Event::Destroy => EventKind::Destroy,
        }
    }
}
