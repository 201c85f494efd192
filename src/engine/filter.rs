//! Event compatibility table
//!
//! One static lookup decides which events are meaningful in which phase.
//! Incompatible pairs are dropped before dispatch with no state change and
//! no side effect, which keeps impossible transitions out of the handlers
//! entirely. Kept as a table (not conditionals) so the full phase x event
//! cross-product is testable in one place.

use crate::engine::event::EventKind;
use crate::engine::state::Phase;

const fn allow(kinds: &[EventKind]) -> [bool; EventKind::COUNT] {
    let mut row = [false; EventKind::COUNT];
    let mut i = 0;
    while i < kinds.len() {
        row[kinds[i] as usize] = true;
        i += 1;
    }
    row
}

/// Rows indexed by `Phase as usize`, columns by `EventKind as usize`
static COMPATIBILITY: [[bool; EventKind::COUNT]; Phase::COUNT] = [
    // Initial
    allow(&[
        EventKind::DiscoverAddress,
        EventKind::ComponentError,
        EventKind::RequestPublicState,
        EventKind::Destroy,
    ]),
    // AddressDiscovered
    allow(&[
        EventKind::StartServer,
        EventKind::RestartServer,
        EventKind::ComponentError,
        EventKind::RequestPublicState,
        EventKind::Destroy,
    ]),
    // ServerStarted
    allow(&[
        EventKind::StartStream,
        EventKind::ToggleFromWebPage,
        EventKind::RestartServer,
        EventKind::ComponentError,
        EventKind::RequestPublicState,
        EventKind::Destroy,
    ]),
    // PermissionPending
    allow(&[
        EventKind::StartProjection,
        EventKind::CastPermissionDenied,
        EventKind::RestartServer,
        EventKind::ComponentError,
        EventKind::RequestPublicState,
        EventKind::Destroy,
    ]),
    // Streaming
    allow(&[
        EventKind::StopStream,
        EventKind::ScreenOff,
        EventKind::ToggleFromWebPage,
        EventKind::RestartServer,
        EventKind::ComponentError,
        EventKind::RequestPublicState,
        EventKind::Destroy,
    ]),
    // RestartPending
    allow(&[
        EventKind::DiscoverAddress,
        EventKind::ComponentError,
        EventKind::RequestPublicState,
        EventKind::Destroy,
    ]),
    // Error
    allow(&[
        EventKind::RecoverError,
        EventKind::RestartServer,
        EventKind::ComponentError,
        EventKind::RequestPublicState,
        EventKind::Destroy,
    ]),
    // Destroyed
    allow(&[]),
];

/// Whether `kind` is meaningful while the engine is in `phase`
pub fn admits(phase: Phase, kind: EventKind) -> bool {
    COMPATIBILITY[phase as usize][kind as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destroyed_admits_nothing() {
        for kind in EventKind::ALL {
            assert!(!admits(Phase::Destroyed, kind), "{kind:?} admitted after destroy");
        }
    }

    #[test]
    fn test_destroy_and_errors_admitted_everywhere_else() {
        for phase in Phase::ALL {
            if phase == Phase::Destroyed {
                continue;
            }
            assert!(admits(phase, EventKind::Destroy), "{phase:?} rejects Destroy");
            assert!(
                admits(phase, EventKind::ComponentError),
                "{phase:?} rejects ComponentError"
            );
            assert!(
                admits(phase, EventKind::RequestPublicState),
                "{phase:?} rejects RequestPublicState"
            );
        }
    }

    #[test]
    fn test_projection_only_while_permission_pending() {
        for phase in Phase::ALL {
            assert_eq!(
                admits(phase, EventKind::StartProjection),
                phase == Phase::PermissionPending
            );
        }
    }

    #[test]
    fn test_stop_only_while_streaming() {
        for phase in Phase::ALL {
            assert_eq!(admits(phase, EventKind::StopStream), phase == Phase::Streaming);
            assert_eq!(admits(phase, EventKind::ScreenOff), phase == Phase::Streaming);
        }
    }

    #[test]
    fn test_recover_only_from_error() {
        for phase in Phase::ALL {
            assert_eq!(admits(phase, EventKind::RecoverError), phase == Phase::Error);
        }
    }

    #[test]
    fn test_toggle_in_active_phases_only() {
        for phase in Phase::ALL {
            let expected = matches!(phase, Phase::ServerStarted | Phase::Streaming);
            assert_eq!(admits(phase, EventKind::ToggleFromWebPage), expected);
        }
    }

    #[test]
    fn test_restart_not_admitted_while_already_restarting() {
        assert!(!admits(Phase::RestartPending, EventKind::RestartServer));
        assert!(!admits(Phase::Initial, EventKind::RestartServer));
        for phase in [
            Phase::AddressDiscovered,
            Phase::ServerStarted,
            Phase::PermissionPending,
            Phase::Streaming,
            Phase::Error,
        ] {
            assert!(admits(phase, EventKind::RestartServer), "{phase:?} rejects restart");
        }
    }

    #[test]
    fn test_discovery_in_initial_and_restart_pending_only() {
        for phase in Phase::ALL {
            let expected = matches!(phase, Phase::Initial | Phase::RestartPending);
            assert_eq!(admits(phase, EventKind::DiscoverAddress), expected);
        }
    }
}
