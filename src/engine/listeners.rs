//! System listeners
//!
//! Translate external signals (interface set changes, settings edits) into
//! engine events. Listeners only ever talk to the engine through the queue;
//! once the engine is destroyed their submissions become no-ops.

use tokio::task::JoinHandle;

use crate::config::{classify_change, SettingsDelta, SharedSettings};
use crate::constants::CONNECTIVITY_POLL_INTERVAL;
use crate::engine::event::RestartReason;
use crate::engine::queue::EngineHandle;
use crate::network::{InterfaceFilter, NetInterface, NetworkDiscovery};

/// Poll the interface set and report connectivity changes.
pub fn spawn_connectivity_watcher<D>(
    discovery: D,
    settings: SharedSettings,
    handle: EngineHandle,
) -> JoinHandle<()>
where
    D: NetworkDiscovery + 'static,
{
    tokio::spawn(async move {
        let mut last: Option<Vec<NetInterface>> = None;
        let mut tick = tokio::time::interval(CONNECTIVITY_POLL_INTERVAL);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tick.tick().await;
            let filter = InterfaceFilter::from(&settings.get().network);
            let current = match discovery.list_interfaces(&filter) {
                Ok(interfaces) => interfaces,
                Err(err) => {
                    tracing::debug!(%err, "connectivity poll failed");
                    continue;
                }
            };
            if let Some(previous) = &last {
                if *previous != current {
                    tracing::info!("interface set changed");
                    handle.restart(RestartReason::ConnectivityChanged);
                }
            }
            last = Some(current);
        }
    })
}

/// Watch the settings store and restart the server when a change affects
/// the running stream.
pub fn spawn_settings_watcher(settings: SharedSettings, handle: EngineHandle) -> JoinHandle<()> {
    let mut rx = settings.subscribe();
    tokio::spawn(async move {
        let mut previous = rx.borrow().clone();
        while rx.changed().await.is_ok() {
            let current = rx.borrow_and_update().clone();
            match classify_change(&previous, &current) {
                SettingsDelta::Network => {
                    tracing::info!("network settings changed");
                    handle.restart(RestartReason::NetworkSettingsChanged);
                }
                SettingsDelta::Stream => {
                    tracing::info!("stream settings changed");
                    handle.restart(RestartReason::SettingsChanged);
                }
                SettingsDelta::None => {}
            }
            previous = current;
        }
    })
}
