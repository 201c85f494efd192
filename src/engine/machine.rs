//! The lifecycle consumer loop
//!
//! One task drains the event queue and applies transitions run-to-completion
//! against the single [`StreamState`]. Collaborator calls happen inside the
//! loop, so every side effect is serialized with every state change. The
//! loop exits only when a destroy event is processed.

use std::sync::Arc;

use futures_util::FutureExt;

use crate::capture::{
    CaptureConfig, CaptureController, CaptureGrant, SharedFrameHub, SignalKind, StatusSignaler,
};
use crate::config::SharedSettings;
use crate::constants::{DISCOVERY_MAX_ATTEMPTS, DISCOVERY_RETRY_DELAY, SIGNAL_FRAME_COUNT,
    SIGNAL_FRAME_INTERVAL};
use crate::engine::event::{Event, EventKind, RestartReason};
use crate::engine::filter;
use crate::engine::queue::{EngineHandle, EngineInbox};
use crate::engine::snapshot::Observer;
use crate::engine::state::{ActiveCapture, Phase, StreamState};
use crate::error::{AppError, FatalError, FixableError};
use crate::network::{InterfaceFilter, NetworkDiscovery};
use crate::ui::server::{StatsReceiver, StatsReport, StreamServer};

pub(crate) struct EngineLoop<D, S, C> {
    state: StreamState,
    settings: SharedSettings,
    discovery: D,
    server: S,
    capture: C,
    signaler: StatusSignaler,
    hub: SharedFrameHub,
    handle: EngineHandle,
    observer: Arc<dyn Observer>,
    stats: StatsReceiver,
}

impl<D, S, C> EngineLoop<D, S, C>
where
    D: NetworkDiscovery,
    S: StreamServer,
    C: CaptureController,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        settings: SharedSettings,
        discovery: D,
        server: S,
        capture: C,
        signaler: StatusSignaler,
        hub: SharedFrameHub,
        handle: EngineHandle,
        observer: Arc<dyn Observer>,
        stats: StatsReceiver,
    ) -> Self {
        Self {
            state: StreamState::new(),
            settings,
            discovery,
            server,
            capture,
            signaler,
            hub,
            handle,
            observer,
            stats,
        }
    }

    /// Drain the queue until destroyed.
    pub(crate) async fn run(mut self, mut inbox: EngineInbox) {
        loop {
            tokio::select! {
                biased;
                event = inbox.0.recv() => {
                    let Some(event) = event else { break };
                    if self.process(event).await {
                        break;
                    }
                }
                report = self.stats.rx.recv() => {
                    // Never closed: the receiver keeps a sender alive
                    if let Some(report) = report {
                        self.handle_stats(report);
                    }
                }
            }
        }
        tracing::debug!("engine loop exited");
    }

    /// Process one event. Returns whether the engine was destroyed.
    pub(crate) async fn process(&mut self, event: Event) -> bool {
        let kind = event.kind();
        if !filter::admits(self.state.phase, kind) {
            tracing::debug!(phase = ?self.state.phase, event = ?kind, "event skipped");
            return false;
        }
        tracing::debug!(phase = ?self.state.phase, event = ?kind, "processing event");

        let force_publish = kind == EventKind::RequestPublicState;
        match std::panic::AssertUnwindSafe(self.dispatch(event))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                tracing::error!(%error, event = ?kind, "transition failed");
                self.fail(error);
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                tracing::error!(reason, event = ?kind, "transition panicked");
                self.fail(AppError::Fatal(FatalError::Dispatch(reason.to_string())));
            }
        }
        self.publish_if_changed(force_publish);
        self.state.phase == Phase::Destroyed
    }

    async fn dispatch(&mut self, event: Event) -> Result<(), AppError> {
        match event {
            Event::DiscoverAddress => self.on_discover_address(),
            Event::StartServer => self.on_start_server().await,
            Event::StartStream => {
                self.state.phase = Phase::PermissionPending;
                Ok(())
            }
            Event::CastPermissionDenied => {
                tracing::info!("capture permission denied");
                self.state.phase = Phase::ServerStarted;
                Ok(())
            }
            Event::StartProjection(grant) => self.on_start_projection(grant),
            Event::StopStream => self.on_stop_stream(),
            Event::ScreenOff => self.on_screen_off(),
            Event::ToggleFromWebPage => self.on_toggle(),
            Event::RestartServer(reason) => self.on_restart(reason),
            Event::ComponentError(error) => {
                self.fail(error);
                Ok(())
            }
            Event::RecoverError => self.on_recover(),
            Event::RequestPublicState => Ok(()),
            Event::Destroy => self.on_destroy().await,
        }
    }

    fn on_discover_address(&mut self) -> Result<(), AppError> {
        let filter = InterfaceFilter::from(&self.settings.get().network);
        let found = match self.discovery.list_interfaces(&filter) {
            Ok(list) => list,
            Err(err) => {
                tracing::warn!(%err, "interface enumeration failed");
                Vec::new()
            }
        };

        if !found.is_empty() {
            tracing::info!(count = found.len(), "addresses discovered");
            self.state.interfaces = found;
            self.state.discover_attempt = 0;
            self.state.phase = Phase::AddressDiscovered;
            self.handle.submit(Event::StartServer);
        } else if self.state.discover_attempt < DISCOVERY_MAX_ATTEMPTS {
            self.state.discover_attempt += 1;
            tracing::info!(
                attempt = self.state.discover_attempt,
                "no usable address, retrying"
            );
            self.handle
                .submit_after(Event::DiscoverAddress, DISCOVERY_RETRY_DELAY);
        } else {
            self.state.discover_attempt = 0;
            self.state.interfaces.clear();
            self.fail(FixableError::AddressNotFound.into());
        }
        Ok(())
    }

    async fn on_start_server(&mut self) -> Result<(), AppError> {
        if self.state.interfaces.is_empty() {
            return Err(FatalError::Dispatch(
                "server start without discovered addresses".into(),
            )
            .into());
        }
        // Stop-before-start keeps restarts idempotent
        self.server.stop().await;
        if let Err(err) = self.server.start(&self.state.interfaces).await {
            tracing::warn!(%err, "server start failed");
            self.fail(err.into());
            return Ok(());
        }
        self.pulse(SignalKind::Start);
        self.state.phase = Phase::ServerStarted;
        Ok(())
    }

    fn on_start_projection(&mut self, grant: CaptureGrant) -> Result<(), AppError> {
        let config = CaptureConfig::from_settings(&self.settings.get().stream);
        match self.capture.start(&config, &grant) {
            Ok(session) => {
                self.state.capture = Some(ActiveCapture { grant, session });
                self.state.phase = Phase::Streaming;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, "capture start failed");
                self.fail(err.into());
                Ok(())
            }
        }
    }

    fn on_stop_stream(&mut self) -> Result<(), AppError> {
        self.state.stop_capture();
        // A rotated pin triggers its own settings-change restart, which
        // carries the visual feedback for this stop
        if !self.settings.rotate_pin() {
            self.pulse(SignalKind::Start);
        }
        self.state.phase = Phase::ServerStarted;
        Ok(())
    }

    fn on_screen_off(&mut self) -> Result<(), AppError> {
        if self.settings.get().behavior.stop_on_sleep {
            tracing::info!("screen turned off, stopping stream");
            self.on_stop_stream()
        } else {
            Ok(())
        }
    }

    fn on_toggle(&mut self) -> Result<(), AppError> {
        match self.state.phase {
            Phase::Streaming => self.on_stop_stream(),
            Phase::ServerStarted => {
                self.state.phase = Phase::PermissionPending;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn on_restart(&mut self, reason: RestartReason) -> Result<(), AppError> {
        tracing::info!(?reason, "restarting server");
        let from_error = self.state.phase == Phase::Error;
        self.state.stop_capture();
        match reason {
            RestartReason::ConnectivityChanged => self.observer.on_connection_changed(),
            RestartReason::SettingsChanged => self.pulse(SignalKind::Reload),
            RestartReason::NetworkSettingsChanged => self.pulse(SignalKind::NewAddress),
        }
        if from_error {
            // Recovery owns the transition out of the error phase
            self.handle.submit(Event::RecoverError);
            return Ok(());
        }
        self.state.interfaces.clear();
        self.state.discover_attempt = 0;
        self.state.phase = Phase::RestartPending;
        self.handle
            .submit_after(Event::DiscoverAddress, DISCOVERY_RETRY_DELAY);
        Ok(())
    }

    fn on_recover(&mut self) -> Result<(), AppError> {
        tracing::info!("recovering from error");
        self.state.error = None;
        self.state.interfaces.clear();
        self.state.discover_attempt = 0;
        self.state.phase = Phase::RestartPending;
        self.handle.submit(Event::DiscoverAddress);
        Ok(())
    }

    async fn on_destroy(&mut self) -> Result<(), AppError> {
        tracing::info!("engine shutting down");
        self.state.stop_capture();
        self.server.stop().await;
        self.state.interfaces.clear();
        self.state.error = None;
        self.state.phase = Phase::Destroyed;
        Ok(())
    }

    /// Record an error and enter the error phase, stopping capture first.
    fn fail(&mut self, error: AppError) {
        self.state.stop_capture();
        self.state.error = Some(error);
        self.state.phase = Phase::Error;
    }

    /// Publish a short glyph pulse into the frame feed without blocking the
    /// loop.
    fn pulse(&self, kind: SignalKind) {
        let frame = match self.signaler.render_frame(kind) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(%err, "glyph render failed");
                return;
            }
        };
        let hub = self.hub.clone();
        let (width, height) = (self.signaler.width(), self.signaler.height());
        tokio::spawn(async move {
            for i in 0..SIGNAL_FRAME_COUNT {
                hub.publish(frame.clone(), width, height);
                if i + 1 < SIGNAL_FRAME_COUNT {
                    tokio::time::sleep(SIGNAL_FRAME_INTERVAL).await;
                }
            }
        });
    }

    fn handle_stats(&mut self, report: StatsReport) {
        self.state.connected_clients = report.clients.len();
        self.observer
            .on_client_statistics(report.clients, report.traffic);
        self.publish_if_changed(false);
    }

    fn publish_if_changed(&mut self, force: bool) {
        let snapshot = self.state.snapshot();
        let changed = self.handle.replace_published(&snapshot);
        if changed || force {
            self.observer.on_snapshot(snapshot);
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &StreamState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut StreamState {
        &mut self.state
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
