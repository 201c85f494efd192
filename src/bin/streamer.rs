//! Screen Streamer Application
//!
//! Captures the screen and serves it to browser clients over HTTP.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lan_screen_streamer::{
    capture::{create_shared_hub, CaptureGrant, DisplayCapturer, StatusSignaler},
    config::{AppSettings, SettingsStore},
    engine::{
        listeners::{spawn_connectivity_watcher, spawn_settings_watcher},
        EngineHandle, Observer, PublicSnapshot, StreamEngine,
    },
    network::SystemDiscovery,
    ui::{stats_channel, ClientInfo, TrafficPoint, WebServer},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting LAN Screen Streamer");

    let settings_path = AppSettings::default_path();
    if let Some(path) = &settings_path {
        tracing::info!(path = %path.display(), "settings file");
    }
    let settings = SettingsStore::load_or_default(settings_path)?;
    let current = settings.get();
    tracing::info!(
        port = current.network.http_port,
        fps = current.stream.frame_rate,
        pin = current.security.enable_pin,
        "settings loaded"
    );

    let auto_start = std::env::args().any(|arg| arg == "--start");

    let (handle, inbox) = EngineHandle::new();
    let (stats_tx, stats_rx) = stats_channel();
    let hub = create_shared_hub();

    let server = WebServer::new(settings.clone(), hub.clone(), handle.clone(), stats_tx);
    let capture = DisplayCapturer::new(hub.clone());
    let signaler = StatusSignaler::new(
        current.stream.width,
        current.stream.height,
        current.stream.jpeg_quality,
    );

    let observer: Arc<dyn Observer> = Arc::new(ConsoleObserver {
        handle: handle.clone(),
        auto_start,
        start_requested: AtomicBool::new(false),
    });

    let mut engine = StreamEngine::start(
        settings.clone(),
        SystemDiscovery,
        server,
        capture,
        signaler,
        hub,
        observer,
        handle.clone(),
        inbox,
        stats_rx,
    );

    engine.attach_listener(spawn_connectivity_watcher(
        SystemDiscovery,
        settings.clone(),
        handle.clone(),
    ));
    engine.attach_listener(spawn_settings_watcher(settings.clone(), handle.clone()));

    // SIGUSR1 maps to the screen-off signal on unix hosts
    #[cfg(unix)]
    {
        let handle = handle.clone();
        engine.attach_listener(tokio::spawn(async move {
            let Ok(mut signal) =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::user_defined1())
            else {
                return;
            };
            while signal.recv().await.is_some() {
                tracing::info!("screen-off signal received");
                handle.screen_off();
            }
        }));
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    engine.destroy().await;
    tracing::info!("Goodbye");
    Ok(())
}

/// Logs engine activity and drives the headless permission flow: when the
/// engine waits for a capture grant, issue one immediately.
struct ConsoleObserver {
    handle: EngineHandle,
    auto_start: bool,
    start_requested: AtomicBool,
}

impl Observer for ConsoleObserver {
    fn on_snapshot(&self, snapshot: PublicSnapshot) {
        match &snapshot.error {
            Some(error) => tracing::error!(%error, "stream error"),
            None => tracing::info!(
                streaming = snapshot.is_streaming,
                busy = snapshot.is_busy,
                clients = snapshot.connected_clients,
                "state changed"
            ),
        }

        if snapshot.waiting_for_cast_permission {
            // Headless host: the platform grant dialog collapses to a yes
            self.handle.provide_grant(CaptureGrant::new());
        } else if self.auto_start
            && !snapshot.is_busy
            && !snapshot.is_streaming
            && snapshot.error.is_none()
            && !self.start_requested.swap(true, Ordering::SeqCst)
        {
            self.handle.start_stream();
        }
    }

    fn on_client_statistics(&self, clients: Vec<ClientInfo>, traffic: Vec<TrafficPoint>) {
        let last_bytes = traffic.last().map_or(0, |point| point.bytes);
        tracing::debug!(
            clients = clients.len(),
            bytes_last_second = last_bytes,
            "client statistics"
        );
    }

    fn on_connection_changed(&self) {
        tracing::info!("connection changed, stream addresses will be rediscovered");
    }
}
