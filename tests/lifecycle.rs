//! End-to-end lifecycle tests against a running engine
//!
//! These spawn the real consumer loop with stub collaborators and drive it
//! exclusively through the public handle, the way the binary and the web
//! page do.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::timeout;

use lan_screen_streamer::capture::{
    create_shared_hub, CaptureConfig, CaptureController, CaptureGrant, CaptureSession,
    StatusSignaler,
};
use lan_screen_streamer::config::{AppSettings, SettingsStore, SharedSettings};
use lan_screen_streamer::engine::{
    Event, EngineHandle, Observer, PublicSnapshot, RestartReason, StreamEngine,
};
use lan_screen_streamer::error::{CaptureError, DiscoveryError, ServerError};
use lan_screen_streamer::network::{InterfaceFilter, NetInterface, NetworkDiscovery};
use lan_screen_streamer::ui::{stats_channel, StreamServer};

fn interfaces() -> Vec<NetInterface> {
    vec![NetInterface {
        name: "eth0".into(),
        address: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)),
    }]
}

/// Discovery with a scripted prefix and a steady fallback
struct ScriptedDiscovery {
    script: Mutex<Vec<Vec<NetInterface>>>,
    fallback: Vec<NetInterface>,
}

impl ScriptedDiscovery {
    fn steady() -> Self {
        Self {
            script: Mutex::new(Vec::new()),
            fallback: interfaces(),
        }
    }

    fn failing_first(empties: usize) -> Self {
        Self {
            script: Mutex::new(vec![Vec::new(); empties]),
            fallback: interfaces(),
        }
    }
}

impl NetworkDiscovery for ScriptedDiscovery {
    fn list_interfaces(
        &self,
        _filter: &InterfaceFilter,
    ) -> Result<Vec<NetInterface>, DiscoveryError> {
        let mut script = self.script.lock();
        Ok(if script.is_empty() {
            self.fallback.clone()
        } else {
            script.remove(0)
        })
    }
}

#[derive(Default)]
struct StubServer {
    log: Arc<Mutex<Vec<&'static str>>>,
    running: bool,
}

#[async_trait]
impl StreamServer for StubServer {
    async fn start(&mut self, _interfaces: &[NetInterface]) -> Result<(), ServerError> {
        self.log.lock().push("start");
        self.running = true;
        Ok(())
    }

    async fn stop(&mut self) {
        self.log.lock().push("stop");
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

#[derive(Default)]
struct StubCapture {
    active: Arc<AtomicUsize>,
}

struct StubSession {
    active: Arc<AtomicUsize>,
}

impl CaptureSession for StubSession {
    fn stop(self: Box<Self>) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl CaptureController for StubCapture {
    fn start(
        &mut self,
        _config: &CaptureConfig,
        _grant: &CaptureGrant,
    ) -> Result<Box<dyn CaptureSession>, CaptureError> {
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubSession {
            active: self.active.clone(),
        }))
    }
}

/// Observer that mirrors snapshots into a watch channel for awaiting
struct WatchObserver {
    tx: watch::Sender<PublicSnapshot>,
    publishes: AtomicUsize,
}

impl Observer for WatchObserver {
    fn on_snapshot(&self, snapshot: PublicSnapshot) {
        self.publishes.fetch_add(1, Ordering::SeqCst);
        self.tx.send_replace(snapshot);
    }
}

struct Rig {
    engine: StreamEngine,
    handle: EngineHandle,
    snapshots: watch::Receiver<PublicSnapshot>,
    observer: Arc<WatchObserver>,
    server_log: Arc<Mutex<Vec<&'static str>>>,
    captures_active: Arc<AtomicUsize>,
    settings: SharedSettings,
}

fn launch(discovery: ScriptedDiscovery) -> Rig {
    let settings = SettingsStore::new(AppSettings::default(), None);
    let (handle, inbox) = EngineHandle::new();
    let (_stats_tx, stats_rx) = stats_channel();
    let hub = create_shared_hub();

    let server = StubServer::default();
    let server_log = server.log.clone();
    let capture = StubCapture::default();
    let captures_active = capture.active.clone();

    let (tx, snapshots) = watch::channel(PublicSnapshot::default());
    let observer = Arc::new(WatchObserver {
        tx,
        publishes: AtomicUsize::new(0),
    });

    let engine = StreamEngine::start(
        settings.clone(),
        discovery,
        server,
        capture,
        StatusSignaler::new(16, 16, 50),
        hub,
        observer.clone(),
        handle.clone(),
        inbox,
        stats_rx,
    );

    Rig {
        engine,
        handle,
        snapshots,
        observer,
        server_log,
        captures_active,
        settings,
    }
}

impl Rig {
    async fn wait_for(&mut self, what: &str, pred: impl FnMut(&PublicSnapshot) -> bool) {
        timeout(Duration::from_secs(10), self.snapshots.wait_for(pred))
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
            .expect("engine observer dropped");
    }
}

#[tokio::test(start_paused = true)]
async fn test_engine_boots_to_server_started_and_streams() {
    let mut rig = launch(ScriptedDiscovery::steady());

    rig.wait_for("server started", |s| !s.is_busy && s.error.is_none())
        .await;
    assert_eq!(*rig.server_log.lock(), vec!["stop", "start"]);

    rig.handle.start_stream();
    rig.wait_for("permission request", |s| s.waiting_for_cast_permission)
        .await;

    rig.handle.provide_grant(CaptureGrant::new());
    rig.wait_for("streaming", |s| s.is_streaming).await;
    assert_eq!(rig.captures_active.load(Ordering::SeqCst), 1);

    rig.handle.stop_stream();
    rig.wait_for("stream stopped", |s| !s.is_streaming && !s.is_busy)
        .await;
    assert_eq!(rig.captures_active.load(Ordering::SeqCst), 0);

    rig.engine.destroy().await;
}

#[tokio::test(start_paused = true)]
async fn test_discovery_exhaustion_reports_error_then_recovers() {
    // Initial attempt plus three retries all come up empty
    let mut rig = launch(ScriptedDiscovery::failing_first(4));

    rig.wait_for("address-not-found error", |s| s.error.is_some())
        .await;
    assert!(rig
        .snapshots
        .borrow()
        .error
        .as_ref()
        .is_some_and(|e| e.is_fixable()));

    rig.handle.recover();
    rig.wait_for("recovery", |s| !s.is_busy && s.error.is_none())
        .await;
    assert_eq!(*rig.server_log.lock(), vec!["stop", "start"]);

    rig.engine.destroy().await;
}

#[tokio::test(start_paused = true)]
async fn test_connectivity_restart_cycles_the_server() {
    let mut rig = launch(ScriptedDiscovery::steady());
    rig.wait_for("server started", |s| !s.is_busy).await;

    rig.handle.restart(RestartReason::ConnectivityChanged);
    rig.wait_for("restart pending", |s| s.is_busy).await;
    rig.wait_for("server restarted", |s| !s.is_busy).await;

    assert_eq!(
        *rig.server_log.lock(),
        vec!["stop", "start", "stop", "start"]
    );

    rig.engine.destroy().await;
}

#[tokio::test(start_paused = true)]
async fn test_destroy_is_terminal_even_for_scheduled_events() {
    let mut rig = launch(ScriptedDiscovery::steady());
    rig.wait_for("server started", |s| !s.is_busy).await;

    // Schedule an event for later, then destroy before it fires
    rig.handle
        .submit_after(Event::RequestPublicState, Duration::from_secs(2));

    let handle = rig.handle.clone();
    rig.engine.destroy().await;
    let published_at_destroy = rig.observer.publishes.load(Ordering::SeqCst);

    // Both direct and scheduled submissions must be swallowed now
    handle.start_stream();
    handle.request_state();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(
        rig.observer.publishes.load(Ordering::SeqCst),
        published_at_destroy
    );
    assert_eq!(rig.captures_active.load(Ordering::SeqCst), 0);
    assert_eq!(rig.server_log.lock().last(), Some(&"stop"));
}

#[tokio::test(start_paused = true)]
async fn test_stop_with_auto_rotation_changes_pin() {
    let mut rig = launch(ScriptedDiscovery::steady());
    rig.settings
        .update(|s| {
            s.security.enable_pin = true;
            s.security.auto_change_pin = true;
        })
        .unwrap();
    rig.wait_for("server started", |s| !s.is_busy).await;

    rig.handle.start_stream();
    rig.wait_for("permission request", |s| s.waiting_for_cast_permission)
        .await;
    rig.handle.provide_grant(CaptureGrant::new());
    rig.wait_for("streaming", |s| s.is_streaming).await;

    let pin_before = rig.settings.get().security.pin;
    rig.handle.stop_stream();
    rig.wait_for("stream stopped", |s| !s.is_streaming).await;

    assert_ne!(rig.settings.get().security.pin, pin_before);

    rig.engine.destroy().await;
}
