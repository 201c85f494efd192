//! HTTP streaming server
//!
//! Serves the control page and the MJPEG stream on every discovered
//! interface address, and reports per-client statistics to the engine over a
//! side channel once per second.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::capture::SharedFrameHub;
use crate::config::SharedSettings;
use crate::constants::{STATS_CHANNEL_CAPACITY, STATS_INTERVAL, TRAFFIC_HISTORY_LEN};
use crate::engine::EngineHandle;
use crate::error::ServerError;
use crate::network::NetInterface;
use crate::ui::handlers;

/// A connected stream client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientInfo {
    pub id: Uuid,
    pub address: SocketAddr,
    pub connected_at: DateTime<Utc>,
    pub bytes_sent: u64,
}

/// Bytes served across all clients during one sampling interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrafficPoint {
    pub at: DateTime<Utc>,
    pub bytes: u64,
}

/// Periodic statistics pushed to the engine
#[derive(Debug, Clone)]
pub struct StatsReport {
    pub clients: Vec<ClientInfo>,
    pub traffic: Vec<TrafficPoint>,
}

/// Sending half of the statistics side channel (held by the server)
#[derive(Clone)]
pub struct StatsSender(pub(crate) mpsc::Sender<StatsReport>);

/// Receiving half of the statistics side channel (held by the engine).
///
/// Keeps a sender alive so the engine never observes a closed channel.
pub struct StatsReceiver {
    pub(crate) rx: mpsc::Receiver<StatsReport>,
    _keepalive: mpsc::Sender<StatsReport>,
}

/// Create the statistics side channel
pub fn stats_channel() -> (StatsSender, StatsReceiver) {
    let (tx, rx) = mpsc::channel(STATS_CHANNEL_CAPACITY);
    (
        StatsSender(tx.clone()),
        StatsReceiver {
            rx,
            _keepalive: tx,
        },
    )
}

/// Port for HTTP stream server implementations
#[async_trait]
pub trait StreamServer: Send {
    /// Bind and serve on the given interface addresses.
    async fn start(&mut self, interfaces: &[NetInterface]) -> Result<(), ServerError>;

    /// Stop serving. Idempotent.
    async fn stop(&mut self);

    /// Whether the server is currently bound
    fn is_running(&self) -> bool;
}

struct ClientEntry {
    address: SocketAddr,
    connected_at: DateTime<Utc>,
    bytes_sent: AtomicU64,
}

/// Tracks connected clients and served bytes
pub struct ClientRegistry {
    clients: DashMap<Uuid, ClientEntry>,
    traffic: Mutex<Vec<TrafficPoint>>,
    window_bytes: AtomicU64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
            traffic: Mutex::new(Vec::new()),
            window_bytes: AtomicU64::new(0),
        }
    }

    /// Register a connected client; the returned guard deregisters on drop.
    pub fn register(self: &Arc<Self>, address: SocketAddr) -> ClientHandle {
        let id = Uuid::new_v4();
        self.clients.insert(
            id,
            ClientEntry {
                address,
                connected_at: Utc::now(),
                bytes_sent: AtomicU64::new(0),
            },
        );
        tracing::info!(%address, client = %id, "stream client connected");
        ClientHandle {
            registry: self.clone(),
            id,
        }
    }

    pub fn count(&self) -> usize {
        self.clients.len()
    }

    /// Current view of all connected clients
    pub fn snapshot(&self) -> Vec<ClientInfo> {
        let mut clients: Vec<ClientInfo> = self
            .clients
            .iter()
            .map(|entry| ClientInfo {
                id: *entry.key(),
                address: entry.value().address,
                connected_at: entry.value().connected_at,
                bytes_sent: entry.value().bytes_sent.load(Ordering::Relaxed),
            })
            .collect();
        clients.sort_by_key(|c| c.connected_at);
        clients
    }

    /// Close the current sampling window and return the retained history.
    pub fn sample_traffic(&self) -> Vec<TrafficPoint> {
        let bytes = self.window_bytes.swap(0, Ordering::Relaxed);
        let mut traffic = self.traffic.lock();
        traffic.push(TrafficPoint {
            at: Utc::now(),
            bytes,
        });
        if traffic.len() > TRAFFIC_HISTORY_LEN {
            let excess = traffic.len() - TRAFFIC_HISTORY_LEN;
            traffic.drain(..excess);
        }
        traffic.clone()
    }

    pub fn clear(&self) {
        self.clients.clear();
        self.traffic.lock().clear();
        self.window_bytes.store(0, Ordering::Relaxed);
    }

    fn add_bytes(&self, id: Uuid, n: u64) {
        if let Some(entry) = self.clients.get(&id) {
            entry.bytes_sent.fetch_add(n, Ordering::Relaxed);
        }
        self.window_bytes.fetch_add(n, Ordering::Relaxed);
    }

    fn deregister(&self, id: Uuid) {
        if self.clients.remove(&id).is_some() {
            tracing::info!(client = %id, "stream client disconnected");
        }
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard for one connected client
pub struct ClientHandle {
    registry: Arc<ClientRegistry>,
    id: Uuid,
}

impl ClientHandle {
    pub fn add_bytes(&self, n: u64) {
        self.registry.add_bytes(self.id, n);
    }
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}

/// Shared state handed to the HTTP handlers
pub struct AppState {
    pub settings: SharedSettings,
    pub feed: SharedFrameHub,
    pub events: EngineHandle,
    pub clients: Arc<ClientRegistry>,
    /// Flips to `true` when the server stops; long-lived response streams
    /// watch it so graceful shutdown is not held open by them
    pub(crate) shutdown: watch::Sender<bool>,
}

/// Default axum-backed stream server
pub struct WebServer {
    state: Arc<AppState>,
    stats_tx: StatsSender,
    tasks: Vec<JoinHandle<()>>,
}

impl WebServer {
    pub fn new(
        settings: SharedSettings,
        feed: SharedFrameHub,
        events: EngineHandle,
        stats_tx: StatsSender,
    ) -> Self {
        let (shutdown, _) = watch::channel(true);
        Self {
            state: Arc::new(AppState {
                settings,
                feed,
                events,
                clients: Arc::new(ClientRegistry::new()),
                shutdown,
            }),
            stats_tx,
            tasks: Vec::new(),
        }
    }

    /// Client registry, exposed for statistics
    pub fn clients(&self) -> Arc<ClientRegistry> {
        self.state.clients.clone()
    }
}

#[async_trait]
impl StreamServer for WebServer {
    async fn start(&mut self, interfaces: &[NetInterface]) -> Result<(), ServerError> {
        self.stop().await;
        if interfaces.is_empty() {
            return Err(ServerError::NoInterfaces);
        }

        let port = self.state.settings.get().network.http_port;
        // Bind everything first so a single failure leaves nothing running
        let mut listeners = Vec::with_capacity(interfaces.len());
        for interface in interfaces {
            let addr = SocketAddr::new(interface.address, port);
            let listener =
                tokio::net::TcpListener::bind(addr)
                    .await
                    .map_err(|e| ServerError::BindFailed {
                        addr: addr.to_string(),
                        reason: e.to_string(),
                    })?;
            listeners.push(listener);
        }

        self.state.shutdown.send_replace(false);
        let router = handlers::router(self.state.clone());
        for listener in listeners {
            if let Ok(addr) = listener.local_addr() {
                tracing::info!(%addr, "http server listening");
            }
            let app = router
                .clone()
                .into_make_service_with_connect_info::<SocketAddr>();
            let mut shutdown = self.state.shutdown.subscribe();
            self.tasks.push(tokio::spawn(async move {
                let served = axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.wait_for(|stop| *stop).await;
                    })
                    .await;
                if let Err(err) = served {
                    tracing::error!(%err, "http server terminated");
                }
            }));
        }

        // Statistics tick
        let clients = self.state.clients.clone();
        let stats_tx = self.stats_tx.0.clone();
        let mut shutdown = self.state.shutdown.subscribe();
        self.tasks.push(tokio::spawn(async move {
            let mut tick = tokio::time::interval(STATS_INTERVAL);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let report = StatsReport {
                            clients: clients.snapshot(),
                            traffic: clients.sample_traffic(),
                        };
                        if stats_tx.try_send(report).is_err() {
                            tracing::trace!("statistics report dropped");
                        }
                    }
                    _ = shutdown.wait_for(|stop| *stop) => break,
                }
            }
        }));

        Ok(())
    }

    async fn stop(&mut self) {
        self.state.shutdown.send_replace(true);
        for task in self.tasks.drain(..) {
            if task.await.is_err() {
                tracing::warn!("server task terminated abnormally");
            }
        }
        self.state.clients.clear();
    }

    fn is_running(&self) -> bool {
        !self.tasks.is_empty()
    }
}
