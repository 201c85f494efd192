//! Lifecycle engine
//!
//! The one place where lifecycle decisions are made. Events from every
//! source (public API, web page, listeners, collaborators) are serialized
//! through a bounded queue into a single consumer loop that owns the mutable
//! [`state::StreamState`], applies one transition at a time, and publishes a
//! derived [`snapshot::PublicSnapshot`] whenever it changes.

pub mod event;
pub mod filter;
pub mod listeners;
mod machine;
pub mod queue;
pub mod snapshot;
pub mod state;

pub use event::{Event, EventKind, RestartReason};
pub use queue::{EngineHandle, EngineInbox};
pub use snapshot::{Observer, PublicSnapshot};
pub use state::Phase;

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::capture::{CaptureController, SharedFrameHub, StatusSignaler};
use crate::config::SharedSettings;
use crate::network::NetworkDiscovery;
use crate::ui::server::{StatsReceiver, StreamServer};

use machine::EngineLoop;

/// Owning handle to a running lifecycle engine.
///
/// Dropping this does not stop the engine; call [`StreamEngine::destroy`]
/// for an orderly, awaitable teardown.
pub struct StreamEngine {
    handle: EngineHandle,
    task: Option<JoinHandle<()>>,
    listeners: Vec<JoinHandle<()>>,
}

impl StreamEngine {
    /// Spawn the consumer loop and kick off address discovery.
    ///
    /// `handle`/`inbox` must come from the same [`EngineHandle::new`] call;
    /// collaborators that submit events (the web server, listeners) should
    /// be built from clones of the same handle.
    #[allow(clippy::too_many_arguments)]
    pub fn start<D, S, C>(
        settings: SharedSettings,
        discovery: D,
        server: S,
        capture: C,
        signaler: StatusSignaler,
        hub: SharedFrameHub,
        observer: Arc<dyn Observer>,
        handle: EngineHandle,
        inbox: EngineInbox,
        stats: StatsReceiver,
    ) -> Self
    where
        D: NetworkDiscovery + 'static,
        S: StreamServer + 'static,
        C: CaptureController + 'static,
    {
        handle.set_observer(observer.clone());
        let machine = EngineLoop::new(
            settings,
            discovery,
            server,
            capture,
            signaler,
            hub,
            handle.clone(),
            observer,
            stats,
        );
        handle.submit(Event::DiscoverAddress);
        let task = tokio::spawn(machine.run(inbox));
        Self {
            handle,
            task: Some(task),
            listeners: Vec::new(),
        }
    }

    /// A cloneable handle for submitting events
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Register a listener task to be torn down with the engine.
    pub fn attach_listener(&mut self, listener: JoinHandle<()>) {
        self.listeners.push(listener);
    }

    /// Tear down the engine: unregisters listeners, stops capture and the
    /// server, closes the queue, and returns once the consumer loop has
    /// exited.
    pub async fn destroy(mut self) {
        for listener in self.listeners.drain(..) {
            listener.abort();
        }
        if !self.handle.send_destroy().await {
            tracing::debug!("engine already shut down");
        }
        if let Some(task) = self.task.take() {
            if task.await.is_err() {
                tracing::error!("engine loop terminated abnormally");
            }
        }
    }
}
