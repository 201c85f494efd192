//! Event submission and the bounded engine queue
//!
//! Producers never block: submission is `try_send` into a bounded channel.
//! A full queue is surfaced as a fatal error pushed straight into the
//! published snapshot; a closed queue (post-destroy) swallows the event
//! silently. Delayed submissions are spawned timers that post back into the
//! same queue, so a timer outliving the engine fires into a closed channel
//! and becomes a no-op.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::capture::CaptureGrant;
use crate::constants::EVENT_QUEUE_CAPACITY;
use crate::engine::event::{Event, RestartReason};
use crate::engine::snapshot::{Observer, PublicSnapshot};
use crate::error::{AppError, FatalError};

/// Receiving half of the engine queue, consumed by [`super::StreamEngine::start`]
pub struct EngineInbox(pub(crate) mpsc::Receiver<Event>);

impl EngineInbox {
    /// Receive the next queued event
    pub async fn recv(&mut self) -> Option<Event> {
        self.0.recv().await
    }
}

struct Shared {
    tx: mpsc::Sender<Event>,
    published: RwLock<PublicSnapshot>,
    observer: RwLock<Option<Arc<dyn Observer>>>,
}

/// Cloneable handle for submitting events to the engine
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<Shared>,
}

impl EngineHandle {
    /// Create the engine queue. The inbox must be handed to
    /// [`super::StreamEngine::start`]; the handle is freely cloneable.
    pub fn new() -> (Self, EngineInbox) {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let shared = Arc::new(Shared {
            tx,
            published: RwLock::new(PublicSnapshot::default()),
            observer: RwLock::new(None),
        });
        (Self { shared }, EngineInbox(rx))
    }

    /// Submit an event. Fire-and-forget; never blocks.
    pub fn submit(&self, event: Event) {
        match self.shared.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::error!(kind = ?event.kind(), "event queue full, dropping event");
                self.publish_fatal(FatalError::EventQueueFull);
            }
            Err(TrySendError::Closed(event)) => {
                tracing::trace!(kind = ?event.kind(), "event after shutdown dropped");
            }
        }
    }

    /// Submit an event after a delay, without blocking the caller.
    pub fn submit_after(&self, event: Event, delay: Duration) {
        if delay.is_zero() {
            self.submit(event);
            return;
        }
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.submit(event);
        });
    }

    /// Last published snapshot
    pub fn published(&self) -> PublicSnapshot {
        self.shared.published.read().clone()
    }

    // Typed conveniences for external callers

    pub fn start_stream(&self) {
        self.submit(Event::StartStream);
    }

    pub fn stop_stream(&self) {
        self.submit(Event::StopStream);
    }

    pub fn toggle(&self) {
        self.submit(Event::ToggleFromWebPage);
    }

    pub fn provide_grant(&self, grant: CaptureGrant) {
        self.submit(Event::StartProjection(grant));
    }

    pub fn deny_permission(&self) {
        self.submit(Event::CastPermissionDenied);
    }

    pub fn request_state(&self) {
        self.submit(Event::RequestPublicState);
    }

    pub fn recover(&self) {
        self.submit(Event::RecoverError);
    }

    pub fn screen_off(&self) {
        self.submit(Event::ScreenOff);
    }

    pub fn restart(&self, reason: RestartReason) {
        self.submit(Event::RestartServer(reason));
    }

    // Internal plumbing used by the consumer loop

    pub(crate) fn set_observer(&self, observer: Arc<dyn Observer>) {
        *self.shared.observer.write() = Some(observer);
    }

    /// Store `snapshot` as the published value. Returns whether it differed
    /// from the previous one.
    pub(crate) fn replace_published(&self, snapshot: &PublicSnapshot) -> bool {
        let mut current = self.shared.published.write();
        if *current == *snapshot {
            false
        } else {
            *current = snapshot.clone();
            true
        }
    }

    /// Push a fatal error straight into the published snapshot, bypassing
    /// the normal transition flow. Used when the loop itself cannot help
    /// (queue exhausted).
    pub(crate) fn publish_fatal(&self, error: FatalError) {
        let snapshot = {
            let mut current = self.shared.published.write();
            current.error = Some(AppError::Fatal(error));
            current.clone()
        };
        let observer = self.shared.observer.read().clone();
        if let Some(observer) = observer {
            observer.on_snapshot(snapshot);
        }
    }

    /// Awaitable submission used only by destroy, which must not be dropped
    /// under backpressure.
    pub(crate) async fn send_destroy(&self) -> bool {
        self.shared.tx.send(Event::Destroy).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct CountingObserver {
        snapshots: Mutex<Vec<PublicSnapshot>>,
    }

    impl Observer for CountingObserver {
        fn on_snapshot(&self, snapshot: PublicSnapshot) {
            self.snapshots.lock().push(snapshot);
        }
    }

    #[tokio::test]
    async fn test_submit_delivers_in_order() {
        let (handle, mut inbox) = EngineHandle::new();
        handle.submit(Event::StartStream);
        handle.submit(Event::StopStream);

        assert!(matches!(inbox.0.recv().await, Some(Event::StartStream)));
        assert!(matches!(inbox.0.recv().await, Some(Event::StopStream)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_after_delivers_later() {
        let (handle, mut inbox) = EngineHandle::new();
        handle.submit_after(Event::DiscoverAddress, Duration::from_secs(1));

        assert!(inbox.0.try_recv().is_err());
        // Paused time fast-forwards through the timer
        assert!(matches!(inbox.0.recv().await, Some(Event::DiscoverAddress)));
    }

    #[tokio::test]
    async fn test_full_queue_publishes_fatal() {
        let (handle, _inbox) = EngineHandle::new();
        let observer = Arc::new(CountingObserver {
            snapshots: Mutex::new(Vec::new()),
        });
        handle.set_observer(observer.clone());

        for _ in 0..EVENT_QUEUE_CAPACITY {
            handle.submit(Event::RequestPublicState);
        }
        // Queue is now full; the next submission must surface the failure
        handle.submit(Event::RequestPublicState);

        let snapshots = observer.snapshots.lock();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(
            snapshots[0].error,
            Some(AppError::Fatal(FatalError::EventQueueFull))
        );
        assert_eq!(
            handle.published().error,
            Some(AppError::Fatal(FatalError::EventQueueFull))
        );
    }

    #[tokio::test]
    async fn test_closed_queue_is_silent() {
        let (handle, inbox) = EngineHandle::new();
        let observer = Arc::new(CountingObserver {
            snapshots: Mutex::new(Vec::new()),
        });
        handle.set_observer(observer.clone());

        drop(inbox);
        handle.submit(Event::StartStream);

        assert!(observer.snapshots.lock().is_empty());
        assert!(handle.published().error.is_none());
    }

    #[test]
    fn test_replace_published_detects_change() {
        let (handle, _inbox) = EngineHandle::new();
        let unchanged = PublicSnapshot::default();
        assert!(!handle.replace_published(&unchanged));

        let mut changed = PublicSnapshot::default();
        changed.is_streaming = true;
        assert!(handle.replace_published(&changed));
        assert!(!handle.replace_published(&changed));
    }
}
