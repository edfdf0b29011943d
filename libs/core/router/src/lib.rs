//! [libs/core/router/src/lib.rs]
//! In-process event router (§4.1): bounded priority queue with FIFO-within-
//! band dispatch, at-most-once-per-second overflow signaling, and a
//! deadline-bounded drain on shutdown.
//!
//! Generic over `fabric_domain_models::RouterEvent` — this crate has no
//! dependency on any other `fabric-*` crate besides the shared domain
//! types, so it can be exercised without persistence, connectors, or the
//! intent graph.

mod errors;
mod queue;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use fabric_domain_models::{EventType, RouterEvent};
use futures::{Stream, StreamExt};
use serde_json::json;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, instrument, warn};

pub use errors::RouterError;
pub use queue::PriorityQueue;

const DEFAULT_DRAIN_DEADLINE: Duration = Duration::from_secs(5);

struct Inner {
    queue: Mutex<PriorityQueue>,
    notify: Notify,
    broadcaster: broadcast::Sender<RouterEvent>,
    shutting_down: AtomicBool,
    drain_deadline: Mutex<Option<Instant>>,
    last_overflow_emitted: Mutex<Option<Instant>>,
}

/// Cheaply clonable handle to the router; every clone shares the same
/// queue, broadcaster, and dispatcher task.
#[derive(Clone)]
pub struct EventRouter {
    inner: Arc<Inner>,
    dispatcher: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl EventRouter {
    /// Spawns the dispatcher task and returns a router handle. `capacity`
    /// bounds the pending queue (§4.1 default 10_000).
    pub fn new(capacity: usize) -> Self {
        let (broadcaster, _) = broadcast::channel(capacity.max(64));
        let inner = Arc::new(Inner {
            queue: Mutex::new(PriorityQueue::new(capacity)),
            notify: Notify::new(),
            broadcaster,
            shutting_down: AtomicBool::new(false),
            drain_deadline: Mutex::new(None),
            last_overflow_emitted: Mutex::new(None),
        });
        let dispatcher_inner = inner.clone();
        let handle = tokio::spawn(Self::dispatch_loop(dispatcher_inner));
        Self { inner, dispatcher: Arc::new(Mutex::new(Some(handle))) }
    }

    /// Submits an event for dispatch. Never blocks beyond the O(log n)
    /// queue insertion; fails only once the router has begun shutting
    /// down (§4.1: "fails only if the router is shutting down").
    #[instrument(skip(self, event), fields(event_type = ?event.event_type, priority = event.priority))]
    pub fn publish(&self, event: RouterEvent) -> Result<(), RouterError> {
        if self.inner.shutting_down.load(Ordering::SeqCst) {
            return Err(RouterError::ShuttingDown);
        }
        let evicted = self.inner.queue.lock().expect("router queue poisoned").push(event);
        if let Some(evicted_event) = evicted {
            self.maybe_emit_overflow(evicted_event);
        }
        self.inner.notify.notify_one();
        Ok(())
    }

    /// Delivers events of `event_type` in dispatch order. No ordering is
    /// promised across distinct event types (§4.1).
    pub fn subscribe(&self, event_type: EventType) -> impl Stream<Item = RouterEvent> {
        let receiver = self.inner.broadcaster.subscribe();
        BroadcastStream::new(receiver).filter_map(move |result| {
            let matched = match result {
                Ok(event) if event.event_type == event_type => Some(event),
                _ => None,
            };
            futures::future::ready(matched)
        })
    }

    /// Begins shutdown: producers observe a closed-submit signal
    /// immediately (subsequent `publish` calls fail); the dispatcher keeps
    /// draining the queue until `drain_deadline` elapses, then stops.
    #[instrument(skip(self))]
    pub async fn shutdown(&self, drain_deadline: Duration) {
        info!("event router shutdown requested, drain deadline {:?}", drain_deadline);
        *self.inner.drain_deadline.lock().expect("drain deadline mutex poisoned") = Some(Instant::now() + drain_deadline);
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();

        let handle = self.dispatcher.lock().expect("dispatcher handle mutex poisoned").take();
        if let Some(handle) = handle {
            if tokio::time::timeout(drain_deadline + Duration::from_millis(250), handle).await.is_err() {
                warn!("event router dispatcher did not exit within the drain deadline");
            }
        }
    }

    pub fn pending_len(&self) -> usize {
        self.inner.queue.lock().expect("router queue poisoned").len()
    }

    fn maybe_emit_overflow(&self, evicted: RouterEvent) {
        let mut last = self.inner.last_overflow_emitted.lock().expect("overflow mutex poisoned");
        let now = Instant::now();
        let should_emit = last.map(|t| now.duration_since(t) >= Duration::from_secs(1)).unwrap_or(true);
        if !should_emit {
            return;
        }
        *last = Some(now);
        warn!(evicted_id = %evicted.id, evicted_type = ?evicted.event_type, "router queue overflow, dropped lowest-priority event");

        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        let overflow_event = RouterEvent::new(
            EventType::RouterOverflow,
            "event_router",
            json!({ "evicted_id": evicted.id, "evicted_type": evicted.event_type }),
            10,
            timestamp,
        );
        // Best-effort: if there are no subscribers yet this simply has no
        // receivers. The overflow event never re-enters the bounded queue
        // itself (that would risk a second eviction storm under load).
        let _ = self.inner.broadcaster.send(overflow_event);
    }

    async fn dispatch_loop(inner: Arc<Inner>) {
        loop {
            let popped = inner.queue.lock().expect("router queue poisoned").pop();
            match popped {
                Some(event) => {
                    let _ = inner.broadcaster.send(event);
                }
                None => {
                    if inner.shutting_down.load(Ordering::SeqCst) {
                        break;
                    }
                    inner.notify.notified().await;
                }
            }

            if inner.shutting_down.load(Ordering::SeqCst) {
                let deadline = *inner.drain_deadline.lock().expect("drain deadline mutex poisoned");
                if matches!(deadline, Some(d) if Instant::now() >= d) {
                    break;
                }
            }
        }
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new(10_000)
    }
}

pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;
pub const DEFAULT_SHUTDOWN_DRAIN: Duration = DEFAULT_DRAIN_DEADLINE;

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_domain_models::EventType;
    use serde_json::json;

    fn event(event_type: EventType, priority: u8) -> RouterEvent {
        RouterEvent::new(event_type, "test", json!({}), priority, 0)
    }

    #[tokio::test]
    async fn publish_then_subscribe_delivers_matching_type() {
        let router = EventRouter::new(16);
        let mut stream = router.subscribe(EventType::MarketDataUpdate);
        router.publish(event(EventType::MarketDataUpdate, 5)).unwrap();
        router.publish(event(EventType::SystemAlert, 5)).unwrap();

        let received = tokio::time::timeout(Duration::from_secs(1), stream.next()).await.unwrap().unwrap();
        assert_eq!(received.event_type, EventType::MarketDataUpdate);
    }

    #[tokio::test]
    async fn publish_after_shutdown_fails() {
        let router = EventRouter::new(16);
        router.shutdown(Duration::from_millis(50)).await;
        let result = router.publish(event(EventType::SystemAlert, 5));
        assert!(matches!(result, Err(RouterError::ShuttingDown)));
    }

    #[tokio::test]
    async fn overflow_emits_router_overflow_event() {
        let router = EventRouter::new(2);
        let mut overflow_stream = router.subscribe(EventType::RouterOverflow);
        router.publish(event(EventType::SystemAlert, 1)).unwrap();
        router.publish(event(EventType::SystemAlert, 2)).unwrap();
        router.publish(event(EventType::SystemAlert, 9)).unwrap();

        let received = tokio::time::timeout(Duration::from_secs(1), overflow_stream.next()).await.unwrap().unwrap();
        assert_eq!(received.event_type, EventType::RouterOverflow);
    }
}
