//! Fan-out of progress events to live subscribers

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::Stream;
use tokio::sync::mpsc;
use tracing::debug;

use super::ProgressEvent;

/// Default per-subscriber queue depth
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

/// Handle returned by registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

/// A write to a subscriber failed; the hub drops it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

/// Destination for broadcast events. Implementations must not block.
pub trait EventSink: Send {
    fn deliver(&mut self, event: &ProgressEvent) -> Result<(), SinkClosed>;
}

impl EventSink for mpsc::Sender<ProgressEvent> {
    fn deliver(&mut self, event: &ProgressEvent) -> Result<(), SinkClosed> {
        // Full counts as failed: a subscriber that cannot keep up is dropped
        self.try_send(event.clone()).map_err(|_| SinkClosed)
    }
}

impl EventSink for mpsc::UnboundedSender<ProgressEvent> {
    fn deliver(&mut self, event: &ProgressEvent) -> Result<(), SinkClosed> {
        self.send(event.clone()).map_err(|_| SinkClosed)
    }
}

struct HubState {
    next_id: u64,
    sinks: BTreeMap<SubscriberId, Box<dyn EventSink>>,
    latest: Option<ProgressEvent>,
}

/// Process-wide broadcast of progress events.
///
/// Cloning yields another handle to the same subscriber set. Delivery is
/// best-effort: no persistence, no replay, no back-pressure on the emitter.
#[derive(Clone)]
pub struct ProgressHub {
    state: Arc<Mutex<HubState>>,
    buffer: usize,
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

impl std::fmt::Debug for ProgressHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressHub")
            .field("subscribers", &self.subscriber_count())
            .field("buffer", &self.buffer)
            .finish()
    }
}

impl ProgressHub {
    /// `buffer` is the queue depth of each channel subscription
    pub fn new(buffer: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState {
                next_id: 0,
                sinks: BTreeMap::new(),
                latest: None,
            })),
            buffer: buffer.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        // A panicking sink must not take the hub down with it
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a sink. It receives `Connected` before any broadcast event;
    /// a sink that rejects that first write is never added.
    pub fn register(&self, mut sink: Box<dyn EventSink>) -> SubscriberId {
        let mut state = self.lock();
        let id = SubscriberId(state.next_id);
        state.next_id += 1;

        if sink.deliver(&ProgressEvent::Connected).is_ok() {
            state.sinks.insert(id, sink);
            debug!(subscriber = id.0, total = state.sinks.len(), "Subscriber registered");
        } else {
            debug!(subscriber = id.0, "Subscriber closed before registration");
        }
        id
    }

    /// Channel-backed subscription that unregisters itself when dropped
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = self.register(Box::new(tx));
        Subscription {
            id,
            receiver: rx,
            hub: self.clone(),
        }
    }

    /// Returns whether the subscriber was still registered
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self.lock().sinks.remove(&id).is_some();
        if removed {
            debug!(subscriber = id.0, "Subscriber unregistered");
        }
        removed
    }

    /// Deliver `event` to every subscriber in registration order.
    ///
    /// Subscribers whose write fails are removed. Returns the number of
    /// successful deliveries; never blocks and never fails the caller.
    pub fn broadcast(&self, event: ProgressEvent) -> usize {
        let mut state = self.lock();
        let mut dead = Vec::new();
        let mut delivered = 0;

        for (id, sink) in state.sinks.iter_mut() {
            match sink.deliver(&event) {
                Ok(()) => delivered += 1,
                Err(SinkClosed) => dead.push(*id),
            }
        }
        for id in dead {
            state.sinks.remove(&id);
            debug!(subscriber = id.0, "Dropped subscriber after failed write");
        }

        if event != ProgressEvent::Connected {
            state.latest = Some(event);
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().sinks.len()
    }

    /// Most recent broadcast event, for late observers polling status
    pub fn latest(&self) -> Option<ProgressEvent> {
        self.lock().latest.clone()
    }
}

/// Live, ordered event feed for one observer
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<ProgressEvent>,
    hub: ProgressHub,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next event; `None` once the hub dropped this subscriber
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.receiver.recv().await
    }

    /// Next already-queued event, if any
    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        self.receiver.try_recv().ok()
    }

    /// Everything queued right now
    pub fn drain(&mut self) -> Vec<ProgressEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    pub fn into_stream(self) -> impl Stream<Item = ProgressEvent> + Send {
        futures::stream::unfold(self, |mut sub| async move {
            sub.recv().await.map(|event| (event, sub))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unregister(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenSink {
        writes_before_failure: usize,
    }

    impl EventSink for BrokenSink {
        fn deliver(&mut self, _event: &ProgressEvent) -> Result<(), SinkClosed> {
            if self.writes_before_failure == 0 {
                return Err(SinkClosed);
            }
            self.writes_before_failure -= 1;
            Ok(())
        }
    }

    #[test]
    fn test_new_subscriber_gets_connected_first() {
        let hub = ProgressHub::new(8);
        let mut sub = hub.subscribe();
        hub.broadcast(ProgressEvent::Merge);

        assert_eq!(sub.drain(), vec![ProgressEvent::Connected, ProgressEvent::Merge]);
    }

    #[test]
    fn test_broken_subscriber_does_not_affect_healthy_one() {
        let hub = ProgressHub::new(8);
        let mut healthy = hub.subscribe();
        hub.register(Box::new(BrokenSink {
            writes_before_failure: 1,
        }));
        assert_eq!(hub.subscriber_count(), 2);

        let delivered = hub.broadcast(ProgressEvent::Start { total: 3 });
        assert_eq!(delivered, 1);
        assert_eq!(hub.subscriber_count(), 1);

        hub.broadcast(ProgressEvent::Merge);
        assert_eq!(
            healthy.drain(),
            vec![
                ProgressEvent::Connected,
                ProgressEvent::Start { total: 3 },
                ProgressEvent::Merge
            ]
        );
    }

    #[test]
    fn test_sink_failing_connected_is_not_added() {
        let hub = ProgressHub::new(8);
        let id = hub.register(Box::new(BrokenSink {
            writes_before_failure: 0,
        }));
        assert_eq!(hub.subscriber_count(), 0);
        assert!(!hub.unregister(id));
    }

    #[test]
    fn test_slow_subscriber_is_dropped_without_blocking() {
        let hub = ProgressHub::new(2);
        let mut slow = hub.subscribe();
        let mut fast = hub.subscribe();

        hub.broadcast(ProgressEvent::info("a"));
        fast.drain();
        // slow still holds Connected + "a"; the next write overflows it
        hub.broadcast(ProgressEvent::info("b"));

        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(fast.drain(), vec![ProgressEvent::info("b")]);
        assert_eq!(slow.drain().len(), 2);
    }

    #[test]
    fn test_dropping_subscription_unregisters() {
        let hub = ProgressHub::default();
        let sub = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        drop(sub);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.broadcast(ProgressEvent::Merge), 0);
    }

    #[test]
    fn test_latest_tracks_last_broadcast() {
        let hub = ProgressHub::default();
        assert!(hub.latest().is_none());
        hub.broadcast(ProgressEvent::Start { total: 1 });
        hub.broadcast(ProgressEvent::error("boom"));
        assert_eq!(hub.latest(), Some(ProgressEvent::error("boom")));
    }

    #[tokio::test]
    async fn test_concurrent_registration_and_broadcast() {
        let hub = ProgressHub::new(1024);
        let mut subs = Vec::new();
        let emitter = {
            let hub = hub.clone();
            tokio::spawn(async move {
                for i in 0..100 {
                    hub.broadcast(ProgressEvent::Progress {
                        current: i as f64,
                        total: 100.0,
                        percent: i as u8,
                    });
                    tokio::task::yield_now().await;
                }
            })
        };
        for _ in 0..10 {
            subs.push(hub.subscribe());
            tokio::task::yield_now().await;
        }
        emitter.await.unwrap();

        for mut sub in subs {
            let events = sub.drain();
            assert_eq!(events.first(), Some(&ProgressEvent::Connected));
            let percents: Vec<u8> = events
                .iter()
                .filter_map(|e| match e {
                    ProgressEvent::Progress { percent, .. } => Some(*percent),
                    _ => None,
                })
                .collect();
            assert!(percents.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[tokio::test]
    async fn test_stream_yields_in_order() {
        use futures::StreamExt;

        let hub = ProgressHub::default();
        let stream = hub.subscribe().into_stream();
        hub.broadcast(ProgressEvent::Start { total: 2 });
        hub.broadcast(ProgressEvent::Merge);

        let events: Vec<_> = stream.take(3).collect().await;
        assert_eq!(
            events,
            vec![
                ProgressEvent::Connected,
                ProgressEvent::Start { total: 2 },
                ProgressEvent::Merge
            ]
        );
    }
}
