use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::mpsc;
use tracing::{debug, trace};

use hush_types::{RelayEvent, RelayEventKind};

/// Fans inbound relay events out to subscribers.
///
/// Every subscriber gets its own unbounded queue, so one slow consumer never
/// reorders or drops events for another. Delivery order within a queue is
/// the order `dispatch` was called in.
#[derive(Clone, Default)]
pub struct EventRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    closed: bool,
    /// subscription id -> handler, iterated in registration order
    handlers: BTreeMap<u64, Handler>,
}

struct Handler {
    kinds: Vec<RelayEventKind>,
    tx: mpsc::UnboundedSender<RelayEvent>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in `kinds`. On a closed registry the returned
    /// subscription is already finished.
    pub fn subscribe(&self, kinds: &[RelayEventKind]) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().expect("registry lock poisoned");

        let id = inner.next_id;
        inner.next_id += 1;

        if !inner.closed {
            inner.handlers.insert(
                id,
                Handler {
                    kinds: kinds.to_vec(),
                    tx,
                },
            );
            debug!(
                "subscription {} registered for {:?}",
                id,
                kinds.iter().map(|k| k.name()).collect::<Vec<_>>()
            );
        }

        Subscription {
            id,
            rx,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver one event to every matching subscriber. Returns how many
    /// subscribers received it.
    pub fn dispatch(&self, event: RelayEvent) -> usize {
        let kind = event.kind();
        let mut inner = self.inner.lock().expect("registry lock poisoned");

        let mut delivered = 0;
        let mut gone = Vec::new();
        for (&id, handler) in inner.handlers.iter() {
            if !handler.kinds.contains(&kind) {
                continue;
            }
            if handler.tx.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                gone.push(id);
            }
        }

        // Receiver dropped without going through Subscription::drop (e.g. leaked)
        for id in gone {
            inner.handlers.remove(&id);
        }

        trace!("dispatched {} to {} subscriber(s)", kind.name(), delivered);
        delivered
    }

    /// Drop every handler and refuse new ones. Open subscriptions see the end
    /// of their stream once queued events are drained.
    pub fn close(&self) {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        inner.closed = true;
        inner.handlers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().expect("registry lock poisoned").closed
    }

    /// Number of live subscriptions.
    pub fn handler_count(&self) -> usize {
        self.inner
            .lock()
            .expect("registry lock poisoned")
            .handlers
            .len()
    }
}

/// An ordered stream of inbound events. Deregisters itself on drop.
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<RelayEvent>,
    registry: Weak<Mutex<RegistryInner>>,
}

impl Subscription {
    /// Next event, or `None` once the channel is closed and the queue drained.
    pub async fn recv(&mut self) -> Option<RelayEvent> {
        self.rx.recv().await
    }

    /// Non-blocking variant of `recv`.
    pub fn try_recv(&mut self) -> Option<RelayEvent> {
        self.rx.try_recv().ok()
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        // A poisoned lock means the registry is going away anyway.
        if let Ok(mut inner) = registry.lock() {
            if inner.handlers.remove(&self.id).is_some() {
                debug!("subscription {} deregistered", self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use hush_types::Message;

    fn msg(id: &str) -> RelayEvent {
        RelayEvent::Message(Message {
            id: id.into(),
            sender: "friend".into(),
            body: format!("body {}", id),
            timestamp: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        })
    }

    #[tokio::test]
    async fn delivers_mixed_kinds_in_arrival_order() {
        let registry = EventRegistry::new();
        let mut sub = registry.subscribe(&RelayEventKind::ALL);

        registry.dispatch(msg("1"));
        registry.dispatch(RelayEvent::UserTyping);
        registry.dispatch(msg("2"));

        assert_eq!(sub.recv().await, Some(msg("1")));
        assert_eq!(sub.recv().await, Some(RelayEvent::UserTyping));
        assert_eq!(sub.recv().await, Some(msg("2")));
    }

    #[tokio::test]
    async fn filters_by_kind() {
        let registry = EventRegistry::new();
        let mut typing_only = registry.subscribe(&[RelayEventKind::UserTyping]);

        assert_eq!(registry.dispatch(msg("1")), 0);
        assert_eq!(registry.dispatch(RelayEvent::UserTyping), 1);

        assert_eq!(typing_only.recv().await, Some(RelayEvent::UserTyping));
        assert!(typing_only.try_recv().is_none());
    }

    #[test]
    fn dropping_subscription_deregisters() {
        let registry = EventRegistry::new();
        let a = registry.subscribe(&RelayEventKind::ALL);
        let b = registry.subscribe(&[RelayEventKind::Message]);
        assert_eq!(registry.handler_count(), 2);

        drop(a);
        assert_eq!(registry.handler_count(), 1);
        assert_eq!(registry.dispatch(msg("x")), 1);

        drop(b);
        assert_eq!(registry.handler_count(), 0);
        assert_eq!(registry.dispatch(msg("y")), 0);
    }

    #[tokio::test]
    async fn close_ends_streams_after_draining() {
        let registry = EventRegistry::new();
        let mut sub = registry.subscribe(&RelayEventKind::ALL);

        registry.dispatch(msg("last"));
        registry.close();

        assert_eq!(sub.recv().await, Some(msg("last")));
        assert_eq!(sub.recv().await, None);

        let mut late = registry.subscribe(&RelayEventKind::ALL);
        assert_eq!(late.recv().await, None);
        assert_eq!(registry.handler_count(), 0);
    }

    #[test]
    fn subscription_outliving_registry_drops_cleanly() {
        let registry = EventRegistry::new();
        let sub = registry.subscribe(&RelayEventKind::ALL);
        drop(registry);
        drop(sub);
    }
}
