use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, trace};
use uuid::Uuid;

use hush_types::{Message, RelayEvent};

/// An event on its way out, tagged with the connection that caused it.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub origin: Uuid,
    pub event: RelayEvent,
}

impl Outbound {
    /// Typing pulses go to everyone except whoever is typing. Messages go to
    /// everyone, the author included; that echo is how clients learn their
    /// message was accepted.
    pub fn is_for(&self, conn_id: Uuid) -> bool {
        match self.event {
            RelayEvent::UserTyping => self.origin != conn_id,
            RelayEvent::Message(_) => true,
        }
    }
}

/// Fans relay events out to every connected client and keeps the
/// conversation for the history endpoint.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<Outbound>,
    history: RwLock<Vec<Message>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                history: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Accept a message: assign id and timestamp, record it, broadcast it.
    /// Blank bodies are dropped and return `None`.
    pub async fn post_message(&self, origin: Uuid, sender: &str, body: &str) -> Option<Message> {
        if body.trim().is_empty() {
            trace!("Dropping blank message from {}", sender);
            return None;
        }

        let message = Message {
            id: Uuid::new_v4().to_string(),
            sender: sender.to_string(),
            body: body.to_string(),
            timestamp: Utc::now(),
        };

        // History is never behind an echo
        self.inner.history.write().await.push(message.clone());
        debug!("Message {} from {}", message.id, message.sender);

        let _ = self.inner.broadcast_tx.send(Outbound {
            origin,
            event: RelayEvent::Message(message.clone()),
        });
        Some(message)
    }

    pub fn typing(&self, origin: Uuid) {
        let _ = self.inner.broadcast_tx.send(Outbound {
            origin,
            event: RelayEvent::UserTyping,
        });
    }

    /// The whole conversation, oldest first.
    pub async fn history(&self) -> Vec<Message> {
        self.inner.history.read().await.clone()
    }

    pub fn connection_count(&self) -> usize {
        self.inner.broadcast_tx.receiver_count()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
