use tokio::sync::watch;
use tokio::time::Instant;

use hush_types::Message;

use crate::presence::PresenceDebouncer;
use crate::store::MessageStore;

/// Everything a session mutates, behind one lock.
///
/// Inbound events, timer callbacks and user actions all go through here, and
/// each checks `closed` under the lock first, so nothing lands after teardown.
pub(crate) struct SessionState {
    pub store: MessageStore,
    pub presence: PresenceDebouncer,
    pub closed: bool,
    messages_tx: watch::Sender<usize>,
    typing_tx: watch::Sender<bool>,
}

impl SessionState {
    pub fn new(presence: PresenceDebouncer) -> Self {
        let (messages_tx, _) = watch::channel(0);
        let (typing_tx, _) = watch::channel(false);
        Self {
            store: MessageStore::new(),
            presence,
            closed: false,
            messages_tx,
            typing_tx,
        }
    }

    pub fn append(&mut self, message: Message) {
        self.store.append(message);
        self.messages_tx.send_replace(self.store.len());
    }

    pub fn replace_history(&mut self, snapshot: Vec<Message>) {
        self.store.replace_history(snapshot);
        self.messages_tx.send_replace(self.store.len());
    }

    /// Returns true on the idle -> active edge.
    pub fn typing_pulse(&mut self, now: Instant) -> bool {
        let started = self.presence.pulse(now);
        if self.presence.is_typing(now) {
            self.publish_typing(true);
        }
        started
    }

    /// Re-evaluate the flag; returns true if it just dropped.
    pub fn typing_expire(&mut self, now: Instant) -> bool {
        if self.presence.is_typing(now) {
            return false;
        }
        self.publish_typing(false)
    }

    pub fn close(&mut self) {
        self.closed = true;
        self.presence.clear();
        self.publish_typing(false);
    }

    pub fn messages_watch(&self) -> watch::Receiver<usize> {
        self.messages_tx.subscribe()
    }

    pub fn typing_watch(&self) -> watch::Receiver<bool> {
        self.typing_tx.subscribe()
    }

    fn publish_typing(&self, typing: bool) -> bool {
        self.typing_tx.send_if_modified(|current| {
            let changed = *current != typing;
            *current = typing;
            changed
        })
    }
}
