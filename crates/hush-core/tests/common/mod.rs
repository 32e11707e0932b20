#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use hush_api::{CredentialTable, Grant, HistoryError, HistorySource};
use hush_gateway::{Channel, ChannelError, EventRegistry, Subscription};
use hush_types::{ConnectionState, Message, RelayCommand, RelayEvent, RelayEventKind};

/// In-memory relay channel: records what the session sends, and lets the
/// test push inbound events.
pub struct FakeChannel {
    registry: EventRegistry,
    sent: Mutex<Vec<RelayCommand>>,
    state_tx: watch::Sender<ConnectionState>,
    closes: AtomicUsize,
}

impl FakeChannel {
    pub fn connected() -> Arc<Self> {
        let (state_tx, _) = watch::channel(ConnectionState::Connected);
        Arc::new(Self {
            registry: EventRegistry::new(),
            sent: Mutex::new(Vec::new()),
            state_tx,
            closes: AtomicUsize::new(0),
        })
    }

    pub fn as_channel(self: &Arc<Self>) -> Arc<dyn Channel> {
        self.clone()
    }

    pub fn deliver(&self, event: RelayEvent) -> usize {
        self.registry.dispatch(event)
    }

    pub fn sent(&self) -> Vec<RelayCommand> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.handler_count()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }
}

impl Channel for FakeChannel {
    fn send(&self, command: RelayCommand) -> Result<(), ChannelError> {
        match *self.state_tx.borrow() {
            ConnectionState::Connected => {}
            ConnectionState::Disconnected => return Err(ChannelError::Closed),
            other => return Err(ChannelError::NotConnected(other)),
        }
        self.sent.lock().unwrap().push(command);
        Ok(())
    }

    fn subscribe(&self, kinds: &[RelayEventKind]) -> Subscription {
        self.registry.subscribe(kinds)
    }

    fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.registry.close();
        self.state_tx.send_replace(ConnectionState::Disconnected);
    }
}

pub struct StaticHistory(pub Vec<Message>);

impl HistorySource for StaticHistory {
    async fn fetch(&self) -> Result<Vec<Message>, HistoryError> {
        Ok(self.0.clone())
    }
}

pub struct FailingHistory;

impl HistorySource for FailingHistory {
    async fn fetch(&self) -> Result<Vec<Message>, HistoryError> {
        Err(HistoryError::Status(reqwest::StatusCode::BAD_GATEWAY))
    }
}

pub fn live_grant() -> Grant {
    CredentialTable::default()
        .authenticate("Kunal", "Lanuk")
        .unwrap()
}

pub fn reviewer_grant() -> Grant {
    CredentialTable::default()
        .authenticate("reviewer", "calc-review")
        .unwrap()
}

pub fn message(id: &str, sender: &str, body: &str) -> Message {
    Message {
        id: id.into(),
        sender: sender.into(),
        body: body.into(),
        timestamp: Utc::now(),
    }
}

/// Let spawned tasks (inbound pump, timers) run to quiescence.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

pub async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("timed out waiting for session")
}
