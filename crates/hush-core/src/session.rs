use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use hush_api::{Grant, HistorySource};
use hush_gateway::{Channel, Subscription, WsChannel};
use hush_types::{ConnectionState, Message, RelayEvent, RelayEventKind, SessionMode};

use crate::config::ClientConfig;
use crate::dispatcher::{Delivery, DeliveryDispatcher};
use crate::error::SessionError;
use crate::presence::PresenceDebouncer;
use crate::state::SessionState;
use crate::timers::{TimerArena, TimerKey};

/// Result of `ChatSession::open`. A failed history fetch does not prevent
/// the session from running; it is handed back here for the UI to show.
pub struct Opened {
    pub session: ChatSession,
    pub history_error: Option<SessionError>,
}

/// One authenticated chat view.
///
/// Owns its message log, presence flag, timers and (in live mode) the relay
/// channel. `teardown` or drop releases all of them at once.
pub struct ChatSession {
    id: Uuid,
    participant: String,
    mode: SessionMode,
    state: Arc<Mutex<SessionState>>,
    timers: TimerArena,
    dispatcher: DeliveryDispatcher,
    channel: Option<Arc<dyn Channel>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl ChatSession {
    /// Bind a grant to its transport. Live grants need a channel, simulated
    /// grants must not have one. Must be called from within a Tokio runtime.
    pub fn start(
        grant: &Grant,
        channel: Option<Arc<dyn Channel>>,
        config: &ClientConfig,
    ) -> Result<Self, SessionError> {
        let id = Uuid::new_v4();
        let timers = TimerArena::new(id);

        let session = match (grant.mode(), channel) {
            (SessionMode::Live, Some(channel)) => {
                let state = Arc::new(Mutex::new(SessionState::new(PresenceDebouncer::new(
                    config.typing_window,
                ))));
                let events = channel.subscribe(&RelayEventKind::ALL);
                let pump = tokio::spawn(pump(
                    id,
                    events,
                    Arc::clone(&state),
                    timers.clone(),
                    config.typing_window,
                ));
                let dispatcher =
                    DeliveryDispatcher::relay(Arc::clone(&channel), Arc::clone(&state), timers.clone());

                Self {
                    id,
                    participant: grant.participant().to_string(),
                    mode: SessionMode::Live,
                    state,
                    timers,
                    dispatcher,
                    channel: Some(channel),
                    pump: Mutex::new(Some(pump)),
                }
            }
            (SessionMode::Simulated, None) => {
                let state = Arc::new(Mutex::new(SessionState::new(PresenceDebouncer::disabled())));
                let dispatcher = DeliveryDispatcher::simulated(
                    config.simulated.clone(),
                    Arc::clone(&state),
                    timers.clone(),
                );

                Self {
                    id,
                    participant: grant.participant().to_string(),
                    mode: SessionMode::Simulated,
                    state,
                    timers,
                    dispatcher,
                    channel: None,
                    pump: Mutex::new(None),
                }
            }
            (SessionMode::Live, None) => return Err(SessionError::MissingChannel),
            (SessionMode::Simulated, Some(_)) => return Err(SessionError::UnexpectedChannel),
        };

        info!(
            "Session {} started for {} ({:?})",
            session.id, session.participant, session.mode
        );
        Ok(session)
    }

    /// Full start-up: open the relay channel, start streaming, load history.
    /// Simulated sessions skip both the channel and the history fetch.
    pub async fn open<H: HistorySource>(
        grant: &Grant,
        config: &ClientConfig,
        history: &H,
    ) -> Result<Opened, SessionError> {
        match grant.mode() {
            SessionMode::Live => {
                let channel: Arc<dyn Channel> =
                    Arc::new(WsChannel::open(config.gateway_url(), config.transport.clone()));
                let session = Self::start(grant, Some(channel), config)?;
                let history_error = session.load_history(history).await.err();
                Ok(Opened {
                    session,
                    history_error,
                })
            }
            SessionMode::Simulated => Ok(Opened {
                session: Self::start(grant, None, config)?,
                history_error: None,
            }),
        }
    }

    /// Fetch the conversation and install it as the log's history prefix.
    /// On failure the log is left as it was; nothing is retried.
    pub async fn load_history<H: HistorySource>(&self, source: &H) -> Result<usize, SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }

        let snapshot = match source.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Session {}: history fetch failed: {}", self.id, e);
                return Err(e.into());
            }
        };

        let mut state = self.state.lock().expect("session lock poisoned");
        if state.closed {
            return Err(SessionError::Closed);
        }
        let count = snapshot.len();
        state.replace_history(snapshot);
        info!("Session {}: loaded {} message(s) of history", self.id, count);
        Ok(count)
    }

    pub fn send_outgoing(&self, sender: &str, body: &str) -> Result<Delivery, SessionError> {
        self.dispatcher.send_outgoing(sender, body)
    }

    /// Send as the authenticated participant.
    pub fn send(&self, body: &str) -> Result<Delivery, SessionError> {
        self.dispatcher.send_outgoing(&self.participant, body)
    }

    /// Report a keystroke in the compose box (live sessions only emit it).
    pub fn compose_pulse(&self) -> Result<(), SessionError> {
        self.dispatcher.compose_pulse()
    }

    /// Snapshot of the log in insertion order.
    pub fn messages(&self) -> Vec<Message> {
        self.state
            .lock()
            .expect("session lock poisoned")
            .store
            .all()
            .to_vec()
    }

    pub fn message_count(&self) -> usize {
        self.state.lock().expect("session lock poisoned").store.len()
    }

    /// Whether the other participant is typing right now.
    pub fn is_typing(&self) -> bool {
        self.state
            .lock()
            .expect("session lock poisoned")
            .presence
            .is_typing(Instant::now())
    }

    /// Change feed of the typing flag.
    pub fn typing_watch(&self) -> watch::Receiver<bool> {
        self.state.lock().expect("session lock poisoned").typing_watch()
    }

    /// Change feed of the log length.
    pub fn messages_watch(&self) -> watch::Receiver<usize> {
        self.state.lock().expect("session lock poisoned").messages_watch()
    }

    /// Relay connection state; `None` for simulated sessions.
    pub fn connection_state(&self) -> Option<watch::Receiver<ConnectionState>> {
        self.channel.as_ref().map(|channel| channel.connection_state())
    }

    /// Timers that have not fired yet.
    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn participant(&self) -> &str {
        &self.participant
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().expect("session lock poisoned").closed
    }

    /// Stop everything: inbound events, pending timers, the channel.
    /// Idempotent.
    pub fn teardown(&self) {
        {
            let mut state = self.state.lock().expect("session lock poisoned");
            if state.closed {
                return;
            }
            state.close();
        }

        if let Some(pump) = self.pump.lock().expect("pump lock poisoned").take() {
            pump.abort();
        }
        self.timers.cancel_all();
        if let Some(channel) = &self.channel {
            channel.close();
        }

        info!("Session {} torn down", self.id);
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Apply inbound relay events to the session, one at a time, in arrival order.
async fn pump(
    session_id: Uuid,
    mut events: Subscription,
    state: Arc<Mutex<SessionState>>,
    timers: TimerArena,
    typing_window: Duration,
) {
    while let Some(event) = events.recv().await {
        let mut guard = state.lock().expect("session lock poisoned");
        if guard.closed {
            break;
        }

        match event {
            RelayEvent::Message(message) => {
                debug!(
                    "Session {}: message {} from {}",
                    session_id, message.id, message.sender
                );
                guard.append(message);
            }
            RelayEvent::UserTyping => {
                if guard.typing_pulse(Instant::now()) {
                    debug!("Session {}: peer started typing", session_id);
                }
                drop(guard);

                let state = Arc::clone(&state);
                timers.schedule(TimerKey::PresenceDecay, typing_window, move || {
                    let mut state = state.lock().expect("session lock poisoned");
                    if state.closed {
                        return;
                    }
                    if state.typing_expire(Instant::now()) {
                        debug!("Session {}: peer stopped typing", session_id);
                    }
                });
            }
        }
    }

    debug!("Session {}: inbound stream ended", session_id);
}
