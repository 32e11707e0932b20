use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use hush_gateway::Channel;
use hush_types::{Message, RelayCommand};

use crate::config::SimulatedScript;
use crate::error::SessionError;
use crate::state::SessionState;
use crate::timers::{TimerArena, TimerKey};

/// What happened to an accepted outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the relay. It shows up in the log only once the relay
    /// echoes it back.
    Relayed,
    /// Appended to the log directly under this locally generated id.
    AppliedLocally { id: String },
}

enum Route {
    Relay(Arc<dyn Channel>),
    Simulated(SimulatedScript),
}

/// Sends the local user's messages and typing pulses.
///
/// Live sessions go through the relay and wait for the echo. Simulated
/// sessions apply the message at once and schedule the scripted reply.
pub struct DeliveryDispatcher {
    route: Route,
    state: Arc<Mutex<SessionState>>,
    timers: TimerArena,
}

impl DeliveryDispatcher {
    pub(crate) fn relay(
        channel: Arc<dyn Channel>,
        state: Arc<Mutex<SessionState>>,
        timers: TimerArena,
    ) -> Self {
        Self {
            route: Route::Relay(channel),
            state,
            timers,
        }
    }

    pub(crate) fn simulated(
        script: SimulatedScript,
        state: Arc<Mutex<SessionState>>,
        timers: TimerArena,
    ) -> Self {
        Self {
            route: Route::Simulated(script),
            state,
            timers,
        }
    }

    /// Send one message. Blank bodies are refused without touching the log
    /// or the channel.
    pub fn send_outgoing(&self, sender: &str, body: &str) -> Result<Delivery, SessionError> {
        if body.trim().is_empty() {
            trace!("Ignoring blank outgoing message from {}", sender);
            return Err(SessionError::EmptyBody);
        }
        self.ensure_open()?;

        match &self.route {
            Route::Relay(channel) => {
                channel.send(RelayCommand::Message {
                    sender: sender.to_string(),
                    message: body.to_string(),
                })?;
                debug!("{} -> relay ({} chars)", sender, body.len());
                Ok(Delivery::Relayed)
            }
            Route::Simulated(script) => {
                let message = Message::new_local(sender, body);
                let id = message.id.clone();
                {
                    let mut state = self.state.lock().expect("session lock poisoned");
                    if state.closed {
                        return Err(SessionError::Closed);
                    }
                    state.append(message);
                }
                debug!("{} -> local log as {}", sender, id);
                self.schedule_reply(script);
                Ok(Delivery::AppliedLocally { id })
            }
        }
    }

    /// Called on every edit of the compose box.
    pub fn compose_pulse(&self) -> Result<(), SessionError> {
        match &self.route {
            Route::Relay(channel) => {
                self.ensure_open()?;
                channel.send(RelayCommand::Typing)?;
                Ok(())
            }
            // Nobody on the other end to see it
            Route::Simulated(_) => Ok(()),
        }
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.state.lock().expect("session lock poisoned").closed {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    fn schedule_reply(&self, script: &SimulatedScript) {
        let state = Arc::clone(&self.state);
        let counterpart = script.counterpart.clone();
        let body = script.reply_body.clone();
        let key = TimerKey::SimulatedReply(self.timers.next_seq());

        self.timers.schedule(key, script.reply_delay, move || {
            let mut state = state.lock().expect("session lock poisoned");
            if state.closed {
                return;
            }
            debug!("Scripted reply from {}", counterpart);
            state.append(Message::new_local(counterpart, body));
        });
    }
}
