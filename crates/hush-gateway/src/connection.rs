use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use hush_types::{ConnectionState, RelayCommand, RelayEvent, RelayEventKind};

use crate::channel::{Channel, ChannelError};
use crate::registry::{EventRegistry, Subscription};

/// Heartbeat interval: the client sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Connection and retry tuning for `WsChannel`.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub heartbeat_interval: Duration,
    /// Delay before the first retry; doubles on each consecutive failure.
    pub reconnect_base: Duration,
    pub reconnect_cap: Duration,
    /// Upper bound of the random delay added to every backoff.
    pub reconnect_jitter: Duration,
    /// Consecutive failed attempts tolerated before giving up. `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: HEARTBEAT_INTERVAL,
            reconnect_base: Duration::from_millis(500),
            reconnect_cap: Duration::from_secs(10),
            reconnect_jitter: Duration::from_millis(250),
            max_reconnect_attempts: None,
        }
    }
}

impl TransportConfig {
    /// Backoff before retry number `attempt` (1-based), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.reconnect_base
            .saturating_mul(1u32 << exp)
            .min(self.reconnect_cap)
    }
}

/// WebSocket endpoint of the relay for a given HTTP base URL.
pub fn gateway_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}/gateway", ws_base)
}

/// A relay channel over WebSocket.
///
/// `open` returns immediately; a background supervisor owns the socket,
/// reconnects with backoff when it drops, and publishes every transition on
/// the state watch. Inbound frames are decoded and fanned out through the
/// registry in the order they arrive.
pub struct WsChannel {
    endpoint: String,
    commands: mpsc::UnboundedSender<RelayCommand>,
    registry: EventRegistry,
    state: watch::Receiver<ConnectionState>,
    shutdown: CancellationToken,
}

impl WsChannel {
    /// Start connecting to `endpoint` (a `ws://` or `wss://` URL).
    /// Must be called from within a Tokio runtime.
    pub fn open(endpoint: impl Into<String>, config: TransportConfig) -> Self {
        let endpoint = endpoint.into();
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Connecting);
        let registry = EventRegistry::new();
        let shutdown = CancellationToken::new();

        info!("Opening relay channel to {}", endpoint);
        tokio::spawn(supervise(
            endpoint.clone(),
            config,
            registry.clone(),
            command_rx,
            state_tx,
            shutdown.clone(),
        ));

        Self {
            endpoint,
            commands,
            registry,
            state,
            shutdown,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Channel for WsChannel {
    fn send(&self, command: RelayCommand) -> Result<(), ChannelError> {
        if self.shutdown.is_cancelled() {
            return Err(ChannelError::Closed);
        }
        match *self.state.borrow() {
            ConnectionState::Connected => {}
            ConnectionState::Disconnected => return Err(ChannelError::Closed),
            other => return Err(ChannelError::NotConnected(other)),
        }
        self.commands.send(command).map_err(|_| ChannelError::Closed)
    }

    fn subscribe(&self, kinds: &[RelayEventKind]) -> Subscription {
        self.registry.subscribe(kinds)
    }

    fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    fn close(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        info!("Closing relay channel to {}", self.endpoint);
        self.shutdown.cancel();
        self.registry.close();
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

enum ConnectionEnd {
    Shutdown,
    Dropped(String),
}

async fn supervise(
    endpoint: String,
    config: TransportConfig,
    registry: EventRegistry,
    mut commands: mpsc::UnboundedReceiver<RelayCommand>,
    state_tx: watch::Sender<ConnectionState>,
    shutdown: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let connected = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = tokio_tungstenite::connect_async(endpoint.as_str()) => result,
        };

        match connected {
            Ok((stream, _response)) => {
                attempt = 0;

                // Anything still queued raced a previous disconnect
                let mut stale = 0;
                while commands.try_recv().is_ok() {
                    stale += 1;
                }
                if stale > 0 {
                    debug!("Discarded {} stale command(s) for {}", stale, endpoint);
                }

                state_tx.send_replace(ConnectionState::Connected);
                info!("Relay channel connected to {}", endpoint);

                match run_connection(
                    stream,
                    &registry,
                    &mut commands,
                    &shutdown,
                    config.heartbeat_interval,
                )
                .await
                {
                    ConnectionEnd::Shutdown => break,
                    ConnectionEnd::Dropped(reason) => {
                        warn!("Relay channel to {} dropped: {}", endpoint, reason);
                    }
                }
            }
            Err(e) => {
                warn!("Relay connect to {} failed: {}", endpoint, e);
            }
        }

        attempt += 1;
        if let Some(max) = config.max_reconnect_attempts {
            if attempt > max {
                warn!(
                    "Giving up on {} after {} failed attempt(s)",
                    endpoint, attempt
                );
                break;
            }
        }

        state_tx.send_replace(ConnectionState::Reconnecting);
        let delay = config.backoff(attempt) + jitter(config.reconnect_jitter);
        debug!("Reconnecting to {} in {:?} (attempt {})", endpoint, delay, attempt);

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    registry.close();
    state_tx.send_replace(ConnectionState::Disconnected);
    info!("Relay channel to {} closed", endpoint);
}

fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}

async fn run_connection<S>(
    stream: WebSocketStream<S>,
    registry: &EventRegistry,
    commands: &mut mpsc::UnboundedReceiver<RelayCommand>,
    shutdown: &CancellationToken,
    heartbeat_interval: Duration,
) -> ConnectionEnd
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut sink, mut frames) = stream.split();

    let mut heartbeat = tokio::time::interval(heartbeat_interval);
    heartbeat.tick().await;
    let mut pong_received = true;
    let mut missed_heartbeats: u8 = 0;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = sink.send(Message::Close(None)).await;
                return ConnectionEnd::Shutdown;
            }
            command = commands.recv() => {
                // Sender side lives in WsChannel; gone means the channel was dropped
                let Some(command) = command else {
                    return ConnectionEnd::Shutdown;
                };
                let text = match serde_json::to_string(&command) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode command {:?}: {}", command, e);
                        continue;
                    }
                };
                trace!("-> {}", text);
                if let Err(e) = sink.send(Message::text(text)).await {
                    return ConnectionEnd::Dropped(e.to_string());
                }
            }
            frame = frames.next() => match frame {
                Some(Ok(Message::Text(text))) => handle_text(registry, text.as_str()),
                Some(Ok(Message::Pong(_))) => pong_received = true,
                Some(Ok(Message::Close(frame))) => {
                    return ConnectionEnd::Dropped(format!("closed by relay ({:?})", frame));
                }
                // Pings are answered by tungstenite; binary frames are not part of the protocol
                Some(Ok(_)) => {}
                Some(Err(e)) => return ConnectionEnd::Dropped(e.to_string()),
                None => return ConnectionEnd::Dropped("stream ended".into()),
            },
            _ = heartbeat.tick() => {
                if std::mem::replace(&mut pong_received, false) {
                    missed_heartbeats = 0;
                } else {
                    missed_heartbeats += 1;
                    if missed_heartbeats >= 2 {
                        return ConnectionEnd::Dropped(format!(
                            "heartbeat timeout (missed {} pongs)",
                            missed_heartbeats
                        ));
                    }
                }
                if let Err(e) = sink.send(Message::Ping(Vec::new().into())).await {
                    return ConnectionEnd::Dropped(e.to_string());
                }
            }
        }
    }
}

fn handle_text(registry: &EventRegistry, text: &str) {
    trace!("<- {}", text);
    match serde_json::from_str::<RelayEvent>(text) {
        Ok(event) => {
            registry.dispatch(event);
        }
        Err(e) => {
            let raw: String = text.chars().take(200).collect();
            warn!("Bad relay frame: {} -- raw: {}", e, raw);
        }
    }
}
