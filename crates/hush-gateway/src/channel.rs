use thiserror::Error;
use tokio::sync::watch;

use hush_types::{ConnectionState, RelayCommand, RelayEventKind};

use crate::registry::Subscription;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel is closed")]
    Closed,

    #[error("channel is not connected ({0:?})")]
    NotConnected(ConnectionState),
}

/// A live, bidirectional link to the relay.
///
/// This is everything a chat session may do with its transport. Sends are
/// fire-and-forget: `Ok` means the command was queued for the wire, not that
/// the relay received it.
pub trait Channel: Send + Sync + 'static {
    /// Queue one outbound command.
    fn send(&self, command: RelayCommand) -> Result<(), ChannelError>;

    /// Receive inbound events of the given kinds, in arrival order.
    /// Dropping the returned handle deregisters it.
    fn subscribe(&self, kinds: &[RelayEventKind]) -> Subscription;

    /// Watch the connection state.
    fn connection_state(&self) -> watch::Receiver<ConnectionState>;

    /// Release the connection. Safe to call any number of times.
    fn close(&self);
}
