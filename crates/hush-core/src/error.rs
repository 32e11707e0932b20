use thiserror::Error;

use hush_api::HistoryError;
use hush_gateway::ChannelError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("message body is empty")]
    EmptyBody,

    #[error("session is closed")]
    Closed,

    #[error("live session requires a relay channel")]
    MissingChannel,

    #[error("simulated session cannot use a relay channel")]
    UnexpectedChannel,

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    History(#[from] HistoryError),
}
