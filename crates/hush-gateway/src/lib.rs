//! Hush gateway: the client side of the relay connection.
//!
//! - `channel`: the narrow `Channel` capability sessions program against
//! - `registry`: inbound event fan-out with RAII subscriptions
//! - `connection`: `WsChannel`, a WebSocket channel with reconnect and heartbeat

pub mod channel;
pub mod connection;
pub mod registry;

pub use channel::{Channel, ChannelError};
pub use connection::{TransportConfig, WsChannel, gateway_url};
pub use registry::{EventRegistry, Subscription};
