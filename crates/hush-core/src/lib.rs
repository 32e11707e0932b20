//! Hush core: the real-time part of a two-party chat session.
//!
//! - `store`: append-only message log with history reconciliation
//! - `presence`: typing pulses debounced into a decaying flag
//! - `timers`: per-session arena of cancellable delayed tasks
//! - `dispatcher`: outgoing delivery, relayed or simulated
//! - `session`: ties the above to a relay channel and tears it all down together

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod presence;
pub mod session;
pub mod store;
pub mod timers;

mod state;

pub use config::{ClientConfig, SimulatedScript};
pub use dispatcher::{Delivery, DeliveryDispatcher};
pub use error::SessionError;
pub use presence::PresenceDebouncer;
pub use session::{ChatSession, Opened};
pub use store::MessageStore;
pub use timers::{TimerArena, TimerKey};
