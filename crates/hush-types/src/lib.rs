//! Hush shared types.
//!
//! Domain records and the JSON frames exchanged with the relay, used by the
//! client crates and the reference relay alike.

pub mod events;
pub mod models;

pub use events::{RelayCommand, RelayEvent, RelayEventKind};
pub use models::{ConnectionState, Message, SessionMode};
