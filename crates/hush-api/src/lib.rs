//! Boundary collaborators of a chat session: the history endpoint and the
//! credential gate that decides which session mode a user gets.

pub mod auth;
pub mod history;

pub use auth::{AuthError, CredentialTable, Grant};
pub use history::{HISTORY_PATH, HistoryError, HistorySource, HttpHistory};
