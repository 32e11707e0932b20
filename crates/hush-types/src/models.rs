use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One chat message.
///
/// Field names follow the relay's JSON (`_id`, `message`). `timestamp` is
/// informational only: the message log is ordered by arrival, never by time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender: String,
    #[serde(rename = "message")]
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a message with a fresh v4 id stamped with the current time.
    pub fn new_local(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: sender.into(),
            body: body.into(),
            timestamp: Utc::now(),
        }
    }
}

/// How a chat session delivers messages. Fixed when the session is granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Bound to a real relay channel.
    Live,
    /// No transport at all; outgoing messages are applied locally and
    /// answered by a scripted counterpart.
    Simulated,
}

/// Observable state of a relay channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// First connection attempt in flight.
    Connecting,
    Connected,
    /// Connection dropped or failed; waiting out backoff before retrying.
    Reconnecting,
    /// Closed for good, either by the owner or after the retry budget ran out.
    Disconnected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_uses_relay_field_names() {
        let raw = r#"{
            "_id": "6751c0ffee",
            "sender": "Kunal",
            "message": "hello",
            "timestamp": "2024-12-05T14:03:11.000Z",
            "__v": 0
        }"#;

        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.id, "6751c0ffee");
        assert_eq!(msg.sender, "Kunal");
        assert_eq!(msg.body, "hello");

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["_id"], "6751c0ffee");
        assert_eq!(json["message"], "hello");
        assert!(json.get("body").is_none());
    }

    #[test]
    fn local_messages_get_distinct_ids() {
        let a = Message::new_local("reviewer", "hi");
        let b = Message::new_local("reviewer", "hi");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn connection_state_predicates() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Reconnecting.is_connected());
        assert!(ConnectionState::Disconnected.is_terminal());
        assert!(!ConnectionState::Connecting.is_terminal());
    }
}
