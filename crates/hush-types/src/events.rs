use serde::{Deserialize, Serialize};

use crate::models::Message;

/// Events sent FROM the relay TO clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum RelayEvent {
    /// A message was accepted by the relay (including our own, echoed back)
    Message(Message),

    /// The other participant is typing. Carries no payload.
    UserTyping,
}

impl RelayEvent {
    pub fn kind(&self) -> RelayEventKind {
        match self {
            Self::Message(_) => RelayEventKind::Message,
            Self::UserTyping => RelayEventKind::UserTyping,
        }
    }
}

/// Names of inbound events, used to pick what a subscription receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayEventKind {
    Message,
    UserTyping,
}

impl RelayEventKind {
    pub const ALL: [RelayEventKind; 2] = [Self::Message, Self::UserTyping];

    /// Wire name of the event.
    pub fn name(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::UserTyping => "userTyping",
        }
    }
}

/// Commands sent FROM clients TO the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum RelayCommand {
    /// Post a message. The relay assigns id and timestamp.
    Message { sender: String, message: String },

    /// Presence pulse for the local compose box
    Typing,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typing_pulse_has_no_payload() {
        let frame = serde_json::to_value(RelayCommand::Typing).unwrap();
        assert_eq!(frame, json!({ "event": "typing" }));

        let event: RelayEvent = serde_json::from_str(r#"{"event":"userTyping"}"#).unwrap();
        assert_eq!(event, RelayEvent::UserTyping);
        assert_eq!(event.kind().name(), "userTyping");
    }

    #[test]
    fn outgoing_message_frame_shape() {
        let cmd = RelayCommand::Message {
            sender: "Kunal".into(),
            message: "hello".into(),
        };
        assert_eq!(
            serde_json::to_value(cmd).unwrap(),
            json!({ "event": "message", "data": { "sender": "Kunal", "message": "hello" } })
        );
    }

    #[test]
    fn inbound_message_frame_decodes() {
        let raw = r#"{"event":"message","data":{"_id":"a1","sender":"friend","message":"yo","timestamp":"2025-01-02T03:04:05Z"}}"#;
        match serde_json::from_str::<RelayEvent>(raw).unwrap() {
            RelayEvent::Message(msg) => {
                assert_eq!(msg.id, "a1");
                assert_eq!(msg.body, "yo");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn unknown_event_is_an_error() {
        assert!(serde_json::from_str::<RelayEvent>(r#"{"event":"reaction"}"#).is_err());
    }
}
