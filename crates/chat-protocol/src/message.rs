use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// One room as it appears inside a `rooms_list` snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomSummary {
    pub name: String,
    pub created_by: String,
    pub created_at: String,
    pub user_count: usize,
    pub users: Vec<String>,
}

/// The tagged payload of a [`Frame`].
///
/// Serializes as `{"type": "<tag>", "payload": { ... }}` via serde's
/// adjacently-tagged representation; `Frame` flattens this together with a
/// sibling `timestamp` field to produce the three-field wire object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MessageBody {
    Connect {
        username: String,
    },
    ConnectionAck {
        username: String,
        user_id: String,
    },
    ConnectionError {
        reason: String,
    },
    Disconnect {
        username: String,
    },
    CreateRoom {
        room_name: String,
    },
    JoinRoom {
        room_name: String,
    },
    LeaveRoom {
        #[serde(default)]
        room_name: Option<String>,
    },
    ListRooms {},
    RoomsList {
        rooms: Vec<RoomSummary>,
    },
    RoomUsers {
        room_name: String,
        users: Vec<String>,
    },
    ChatMessage {
        // A client only ever needs to send `content`; `username` is decided
        // by the server from the sender's session identity and `room_name`
        // defaults to the sender's current room when omitted.
        #[serde(default)]
        username: String,
        #[serde(default)]
        room_name: String,
        content: String,
    },
    SystemMessage {
        content: String,
        #[serde(default)]
        room_name: Option<String>,
    },
    UserJoined {
        username: String,
        room_name: String,
    },
    UserLeft {
        username: String,
        room_name: String,
    },
    Error {
        message: String,
    },
}

/// A standalone wire frame: a JSON object with `type`, `payload` and
/// `timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    #[serde(flatten)]
    pub body: MessageBody,
    pub timestamp: String,
}

impl Frame {
    /// Wraps `body` with a freshly-stamped timestamp.
    pub fn new(body: MessageBody) -> Self {
        Self {
            body,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn encode(&self) -> String {
        // A `Frame` only ever holds data we constructed ourselves, so encoding
        // cannot fail.
        serde_json::to_string(self).expect("frame is always serializable")
    }

    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn connection_ack(username: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::new(MessageBody::ConnectionAck {
            username: username.into(),
            user_id: user_id.into(),
        })
    }

    pub fn connection_error(reason: impl Into<String>) -> Self {
        Self::new(MessageBody::ConnectionError {
            reason: reason.into(),
        })
    }

    pub fn rooms_list(rooms: Vec<RoomSummary>) -> Self {
        Self::new(MessageBody::RoomsList { rooms })
    }

    pub fn room_users(room_name: impl Into<String>, users: Vec<String>) -> Self {
        Self::new(MessageBody::RoomUsers {
            room_name: room_name.into(),
            users,
        })
    }

    pub fn chat_message(
        username: impl Into<String>,
        room_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(MessageBody::ChatMessage {
            username: username.into(),
            room_name: room_name.into(),
            content: content.into(),
        })
    }

    pub fn system_message(content: impl Into<String>, room_name: Option<String>) -> Self {
        Self::new(MessageBody::SystemMessage {
            content: content.into(),
            room_name,
        })
    }

    pub fn user_joined(username: impl Into<String>, room_name: impl Into<String>) -> Self {
        Self::new(MessageBody::UserJoined {
            username: username.into(),
            room_name: room_name.into(),
        })
    }

    pub fn user_left(username: impl Into<String>, room_name: impl Into<String>) -> Self {
        Self::new(MessageBody::UserLeft {
            username: username.into(),
            room_name: room_name.into(),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(MessageBody::Error {
            message: message.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_chat_message() {
        let frame = Frame::chat_message("alice", "General", "hi");
        let encoded = frame.encode();
        let decoded = Frame::decode(&encoded).unwrap();
        assert_eq!(frame, decoded);
    }

    #[test]
    fn wire_shape_has_three_fields() {
        let frame = Frame::error("oops");
        let value: serde_json::Value = serde_json::from_str(&frame.encode()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(obj["type"], "error");
        assert_eq!(obj["payload"]["message"], "oops");
        assert!(obj["timestamp"].is_string());
    }

    #[test]
    fn leave_room_tolerates_missing_room_name() {
        let raw = r#"{"type":"leave_room","payload":{},"timestamp":"2024-01-01T00:00:00Z"}"#;
        let frame = Frame::decode(raw).unwrap();
        assert_eq!(frame.body, MessageBody::LeaveRoom { room_name: None });
    }

    #[test]
    fn unknown_type_is_a_decode_error() {
        let raw = r#"{"type":"not_a_real_tag","payload":{},"timestamp":"x"}"#;
        assert!(Frame::decode(raw).is_err());
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        assert!(Frame::decode("{not json").is_err());
    }

    #[test]
    fn chat_message_tolerates_missing_username_and_room_name() {
        let raw = r#"{"type":"chat_message","payload":{"content":"hi"},"timestamp":"2024-01-01T00:00:00Z"}"#;
        let frame = Frame::decode(raw).unwrap();
        assert_eq!(
            frame.body,
            MessageBody::ChatMessage {
                username: String::new(),
                room_name: String::new(),
                content: "hi".to_string(),
            }
        );
    }

    #[test]
    fn list_rooms_has_empty_payload() {
        let frame = Frame::new(MessageBody::ListRooms {});
        let value: serde_json::Value = serde_json::from_str(&frame.encode()).unwrap();
        assert_eq!(value["payload"], serde_json::json!({}));
    }
}
