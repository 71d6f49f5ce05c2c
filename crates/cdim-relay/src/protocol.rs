//! Wire protocol: JSON text frames tagged by `type`.
//!
//! Client events are parsed into a closed enum at the boundary. A frame
//! that is valid JSON with an unrecognised `type` becomes
//! [`ClientEvent::Unknown`]; anything else that fails to parse is reported
//! as a `serde_json::Error` and treated as malformed by the session.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Prefix a chat image must carry to be accepted.
pub const IMAGE_PREFIX: &str = "data:image";

/// Text stored for a chat that carries only an image.
pub const IMAGE_PLACEHOLDER: &str = "[image]";

/// Events a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Join a pair. Fields are validated by the session, not here.
    #[serde(rename = "hello")]
    Hello {
        #[serde(rename = "pairId", default, deserialize_with = "loose_string")]
        pair_id: Option<String>,
        #[serde(rename = "userId", default, deserialize_with = "loose_string")]
        user_id: Option<String>,
        #[serde(rename = "displayName", default, deserialize_with = "loose_string")]
        display_name: Option<String>,
    },

    #[serde(rename = "chat")]
    Chat {
        #[serde(default, deserialize_with = "loose_string")]
        text: Option<String>,
        #[serde(default, deserialize_with = "loose_string")]
        image: Option<String>,
        #[serde(rename = "clientMsgId", default, deserialize_with = "loose_string")]
        client_msg_id: Option<String>,
    },

    #[serde(other)]
    Unknown,
}

/// Accept strings as-is and numbers in their JSON spelling; every other
/// JSON type counts as absent.
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Parse one inbound text frame.
pub fn parse_client_event(raw: &str) -> Result<ClientEvent, serde_json::Error> {
    serde_json::from_str(raw)
}

/// One entry of a presence list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceEntry {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// A chat message as stored in pair history and sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "chat")]
pub struct ChatMessage {
    pub id: String,
    #[serde(rename = "pairId")]
    pub pair_id: String,
    /// Sender's participant identifier.
    pub from: String,
    pub text: String,
    /// ISO-8601 UTC, millisecond precision.
    pub time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Events the relay sends to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "welcome")]
    Welcome {
        #[serde(rename = "pairId")]
        pair_id: String,
        #[serde(rename = "userId")]
        user_id: String,
        history: Vec<ChatMessage>,
        users: Vec<PresenceEntry>,
    },

    #[serde(rename = "presence")]
    Presence {
        #[serde(rename = "pairId")]
        pair_id: String,
        users: Vec<PresenceEntry>,
    },

    #[serde(rename = "chat")]
    Chat { message: ChatMessage },

    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    /// Serialize to the JSON text sent over the socket.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hello() {
        let event =
            parse_client_event(r#"{"type":"hello","pairId":"p1","userId":"alice","displayName":"Alice"}"#)
                .unwrap();
        assert_eq!(
            event,
            ClientEvent::Hello {
                pair_id: Some("p1".into()),
                user_id: Some("alice".into()),
                display_name: Some("Alice".into()),
            }
        );
    }

    #[test]
    fn hello_fields_are_optional() {
        let event = parse_client_event(r#"{"type":"hello"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::Hello {
                pair_id: None,
                user_id: None,
                display_name: None,
            }
        );
    }

    #[test]
    fn numeric_ids_are_stringified() {
        let event = parse_client_event(r#"{"type":"hello","pairId":42,"userId":7}"#).unwrap();
        assert!(matches!(
            event,
            ClientEvent::Hello { pair_id: Some(ref p), user_id: Some(ref u), .. } if p == "42" && u == "7"
        ));
    }

    #[test]
    fn parses_chat_with_image() {
        let event = parse_client_event(
            r#"{"type":"chat","text":"","image":"data:image/png;base64,AAAA","clientMsgId":"c-1"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::Chat {
                text: Some(String::new()),
                image: Some("data:image/png;base64,AAAA".into()),
                client_msg_id: Some("c-1".into()),
            }
        );
    }

    #[test]
    fn non_string_image_is_absent() {
        let event = parse_client_event(r#"{"type":"chat","text":"hi","image":{"a":1}}"#).unwrap();
        assert!(matches!(event, ClientEvent::Chat { image: None, .. }));
    }

    #[test]
    fn unknown_type_is_unknown() {
        let event = parse_client_event(r#"{"type":"typing","pairId":"p1"}"#).unwrap();
        assert_eq!(event, ClientEvent::Unknown);
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(parse_client_event("not json").is_err());
        assert!(parse_client_event("[1,2,3]").is_err());
        assert!(parse_client_event(r#"{"text":"no type"}"#).is_err());
    }

    #[test]
    fn chat_message_serializes_with_type_tag() {
        let msg = ChatMessage {
            id: "m1".into(),
            pair_id: "p1".into(),
            from: "alice".into(),
            text: "hi".into(),
            time: "2026-01-01T00:00:00.000Z".into(),
            image: None,
        };
        let json: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "chat");
        assert_eq!(json["pairId"], "p1");
        assert_eq!(json["from"], "alice");
        assert!(json.get("image").is_none());
    }

    #[test]
    fn server_events_use_camel_case_fields() {
        let event = ServerEvent::Presence {
            pair_id: "p1".into(),
            users: vec![PresenceEntry {
                user_id: "alice".into(),
                display_name: "Alice".into(),
            }],
        };
        let json: Value = serde_json::from_str(&event.encode().unwrap()).unwrap();
        assert_eq!(json["type"], "presence");
        assert_eq!(json["pairId"], "p1");
        assert_eq!(json["users"][0]["userId"], "alice");
        assert_eq!(json["users"][0]["displayName"], "Alice");
    }

    #[test]
    fn error_event_shape() {
        let json: Value =
            serde_json::from_str(&ServerEvent::error("not joined").encode().unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"type": "error", "message": "not joined"}));
    }
}
