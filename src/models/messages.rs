use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::models::Language;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinMessage {
    pub room: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSendMessage {
    pub room: String,
    pub text: String,
}

/// Document text for a room, used both for `code:update` and `code:apply`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeMessage {
    pub room: String,
    pub text: String,
}

/// The language arrives as a raw tag so an unknown value can be rejected
/// without failing the whole frame.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageUpdateMessage {
    pub room: String,
    pub language: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageApplyMessage {
    pub room: String,
    pub language: Language,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NameMessage {
    pub name: String,
}

/// Immutable once appended to a room's chat log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub sender_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Full authoritative room state, sent only to the joining connection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomStateMessage {
    pub you: String,
    pub members: Vec<String>,
    pub chat: Vec<ChatEntry>,
    pub document: String,
    pub language: Language,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceMessage {
    pub members: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PongMessage {
    pub date: String,
}

/// Frames a client sends to the relay.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "join")]
    Join(JoinMessage),
    #[serde(rename = "chat:send")]
    ChatSend(ChatSendMessage),
    #[serde(rename = "code:update")]
    CodeUpdate(CodeMessage),
    #[serde(rename = "language:update")]
    LanguageUpdate(LanguageUpdateMessage),
    #[serde(rename = "name:update")]
    NameUpdate(NameMessage),
    #[serde(rename = "ping")]
    Ping,
}

/// Frames the relay sends to a client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "room:state")]
    RoomState(RoomStateMessage),
    #[serde(rename = "room:presence")]
    Presence(PresenceMessage),
    #[serde(rename = "chat:recv")]
    ChatRecv(ChatEntry),
    #[serde(rename = "code:apply")]
    CodeApply(CodeMessage),
    #[serde(rename = "language:apply")]
    LanguageApply(LanguageApplyMessage),
    #[serde(rename = "you:renamed")]
    Renamed(NameMessage),
    #[serde(rename = "pong")]
    Pong(PongMessage),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_browser_join_frame() {
        let msg: ReceivedMessage =
            serde_json::from_value(json!({"type": "join", "room": "r1", "name": "Ada"})).unwrap();
        assert_eq!(
            msg,
            ReceivedMessage::Join(JoinMessage { room: "r1".into(), name: "Ada".into() })
        );
    }

    #[test]
    fn parses_ping_without_payload() {
        let msg: ReceivedMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, ReceivedMessage::Ping);
    }

    #[test]
    fn keeps_unknown_language_as_raw_tag() {
        let msg: ReceivedMessage = serde_json::from_value(
            json!({"type": "language:update", "room": "r1", "language": "cobol"}),
        )
        .unwrap();
        match msg {
            ReceivedMessage::LanguageUpdate(update) => assert_eq!(update.language, "cobol"),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn chat_entry_uses_camel_case_sender() {
        let entry = ChatEntry {
            sender_name: "Ada".into(),
            text: "hi".into(),
            timestamp: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        let value = serde_json::to_value(SendMessage::ChatRecv(entry)).unwrap();
        assert_eq!(value["type"], "chat:recv");
        assert_eq!(value["senderName"], "Ada");
        assert_eq!(value["text"], "hi");
    }

    #[test]
    fn rejects_frame_with_missing_fields() {
        let parsed = serde_json::from_str::<ReceivedMessage>(r#"{"type":"join","room":"r1"}"#);
        assert!(parsed.is_err());
    }
}
