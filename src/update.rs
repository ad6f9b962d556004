//! Typed view over the inbound webhook payload.
//!
//! The payload is deserialized straight into these structs. Fields the
//! router never reads are ignored, and the raw JSON is kept next to the typed
//! view so the dispatch report can echo exactly what was received.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::Command;
use crate::error::{BotError, BotResult};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Chat {
    pub id: i64,
    /// "private", "group", "supergroup" or "channel"
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Chat {
    pub fn is_private(&self) -> bool {
        self.kind == "private"
    }

    pub fn is_group(&self) -> bool {
        is_group_chat(&self.kind)
    }
}

/// Group-type chats are the ones where replies need threading.
pub fn is_group_chat(kind: &str) -> bool {
    kind == "group" || kind == "supergroup"
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Message {
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message: Option<Box<Message>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct InlineQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub offset: String,
}

#[derive(Debug, Deserialize)]
struct UpdatePayload {
    #[serde(default)]
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    inline_query: Option<InlineQuery>,
}

/// One inbound event, read-only after construction.
#[derive(Debug)]
pub struct InboundUpdate {
    update_id: i64,
    message: Option<Message>,
    inline_query: Option<InlineQuery>,
    raw: Value,
    command: OnceLock<Option<Command>>,
}

impl InboundUpdate {
    /// Build from a decoded webhook body.
    pub fn from_value(raw: Value) -> BotResult<Self> {
        if !raw.is_object() {
            return Err(BotError::MalformedInput(format!(
                "expected a JSON object, got {}",
                kind_of(&raw)
            )));
        }

        let payload: UpdatePayload = serde_json::from_value(raw.clone())
            .map_err(|e| BotError::MalformedInput(e.to_string()))?;

        Ok(Self {
            update_id: payload.update_id,
            message: payload.message,
            inline_query: payload.inline_query,
            raw,
            command: OnceLock::new(),
        })
    }

    /// Build from a raw webhook body. An empty body is malformed input.
    pub fn from_slice(body: &[u8]) -> BotResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(BotError::MalformedInput("no update payload sent".into()));
        }
        let raw: Value =
            serde_json::from_slice(body).map_err(|e| BotError::MalformedInput(e.to_string()))?;
        Self::from_value(raw)
    }

    pub fn update_id(&self) -> i64 {
        self.update_id
    }

    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    pub fn inline_query(&self) -> Option<&InlineQuery> {
        self.inline_query.as_ref()
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn text(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.text.as_deref())
    }

    /// The command view of the message text, parsed on first access.
    /// `None` when there is no text at all.
    pub fn command(&self) -> Option<&Command> {
        self.command
            .get_or_init(|| self.text().map(Command::parse))
            .as_ref()
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_update() {
        let update = InboundUpdate::from_value(json!({
            "update_id": 17,
            "message": {
                "message_id": 9,
                "from": {"id": 42, "is_bot": false, "first_name": "Ada"},
                "chat": {"id": 5, "type": "private"},
                "date": 1700000000,
                "text": "/echo hi"
            }
        }))
        .unwrap();

        assert_eq!(update.update_id(), 17);
        let msg = update.message().unwrap();
        assert_eq!(msg.message_id, 9);
        assert!(msg.chat.is_private());
        assert_eq!(msg.from.as_ref().unwrap().id, 42);
        assert!(update.inline_query().is_none());

        let cmd = update.command().unwrap();
        assert!(cmd.valid);
        assert_eq!(cmd.name, "echo");
        assert_eq!(cmd.args, "hi");
    }

    #[test]
    fn test_command_absent_without_text() {
        let update = InboundUpdate::from_value(json!({
            "message": {"message_id": 1, "chat": {"id": 1, "type": "group"}}
        }))
        .unwrap();
        assert!(update.command().is_none());
        assert!(update.message().unwrap().chat.is_group());
    }

    #[test]
    fn test_plain_text_has_invalid_command() {
        let update = InboundUpdate::from_value(json!({
            "message": {"message_id": 1, "chat": {"id": 1, "type": "group"}, "text": "hello"}
        }))
        .unwrap();
        assert!(!update.command().unwrap().valid);
    }

    #[test]
    fn test_inline_query_update() {
        let update = InboundUpdate::from_value(json!({
            "update_id": 3,
            "inline_query": {
                "id": "abc",
                "from": {"id": 7, "is_bot": false, "first_name": "Bo"},
                "query": "weather berlin",
                "offset": ""
            }
        }))
        .unwrap();
        assert!(update.message().is_none());
        assert_eq!(update.inline_query().unwrap().query, "weather berlin");
        assert!(update.command().is_none());
    }

    #[test]
    fn test_reply_chain() {
        let update = InboundUpdate::from_value(json!({
            "message": {
                "message_id": 20,
                "chat": {"id": -100, "type": "supergroup"},
                "text": "+1",
                "reply_to_message": {
                    "message_id": 19,
                    "chat": {"id": -100, "type": "supergroup"},
                    "text": "original"
                }
            }
        }))
        .unwrap();
        let replied = update.message().unwrap().reply_to_message.as_ref().unwrap();
        assert_eq!(replied.message_id, 19);
    }

    #[test]
    fn test_empty_object_is_dispatchable() {
        let update = InboundUpdate::from_value(json!({})).unwrap();
        assert!(update.message().is_none());
        assert!(update.inline_query().is_none());
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            InboundUpdate::from_value(Value::Null),
            Err(BotError::MalformedInput(_))
        ));
        assert!(matches!(
            InboundUpdate::from_slice(b"  \n"),
            Err(BotError::MalformedInput(_))
        ));
        assert!(matches!(
            InboundUpdate::from_slice(b"{not json"),
            Err(BotError::MalformedInput(_))
        ));
        assert!(matches!(
            InboundUpdate::from_value(json!({"message": {"message_id": "x"}})),
            Err(BotError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_raw_is_kept() {
        let body = json!({"update_id": 1, "custom": true});
        let update = InboundUpdate::from_value(body.clone()).unwrap();
        assert_eq!(update.raw(), &body);
    }

    #[test]
    fn test_group_chat_kinds() {
        assert!(is_group_chat("group"));
        assert!(is_group_chat("supergroup"));
        assert!(!is_group_chat("private"));
        assert!(!is_group_chat("channel"));
    }
}
