//! `send` / `reply` / `auto` helpers for handlers that build payloads by
//! hand. The chat and message being answered come from an explicit
//! [`ChatScope`].

use serde_json::{Map, Value};

use crate::error::{BotError, BotResult};
use crate::response::{OutboundAction, DEFAULT_METHOD};
use crate::update::{is_group_chat, Message};

/// The chat a request came from and the message being answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatScope {
    pub chat_id: i64,
    pub chat_type: String,
    pub message_id: Option<i64>,
}

impl ChatScope {
    pub fn is_group(&self) -> bool {
        is_group_chat(&self.chat_type)
    }
}

impl From<&Message> for ChatScope {
    fn from(message: &Message) -> Self {
        Self {
            chat_id: message.chat.id,
            chat_type: message.chat.kind.clone(),
            message_id: Some(message.message_id),
        }
    }
}

/// Either a finished action or loose fields still to be targeted.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundUpdate {
    Action(OutboundAction),
    Fields {
        method: Option<String>,
        fields: Map<String, Value>,
    },
}

impl OutboundUpdate {
    pub fn fields(fields: Map<String, Value>) -> Self {
        OutboundUpdate::Fields {
            method: None,
            fields,
        }
    }

    pub fn with_method(method: impl Into<String>, fields: Map<String, Value>) -> Self {
        OutboundUpdate::Fields {
            method: Some(method.into()),
            fields,
        }
    }
}

impl From<OutboundAction> for OutboundUpdate {
    fn from(action: OutboundAction) -> Self {
        OutboundUpdate::Action(action)
    }
}

/// Address the update to the scope's chat unless it names a chat itself.
pub fn send(update: OutboundUpdate, scope: &ChatScope) -> BotResult<OutboundAction> {
    match update {
        OutboundUpdate::Action(action) => Ok(action),
        OutboundUpdate::Fields { method, mut fields } => {
            let chat_id = match fields.get("chat_id") {
                Some(value) => coerce_chat_id(value)?,
                None => scope.chat_id,
            };
            fields.insert("chat_id".into(), chat_id.into());

            if let Some(value) = fields.get("reply_to_message_id") {
                let id = coerce_message_id(value)?;
                fields.insert("reply_to_message_id".into(), id.into());
            }

            Ok(OutboundAction::new(
                method.unwrap_or_else(|| DEFAULT_METHOD.to_string()),
                fields,
            ))
        }
    }
}

/// Like [`send`], threaded as a reply to `reply_to` or else to the scope's
/// message.
pub fn reply(
    update: OutboundUpdate,
    scope: &ChatScope,
    reply_to: Option<i64>,
) -> BotResult<OutboundAction> {
    match update {
        OutboundUpdate::Action(action) => Ok(action),
        OutboundUpdate::Fields { method, mut fields } => {
            if let Some(id) = reply_to.or(scope.message_id) {
                fields.insert("reply_to_message_id".into(), id.into());
            }
            send(OutboundUpdate::Fields { method, fields }, scope)
        }
    }
}

/// Reply in group chats, plain send everywhere else.
pub fn auto(update: OutboundUpdate, scope: &ChatScope) -> BotResult<OutboundAction> {
    if scope.is_group() {
        reply(update, scope, None)
    } else {
        send(update, scope)
    }
}

fn coerce_chat_id(value: &Value) -> BotResult<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match id {
        Some(id) if id != 0 => Ok(id),
        _ => Err(BotError::InvalidIdentifier {
            field: "chat_id",
            value: value.to_string(),
        }),
    }
}

fn coerce_message_id(value: &Value) -> BotResult<i64> {
    value.as_i64().ok_or_else(|| BotError::InvalidIdentifier {
        field: "reply_to_message_id",
        value: value.to_string(),
    })
}
