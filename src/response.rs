//! Outbound actions and the reply-targeting rules used to build them.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{BotError, BotResult};
use crate::update::{InboundUpdate, Message};

pub const DEFAULT_METHOD: &str = "sendMessage";

/// A Bot API call: method name plus JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundAction {
    method: String,
    payload: Map<String, Value>,
}

impl OutboundAction {
    pub fn new(method: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            method: method.into(),
            payload,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.payload.get(field)
    }

    /// `sendMessage` with the given text, default targeting.
    pub fn text(update: &InboundUpdate, text: impl Into<String>) -> BotResult<Self> {
        ResponseBuilder::new(update)
            .field("text", Value::String(text.into()))
            .build()
    }
}

/// Who an outbound action addresses and whether it threads as a reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Targeting {
    /// Chat of the message; replies to it unless the chat is private.
    #[default]
    ReplyInGroup,
    ToChat,
    ReplyToMessage,
    /// Replies to whatever the inbound message itself replied to.
    ReplyToReplied,
    /// Private chat with the sender.
    ToSender,
}

/// Builds an [`OutboundAction`] targeted relative to an inbound update.
pub struct ResponseBuilder<'a> {
    update: &'a InboundUpdate,
    method: String,
    targeting: Targeting,
    bypass: bool,
    extra: Map<String, Value>,
}

impl<'a> ResponseBuilder<'a> {
    pub fn new(update: &'a InboundUpdate) -> Self {
        Self {
            update,
            method: DEFAULT_METHOD.to_string(),
            targeting: Targeting::default(),
            bypass: true,
            extra: Map::new(),
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn targeting(mut self, targeting: Targeting) -> Self {
        self.targeting = targeting;
        self
    }

    /// With bypass on, `ReplyToReplied` falls back to `ReplyInGroup` on the
    /// original message when there is nothing to reply to.
    pub fn bypass(mut self, bypass: bool) -> Self {
        self.bypass = bypass;
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Extra fields win over the computed targeting fields.
    pub fn extend(mut self, fields: Map<String, Value>) -> Self {
        self.extra.extend(fields);
        self
    }

    pub fn build(self) -> BotResult<OutboundAction> {
        let message = self.update.message().ok_or_else(|| {
            BotError::InvalidTargetingState("update carries no message to respond to".into())
        })?;

        let mut payload = target(message, self.targeting, self.bypass)?;
        payload.extend(self.extra);
        Ok(OutboundAction::new(self.method, payload))
    }
}

fn target(message: &Message, targeting: Targeting, bypass: bool) -> BotResult<Map<String, Value>> {
    let mut fields = Map::new();
    let chat_id = Value::from(message.chat.id);

    match targeting {
        Targeting::ReplyInGroup => {
            fields.insert("chat_id".into(), chat_id);
            if !message.chat.is_private() {
                fields.insert("reply_to_message_id".into(), message.message_id.into());
            }
        }
        Targeting::ToChat => {
            fields.insert("chat_id".into(), chat_id);
        }
        Targeting::ReplyToMessage => {
            fields.insert("chat_id".into(), chat_id);
            fields.insert("reply_to_message_id".into(), message.message_id.into());
        }
        Targeting::ReplyToReplied => match &message.reply_to_message {
            Some(replied) => {
                fields.insert("chat_id".into(), chat_id);
                fields.insert("reply_to_message_id".into(), replied.message_id.into());
            }
            None if bypass => return target(message, Targeting::ReplyInGroup, bypass),
            None => {
                return Err(BotError::InvalidTargetingState(
                    "message is not a reply and bypass is disabled".into(),
                ))
            }
        },
        Targeting::ToSender => {
            let sender = message.from.as_ref().ok_or_else(|| {
                BotError::InvalidTargetingState("message has no sender".into())
            })?;
            fields.insert("chat_id".into(), sender.id.into());
        }
    }

    Ok(fields)
}
