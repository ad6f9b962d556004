//! Handlers the `hookbot` binary registers out of the box.

use serde_json::{json, Map, Value};

use crate::dispatch::RequestContext;
use crate::outbound::{self, ChatScope, OutboundUpdate};
use crate::registry::{HandlerResult, RegistryBuilder};
use crate::response::{OutboundAction, ResponseBuilder, Targeting};

pub fn register_defaults(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .command(["start", "hello"], "Say hello", start)
        .command("echo", "Repeat the given text", echo)
        .command("whoami", "Show your user id (sent privately)", whoami)
        .keyword("ping", pong)
        .inline("default", inline_echo)
}

fn start(ctx: &RequestContext<'_>) -> HandlerResult {
    let name = ctx
        .update
        .message()
        .and_then(|m| m.from.as_ref())
        .map(|u| u.first_name.as_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("there");
    OutboundAction::text(
        ctx.update,
        format!("Hello, {}! Send /help to see what I can do.", name),
    )
    .map(Some)
}

fn echo(ctx: &RequestContext<'_>) -> HandlerResult {
    let Some(command) = ctx.update.command() else {
        return Ok(None);
    };
    if command.args.trim().is_empty() {
        return OutboundAction::text(ctx.update, "Usage: /echo <text>").map(Some);
    }
    ResponseBuilder::new(ctx.update)
        .targeting(Targeting::ReplyToReplied)
        .field("text", Value::String(command.args.clone()))
        .build()
        .map(Some)
}

/// Answers privately; in a group the chat also gets a short notice.
fn whoami(ctx: &RequestContext<'_>) -> HandlerResult {
    let Some(message) = ctx.update.message() else {
        return Ok(None);
    };
    let Some(user) = message.from.as_ref() else {
        return Ok(None);
    };
    if message.chat.is_group() {
        let mut fields = Map::new();
        fields.insert("text".into(), json!("I sent you a private message."));
        ctx.reply(OutboundUpdate::fields(fields), &ChatScope::from(message), None)?;
    }
    ResponseBuilder::new(ctx.update)
        .targeting(Targeting::ToSender)
        .field("text", json!(format!("Your user id is {}", user.id)))
        .build()
        .map(Some)
}

fn pong(ctx: &RequestContext<'_>) -> HandlerResult {
    let Some(message) = ctx.update.message() else {
        return Ok(None);
    };
    let mut fields = Map::new();
    fields.insert("text".into(), json!("pong"));
    outbound::auto(OutboundUpdate::fields(fields), &ChatScope::from(message)).map(Some)
}

/// Offers the query text back as a single article result.
fn inline_echo(ctx: &RequestContext<'_>) -> HandlerResult {
    let Some(query) = ctx.update.inline_query() else {
        return Ok(None);
    };
    let text = if query.query.trim().is_empty() {
        "Type something to echo"
    } else {
        query.query.as_str()
    };

    let mut payload = Map::new();
    payload.insert("inline_query_id".into(), json!(query.id));
    payload.insert(
        "results".into(),
        json!([{
            "type": "article",
            "id": "echo",
            "title": text,
            "input_message_content": {"message_text": text}
        }]),
    );
    Ok(Some(OutboundAction::new("answerInlineQuery", payload)))
}
