use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::dispatch::{Dispatcher, RequestContext};
use crate::error::{BotError, BotResult};
use crate::identity::{Identity, IdentityCache};
use crate::platform::Transport;
use crate::registry::Registry;
use crate::response::OutboundAction;
use crate::update::InboundUpdate;

/// One sent action and what the platform answered.
#[derive(Debug, Clone, Serialize)]
pub struct SentResponse {
    pub method: String,
    pub response: Value,
    pub result: Value,
}

/// Summary of one webhook invocation, for debugging.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub received_at: DateTime<Utc>,
    pub request: Value,
    pub responses: Vec<SentResponse>,
}

impl DispatchReport {
    pub fn new(request: Value) -> Self {
        Self {
            received_at: Utc::now(),
            request,
            responses: Vec::new(),
        }
    }
}

/// Shared bot state: the frozen registry, the transport and the identity
/// cache. Cheap to share behind `Arc` across concurrent requests.
pub struct Bot {
    dispatcher: Dispatcher,
    transport: Arc<dyn Transport>,
    identity: Arc<IdentityCache>,
}

impl Bot {
    pub fn new(registry: Registry, transport: Arc<dyn Transport>) -> Self {
        let identity = Arc::new(IdentityCache::new(Arc::clone(&transport)));
        Self {
            dispatcher: Dispatcher::new(Arc::new(registry), Arc::clone(&identity)),
            transport,
            identity,
        }
    }

    pub fn registry(&self) -> &Registry {
        self.dispatcher.registry()
    }

    pub async fn me(&self, force_refresh: bool) -> BotResult<Identity> {
        self.identity.resolve(force_refresh).await
    }

    /// Process one decoded webhook body: dispatch it, then send the action
    /// the matched handler returned followed by everything handlers queued.
    pub async fn handle(&self, raw: Value) -> BotResult<DispatchReport> {
        let update = InboundUpdate::from_value(raw)?;
        Ok(self.process(&update).await)
    }

    pub async fn process(&self, update: &InboundUpdate) -> DispatchReport {
        let mut report = DispatchReport::new(update.raw().clone());

        let ctx = RequestContext::new(update, self.registry());
        let returned = self.dispatcher.dispatch_in(&ctx).await;
        let actions: Vec<OutboundAction> = returned.into_iter().chain(ctx.into_queued()).collect();

        if actions.is_empty() {
            info!("Update {}: no handler matched", update.update_id());
        }
        for action in &actions {
            info!(
                "Update {}: sending {}",
                update.update_id(),
                action.method()
            );
            if let Err(e) = self.send(action, &mut report).await {
                error!("Failed to send {}: {}", action.method(), e);
            }
        }

        report
    }

    /// Send an action and record it. Transport failures are returned
    /// unchanged after being noted in the report.
    pub async fn send(
        &self,
        action: &OutboundAction,
        report: &mut DispatchReport,
    ) -> BotResult<Value> {
        let payload = Value::Object(action.payload().clone());
        let outcome = self.transport.call(action.method(), action.payload()).await;

        let result = match &outcome {
            Ok(result) => {
                if result.get("ok").and_then(Value::as_bool) == Some(false) {
                    warn!("{} was rejected: {}", action.method(), result);
                }
                result.clone()
            }
            Err(e) => Value::String(format!("{:#}", e)),
        };
        report.responses.push(SentResponse {
            method: action.method().to_string(),
            response: payload,
            result,
        });

        outcome.map_err(BotError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::OutboundUpdate;
    use crate::platform::mock::MockTransport;
    use crate::registry::RegistryBuilder;
    use serde_json::{json, Map};

    fn bot(transport: Arc<MockTransport>) -> Bot {
        Bot::new(RegistryBuilder::new().build(), transport)
    }

    #[tokio::test]
    async fn test_handle_sends_and_records() {
        let transport = Arc::new(MockTransport::new());
        let bot = bot(transport.clone());
        let request = json!({
            "update_id": 1,
            "message": {"message_id": 9, "chat": {"id": 5, "type": "private"}, "text": "/help"}
        });

        let report = bot.handle(request.clone()).await.unwrap();
        assert_eq!(report.request, request);
        assert_eq!(report.responses.len(), 1);

        let sent = &report.responses[0];
        assert_eq!(sent.method, "sendMessage");
        assert_eq!(sent.response["chat_id"], json!(5));
        assert_eq!(sent.result, json!({"ok": true, "result": {"message_id": 1}}));

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "sendMessage");
    }

    #[tokio::test]
    async fn test_handle_without_match_sends_nothing() {
        let transport = Arc::new(MockTransport::new());
        let bot = bot(transport.clone());

        let report = bot.handle(json!({"update_id": 2})).await.unwrap();
        assert!(report.responses.is_empty());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_handle_rejects_malformed_input() {
        let bot = bot(Arc::new(MockTransport::new()));
        assert!(matches!(
            bot.handle(Value::Null).await,
            Err(BotError::MalformedInput(_))
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_is_recorded() {
        let bot = bot(Arc::new(MockTransport::failing()));
        let request = json!({
            "message": {"message_id": 9, "chat": {"id": 5, "type": "private"}, "text": "/help"}
        });

        let report = bot.handle(request).await.unwrap();
        assert_eq!(report.responses.len(), 1);
        assert_eq!(report.responses[0].result, json!("connection refused"));
    }

    #[tokio::test]
    async fn test_send_returns_platform_result() {
        let transport = Arc::new(MockTransport::new().respond(
            "sendMessage",
            json!({"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}),
        ));
        let bot = bot(transport);
        let mut report = DispatchReport::new(json!({}));
        let mut payload = Map::new();
        payload.insert("chat_id".into(), json!(1));

        let result = bot
            .send(&OutboundAction::new("sendMessage", payload), &mut report)
            .await
            .unwrap();
        assert_eq!(result["error_code"], json!(400));
        assert_eq!(report.responses[0].result, result);
    }

    fn notify_twice(ctx: &RequestContext<'_>) -> crate::registry::HandlerResult {
        let Some(scope) = ctx.scope() else {
            return Ok(None);
        };
        for text in ["first", "second"] {
            let mut fields = Map::new();
            fields.insert("text".into(), json!(text));
            ctx.send(OutboundUpdate::fields(fields), &scope)?;
        }
        Ok(None)
    }

    #[tokio::test]
    async fn test_handler_queued_sends_are_recorded() {
        let transport = Arc::new(MockTransport::new());
        let registry = RegistryBuilder::new()
            .command("notify", "Two messages", notify_twice)
            .build();
        let bot = Bot::new(registry, transport.clone());
        let request = json!({
            "message": {"message_id": 9, "chat": {"id": 5, "type": "private"}, "text": "/notify"}
        });

        let report = bot.handle(request).await.unwrap();
        assert_eq!(report.responses.len(), 2);
        assert_eq!(report.responses[0].response["text"], json!("first"));
        assert_eq!(report.responses[1].response["text"], json!("second"));
        assert_eq!(transport.count("sendMessage"), 2);
    }

    #[tokio::test]
    async fn test_returned_action_goes_before_queued() {
        let transport = Arc::new(MockTransport::new());
        let registry = RegistryBuilder::new()
            .command("both", "Answer and queue", |ctx: &RequestContext<'_>| {
                let scope = ctx.scope().expect("message update");
                let mut fields = Map::new();
                fields.insert("text".into(), json!("queued"));
                ctx.send(OutboundUpdate::fields(fields), &scope)?;
                OutboundAction::text(ctx.update, "returned").map(Some)
            })
            .build();
        let bot = Bot::new(registry, transport);
        let request = json!({
            "message": {"message_id": 9, "chat": {"id": 5, "type": "private"}, "text": "/both"}
        });

        let report = bot.handle(request).await.unwrap();
        let texts: Vec<_> = report.responses.iter().map(|r| r.response["text"].clone()).collect();
        assert_eq!(texts, vec![json!("returned"), json!("queued")]);
    }

    #[tokio::test]
    async fn test_me_is_cached() {
        let transport = Arc::new(MockTransport::with_username("hook_bot"));
        let bot = bot(transport.clone());

        assert_eq!(bot.me(false).await.unwrap().username.as_deref(), Some("hook_bot"));
        bot.me(false).await.unwrap();
        assert_eq!(transport.count("getMe"), 1);
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let report = DispatchReport::new(json!({"update_id": 3}));
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["request"], json!({"update_id": 3}));
        assert_eq!(value["responses"], json!([]));
        assert!(value["received_at"].is_string());
    }
}
