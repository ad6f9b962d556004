//! Selects the one handler that answers an update.
//!
//! Kinds are tried in [`DISPATCH_ORDER`]. Within a kind at most one entry is
//! invoked; the first kind whose handler yields an action wins. A handler
//! that yields nothing, or fails, hands the update on to the next kind.

use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use regex::Regex;
use tracing::{debug, warn};

use crate::error::BotResult;
use crate::identity::IdentityCache;
use crate::outbound::{self, ChatScope, OutboundUpdate};
use crate::registry::{Entry, HandlerKind, Registry};
use crate::response::OutboundAction;
use crate::update::InboundUpdate;

pub const DISPATCH_ORDER: [HandlerKind; 3] =
    [HandlerKind::Command, HandlerKind::Keyword, HandlerKind::Inline];

/// Inline entry used when no name matches the query.
pub const DEFAULT_INLINE: &str = "default";

static INLINE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+").expect("inline token pattern must compile"));

/// Everything a handler callback may look at for the current request.
///
/// Besides returning an action, a handler may queue any number of extra
/// sends here; they go out after the returned action, in queue order.
pub struct RequestContext<'a> {
    pub update: &'a InboundUpdate,
    pub registry: &'a Registry,
    outbox: Mutex<Vec<OutboundAction>>,
}

impl<'a> RequestContext<'a> {
    pub fn new(update: &'a InboundUpdate, registry: &'a Registry) -> Self {
        Self {
            update,
            registry,
            outbox: Mutex::new(Vec::new()),
        }
    }

    /// Scope of the message being handled, if the update carries one.
    pub fn scope(&self) -> Option<ChatScope> {
        self.update.message().map(ChatScope::from)
    }

    pub fn queue(&self, action: OutboundAction) {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(action);
    }

    /// Queue [`outbound::send`] for the given scope.
    pub fn send(&self, update: impl Into<OutboundUpdate>, scope: &ChatScope) -> BotResult<()> {
        self.queue(outbound::send(update.into(), scope)?);
        Ok(())
    }

    /// Queue [`outbound::reply`] for the given scope.
    pub fn reply(
        &self,
        update: impl Into<OutboundUpdate>,
        scope: &ChatScope,
        reply_to: Option<i64>,
    ) -> BotResult<()> {
        self.queue(outbound::reply(update.into(), scope, reply_to)?);
        Ok(())
    }

    /// Queue [`outbound::auto`] for the given scope.
    pub fn auto(&self, update: impl Into<OutboundUpdate>, scope: &ChatScope) -> BotResult<()> {
        self.queue(outbound::auto(update.into(), scope)?);
        Ok(())
    }

    /// Everything queued so far, oldest first.
    pub fn into_queued(self) -> Vec<OutboundAction> {
        self.outbox
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct Dispatcher {
    registry: Arc<Registry>,
    identity: Arc<IdentityCache>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, identity: Arc<IdentityCache>) -> Self {
        Self { registry, identity }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Dispatch with a throwaway context; anything a handler queues is
    /// dropped. Use [`Dispatcher::dispatch_in`] to keep queued sends.
    pub async fn dispatch(&self, update: &InboundUpdate) -> Option<OutboundAction> {
        let ctx = RequestContext::new(update, &self.registry);
        self.dispatch_in(&ctx).await
    }

    pub async fn dispatch_in(&self, ctx: &RequestContext<'_>) -> Option<OutboundAction> {
        let update = ctx.update;

        for kind in DISPATCH_ORDER {
            let entry = match kind {
                HandlerKind::Command => self.match_command(ctx).await,
                HandlerKind::Keyword => match_keyword(ctx),
                HandlerKind::Inline => match_inline(ctx),
            };
            let Some(entry) = entry else {
                continue;
            };

            debug!("Update {} matched {} '{}'", update.update_id(), kind, entry.name);
            match entry.call(ctx) {
                Ok(Some(action)) => return Some(action),
                Ok(None) => debug!("{} '{}' produced no action", kind, entry.name),
                Err(e) => warn!("{} '{}' failed: {}", kind, entry.name, e),
            }
        }

        debug!("No handler answered update {}", update.update_id());
        None
    }

    async fn match_command<'a>(&self, ctx: &RequestContext<'a>) -> Option<&'a Entry> {
        let command = ctx.update.command().filter(|c| c.valid)?;
        let entry = ctx.registry.get(HandlerKind::Command, &command.name)?;

        if command.is_addressed() {
            match self.identity.resolve(false).await {
                Ok(me) if me.is_addressed_by(&command.bot) => {}
                Ok(_) => {
                    debug!("/{} is addressed to @{}, not to us", command.name, command.bot);
                    return None;
                }
                Err(e) => {
                    warn!("Could not resolve bot identity: {}", e);
                    return None;
                }
            }
        }

        Some(entry)
    }
}

fn match_keyword<'a>(ctx: &RequestContext<'a>) -> Option<&'a Entry> {
    let text = ctx.update.text()?.to_lowercase();
    ctx.registry
        .entries(HandlerKind::Keyword)
        .iter()
        .find(|entry| text.contains(&entry.name.to_lowercase()))
}

fn match_inline<'a>(ctx: &RequestContext<'a>) -> Option<&'a Entry> {
    let query = ctx.update.inline_query()?;
    let token = INLINE_TOKEN_RE
        .find(&query.query)
        .map(|m| m.as_str())
        .unwrap_or_default();

    ctx.registry
        .entries(HandlerKind::Inline)
        .iter()
        .find(|entry| !token.is_empty() && entry.name.to_lowercase() == token.to_lowercase())
        .or_else(|| ctx.registry.get(HandlerKind::Inline, DEFAULT_INLINE))
}
