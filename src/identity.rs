use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{BotError, BotResult};
use crate::platform::Transport;

const GET_ME: &str = "getMe";

/// The bot's own account, as reported by `getMe`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Identity {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl Identity {
    /// Whether a `/cmd@name` suffix addresses this bot.
    pub fn is_addressed_by(&self, suffix: &str) -> bool {
        // Platform usernames are case-insensitive.
        self.username
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(suffix))
    }
}

/// Process-wide cache of the bot identity.
///
/// The lock is held across the `getMe` call so that a refresh and a
/// concurrent read never interleave.
pub struct IdentityCache {
    transport: Arc<dyn Transport>,
    cached: Mutex<Option<Identity>>,
}

impl IdentityCache {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            cached: Mutex::new(None),
        }
    }

    /// Fetch on first use, or always when `force_refresh` is set.
    pub async fn resolve(&self, force_refresh: bool) -> BotResult<Identity> {
        let mut cached = self.cached.lock().await;
        if !force_refresh {
            if let Some(identity) = cached.as_ref() {
                return Ok(identity.clone());
            }
        }

        debug!("Fetching bot identity");
        let response = self.transport.call(GET_ME, &Map::new()).await?;
        let identity: Identity = decode_result(GET_ME, response)?;
        info!(
            "Bot identity: @{} ({})",
            identity.username.as_deref().unwrap_or("?"),
            identity.id
        );

        *cached = Some(identity.clone());
        Ok(identity)
    }

    pub async fn cached(&self) -> Option<Identity> {
        self.cached.lock().await.clone()
    }
}

/// Unwrap a `{"ok": ..., "result": ...}` Bot API envelope.
pub fn decode_result<T: serde::de::DeserializeOwned>(method: &str, response: Value) -> BotResult<T> {
    let api_error = |description: String| BotError::Api {
        method: method.to_string(),
        description,
    };

    if response.get("ok").and_then(Value::as_bool) != Some(true) {
        let description = response
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("request was not successful")
            .to_string();
        return Err(api_error(description));
    }

    let result = response
        .get("result")
        .cloned()
        .ok_or_else(|| api_error("response has no result".to_string()))?;
    serde_json::from_value(result).map_err(|e| api_error(e.to_string()))
}
