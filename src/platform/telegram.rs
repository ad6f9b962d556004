use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use super::Transport;
use crate::config::TelegramConfig;

/// Bot API client: `POST {api_base_url}/bot{token}/{method}` with a JSON body.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: format!(
                "{}/bot{}/",
                config.api_base_url.trim_end_matches('/'),
                config.bot_token
            ),
        })
    }

    pub fn method_url(&self, method: &str) -> String {
        format!("{}{}", self.base_url, method)
    }
}

/// Hide the token part of a Bot API URL for logging.
pub fn mask_token(url: &str) -> String {
    let Some(start) = url.find("/bot") else {
        return url.to_string();
    };
    let token_start = start + "/bot".len();
    let token_end = url[token_start..]
        .find('/')
        .map(|pos| token_start + pos)
        .unwrap_or(url.len());
    let token = &url[token_start..token_end];
    let visible: String = token.chars().take(4).collect();
    format!("{}{}***{}", &url[..token_start], visible, &url[token_end..])
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, method: &str, payload: &Map<String, Value>) -> Result<Value> {
        let url = self.method_url(method);
        debug!("Calling Bot API: {}", mask_token(&url));

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", method))?;

        // Error statuses still carry a JSON body describing the failure;
        // it is handed back to the caller as-is.
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to decode {} response ({})", method, status))?;

        debug!("{} answered with status {}", method, status);
        Ok(body)
    }
}
