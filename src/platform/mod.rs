pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Sends one Bot API call and returns the decoded platform response.
///
/// Implementations hand back whatever the platform answered, error bodies
/// included. Only failures to get an answer at all are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, method: &str, payload: &Map<String, Value>) -> Result<Value>;
}
