//! Webhook endpoint. Each POST is one update; the dispatch report is the
//! response body.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, warn};

use crate::bot::{Bot, DispatchReport};
use crate::config::ServerConfig;
use crate::error::BotError;
use crate::update::InboundUpdate;

pub fn router(bot: Arc<Bot>, webhook_path: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(webhook_path, post(webhook))
        .with_state(bot)
}

pub async fn serve(bot: Arc<Bot>, config: &ServerConfig) -> Result<()> {
    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Listening for updates on http://{}{}", addr, config.webhook_path);

    axum::serve(listener, router(bot, &config.webhook_path))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn webhook(
    State(bot): State<Arc<Bot>>,
    body: Bytes,
) -> Result<Json<DispatchReport>, (StatusCode, String)> {
    let update = InboundUpdate::from_slice(&body).map_err(reject)?;
    Ok(Json(bot.process(&update).await))
}

fn reject(e: BotError) -> (StatusCode, String) {
    warn!("Rejected webhook request: {}", e);
    (StatusCode::BAD_REQUEST, e.to_string())
}
