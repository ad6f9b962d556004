use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hookbot::config::Config;
use hookbot::platform::telegram::HttpTransport;
use hookbot::{handlers, server, Bot, InboundUpdate, RegistryBuilder};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdin mode keeps stdout for the report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hookbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let stdin_mode = args.iter().any(|a| a == "--stdin");
    let config_path = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  API: {}", config.telegram.api_base_url);
    info!("  Webhook: {}{}", config.server.bind, config.server.webhook_path);

    let transport = Arc::new(HttpTransport::new(&config.telegram)?);
    let registry = handlers::register_defaults(RegistryBuilder::new()).build();
    let bot = Arc::new(Bot::new(registry, transport));

    if stdin_mode {
        let mut body = Vec::new();
        std::io::stdin()
            .read_to_end(&mut body)
            .context("Failed to read update from stdin")?;
        let update = InboundUpdate::from_slice(&body)?;
        let report = bot.process(&update).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    info!("Bot is starting...");
    server::serve(bot, &config.server).await?;

    Ok(())
}
