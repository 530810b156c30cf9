mod bot;
mod config;
mod telegram_log;

use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use bot::{Engine, FirestoreClient, TelegramClient};
use config::Config;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "trafficbot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("trafficbot.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    if let Some(ref log_chat_id) = config.log_chat_id {
        let tg_layer =
            telegram_log::TelegramLogLayer::new(&config.telegram_bot_token, log_chat_id.clone());
        registry.with(tg_layer).init();
    } else {
        registry.init();
    }

    info!("🚀 Starting trafficbot...");
    info!("Loaded config from {config_path}");
    if config.dry_run {
        info!("DRY RUN mode enabled");
    }

    let telegram = TelegramClient::new(&config.telegram_bot_token);
    let store = FirestoreClient::new(&config.firestore_project_id);

    // Webhook registration is a one-shot mode: the Bot API stops serving
    // getUpdates while a webhook is set, so we don't poll afterwards.
    if let Some(ref webhook_url) = config.webhook_url {
        if telegram.set_webhook(webhook_url).await {
            info!("Webhook registered: {webhook_url}");
        } else {
            warn!("Webhook registration failed: {webhook_url}");
            std::process::exit(1);
        }
        return;
    }

    let mut engine = Engine::new(config, telegram, store);
    engine.run().await;
}
