use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Log message with priority.
enum LogMessage {
    /// High priority (WARN/ERROR) - send immediately
    Urgent(String),
    /// Low priority (INFO) - batch and send periodically
    Info(String),
}

/// Forwards log lines to a Telegram chat.
///
/// Posts through its own bare HTTP call and reports its own failures with
/// eprintln, so a failed send can never re-enter the subscriber.
pub struct TelegramLogLayer {
    tx: mpsc::UnboundedSender<LogMessage>,
}

impl TelegramLogLayer {
    pub fn new(bot_token: &str, chat_id: String) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<LogMessage>();
        let url = format!("https://api.telegram.org/bot{bot_token}/sendMessage");
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        tokio::spawn(async move {
            let mut info_buffer: Vec<String> = Vec::new();
            let mut interval = tokio::time::interval(Duration::from_secs(5));

            loop {
                tokio::select! {
                    msg = rx.recv() => {
                        match msg {
                            Some(LogMessage::Urgent(text)) => {
                                // Send WARN/ERROR immediately
                                send_log(&http, &url, &chat_id, &text).await;
                            }
                            Some(LogMessage::Info(text)) => {
                                // Buffer INFO logs
                                info_buffer.push(text);
                                // If buffer gets too large, flush early
                                if info_buffer.len() >= 50 {
                                    flush_buffer(&http, &url, &chat_id, &mut info_buffer).await;
                                }
                            }
                            None => break,
                        }
                    }
                    _ = interval.tick() => {
                        // Periodic flush of INFO buffer
                        if !info_buffer.is_empty() {
                            flush_buffer(&http, &url, &chat_id, &mut info_buffer).await;
                        }
                    }
                }
            }
        });

        Self { tx }
    }
}

async fn send_log(http: &reqwest::Client, url: &str, chat_id: &str, text: &str) {
    let text = if text.len() > 4000 {
        let truncated: String = text.chars().take(4000).collect();
        format!("{}...", truncated)
    } else {
        text.to_string()
    };

    let body = json!({ "chat_id": chat_id, "text": text });
    match http.post(url).json(&body).send().await {
        Ok(response) if !response.status().is_success() => {
            eprintln!("Failed to send log to Telegram: HTTP {}", response.status());
        }
        Ok(_) => {}
        Err(e) => eprintln!("Failed to send log to Telegram: {e}"),
    }
}

async fn flush_buffer(http: &reqwest::Client, url: &str, chat_id: &str, buffer: &mut Vec<String>) {
    if buffer.is_empty() {
        return;
    }
    // Join all messages with newlines
    let combined = buffer.join("\n");
    buffer.clear();
    send_log(http, url, chat_id, &combined).await;
}

struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else if self.message.is_empty() {
            self.message = format!("{} = {:?}", field.name(), value);
        } else {
            self.message
                .push_str(&format!(", {} = {:?}", field.name(), value));
        }
    }
}

impl<S: Subscriber> Layer<S> for TelegramLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();

        // Only send INFO, WARN, ERROR to Telegram
        if level > Level::INFO {
            return;
        }

        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);

        // Add emoji prefix for WARN/ERROR levels
        let msg = match level {
            Level::ERROR => LogMessage::Urgent(format!("❌ {}", visitor.message)),
            Level::WARN => LogMessage::Urgent(format!("⚠️ {}", visitor.message)),
            _ => LogMessage::Info(visitor.message),
        };

        if self.tx.send(msg).is_err() {
            eprintln!("Log channel closed, message dropped");
        }
    }
}
