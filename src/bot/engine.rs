//! Service loop: poll Telegram, classify, reply, record.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::bot::message::{Conversation, MessageKind};
use crate::bot::models::{AdminStats, ReportKind, ReportStatus, Route, Severity, TrafficReport, User};
use crate::bot::responder::Intent;
use crate::bot::store::FirestoreClient;
use crate::bot::telegram::{self, Incoming, Sender, TelegramClient};
use crate::config::Config;

/// Pause after a failed poll before retrying.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// The traffic assistant service.
///
/// Holds the two API clients (built from injected config, no globals) and
/// one conversation per chat. Every network call is attempted exactly once;
/// failures are logged and the loop moves on.
pub struct Engine {
    config: Config,
    telegram: TelegramClient,
    store: FirestoreClient,
    conversations: HashMap<String, Conversation>,
}

impl Engine {
    pub fn new(config: Config, telegram: TelegramClient, store: FirestoreClient) -> Self {
        Self {
            config,
            telegram,
            store,
            conversations: HashMap::new(),
        }
    }

    pub async fn run(&mut self) {
        info!("🚦 Engine started (poll timeout: {}s)", self.config.poll_timeout_secs);
        self.notify_admin_restart().await;

        let mut offset = 0i64;
        loop {
            let updates = match self
                .telegram
                .get_updates(offset, self.config.poll_timeout_secs)
                .await
            {
                Ok(updates) => updates,
                Err(e) => {
                    warn!("getUpdates failed: {e}");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                if let Some(message) = update.message {
                    self.handle_message(message).await;
                }
            }
        }
    }

    /// Restart ping to the admin chat, with the dashboard snapshot.
    async fn notify_admin_restart(&self) {
        let Some(ref admin) = self.config.admin_chat_id else {
            return;
        };
        let body = format!(
            "Service restarted and polling for updates.\n\n{}",
            AdminStats::demo().summary()
        );
        if self.config.dry_run {
            info!("[DRY RUN] Would notify admin {admin} about restart");
        } else {
            self.telegram.send_notification(admin, "Traffic Assistant", &body).await;
        }
    }

    async fn handle_message(&mut self, incoming: Incoming) {
        let Some(text) = incoming.text else {
            return;
        };
        let chat_id = incoming.chat.id.to_string();

        let preview: String = text.chars().take(100).collect();
        let intent = Intent::of(&text);
        info!("📨 Message from {chat_id}: \"{preview}\" → {intent:?}");

        self.touch_user(&chat_id, incoming.from.as_ref()).await;

        let reply_text = {
            let convo = self.conversations.entry(chat_id.clone()).or_default();
            let reply = convo.reply_to(&text);
            debug!(
                "🤖 Reply {} ({}, bot={}) at {}",
                reply.id,
                reply.kind.map(MessageKind::as_str).unwrap_or("untagged"),
                reply.is_bot,
                reply.timestamp
            );
            let reply_text = reply.text.clone();
            debug!("💬 Conversation with {chat_id} now has {} message(s)", convo.messages().len());
            reply_text
        };

        // Help replies carry the quick-action keyboard
        let options = (intent == Intent::Help).then(telegram::quick_replies);

        if self.config.dry_run {
            info!("[DRY RUN] Would reply to {chat_id} with {intent:?} response");
        } else {
            self.telegram.send_message(&chat_id, &reply_text, options).await;
        }

        match intent {
            Intent::Traffic => self.send_live_reports(&chat_id).await,
            Intent::Route => self.send_route_demo(&chat_id).await,
            Intent::Report => self.record_report(&chat_id, incoming.message_id, &text).await,
            _ => {}
        }
    }

    /// Follow a traffic reply with currently active community reports.
    async fn send_live_reports(&self, chat_id: &str) {
        let reports = self.store.get_active_traffic_reports().await;
        if reports.is_empty() {
            return;
        }

        if self.config.dry_run {
            info!("[DRY RUN] Would send {} active report(s) to {chat_id}", reports.len());
        } else {
            self.telegram.send_traffic_update(chat_id, &reports).await;
        }
    }

    /// Follow a route reply with a worked example.
    async fn send_route_demo(&self, chat_id: &str) {
        let route = Route::sample();
        info!(
            "🗺️ Sending demo route {} ({} waypoints) to {chat_id}",
            route.id,
            route.waypoints.len()
        );
        if self.config.dry_run {
            info!("[DRY RUN] Would send route recommendation to {chat_id}");
        } else {
            self.telegram.send_route_recommendation(chat_id, &route).await;
        }
    }

    /// Record a community report built from the message text.
    async fn record_report(&self, chat_id: &str, message_id: i64, text: &str) {
        let report = TrafficReport {
            id: format!("{chat_id}-{message_id}"),
            kind: ReportKind::from_text(text),
            location: "unspecified".to_string(),
            description: text.to_string(),
            severity: Severity::Medium,
            timestamp: Utc::now(),
            reported_by: chat_id.to_string(),
            status: ReportStatus::Active,
        };

        if self.config.dry_run {
            info!("[DRY RUN] Would record report {}", report.id);
            return;
        }
        if self.store.save_traffic_report(&report).await {
            info!("📢 Recorded report {} ({})", report.id, report.kind.as_str());
        }

        // "Shared with other users": alert everyone registered near the
        // location who wants notifications.
        let nearby = self.store.get_users_by_location(&report.location).await;
        for user in &nearby {
            if user.preferences.notifications {
                self.telegram
                    .send_notification(&user.chat_id, "Traffic alert", &report.description)
                    .await;
            }
        }
    }

    /// Create the user record on first contact, otherwise bump last_active.
    /// The stored chat id is never rewritten.
    async fn touch_user(&self, chat_id: &str, sender: Option<&Sender>) {
        let now = Utc::now();

        let mut user = match self.store.get_user(chat_id).await {
            Ok(Some(existing)) => existing,
            Ok(None) => {
                info!("👋 New user {chat_id}");
                let mut user = User::new(chat_id.to_string(), now);
                if let Some(sender) = sender {
                    user.first_name = Some(sender.first_name.clone()).filter(|n| !n.is_empty());
                    user.last_name = sender.last_name.clone();
                    user.username = sender.username.clone();
                }
                user
            }
            Err(e) => {
                warn!("Failed to look up user {chat_id}: {e}");
                return;
            }
        };

        user.last_active = now;

        if self.config.dry_run {
            debug!("[DRY RUN] Would save user {chat_id}");
            return;
        }
        self.store.save_user(&user).await;
    }
}
