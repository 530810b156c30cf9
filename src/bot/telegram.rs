//! Telegram Bot API client over plain HTTP.
//!
//! Send operations collapse transport and API failures into a boolean:
//! the failure is logged and the caller only learns that the send did not
//! happen. There is no retry.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::bot::models::{Route, TrafficReport};

pub struct TelegramClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug)]
pub enum TelegramError {
    Http(String),
    Api(String),
    Parse(String),
}

impl std::fmt::Display for TelegramError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelegramError::Http(e) => write!(f, "HTTP error: {e}"),
            TelegramError::Api(e) => write!(f, "API error: {e}"),
            TelegramError::Parse(e) => write!(f, "Parse error: {e}"),
        }
    }
}

impl std::error::Error for TelegramError {}

/// One entry from getUpdates.
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Incoming>,
}

/// An incoming chat message. Only the fields the service reads are kept;
/// serde drops the rest of the Bot API payload.
#[derive(Debug, Deserialize)]
pub struct Incoming {
    pub message_id: i64,
    pub from: Option<Sender>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Sender {
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
    description: Option<String>,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            base_url: format!("https://api.telegram.org/bot{token}"),
            http,
        }
    }

    /// Send a message. Extra Bot API parameters (e.g. a reply keyboard)
    /// are merged into the request body.
    pub async fn send_message(&self, chat_id: &str, text: &str, options: Option<Value>) -> bool {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let (Value::Object(map), Some(Value::Object(extra))) = (&mut body, options) {
            for (key, value) in extra {
                map.insert(key, value);
            }
        }

        match self
            .http
            .post(format!("{}/sendMessage", self.base_url))
            .json(&body)
            .send()
            .await
        {
            Ok(response) => {
                let ok = response.status().is_success();
                if !ok {
                    warn!("sendMessage to {} failed: HTTP {}", chat_id, response.status());
                }
                ok
            }
            Err(e) => {
                warn!("sendMessage to {} failed: {e}", chat_id);
                false
            }
        }
    }

    /// Send current reports, one block per report in input order.
    pub async fn send_traffic_update(&self, chat_id: &str, reports: &[TrafficReport]) -> bool {
        self.send_message(chat_id, &format_traffic_update(reports), None).await
    }

    pub async fn send_route_recommendation(&self, chat_id: &str, route: &Route) -> bool {
        self.send_message(chat_id, &format_route_recommendation(route), None).await
    }

    pub async fn send_notification(&self, chat_id: &str, title: &str, body: &str) -> bool {
        self.send_message(chat_id, &format_notification(title, body), None).await
    }

    /// Register a webhook URL. Long polling stops working while one is set.
    pub async fn set_webhook(&self, url: &str) -> bool {
        match self
            .http
            .post(format!("{}/setWebhook", self.base_url))
            .json(&json!({ "url": url }))
            .send()
            .await
        {
            Ok(response) => {
                let ok = response.status().is_success();
                if !ok {
                    warn!("setWebhook failed: HTTP {}", response.status());
                }
                ok
            }
            Err(e) => {
                warn!("setWebhook failed: {e}");
                false
            }
        }
    }

    /// Long-poll for new updates starting at `offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, TelegramError> {
        let body = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });

        let response = self
            .http
            .post(format!("{}/getUpdates", self.base_url))
            // Must outlive the server-side long-poll window
            .timeout(Duration::from_secs(timeout_secs + 10))
            .json(&body)
            .send()
            .await
            .map_err(|e| TelegramError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TelegramError::Api(format!("{status}: {body}")));
        }

        let parsed: UpdatesResponse = response
            .json()
            .await
            .map_err(|e| TelegramError::Parse(e.to_string()))?;

        if !parsed.ok {
            return Err(TelegramError::Api(
                parsed.description.unwrap_or_else(|| "getUpdates not ok".to_string()),
            ));
        }

        Ok(parsed.result)
    }
}

/// Build a `reply_markup` options object from rows of (label, callback_data).
pub fn inline_keyboard(rows: &[&[(&str, &str)]]) -> Value {
    let keyboard: Vec<Vec<Value>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|(text, data)| json!({ "text": text, "callback_data": data }))
                .collect()
        })
        .collect();

    json!({ "reply_markup": { "inline_keyboard": keyboard } })
}

/// The standard quick-action keyboard offered with help replies.
pub fn quick_replies() -> Value {
    inline_keyboard(&[
        &[("🚦 Traffic Status", "traffic_status"), ("🗺️ Plan Route", "plan_route")],
        &[("🔔 Notifications", "notifications"), ("📍 Set Location", "set_location")],
        &[("📢 Report Issue", "report_issue"), ("⚙️ Settings", "settings")],
    ])
}

fn format_traffic_update(reports: &[TrafficReport]) -> String {
    let mut message = String::from("🚦 <b>Traffic Update</b>\n\n");

    for report in reports {
        message.push_str(&format!("{} <b>{}</b>\n", report.kind.icon(), report.location));
        message.push_str(&format!("   {}\n", report.description));
        message.push_str(&format!("   Severity: {}\n\n", report.severity.as_str().to_uppercase()));
    }

    message
}

fn format_route_recommendation(route: &Route) -> String {
    let mut message = String::from("🗺️ <b>Route Recommendation</b>\n\n");
    message.push_str(&format!("📍 From: {}\n", route.from));
    message.push_str(&format!("📍 To: {}\n", route.to));
    message.push_str(&format!("🚗 Distance: {} km\n", route.distance));
    message.push_str(&format!("⏱️ Duration: {} min\n", route.duration));

    if route.traffic_delay > 0 {
        message.push_str(&format!("⚠️ Traffic delay: +{} min\n", route.traffic_delay));
    }

    if !route.alternatives.is_empty() {
        message.push_str("\n🔀 <b>Alternative Routes:</b>\n");
        for (index, alt) in route.alternatives.iter().enumerate() {
            message.push_str(&format!(
                "{}. {} - {} min ({} traffic)\n",
                index + 1,
                alt.name,
                alt.duration,
                alt.condition.as_str()
            ));
        }
    }

    message
}

fn format_notification(title: &str, body: &str) -> String {
    format!("🔔 <b>{title}</b>\n\n{body}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::models::{AlternativeRoute, ReportKind, ReportStatus, Severity, TrafficCondition};
    use chrono::Utc;

    fn report(kind: ReportKind, location: &str) -> TrafficReport {
        TrafficReport {
            id: "r1".into(),
            kind,
            location: location.into(),
            description: "slow going".into(),
            severity: Severity::Medium,
            timestamp: Utc::now(),
            reported_by: "42".into(),
            status: ReportStatus::Active,
        }
    }

    fn route() -> Route {
        Route {
            id: "route-1".into(),
            from: "Downtown".into(),
            to: "Airport".into(),
            distance: 18.5,
            duration: 25,
            traffic_delay: 0,
            waypoints: Vec::new(),
            alternatives: Vec::new(),
        }
    }

    #[test]
    fn test_traffic_update_icons_and_order() {
        let reports = vec![
            report(ReportKind::Accident, "Highway 1"),
            report(ReportKind::Construction, "Main Street"),
            report(ReportKind::RoadClosure, "5th Avenue"),
        ];
        let message = format_traffic_update(&reports);

        assert!(message.starts_with("🚦 <b>Traffic Update</b>\n\n"));
        assert!(message.contains("🚨 <b>Highway 1</b>"));
        assert!(message.contains("🚧 <b>Main Street</b>"));
        assert!(message.contains("🚫 <b>5th Avenue</b>"));
        assert!(message.contains("Severity: MEDIUM"));
        // Input order preserved
        let first = message.find("Highway 1").unwrap();
        let second = message.find("Main Street").unwrap();
        let third = message.find("5th Avenue").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn test_route_without_delay_omits_delay_line() {
        let message = format_route_recommendation(&route());
        assert!(message.contains("📍 From: Downtown"));
        assert!(message.contains("📍 To: Airport"));
        assert!(message.contains("🚗 Distance: 18.5 km"));
        assert!(message.contains("⏱️ Duration: 25 min"));
        assert!(!message.contains("Traffic delay"));
        assert!(!message.contains("Alternative Routes"));
    }

    #[test]
    fn test_route_with_delay_includes_delay_line() {
        let mut r = route();
        r.traffic_delay = 12;
        let message = format_route_recommendation(&r);
        assert!(message.contains("⚠️ Traffic delay: +12 min"));
    }

    #[test]
    fn test_route_alternatives_numbered() {
        let mut r = route();
        r.alternatives = vec![
            AlternativeRoute {
                name: "Coastal Road".into(),
                duration: 32,
                distance: 21.0,
                condition: TrafficCondition::Light,
            },
            AlternativeRoute {
                name: "Tunnel".into(),
                duration: 28,
                distance: 17.0,
                condition: TrafficCondition::Heavy,
            },
        ];
        let message = format_route_recommendation(&r);
        assert!(message.contains("🔀 <b>Alternative Routes:</b>"));
        assert!(message.contains("1. Coastal Road - 32 min (light traffic)"));
        assert!(message.contains("2. Tunnel - 28 min (heavy traffic)"));
    }

    #[test]
    fn test_notification_bold_title() {
        let message = format_notification("Road closed", "Use the detour via Oak St.");
        assert_eq!(message, "🔔 <b>Road closed</b>\n\nUse the detour via Oak St.");
    }

    #[test]
    fn test_quick_replies_shape() {
        let options = quick_replies();
        let keyboard = &options["reply_markup"]["inline_keyboard"];
        assert_eq!(keyboard.as_array().unwrap().len(), 3);
        assert_eq!(keyboard[0][0]["callback_data"], "traffic_status");
        assert_eq!(keyboard[2][1]["text"], "⚙️ Settings");
    }
}
