//! Domain types shared by the responder, the Telegram client and the store.

use chrono::{DateTime, Utc};

/// Category of a traffic report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Accident,
    Construction,
    HeavyTraffic,
    RoadClosure,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Accident => "accident",
            ReportKind::Construction => "construction",
            ReportKind::HeavyTraffic => "heavy_traffic",
            ReportKind::RoadClosure => "road_closure",
        }
    }

    /// Parse a stored wire value. Unknown values are an error at the
    /// decoding layer, not silently defaulted.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "accident" => Some(ReportKind::Accident),
            "construction" => Some(ReportKind::Construction),
            "heavy_traffic" => Some(ReportKind::HeavyTraffic),
            "road_closure" => Some(ReportKind::RoadClosure),
            _ => None,
        }
    }

    /// Icon used when formatting a report for Telegram.
    pub fn icon(self) -> &'static str {
        match self {
            ReportKind::Accident => "🚨",
            ReportKind::Construction => "🚧",
            ReportKind::HeavyTraffic => "🚗",
            ReportKind::RoadClosure => "🚫",
        }
    }

    /// Guess the kind from free-form report text.
    pub fn from_text(text: &str) -> Self {
        let text = text.to_lowercase();
        if text.contains("accident") || text.contains("crash") {
            ReportKind::Accident
        } else if text.contains("construction") || text.contains("roadwork") {
            ReportKind::Construction
        } else if text.contains("closure") || text.contains("closed") {
            ReportKind::RoadClosure
        } else {
            ReportKind::HeavyTraffic
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    Active,
    Resolved,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Active => "active",
            ReportStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ReportStatus::Active),
            "resolved" => Some(ReportStatus::Resolved),
            _ => None,
        }
    }
}

/// A community traffic report.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficReport {
    pub id: String,
    pub kind: ReportKind,
    pub location: String,
    pub description: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub reported_by: String,
    pub status: ReportStatus,
}

impl TrafficReport {
    pub fn is_active(&self) -> bool {
        self.status == ReportStatus::Active
    }

    /// Mark the report resolved. Reports never go back to active.
    #[allow(dead_code)]
    pub fn resolve(&mut self) {
        self.status = ReportStatus::Resolved;
    }
}

/// A registered bot user, keyed by chat id.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Storage key. Never rewritten once the record exists.
    pub chat_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub location: Option<String>,
    pub preferences: UserPreferences,
    pub subscriptions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl User {
    /// Fresh record for a chat seen for the first time.
    pub fn new(chat_id: String, now: DateTime<Utc>) -> Self {
        Self {
            chat_id,
            first_name: None,
            last_name: None,
            username: None,
            location: None,
            preferences: UserPreferences::default(),
            subscriptions: Vec::new(),
            created_at: now,
            last_active: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserPreferences {
    pub notifications: bool,
    pub morning_briefing: bool,
    pub evening_update: bool,
    pub alert_types: Vec<String>,
    pub commute_route: Option<CommuteRoute>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            notifications: true,
            morning_briefing: false,
            evening_update: false,
            alert_types: Vec::new(),
            commute_route: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommuteRoute {
    pub from: String,
    pub to: String,
    pub days: Vec<String>,
    pub times: Vec<String>,
}

/// Traffic load on an alternative route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficCondition {
    Light,
    Moderate,
    Heavy,
}

impl TrafficCondition {
    pub fn as_str(self) -> &'static str {
        match self {
            TrafficCondition::Light => "light",
            TrafficCondition::Moderate => "moderate",
            TrafficCondition::Heavy => "heavy",
        }
    }
}

/// A planned route with current traffic applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: String,
    pub from: String,
    pub to: String,
    /// Kilometers.
    pub distance: f64,
    /// Minutes, without delay.
    pub duration: u32,
    /// Extra minutes caused by current traffic.
    pub traffic_delay: u32,
    pub waypoints: Vec<RoutePoint>,
    pub alternatives: Vec<AlternativeRoute>,
}

impl Route {
    /// Demo recommendation sent until real routing is hooked up.
    pub fn sample() -> Self {
        Self {
            id: "demo-downtown-airport".to_string(),
            from: "Downtown".to_string(),
            to: "Airport".to_string(),
            distance: 18.5,
            duration: 25,
            traffic_delay: 12,
            waypoints: vec![
                RoutePoint { lat: 37.7749, lng: -122.4194, address: "Downtown".to_string() },
                RoutePoint { lat: 37.6213, lng: -122.3790, address: "Airport".to_string() },
            ],
            alternatives: vec![
                AlternativeRoute {
                    name: "Coastal Highway".to_string(),
                    duration: 32,
                    distance: 21.4,
                    condition: TrafficCondition::Light,
                },
                AlternativeRoute {
                    name: "Industrial Parkway".to_string(),
                    duration: 29,
                    distance: 19.8,
                    condition: TrafficCondition::Moderate,
                },
                AlternativeRoute {
                    name: "Express Tunnel".to_string(),
                    duration: 24,
                    distance: 16.9,
                    condition: TrafficCondition::Heavy,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutePoint {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlternativeRoute {
    pub name: String,
    pub duration: u32,
    pub distance: f64,
    pub condition: TrafficCondition,
}

/// Counters shown on the admin dashboard. Static demo values, not derived
/// from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminStats {
    pub active_users: u32,
    pub messages_today: u32,
    pub traffic_reports: u32,
    pub routes_planned: u32,
}

impl AdminStats {
    pub fn demo() -> Self {
        Self {
            active_users: 1234,
            messages_today: 5678,
            traffic_reports: 89,
            routes_planned: 456,
        }
    }

    /// One line per counter, for the admin restart ping.
    pub fn summary(&self) -> String {
        format!(
            "Active users: {}\nMessages today: {}\nTraffic reports: {}\nRoutes planned: {}",
            self.active_users, self.messages_today, self.traffic_reports, self.routes_planned
        )
    }
}
