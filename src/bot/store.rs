//! Firestore REST client for users and traffic reports.
//!
//! Every stored value travels in Firestore's field-wrapper encoding, e.g.
//! `{"stringValue": "x"}` or `{"arrayValue": {"values": [...]}}`.
//! `FieldValue` models the wrapper as a tagged enum whose serde form is
//! exactly the wire form, so an unrecognized wrapper kind fails decoding
//! instead of silently defaulting.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::bot::models::{
    CommuteRoute, ReportKind, ReportStatus, Severity, TrafficReport, User, UserPreferences,
};

/// A Firestore-encoded value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    #[serde(rename = "stringValue")]
    String(String),
    #[serde(rename = "booleanValue")]
    Boolean(bool),
    #[serde(rename = "timestampValue")]
    Timestamp(DateTime<Utc>),
    #[serde(rename = "arrayValue")]
    Array {
        #[serde(default)]
        values: Vec<FieldValue>,
    },
    #[serde(rename = "mapValue")]
    Map {
        #[serde(default)]
        fields: Fields,
    },
}

pub type Fields = BTreeMap<String, FieldValue>;

impl FieldValue {
    fn kind(&self) -> &'static str {
        match self {
            FieldValue::String(_) => "stringValue",
            FieldValue::Boolean(_) => "booleanValue",
            FieldValue::Timestamp(_) => "timestampValue",
            FieldValue::Array { .. } => "arrayValue",
            FieldValue::Map { .. } => "mapValue",
        }
    }

    fn string_array(values: &[String]) -> Self {
        FieldValue::Array {
            values: values.iter().map(|v| FieldValue::String(v.clone())).collect(),
        }
    }
}

/// Errors turning stored fields back into domain types.
#[derive(Debug)]
pub enum DecodeError {
    MissingField(String),
    WrongKind {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    UnknownValue { field: String, value: String },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::MissingField(field) => write!(f, "missing field '{field}'"),
            DecodeError::WrongKind { field, expected, found } => {
                write!(f, "field '{field}': expected {expected}, found {found}")
            }
            DecodeError::UnknownValue { field, value } => {
                write!(f, "field '{field}': unknown value '{value}'")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Debug)]
pub enum StoreError {
    Http(String),
    Status(String),
    Parse(String),
    Decode(DecodeError),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Http(e) => write!(f, "HTTP error: {e}"),
            StoreError::Status(e) => write!(f, "store error: {e}"),
            StoreError::Parse(e) => write!(f, "parse error: {e}"),
            StoreError::Decode(e) => write!(f, "decode error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    fields: Fields,
}

#[derive(Deserialize)]
struct DocumentList {
    #[serde(default)]
    documents: Vec<Document>,
}

/// Document store client. Writes collapse failures into a boolean and log
/// the cause; reads surface a typed error.
pub struct FirestoreClient {
    base_url: String,
    http: reqwest::Client,
}

impl FirestoreClient {
    pub fn new(project_id: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            base_url: format!(
                "https://firestore.googleapis.com/v1/projects/{project_id}/databases/(default)/documents"
            ),
            http,
        }
    }

    /// Upsert a user at `users/{chatId}`. The chat id is both identity and
    /// storage key.
    pub async fn save_user(&self, user: &User) -> bool {
        let url = format!("{}/users/{}", self.base_url, urlencoding::encode(&user.chat_id));
        let body = json!({ "fields": encode_user(user) });

        match self.http.patch(&url).json(&body).send().await {
            Ok(response) => {
                let ok = response.status().is_success();
                if !ok {
                    warn!("Failed to save user {}: HTTP {}", user.chat_id, response.status());
                }
                ok
            }
            Err(e) => {
                warn!("Failed to save user {}: {e}", user.chat_id);
                false
            }
        }
    }

    /// Fetch a user by chat id. A missing document is `Ok(None)`; transport,
    /// server and decode failures are errors.
    pub async fn get_user(&self, chat_id: &str) -> Result<Option<User>, StoreError> {
        let url = format!("{}/users/{}", self.base_url, urlencoding::encode(chat_id));

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StoreError::Status(format!("HTTP {}", response.status())));
        }

        let document: Document = response
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))?;

        decode_user(&document.fields)
            .map(Some)
            .map_err(StoreError::Decode)
    }

    /// Append a report to the `traffic_reports` collection. The store
    /// assigns the document path.
    pub async fn save_traffic_report(&self, report: &TrafficReport) -> bool {
        let url = format!("{}/traffic_reports", self.base_url);
        let body = json!({ "fields": encode_report(report) });

        match self.http.post(&url).json(&body).send().await {
            Ok(response) => {
                let ok = response.status().is_success();
                if !ok {
                    warn!("Failed to save traffic report {}: HTTP {}", report.id, response.status());
                }
                ok
            }
            Err(e) => {
                warn!("Failed to save traffic report {}: {e}", report.id);
                false
            }
        }
    }

    /// Fetch the first 50 stored reports and keep the active ones.
    /// No cursor is followed; reports beyond the first page are invisible.
    pub async fn get_active_traffic_reports(&self) -> Vec<TrafficReport> {
        let url = format!("{}/traffic_reports?pageSize=50", self.base_url);

        let response = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Failed to fetch traffic reports: {e}");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            warn!("Failed to fetch traffic reports: HTTP {}", response.status());
            return Vec::new();
        }

        let list: DocumentList = match response.json().await {
            Ok(l) => l,
            Err(e) => {
                warn!("Failed to parse traffic report list: {e}");
                return Vec::new();
            }
        };

        active_reports(list.documents)
    }

    /// Declared contract only: the structured-query endpoint is not wired,
    /// so callers always get an empty list.
    pub async fn get_users_by_location(&self, location: &str) -> Vec<User> {
        debug!("get_users_by_location({location}) is not backed by a query");
        Vec::new()
    }
}

fn active_reports(documents: Vec<Document>) -> Vec<TrafficReport> {
    documents
        .into_iter()
        .filter_map(|doc| match decode_report(&doc.fields) {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Skipping undecodable traffic report: {e}");
                None
            }
        })
        .filter(TrafficReport::is_active)
        .collect()
}

// --- encoding -------------------------------------------------------------

fn encode_user(user: &User) -> Fields {
    let mut preferences = Fields::new();
    preferences.insert(
        "notifications".into(),
        FieldValue::Boolean(user.preferences.notifications),
    );
    preferences.insert(
        "morningBriefing".into(),
        FieldValue::Boolean(user.preferences.morning_briefing),
    );
    preferences.insert(
        "eveningUpdate".into(),
        FieldValue::Boolean(user.preferences.evening_update),
    );
    preferences.insert(
        "alertTypes".into(),
        FieldValue::string_array(&user.preferences.alert_types),
    );
    if let Some(ref commute) = user.preferences.commute_route {
        let mut fields = Fields::new();
        fields.insert("from".into(), FieldValue::String(commute.from.clone()));
        fields.insert("to".into(), FieldValue::String(commute.to.clone()));
        fields.insert("days".into(), FieldValue::string_array(&commute.days));
        fields.insert("times".into(), FieldValue::string_array(&commute.times));
        preferences.insert("commuteRoute".into(), FieldValue::Map { fields });
    }

    let mut fields = Fields::new();
    fields.insert("chatId".into(), FieldValue::String(user.chat_id.clone()));
    // Absent optional strings are stored as ""
    fields.insert(
        "firstName".into(),
        FieldValue::String(user.first_name.clone().unwrap_or_default()),
    );
    fields.insert(
        "lastName".into(),
        FieldValue::String(user.last_name.clone().unwrap_or_default()),
    );
    fields.insert(
        "username".into(),
        FieldValue::String(user.username.clone().unwrap_or_default()),
    );
    fields.insert(
        "location".into(),
        FieldValue::String(user.location.clone().unwrap_or_default()),
    );
    fields.insert("preferences".into(), FieldValue::Map { fields: preferences });
    fields.insert("subscriptions".into(), FieldValue::string_array(&user.subscriptions));
    fields.insert("createdAt".into(), FieldValue::Timestamp(user.created_at));
    fields.insert("lastActive".into(), FieldValue::Timestamp(user.last_active));
    fields
}

fn encode_report(report: &TrafficReport) -> Fields {
    let mut fields = Fields::new();
    fields.insert("id".into(), FieldValue::String(report.id.clone()));
    fields.insert("type".into(), FieldValue::String(report.kind.as_str().into()));
    fields.insert("location".into(), FieldValue::String(report.location.clone()));
    fields.insert("description".into(), FieldValue::String(report.description.clone()));
    fields.insert("severity".into(), FieldValue::String(report.severity.as_str().into()));
    fields.insert("timestamp".into(), FieldValue::Timestamp(report.timestamp));
    fields.insert("reportedBy".into(), FieldValue::String(report.reported_by.clone()));
    fields.insert("status".into(), FieldValue::String(report.status.as_str().into()));
    fields
}

// --- decoding -------------------------------------------------------------

fn require<'a>(fields: &'a Fields, name: &str) -> Result<&'a FieldValue, DecodeError> {
    fields.get(name).ok_or_else(|| DecodeError::MissingField(name.to_string()))
}

fn take_string(fields: &Fields, name: &str) -> Result<String, DecodeError> {
    match require(fields, name)? {
        FieldValue::String(s) => Ok(s.clone()),
        other => Err(DecodeError::WrongKind {
            field: name.to_string(),
            expected: "stringValue",
            found: other.kind(),
        }),
    }
}

/// Optional string: absent or "" decodes to None.
fn opt_string(fields: &Fields, name: &str) -> Result<Option<String>, DecodeError> {
    match fields.get(name) {
        None => Ok(None),
        Some(FieldValue::String(s)) if s.is_empty() => Ok(None),
        Some(FieldValue::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(DecodeError::WrongKind {
            field: name.to_string(),
            expected: "stringValue",
            found: other.kind(),
        }),
    }
}

fn bool_or(fields: &Fields, name: &str, default: bool) -> Result<bool, DecodeError> {
    match fields.get(name) {
        None => Ok(default),
        Some(FieldValue::Boolean(b)) => Ok(*b),
        Some(other) => Err(DecodeError::WrongKind {
            field: name.to_string(),
            expected: "booleanValue",
            found: other.kind(),
        }),
    }
}

fn take_timestamp(fields: &Fields, name: &str) -> Result<DateTime<Utc>, DecodeError> {
    match require(fields, name)? {
        FieldValue::Timestamp(t) => Ok(*t),
        other => Err(DecodeError::WrongKind {
            field: name.to_string(),
            expected: "timestampValue",
            found: other.kind(),
        }),
    }
}

/// Optional string array: absent decodes to empty.
fn string_list(fields: &Fields, name: &str) -> Result<Vec<String>, DecodeError> {
    let values = match fields.get(name) {
        None => return Ok(Vec::new()),
        Some(FieldValue::Array { values }) => values,
        Some(other) => {
            return Err(DecodeError::WrongKind {
                field: name.to_string(),
                expected: "arrayValue",
                found: other.kind(),
            });
        }
    };

    values
        .iter()
        .map(|value| match value {
            FieldValue::String(s) => Ok(s.clone()),
            other => Err(DecodeError::WrongKind {
                field: format!("{name}[]"),
                expected: "stringValue",
                found: other.kind(),
            }),
        })
        .collect()
}

fn decode_user(fields: &Fields) -> Result<User, DecodeError> {
    let preferences = match fields.get("preferences") {
        None => UserPreferences::default(),
        Some(FieldValue::Map { fields: prefs }) => {
            let commute_route = match prefs.get("commuteRoute") {
                None => None,
                Some(FieldValue::Map { fields: route }) => Some(CommuteRoute {
                    from: take_string(route, "from")?,
                    to: take_string(route, "to")?,
                    days: string_list(route, "days")?,
                    times: string_list(route, "times")?,
                }),
                Some(other) => {
                    return Err(DecodeError::WrongKind {
                        field: "preferences.commuteRoute".to_string(),
                        expected: "mapValue",
                        found: other.kind(),
                    });
                }
            };

            UserPreferences {
                notifications: bool_or(prefs, "notifications", true)?,
                morning_briefing: bool_or(prefs, "morningBriefing", false)?,
                evening_update: bool_or(prefs, "eveningUpdate", false)?,
                alert_types: string_list(prefs, "alertTypes")?,
                commute_route,
            }
        }
        Some(other) => {
            return Err(DecodeError::WrongKind {
                field: "preferences".to_string(),
                expected: "mapValue",
                found: other.kind(),
            });
        }
    };

    Ok(User {
        chat_id: take_string(fields, "chatId")?,
        first_name: opt_string(fields, "firstName")?,
        last_name: opt_string(fields, "lastName")?,
        username: opt_string(fields, "username")?,
        location: opt_string(fields, "location")?,
        preferences,
        subscriptions: string_list(fields, "subscriptions")?,
        created_at: take_timestamp(fields, "createdAt")?,
        last_active: take_timestamp(fields, "lastActive")?,
    })
}

fn decode_report(fields: &Fields) -> Result<TrafficReport, DecodeError> {
    let kind_str = take_string(fields, "type")?;
    let kind = ReportKind::parse(&kind_str).ok_or_else(|| DecodeError::UnknownValue {
        field: "type".to_string(),
        value: kind_str,
    })?;

    let severity_str = take_string(fields, "severity")?;
    let severity = Severity::parse(&severity_str).ok_or_else(|| DecodeError::UnknownValue {
        field: "severity".to_string(),
        value: severity_str,
    })?;

    let status_str = take_string(fields, "status")?;
    let status = ReportStatus::parse(&status_str).ok_or_else(|| DecodeError::UnknownValue {
        field: "status".to_string(),
        value: status_str,
    })?;

    Ok(TrafficReport {
        id: take_string(fields, "id")?,
        kind,
        location: take_string(fields, "location")?,
        description: take_string(fields, "description")?,
        severity,
        timestamp: take_timestamp(fields, "timestamp")?,
        reported_by: take_string(fields, "reportedBy")?,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn full_user() -> User {
        User {
            chat_id: "987654".into(),
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            username: Some("ada".into()),
            location: Some("San Francisco".into()),
            preferences: UserPreferences {
                notifications: false,
                morning_briefing: true,
                evening_update: true,
                alert_types: vec!["accident".into(), "road_closure".into()],
                commute_route: Some(CommuteRoute {
                    from: "Home".into(),
                    to: "Office".into(),
                    days: vec!["mon".into(), "tue".into()],
                    times: vec!["08:00".into(), "17:30".into()],
                }),
            },
            subscriptions: vec!["morning_briefing".into()],
            created_at: Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap(),
            last_active: Utc.with_ymd_and_hms(2025, 6, 2, 18, 45, 0).unwrap(),
        }
    }

    fn minimal_user() -> User {
        User::new("42".into(), Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap())
    }

    fn sample_report(status: ReportStatus) -> TrafficReport {
        TrafficReport {
            id: "rep-7".into(),
            kind: ReportKind::Construction,
            location: "Main Street".into(),
            description: "lane closed".into(),
            severity: Severity::Low,
            timestamp: Utc.with_ymd_and_hms(2025, 6, 3, 7, 15, 0).unwrap(),
            reported_by: "987654".into(),
            status,
        }
    }

    /// Encode, push through the actual JSON wire form, decode.
    fn wire_round_trip_user(user: &User) -> User {
        let encoded = serde_json::to_string(&encode_user(user)).unwrap();
        let fields: Fields = serde_json::from_str(&encoded).unwrap();
        decode_user(&fields).unwrap()
    }

    #[test]
    fn test_user_round_trip_all_fields() {
        let user = full_user();
        assert_eq!(wire_round_trip_user(&user), user);
    }

    #[test]
    fn test_user_round_trip_minimal() {
        let user = minimal_user();
        assert_eq!(wire_round_trip_user(&user), user);
    }

    #[test]
    fn test_absent_optionals_encode_as_empty_string() {
        let fields = encode_user(&minimal_user());
        assert_eq!(fields.get("firstName"), Some(&FieldValue::String(String::new())));
        assert_eq!(fields.get("location"), Some(&FieldValue::String(String::new())));
        // Absent commute route is omitted entirely
        let Some(FieldValue::Map { fields: prefs }) = fields.get("preferences") else {
            panic!("preferences must be a mapValue");
        };
        assert!(!prefs.contains_key("commuteRoute"));
    }

    #[test]
    fn test_wire_shape_matches_firestore_convention() {
        let value = serde_json::to_value(encode_user(&full_user())).unwrap();
        assert_eq!(value["chatId"]["stringValue"], "987654");
        assert_eq!(value["preferences"]["mapValue"]["fields"]["morningBriefing"]["booleanValue"], true);
        assert_eq!(
            value["subscriptions"]["arrayValue"]["values"][0]["stringValue"],
            "morning_briefing"
        );
        assert!(value["createdAt"]["timestampValue"].is_string());
    }

    #[test]
    fn test_report_round_trip() {
        let report = sample_report(ReportStatus::Active);
        let encoded = serde_json::to_string(&encode_report(&report)).unwrap();
        let fields: Fields = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decode_report(&fields).unwrap(), report);
    }

    #[test]
    fn test_unknown_wrapper_kind_fails() {
        let result: Result<FieldValue, _> =
            serde_json::from_value(serde_json::json!({ "integerValue": "5" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_enum_value_fails() {
        let mut fields = encode_report(&sample_report(ReportStatus::Active));
        fields.insert("severity".into(), FieldValue::String("catastrophic".into()));
        let err = decode_report(&fields).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownValue { .. }));
        assert!(err.to_string().contains("catastrophic"));
    }

    #[test]
    fn test_missing_field_fails() {
        let mut fields = encode_report(&sample_report(ReportStatus::Active));
        fields.remove("status");
        let err = decode_report(&fields).unwrap_err();
        assert!(matches!(err, DecodeError::MissingField(_)));
    }

    #[test]
    fn test_wrong_wrapper_kind_fails() {
        let mut fields = encode_user(&minimal_user());
        fields.insert("createdAt".into(), FieldValue::String("yesterday".into()));
        let err = decode_user(&fields).unwrap_err();
        assert!(matches!(err, DecodeError::WrongKind { .. }));
    }

    #[test]
    fn test_active_filter_drops_resolved_reports() {
        let documents = vec![
            Document { fields: encode_report(&sample_report(ReportStatus::Active)) },
            Document { fields: encode_report(&sample_report(ReportStatus::Resolved)) },
        ];
        let reports = active_reports(documents);
        assert_eq!(reports.len(), 1);
        assert!(reports.iter().all(TrafficReport::is_active));
    }

    #[test]
    fn test_active_filter_skips_undecodable_documents() {
        let mut broken = encode_report(&sample_report(ReportStatus::Active));
        broken.insert("type".into(), FieldValue::String("tornado".into()));
        let documents = vec![
            Document { fields: broken },
            Document { fields: encode_report(&sample_report(ReportStatus::Active)) },
        ];
        assert_eq!(active_reports(documents).len(), 1);
    }

    #[test]
    fn test_empty_array_wire_form_decodes() {
        // Firestore may omit "values" on an empty arrayValue
        let fields: Fields =
            serde_json::from_value(serde_json::json!({ "subscriptions": { "arrayValue": {} } })).unwrap();
        assert_eq!(string_list(&fields, "subscriptions").unwrap(), Vec::<String>::new());
    }
}
