use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    telegram_bot_token: String,
    /// Firestore project that holds the users and traffic_reports collections.
    firestore_project_id: String,
    /// If set, register this webhook URL and exit instead of long-polling.
    webhook_url: Option<String>,
    /// Long-poll timeout passed to getUpdates.
    #[serde(default = "default_poll_timeout_secs")]
    poll_timeout_secs: u64,
    /// Chat that receives diagnostic log output.
    log_chat_id: Option<String>,
    /// Chat that receives service notifications (restart ping, dashboard snapshot).
    admin_chat_id: Option<String>,
    /// Directory for state files (logs). Defaults to current directory.
    data_dir: Option<String>,
    #[serde(default)]
    dry_run: bool,
}

fn default_poll_timeout_secs() -> u64 {
    30
}

pub struct Config {
    pub telegram_bot_token: String,
    pub firestore_project_id: String,
    /// If set, register this webhook URL and exit instead of long-polling.
    pub webhook_url: Option<String>,
    pub poll_timeout_secs: u64,
    pub log_chat_id: Option<String>,
    /// Chat that receives service notifications.
    pub admin_chat_id: Option<String>,
    /// Directory for state files (logs).
    pub data_dir: PathBuf,
    pub dry_run: bool,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        // Validate required fields
        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if file.firestore_project_id.is_empty() {
            return Err(ConfigError::Validation("firestore_project_id is required".into()));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token: file.telegram_bot_token,
            firestore_project_id: file.firestore_project_id,
            webhook_url: file.webhook_url,
            poll_timeout_secs: file.poll_timeout_secs,
            log_chat_id: file.log_chat_id,
            admin_chat_id: file.admin_chat_id,
            data_dir,
            dry_run: file.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_valid_config() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdefGHIjklMNOpqrsTUVwxyz",
            "firestore_project_id": "traffic-demo"
        }"#);
        let config = Config::load(file.path()).expect("should load valid config");
        assert_eq!(config.firestore_project_id, "traffic-demo");
        assert_eq!(config.poll_timeout_secs, 30);
        assert!(!config.dry_run);
        assert_eq!(config.data_dir, PathBuf::from("."));
    }

    #[test]
    fn test_optional_fields() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "firestore_project_id": "traffic-demo",
            "webhook_url": "https://example.com/hook",
            "poll_timeout_secs": 10,
            "log_chat_id": "-1001234",
            "admin_chat_id": "55555",
            "data_dir": "/tmp/trafficbot",
            "dry_run": true
        }"#);
        let config = Config::load(file.path()).expect("should load valid config");
        assert_eq!(config.webhook_url.as_deref(), Some("https://example.com/hook"));
        assert_eq!(config.poll_timeout_secs, 10);
        assert_eq!(config.log_chat_id.as_deref(), Some("-1001234"));
        assert_eq!(config.admin_chat_id.as_deref(), Some("55555"));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/trafficbot"));
        assert!(config.dry_run);
    }

    #[test]
    fn test_empty_token() {
        let file = write_config(r#"{
            "telegram_bot_token": "",
            "firestore_project_id": "traffic-demo"
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_invalid_token_format_no_colon() {
        let file = write_config(r#"{
            "telegram_bot_token": "invalid_token_no_colon",
            "firestore_project_id": "traffic-demo"
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_invalid_token_format_non_numeric_id() {
        let file = write_config(r#"{
            "telegram_bot_token": "notanumber:ABCdef",
            "firestore_project_id": "traffic-demo"
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_empty_project_id() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdef",
            "firestore_project_id": ""
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("firestore_project_id"));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load("/nonexistent/path/config.json"));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
