//! Widget configuration

use crate::message::DEFAULT_WELCOME_MESSAGE;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.nocodingai.com/langchain";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("CHAT_EMBED_CHATFLOW_ID is not set")]
    MissingChatflowId,
    #[error("CHAT_EMBED_OVERRIDE_CONFIG must be a JSON object: {0}")]
    InvalidOverrideConfig(String),
    #[error("CHAT_EMBED_TIMEOUT_SECS must be a positive integer, got {0:?}")]
    InvalidTimeout(String),
}

/// Settings for one embedded widget instance
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    pub base_url: String,
    /// Integration id; names both the remote chatflow and the local record key
    pub chatflow_id: String,
    pub api_key: String,
    pub welcome_message: String,
    /// Forwarded verbatim as `overrideConfig` on every question
    pub override_config: Option<Map<String, Value>>,
    /// Mirror every appended message to the remote message log
    pub sync_remote_log: bool,
    pub request_timeout: Duration,
    pub db_path: PathBuf,
}

impl WidgetConfig {
    pub fn new(chatflow_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            chatflow_id: chatflow_id.into(),
            api_key: api_key.into(),
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            override_config: None,
            sync_remote_log: false,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            db_path: default_db_path(),
        }
    }

    pub fn with_welcome_message(mut self, welcome: impl Into<String>) -> Self {
        self.welcome_message = welcome.into();
        self
    }

    pub fn with_override_config(mut self, config: Map<String, Value>) -> Self {
        self.override_config = Some(config);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_remote_log(mut self, enabled: bool) -> Self {
        self.sync_remote_log = enabled;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let chatflow_id = var("CHAT_EMBED_CHATFLOW_ID").ok_or(ConfigError::MissingChatflowId)?;
        let mut config = Self::new(chatflow_id, var("CHAT_EMBED_API_KEY").unwrap_or_default());

        if let Some(base_url) = var("CHAT_EMBED_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(welcome) = var("CHAT_EMBED_WELCOME_MESSAGE") {
            config.welcome_message = welcome;
        }
        if let Some(raw) = var("CHAT_EMBED_OVERRIDE_CONFIG") {
            config.override_config = Some(parse_override_config(&raw)?);
        }
        if let Some(flag) = var("CHAT_EMBED_SYNC_REMOTE_LOG") {
            config.sync_remote_log = matches!(flag.trim(), "1" | "true" | "yes");
        }
        if let Some(raw) = var("CHAT_EMBED_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::InvalidTimeout(raw))?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(path) = var("CHAT_EMBED_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        Ok(config)
    }
}

fn parse_override_config(raw: &str) -> Result<Map<String, Value>, ConfigError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ConfigError::InvalidOverrideConfig(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(ConfigError::InvalidOverrideConfig(e.to_string())),
    }
}

fn default_db_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(format!("{home}/.chat-embed/records.db"))
}
