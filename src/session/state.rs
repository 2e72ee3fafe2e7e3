//! Session state types

use crate::config::WidgetConfig;
use serde_json::{Map, Value};

/// Where the submit cycle currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// A question is in flight; `epoch` is the conversation epoch it was sent under
    Submitting { epoch: u64 },
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Submitting { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Submitting { .. } => "submitting",
        }
    }
}

/// Fixed per-widget settings the transition function reads
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub chatflow_id: String,
    pub api_key: String,
    pub welcome_message: String,
    pub override_config: Option<Map<String, Value>>,
    pub sync_remote_log: bool,
}

impl SessionContext {
    pub fn new(chatflow_id: impl Into<String>, welcome_message: impl Into<String>) -> Self {
        Self {
            chatflow_id: chatflow_id.into(),
            api_key: String::new(),
            welcome_message: welcome_message.into(),
            override_config: None,
            sync_remote_log: false,
        }
    }

    pub fn from_config(config: &WidgetConfig) -> Self {
        Self {
            chatflow_id: config.chatflow_id.clone(),
            api_key: config.api_key.clone(),
            welcome_message: config.welcome_message.clone(),
            override_config: config.override_config.clone(),
            sync_remote_log: config.sync_remote_log,
        }
    }
}
