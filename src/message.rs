//! Conversation message types and citation filtering

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use url::Url;

/// Text shown as the first assistant message when no welcome text is configured
pub const DEFAULT_WELCOME_MESSAGE: &str = "Hi there! How can I help?";

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "apiMessage")]
    Api,
    #[serde(rename = "userMessage")]
    User,
    /// Loading placeholder shown while a prediction is in flight; never persisted
    #[serde(rename = "usermessagewaiting")]
    Waiting,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Api => "apiMessage",
            Role::User => "userMessage",
            Role::Waiting => "usermessagewaiting",
        }
    }

    pub fn is_placeholder(self) -> bool {
        matches!(self, Role::Waiting)
    }
}

/// A cited source document attached to an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocument {
    #[serde(default)]
    pub page_content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Any other fields the remote returned, kept so citations round-trip unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SourceDocument {
    pub fn new(page_content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = Map::new();
        metadata.insert("source".to_string(), Value::String(source.into()));
        Self {
            page_content: page_content.into(),
            metadata,
            extra: Map::new(),
        }
    }

    /// The `metadata.source` locator, if it is a string
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(Value::as_str)
    }

    /// The source locator, only when it parses as an absolute URL
    pub fn source_url(&self) -> Option<&str> {
        self.source().filter(|s| Url::parse(s).is_ok())
    }

    /// Caption for display: the URL path for URL sources, the page content otherwise
    pub fn label(&self) -> String {
        match self.source().and_then(|s| Url::parse(s).ok()) {
            Some(url) => url.path().to_string(),
            None => self.page_content.clone(),
        }
    }
}

/// One entry in the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub content: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_documents: Option<Vec<SourceDocument>>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            role: Role::User,
            source_documents: None,
        }
    }

    pub fn api(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            role: Role::Api,
            source_documents: None,
        }
    }

    pub fn api_with_sources(
        content: impl Into<String>,
        source_documents: Option<Vec<SourceDocument>>,
    ) -> Self {
        Self {
            content: content.into(),
            role: Role::Api,
            source_documents,
        }
    }

    pub fn waiting() -> Self {
        Self {
            content: String::new(),
            role: Role::Waiting,
            source_documents: None,
        }
    }

    /// Normalize a stored entry, keeping only `content`, `role` and `sourceDocuments`.
    ///
    /// Returns `None` for entries that are not objects, have no string content,
    /// or carry a role this crate does not know.
    pub fn from_stored(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let content = obj.get("content")?.as_str()?.to_string();
        let role: Role = serde_json::from_value(obj.get("role")?.clone()).ok()?;
        let source_documents = match obj.get("sourceDocuments") {
            None | Some(Value::Null) => None,
            Some(Value::String(encoded)) => serde_json::from_str(encoded).ok(),
            Some(docs) => serde_json::from_value(docs.clone()).ok(),
        };
        Some(Self {
            content,
            role,
            source_documents,
        })
    }

    /// Citations for display, with repeated URL sources removed
    pub fn display_sources(&self) -> Vec<SourceDocument> {
        self.source_documents
            .as_deref()
            .map(dedupe_sources)
            .unwrap_or_default()
    }
}

/// Drop citations whose URL source was already seen, keeping the first one.
///
/// Sources that do not parse as an absolute URL are never treated as
/// duplicates. Order is preserved.
pub fn dedupe_sources(docs: &[SourceDocument]) -> Vec<SourceDocument> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut kept = Vec::with_capacity(docs.len());
    for doc in docs {
        if let Some(url) = doc.source_url() {
            if !seen.insert(url) {
                continue;
            }
        }
        kept.push(doc.clone());
    }
    kept
}
