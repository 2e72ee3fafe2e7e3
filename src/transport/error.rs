//! Transport error types

use serde_json::Value;
use thiserror::Error;

/// Shown when a failure carries nothing more specific to tell the user
pub const GENERIC_ERROR_MESSAGE: &str = "Oops! There seems to be an error. Please try again.";

/// Failure of a remote call, whatever shape it arrived in
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    /// Response body returned alongside a non-success status
    pub body: Option<String>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            status_text: None,
            body: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Decode, message)
    }

    /// A 2xx response whose body reports an error of its own
    pub fn application(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Application, message)
    }

    pub fn status(status: u16, status_text: impl Into<String>, body: Option<String>) -> Self {
        let status_text = status_text.into();
        Self {
            kind: TransportErrorKind::Status,
            message: format!("HTTP {status} {status_text}"),
            status: Some(status),
            status_text: Some(status_text),
            body: body.filter(|b| !b.trim().is_empty()),
        }
    }

    /// Best-effort text to show the user in place of an answer.
    ///
    /// Prefers a server-supplied message, then a `status: statusText`
    /// summary, then the generic fallback.
    pub fn describe(&self) -> String {
        match self.kind {
            TransportErrorKind::Application => {
                if self.message.trim().is_empty() {
                    GENERIC_ERROR_MESSAGE.to_string()
                } else {
                    self.message.clone()
                }
            }
            TransportErrorKind::Status => {
                if let Some(body) = &self.body {
                    return server_message(body).unwrap_or_else(|| body.clone());
                }
                match (self.status, &self.status_text) {
                    (Some(status), Some(text)) => format!("{status}: {text}"),
                    (Some(status), None) => status.to_string(),
                    _ => GENERIC_ERROR_MESSAGE.to_string(),
                }
            }
            TransportErrorKind::Network | TransportErrorKind::Decode => {
                GENERIC_ERROR_MESSAGE.to_string()
            }
        }
    }
}

/// Failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Unreachable host, timeout, connection reset
    Network,
    /// Non-2xx response
    Status,
    /// 2xx response carrying an `error` field
    Application,
    /// Response body was not the JSON we expected
    Decode,
}

/// Pull a human-readable message out of a JSON error body, if it has one.
pub(crate) fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    if let Value::String(text) = &value {
        return Some(text.clone());
    }
    error_field_message(&value).or_else(|| {
        value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
    })
}

/// Message carried by an `error` field, either a string or `{ message }`
pub(crate) fn error_field_message(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
