//! Request builders for the remote prediction and message-log endpoints

use crate::message::Message;
use crate::transport::{HttpRequest, Transport, TransportError};
use serde::Serialize;
use serde_json::{Map, Value};

const API_KEY_HEADER: &str = "x-api-key";

/// Body of a prediction request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionInput {
    pub question: String,
    /// Prior turns, without the welcome message or placeholders
    pub history: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_config: Option<Map<String, Value>>,
}

/// Message-log record as the remote store expects it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoteMessage<'a> {
    content: &'a str,
    role: &'a str,
    /// The remote column is text, so citations travel JSON-encoded
    #[serde(skip_serializing_if = "Option::is_none")]
    source_documents: Option<String>,
}

/// Builds requests against one base URL through a [`Transport`]
pub struct MessageGateway<T> {
    transport: T,
    base_url: String,
}

impl<T: Transport> MessageGateway<T> {
    pub fn new(transport: T, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the prediction endpoint a question; returns the raw response envelope
    pub async fn submit_question(
        &self,
        session_id: &str,
        credential: &str,
        input: &PredictionInput,
    ) -> Result<Value, TransportError> {
        let body = serde_json::to_value(input)
            .map_err(|e| TransportError::decode(format!("Failed to encode question: {e}")))?;
        let request = HttpRequest::post(
            format!("{}/external-prediction/{session_id}", self.base_url),
            body,
        )
        .with_header(API_KEY_HEADER, credential);

        self.transport.request(request).await
    }

    /// Append one message to the remote message log
    pub async fn persist_message(
        &self,
        session_id: &str,
        credential: &str,
        message: &Message,
    ) -> Result<Value, TransportError> {
        let source_documents = message
            .source_documents
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| TransportError::decode(format!("Failed to encode citations: {e}")))?;
        let record = RemoteMessage {
            content: &message.content,
            role: message.role.as_str(),
            source_documents,
        };
        let body = serde_json::to_value(&record)
            .map_err(|e| TransportError::decode(format!("Failed to encode message: {e}")))?;
        let request = HttpRequest::post(self.message_log_url(session_id), body)
            .with_header(API_KEY_HEADER, credential);

        self.transport.request(request).await
    }

    /// Fetch the remote message log for the session.
    ///
    /// Entries that cannot be read as messages are skipped.
    pub async fn fetch_messages(
        &self,
        session_id: &str,
        credential: &str,
    ) -> Result<Vec<Message>, TransportError> {
        let request = HttpRequest::get(self.message_log_url(session_id))
            .with_header(API_KEY_HEADER, credential);
        let response = self.transport.request(request).await?;

        let entries: &[Value] = match &response {
            Value::Array(entries) => entries.as_slice(),
            Value::Object(obj) => obj
                .get("data")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .ok_or_else(|| TransportError::decode("Message log is not a list"))?,
            Value::Null => &[],
            _ => return Err(TransportError::decode("Message log is not a list")),
        };

        let messages: Vec<Message> = entries.iter().filter_map(Message::from_stored).collect();
        if messages.len() < entries.len() {
            tracing::warn!(
                session_id = %session_id,
                skipped = entries.len() - messages.len(),
                "Skipped unreadable remote messages"
            );
        }
        Ok(messages)
    }

    fn message_log_url(&self, session_id: &str) -> String {
        format!("{}/chatmessage-external/{session_id}", self.base_url)
    }
}
