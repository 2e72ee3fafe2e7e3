//! `reqwest`-backed transport

use super::error::error_field_message;
use super::{HttpRequest, Transport, TransportError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Production transport over a shared `reqwest` client
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn classify_send_error(e: &reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::network(format!("Request timeout: {e}"))
        } else if e.is_connect() {
            TransportError::network(format!("Connection failed: {e}"))
        } else {
            TransportError::network(format!("Request failed: {e}"))
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn request(&self, request: HttpRequest) -> Result<Value, TransportError> {
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::classify_send_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(TransportError::status(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                Some(body),
            ));
        }

        decode_body(&body)
    }
}

/// Decode a 2xx body, turning an embedded `error` field into a failure.
///
/// An empty body decodes to `null`; some endpoints answer a POST with nothing.
fn decode_body(body: &str) -> Result<Value, TransportError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    let value: Value = serde_json::from_str(body)
        .map_err(|e| TransportError::decode(format!("Failed to parse response: {e}")))?;

    if let Some(message) = error_field_message(&value) {
        if !has_answer(&value) {
            return Err(TransportError::application(message));
        }
    }
    Ok(value)
}

fn has_answer(value: &Value) -> bool {
    ["text", "json", "data"]
        .iter()
        .any(|key| value.get(key).is_some_and(|v| !v.is_null()))
}
