//! HTTP transport abstraction
//!
//! Every remote call goes through [`Transport`], which folds thrown errors,
//! non-success statuses and error fields in the body into one
//! [`TransportError`] channel.

mod error;
mod http;

pub use error::{TransportError, TransportErrorKind, GENERIC_ERROR_MESSAGE};
pub use http::ReqwestTransport;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

/// A single outbound request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Sends a request and returns the decoded JSON body or a captured error
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: HttpRequest) -> Result<Value, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn request(&self, request: HttpRequest) -> Result<Value, TransportError> {
        (**self).request(request).await
    }
}

/// Logging wrapper for transports
pub struct LoggingTransport<T> {
    inner: T,
}

impl<T: Transport> LoggingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: Transport> Transport for LoggingTransport<T> {
    async fn request(&self, request: HttpRequest) -> Result<Value, TransportError> {
        let method = request.method.clone();
        let url = request.url.clone();
        let start = std::time::Instant::now();
        let result = self.inner.request(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::info!(
                    method = %method,
                    url = %url,
                    duration_ms = %duration.as_millis(),
                    "Remote request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    method = %method,
                    url = %url,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    status = ?e.status,
                    "Remote request failed"
                );
            }
        }

        result
    }
}
