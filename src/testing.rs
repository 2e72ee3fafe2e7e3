//! Mock implementations for testing
//!
//! These mocks enable session tests without real I/O.

use crate::store::{RecordStore, StoreError, StoreResult};
use crate::transport::{HttpRequest, Transport, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// Mock Transport
// ============================================================================

/// Transport that returns queued results in order.
///
/// URLs matching a fragment registered with `respond_to` or `hang_on` bypass
/// the queue.
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<Value, TransportError>>>,
    routes: Mutex<Vec<(String, Result<Value, TransportError>)>>,
    hangs: Mutex<Vec<String>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<HttpRequest>>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            routes: Mutex::new(Vec::new()),
            hangs: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: Value) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: TransportError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Answer every request whose URL contains `fragment` with `response`
    pub fn respond_to(&self, fragment: &str, response: Result<Value, TransportError>) {
        self.routes
            .lock()
            .unwrap()
            .push((fragment.to_string(), response));
    }

    /// Never complete requests whose URL contains `fragment`
    pub fn hang_on(&self, fragment: &str) {
        self.hangs.lock().unwrap().push(fragment.to_string());
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Recorded requests whose URL contains `fragment`
    pub fn requests_to(&self, fragment: &str) -> Vec<HttpRequest> {
        self.recorded_requests()
            .into_iter()
            .filter(|r| r.url.contains(fragment))
            .collect()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, request: HttpRequest) -> Result<Value, TransportError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        let hangs = self.hangs.lock().unwrap().iter().any(|f| url.contains(f.as_str()));
        if hangs {
            return std::future::pending().await;
        }
        let routed = self
            .routes
            .lock()
            .unwrap()
            .iter()
            .find(|(f, _)| url.contains(f.as_str()))
            .map(|(_, response)| response.clone());
        if let Some(response) = routed {
            return response;
        }

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::network("No mock response queued")))
    }
}

// ============================================================================
// Pending Transport (never resolves)
// ============================================================================

/// Transport whose requests never complete
#[derive(Default)]
pub struct PendingTransport {
    pub started: AtomicUsize,
}

#[async_trait]
impl Transport for PendingTransport {
    async fn request(&self, _request: HttpRequest) -> Result<Value, TransportError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<Result<Value, TransportError>>().await
    }
}

// ============================================================================
// Failing Record Store
// ============================================================================

/// Record store whose writes fail until switched back on
#[derive(Default)]
pub struct FailingRecordStore {
    inner: crate::store::MemoryRecordStore,
    failing: AtomicBool,
    pub failed_writes: AtomicUsize,
}

#[allow(dead_code)]
impl FailingRecordStore {
    pub fn failing() -> Self {
        let store = Self::default();
        store.failing.store(true, Ordering::SeqCst);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            self.failed_writes.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("quota exceeded".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FailingRecordStore {
    async fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        self.check()?;
        self.inner.put(key, value).await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("storage disabled".to_string()));
        }
        self.inner.get(key).await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.check()?;
        self.inner.remove(key).await
    }
}
