//! Durable key/value record storage
//!
//! The session core only needs `put/get/remove` of string values by key, so
//! storage sits behind [`RecordStore`] and can be swapped for an in-memory map.

mod sqlite;

pub use sqlite::SqliteRecordStore;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Record store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for serialized records keyed by string
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write `value` under `key`, replacing whatever was there
    async fn put(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Read the value under `key`; `None` when absent
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Remove the value under `key`; removing a missing key succeeds
    async fn remove(&self, key: &str) -> StoreResult<()>;
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).put(key, value).await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key).await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        (**self).remove(key).await
    }
}

/// Process-local store, used for tests and memory-only sessions
#[derive(Debug, Default, Clone)]
pub struct MemoryRecordStore {
    records: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        records.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        records.remove(key);
        Ok(())
    }
}
