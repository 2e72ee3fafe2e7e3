//! Serialized conversation records
//!
//! A session is stored as `{ chatId, chatHistory }` under
//! `{integration-id}_EXTERNAL`. Writes overwrite; reads normalize each stored
//! message and treat anything unreadable as "start fresh".

use crate::message::Message;
use crate::store::{RecordStore, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable form of a conversation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    pub chat_id: String,
    pub chat_history: Vec<Message>,
}

/// Storage key for an integration's record
pub fn record_key(chatflow_id: &str) -> String {
    format!("{chatflow_id}_EXTERNAL")
}

/// Reads and writes [`PersistedRecord`]s through a [`RecordStore`]
pub struct Persistence<S> {
    store: S,
}

impl<S: RecordStore> Persistence<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn save(&self, key: &str, record: &PersistedRecord) -> Result<(), PersistError> {
        let encoded = serde_json::to_string(record)?;
        self.store.put(key, &encoded).await?;
        Ok(())
    }

    /// Load the record under `key`.
    ///
    /// `Ok(None)` means there is nothing usable stored, including a record
    /// too corrupt to parse; only a failing store is an error.
    pub async fn load(&self, key: &str) -> Result<Option<PersistedRecord>, PersistError> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        Ok(decode_record(key, &raw))
    }

    pub async fn clear(&self, key: &str) -> Result<(), PersistError> {
        self.store.remove(key).await?;
        Ok(())
    }
}

fn decode_record(key: &str, raw: &str) -> Option<PersistedRecord> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Discarding unparseable record");
            return None;
        }
    };

    let Some(chat_id) = value.get("chatId").and_then(Value::as_str) else {
        tracing::warn!(key = %key, "Discarding record without chatId");
        return None;
    };

    let entries = value
        .get("chatHistory")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut chat_history = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match Message::from_stored(entry) {
            Some(msg) if msg.role.is_placeholder() => {}
            Some(msg) => chat_history.push(msg),
            None => {
                tracing::warn!(key = %key, index, "Skipping malformed stored message");
            }
        }
    }

    Some(PersistedRecord {
        chat_id: chat_id.to_string(),
        chat_history,
    })
}
