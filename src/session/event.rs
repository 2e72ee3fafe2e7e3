//! Events that drive the session

use crate::message::Message;
use crate::persistence::PersistedRecord;
use crate::transport::TransportError;
use serde_json::Value;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    Submit {
        text: String,
    },
    Clear {
        /// Fresh chat id to adopt
        chat_id: String,
    },

    // Remote events
    PredictionSucceeded {
        epoch: u64,
        envelope: Value,
    },
    PredictionFailed {
        epoch: u64,
        error: TransportError,
    },
    RemoteHistoryFetched {
        messages: Vec<Message>,
    },

    // Lifecycle events
    Restore {
        record: PersistedRecord,
    },
    Unmount,
}
