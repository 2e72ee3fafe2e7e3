//! Session core for an embeddable chat widget
//!
//! Keeps an ordered conversation log, sends questions to a remote prediction
//! API, turns responses into assistant messages, and writes the conversation
//! through to durable storage after every change.

#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions, clippy::must_use_candidate)]

pub mod config;
pub mod conversation;
pub mod gateway;
pub mod message;
pub mod persistence;
pub mod session;
pub mod store;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, WidgetConfig};
pub use conversation::Conversation;
pub use gateway::{MessageGateway, PredictionInput};
pub use message::{dedupe_sources, Message, Role, SourceDocument, DEFAULT_WELCOME_MESSAGE};
pub use persistence::{record_key, PersistError, PersistedRecord, Persistence};
pub use session::{
    PendingSubmission, SessionContext, SessionController, SessionEvent, SessionState,
    SubmitOutcome,
};
pub use store::{MemoryRecordStore, RecordStore, SqliteRecordStore, StoreError};
pub use transport::{
    HttpRequest, LoggingTransport, ReqwestTransport, Transport, TransportError,
    TransportErrorKind,
};
