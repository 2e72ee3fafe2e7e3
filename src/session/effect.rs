//! Effects produced by state transitions

use crate::gateway::PredictionInput;
use crate::message::Message;

/// Effects to be executed after state transition, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Push a message onto the conversation log
    AppendMessage(Message),

    /// Reset the log to the welcome message, adopting `chat_id` if given
    ResetConversation { chat_id: Option<String> },

    /// Swap in a whole history
    ReplaceConversation {
        chat_id: String,
        history: Vec<Message>,
    },

    /// Write the current conversation to the durable record
    PersistRecord,

    /// Delete the durable record
    RemoveRecord,

    /// Send the question to the prediction endpoint
    RequestPrediction { epoch: u64, input: PredictionInput },

    /// Copy a message to the remote message log
    MirrorMessage(Message),

    NotifyHistoryChanged,
    NotifyLoading(bool),
    NotifyCleared { chat_id: String },
}

impl Effect {
    pub fn append(message: Message) -> Self {
        Effect::AppendMessage(message)
    }

    pub fn is_persist(&self) -> bool {
        matches!(self, Effect::PersistRecord)
    }
}
