//! Pure state transition function
//!
//! Given the same state, conversation and event, `transition` always produces
//! the same result. All I/O happens when the controller executes the effects.

use super::answer::answer_message;
use super::{Effect, Event, SessionContext, SessionState};
use crate::conversation::Conversation;
use crate::gateway::PredictionInput;
use crate::message::Message;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Nothing to send")]
    EmptyInput,
    #[error("A question is already in flight")]
    Busy,
    #[error("Result for epoch {result_epoch} arrived after the session moved to epoch {current_epoch}")]
    StaleResult {
        result_epoch: u64,
        current_epoch: u64,
    },
}

pub fn transition(
    state: &SessionState,
    conversation: &Conversation,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (*state, event) {
        // ============================================================
        // Submit
        // ============================================================
        (_, Event::Submit { text }) if text.trim().is_empty() => Err(TransitionError::EmptyInput),

        (SessionState::Idle, Event::Submit { text }) => {
            let epoch = conversation.epoch();
            let input = PredictionInput {
                question: text.clone(),
                history: conversation.outbound_history(&context.welcome_message),
                override_config: context.override_config.clone(),
            };
            let question = Message::user(text);

            Ok(TransitionResult::new(SessionState::Submitting { epoch })
                .with_effect(Effect::append(question.clone()))
                .with_effect(Effect::PersistRecord)
                .with_effects(mirror(context, question))
                .with_effect(Effect::NotifyHistoryChanged)
                .with_effect(Effect::NotifyLoading(true))
                .with_effect(Effect::RequestPrediction { epoch, input }))
        }

        (SessionState::Submitting { .. }, Event::Submit { .. }) => Err(TransitionError::Busy),

        // ============================================================
        // Prediction results
        // ============================================================
        (SessionState::Submitting { epoch }, Event::PredictionSucceeded { epoch: result_epoch, envelope })
            if epoch == result_epoch && conversation.epoch() == result_epoch =>
        {
            Ok(settle(context, answer_message(&envelope)))
        }

        (SessionState::Submitting { epoch }, Event::PredictionFailed { epoch: result_epoch, error })
            if epoch == result_epoch && conversation.epoch() == result_epoch =>
        {
            Ok(settle(context, Message::api(error.describe())))
        }

        (_, Event::PredictionSucceeded { epoch, .. } | Event::PredictionFailed { epoch, .. }) => {
            Err(TransitionError::StaleResult {
                result_epoch: epoch,
                current_epoch: conversation.epoch(),
            })
        }

        // ============================================================
        // Lifecycle
        // ============================================================
        (current, Event::Clear { chat_id }) => Ok(TransitionResult::new(SessionState::Idle)
            .with_effect(Effect::RemoveRecord)
            .with_effect(Effect::ResetConversation {
                chat_id: Some(chat_id.clone()),
            })
            .with_effect(Effect::NotifyCleared { chat_id })
            .with_effect(Effect::NotifyHistoryChanged)
            .with_effects(stop_loading(current))),

        (current, Event::Unmount) => Ok(TransitionResult::new(SessionState::Idle)
            .with_effect(Effect::ResetConversation { chat_id: None })
            .with_effect(Effect::NotifyHistoryChanged)
            .with_effects(stop_loading(current))),

        (current, Event::Restore { record }) => {
            let history = if record.chat_history.is_empty() {
                vec![Message::api(&context.welcome_message)]
            } else {
                record.chat_history
            };
            Ok(TransitionResult::new(SessionState::Idle)
                .with_effect(Effect::ReplaceConversation {
                    chat_id: record.chat_id,
                    history,
                })
                .with_effect(Effect::NotifyHistoryChanged)
                .with_effects(stop_loading(current)))
        }

        (SessionState::Submitting { .. }, Event::RemoteHistoryFetched { .. }) => {
            Err(TransitionError::Busy)
        }

        (SessionState::Idle, Event::RemoteHistoryFetched { messages }) => {
            if messages.is_empty() || !conversation.is_pristine(&context.welcome_message) {
                return Ok(TransitionResult::new(SessionState::Idle));
            }
            let mut history = Vec::with_capacity(messages.len() + 1);
            if messages[0].content != context.welcome_message {
                history.push(Message::api(&context.welcome_message));
            }
            history.extend(messages.into_iter().filter(|m| !m.role.is_placeholder()));

            Ok(TransitionResult::new(SessionState::Idle)
                .with_effect(Effect::ReplaceConversation {
                    chat_id: conversation.chat_id().to_string(),
                    history,
                })
                .with_effect(Effect::PersistRecord)
                .with_effect(Effect::NotifyHistoryChanged))
        }
    }
}

/// Append the answer (or error text), persist, and go idle
fn settle(context: &SessionContext, answer: Message) -> TransitionResult {
    TransitionResult::new(SessionState::Idle)
        .with_effect(Effect::append(answer.clone()))
        .with_effect(Effect::PersistRecord)
        .with_effects(mirror(context, answer))
        .with_effect(Effect::NotifyHistoryChanged)
        .with_effect(Effect::NotifyLoading(false))
}

fn mirror(context: &SessionContext, message: Message) -> Option<Effect> {
    context
        .sync_remote_log
        .then_some(Effect::MirrorMessage(message))
}

fn stop_loading(previous: SessionState) -> Option<Effect> {
    previous.is_loading().then_some(Effect::NotifyLoading(false))
}
