//! Session controller: owns the conversation and executes effects

use super::transition::{transition, TransitionError};
use super::{Effect, Event, SessionContext, SessionState};
use crate::conversation::Conversation;
use crate::gateway::{MessageGateway, PredictionInput};
use crate::message::Message;
use crate::persistence::{record_key, Persistence};
use crate::store::RecordStore;
use crate::transport::{Transport, TransportError};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

/// Notifications for whatever is rendering the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    HistoryChanged { len: usize },
    LoadingChanged(bool),
    Cleared { chat_id: String },
    /// Durable storage failed; the session continues in memory
    PersistenceDegraded { reason: String },
}

/// How a `submit` call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input, nothing happened
    Ignored,
    /// Another question was still in flight
    Busy,
    Answered,
    /// The remote call failed and an error message was appended
    Failed,
    /// The session was cleared or replaced while the question was in flight
    Discarded,
}

/// A question that has been recorded locally and still needs sending
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSubmission {
    pub epoch: u64,
    pub input: PredictionInput,
}

/// Owns one widget's conversation, its durable record and the remote gateway
pub struct SessionController<S, T> {
    context: SessionContext,
    state: SessionState,
    conversation: Conversation,
    persistence: Persistence<S>,
    gateway: Arc<MessageGateway<T>>,
    record_key: String,
    events_tx: broadcast::Sender<SessionEvent>,
    persistence_degraded: bool,
    /// Remote-log writes still in flight
    mirror_tasks: JoinSet<()>,
}

impl<S, T> SessionController<S, T>
where
    S: RecordStore,
    T: Transport + 'static,
{
    /// Create the session, restoring the persisted record if one exists
    pub async fn mount(context: SessionContext, store: S, gateway: MessageGateway<T>) -> Self {
        let (events_tx, _) = broadcast::channel(64);
        let conversation = Conversation::new(new_chat_id(), &context.welcome_message);
        let record_key = record_key(&context.chatflow_id);

        let mut controller = Self {
            context,
            state: SessionState::Idle,
            conversation,
            persistence: Persistence::new(store),
            gateway: Arc::new(gateway),
            record_key,
            events_tx,
            persistence_degraded: false,
            mirror_tasks: JoinSet::new(),
        };
        controller.restore().await;
        controller
    }

    /// Reload the persisted record; returns whether one was found.
    ///
    /// Without a record the current conversation is left as it is.
    pub async fn restore(&mut self) -> bool {
        match self.persistence.load(&self.record_key).await {
            Ok(Some(record)) => {
                tracing::info!(
                    chat_id = %record.chat_id,
                    messages = record.chat_history.len(),
                    "Restored conversation"
                );
                self.dispatch(Event::Restore { record }).await.is_ok()
            }
            Ok(None) => {
                tracing::debug!(key = %self.record_key, "No stored conversation");
                false
            }
            Err(e) => {
                self.mark_degraded(&e.to_string());
                false
            }
        }
    }

    /// Send a question and wait for the answer to be applied
    pub async fn submit(&mut self, text: &str) -> SubmitOutcome {
        let pending = match self.begin_submit(text).await {
            Ok(pending) => pending,
            Err(TransitionError::EmptyInput) => return SubmitOutcome::Ignored,
            Err(_) => return SubmitOutcome::Busy,
        };

        let result = self
            .gateway
            .submit_question(&self.context.chatflow_id, &self.context.api_key, &pending.input)
            .await;
        self.settle(pending.epoch, result).await
    }

    /// Record the question locally and hand back what needs sending.
    ///
    /// The user message is appended and persisted before this returns.
    pub async fn begin_submit(&mut self, text: &str) -> Result<PendingSubmission, TransitionError> {
        let pending = self
            .dispatch(Event::Submit {
                text: text.to_string(),
            })
            .await?;
        // Submit from Idle always requests a prediction
        pending.ok_or(TransitionError::Busy)
    }

    /// Apply the outcome of a prediction started by [`Self::begin_submit`]
    pub async fn settle(
        &mut self,
        epoch: u64,
        result: Result<Value, TransportError>,
    ) -> SubmitOutcome {
        let (event, outcome) = match result {
            Ok(envelope) => (
                Event::PredictionSucceeded { epoch, envelope },
                SubmitOutcome::Answered,
            ),
            Err(error) => {
                tracing::error!(
                    chat_id = %self.conversation.chat_id(),
                    error = %error,
                    kind = ?error.kind,
                    "Prediction request failed"
                );
                (Event::PredictionFailed { epoch, error }, SubmitOutcome::Failed)
            }
        };

        match self.dispatch(event).await {
            Ok(_) => outcome,
            Err(e) => {
                tracing::debug!(error = %e, "Discarding prediction result");
                SubmitOutcome::Discarded
            }
        }
    }

    /// Forget the conversation: delete the record and start over under a new chat id
    pub async fn clear(&mut self) {
        let chat_id = new_chat_id();
        tracing::info!(
            old_chat_id = %self.conversation.chat_id(),
            new_chat_id = %chat_id,
            "Clearing conversation"
        );
        // Clear is accepted from every state
        let _ = self.dispatch(Event::Clear { chat_id }).await;
    }

    /// Drop local state back to the welcome message; the record is kept
    pub async fn unmount(&mut self) {
        let _ = self.dispatch(Event::Unmount).await;
    }

    /// Adopt the remote message log when nothing has been said locally yet.
    ///
    /// Returns the number of messages now in the history.
    pub async fn import_remote_history(&mut self) -> Result<usize, TransportError> {
        let messages = self
            .gateway
            .fetch_messages(&self.context.chatflow_id, &self.context.api_key)
            .await?;
        match self.dispatch(Event::RemoteHistoryFetched { messages }).await {
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "Remote history not imported"),
        }
        Ok(self.conversation.len())
    }

    /// Wait for every remote-log write started so far to finish
    pub async fn flush_mirrors(&mut self) {
        while let Some(result) = self.mirror_tasks.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Remote log task did not complete");
            }
        }
    }

    pub fn history(&self) -> &[Message] {
        self.conversation.history()
    }

    pub fn chat_id(&self) -> &str {
        self.conversation.chat_id()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn persistence_degraded(&self) -> bool {
        self.persistence_degraded
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn gateway(&self) -> Arc<MessageGateway<T>> {
        Arc::clone(&self.gateway)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    /// Run one event through the state machine and execute its effects.
    ///
    /// Returns the prediction to send, if the transition asked for one.
    async fn dispatch(
        &mut self,
        event: Event,
    ) -> Result<Option<PendingSubmission>, TransitionError> {
        let result = transition(&self.state, &self.conversation, &self.context, event)?;

        tracing::debug!(
            from = self.state.name(),
            to = result.new_state.name(),
            effects = result.effects.len(),
            "Session transition"
        );
        self.state = result.new_state;

        let mut pending = None;
        for effect in result.effects {
            if let Some(request) = self.execute_effect(effect).await {
                pending = Some(request);
            }
        }
        Ok(pending)
    }

    async fn execute_effect(&mut self, effect: Effect) -> Option<PendingSubmission> {
        match effect {
            Effect::AppendMessage(message) => {
                self.conversation.append(message);
            }
            Effect::ResetConversation { chat_id } => {
                self.conversation.reset(&self.context.welcome_message, chat_id);
            }
            Effect::ReplaceConversation { chat_id, history } => {
                self.conversation.replace(chat_id, history);
            }
            Effect::PersistRecord => {
                let record = self.conversation.to_record();
                let result = self.persistence.save(&self.record_key, &record).await;
                self.note_persistence(result.map_err(|e| e.to_string()));
            }
            Effect::RemoveRecord => {
                let result = self.persistence.clear(&self.record_key).await;
                self.note_persistence(result.map_err(|e| e.to_string()));
            }
            Effect::RequestPrediction { epoch, input } => {
                return Some(PendingSubmission { epoch, input });
            }
            Effect::MirrorMessage(message) => self.spawn_mirror(message),
            Effect::NotifyHistoryChanged => {
                self.notify(SessionEvent::HistoryChanged {
                    len: self.conversation.len(),
                });
            }
            Effect::NotifyLoading(loading) => {
                self.notify(SessionEvent::LoadingChanged(loading));
            }
            Effect::NotifyCleared { chat_id } => {
                self.notify(SessionEvent::Cleared { chat_id });
            }
        }
        None
    }

    /// Copy a message to the remote log without holding up the session
    fn spawn_mirror(&mut self, message: Message) {
        // Reap finished writes
        while self.mirror_tasks.try_join_next().is_some() {}

        let gateway = Arc::clone(&self.gateway);
        let chatflow_id = self.context.chatflow_id.clone();
        let api_key = self.context.api_key.clone();
        let chat_id = self.conversation.chat_id().to_string();
        self.mirror_tasks.spawn(async move {
            if let Err(e) = gateway.persist_message(&chatflow_id, &api_key, &message).await {
                tracing::warn!(
                    chat_id = %chat_id,
                    error = %e,
                    "Failed to mirror message to remote log"
                );
            }
        });
    }

    fn note_persistence(&mut self, result: Result<(), String>) {
        match result {
            Ok(()) => {
                if self.persistence_degraded {
                    tracing::info!(key = %self.record_key, "Durable storage recovered");
                    self.persistence_degraded = false;
                }
            }
            Err(reason) => self.mark_degraded(&reason),
        }
    }

    fn mark_degraded(&mut self, reason: &str) {
        tracing::warn!(
            key = %self.record_key,
            error = %reason,
            "Durable storage unavailable, keeping conversation in memory"
        );
        if !self.persistence_degraded {
            self.persistence_degraded = true;
            self.notify(SessionEvent::PersistenceDegraded {
                reason: reason.to_string(),
            });
        }
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events_tx.send(event);
    }
}

fn new_chat_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
