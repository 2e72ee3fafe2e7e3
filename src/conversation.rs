//! In-memory conversation log for the active session

use crate::message::Message;
use crate::persistence::PersistedRecord;

/// Ordered message history plus the identifiers that scope it.
///
/// The first message is always the locally synthesized welcome. `epoch`
/// increases every time the log is reset or replaced, so work started against
/// an older log can be recognized when it finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    chat_id: String,
    history: Vec<Message>,
    epoch: u64,
}

impl Conversation {
    pub fn new(chat_id: impl Into<String>, welcome: &str) -> Self {
        Self {
            chat_id: chat_id.into(),
            history: vec![Message::api(welcome)],
            epoch: 0,
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn append(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Back to a lone welcome message, optionally under a new chat id
    pub fn reset(&mut self, welcome: &str, chat_id: Option<String>) {
        if let Some(chat_id) = chat_id {
            self.chat_id = chat_id;
        }
        self.history = vec![Message::api(welcome)];
        self.epoch += 1;
    }

    /// Swap in a restored or imported history
    pub fn replace(&mut self, chat_id: String, history: Vec<Message>) {
        self.chat_id = chat_id;
        self.history = history;
        self.epoch += 1;
    }

    /// True when nothing beyond the welcome message has been said
    pub fn is_pristine(&self, welcome: &str) -> bool {
        self.history.iter().all(|m| m.content == welcome)
    }

    /// Prior turns to send with a question: every message whose content is
    /// the welcome text is dropped, as are placeholders.
    pub fn outbound_history(&self, welcome: &str) -> Vec<Message> {
        self.history
            .iter()
            .filter(|m| m.content != welcome && !m.role.is_placeholder())
            .cloned()
            .collect()
    }

    pub fn to_record(&self) -> PersistedRecord {
        PersistedRecord {
            chat_id: self.chat_id.clone(),
            chat_history: self.history.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELCOME: &str = "Hi there! How can I help?";

    #[test]
    fn test_new_starts_with_welcome() {
        let conv = Conversation::new("c1", WELCOME);
        assert_eq!(conv.history(), &[Message::api(WELCOME)]);
        assert_eq!(conv.epoch(), 0);
        assert!(conv.is_pristine(WELCOME));
    }

    #[test]
    fn test_outbound_history_filters_welcome_and_placeholders() {
        let mut conv = Conversation::new("c1", WELCOME);
        conv.append(Message::user("Q1"));
        conv.append(Message::waiting());
        conv.append(Message::api("A1"));

        assert_eq!(
            conv.outbound_history(WELCOME),
            vec![Message::user("Q1"), Message::api("A1")]
        );
        assert!(!conv.is_pristine(WELCOME));
    }

    #[test]
    fn test_outbound_history_drops_any_welcome_copy() {
        let mut conv = Conversation::new("c1", WELCOME);
        conv.append(Message::user(WELCOME));
        conv.append(Message::user("Q1"));
        assert_eq!(conv.outbound_history(WELCOME), vec![Message::user("Q1")]);
    }

    #[test]
    fn test_reset_and_replace_bump_epoch() {
        let mut conv = Conversation::new("c1", WELCOME);
        conv.append(Message::user("Q1"));

        conv.reset(WELCOME, None);
        assert_eq!(conv.chat_id(), "c1");
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.epoch(), 1);

        conv.reset(WELCOME, Some("c2".to_string()));
        assert_eq!(conv.chat_id(), "c2");
        assert_eq!(conv.epoch(), 2);

        conv.replace("c3".to_string(), vec![Message::api(WELCOME), Message::user("x")]);
        assert_eq!(conv.chat_id(), "c3");
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.epoch(), 3);
    }

    #[test]
    fn test_to_record() {
        let mut conv = Conversation::new("c1", WELCOME);
        conv.append(Message::user("Q1"));
        let record = conv.to_record();
        assert_eq!(record.chat_id, "c1");
        assert_eq!(record.chat_history.len(), 2);
    }
}
