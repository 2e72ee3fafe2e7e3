//! Property-based tests for the session state machine
//!
//! These tests verify key invariants hold across generated histories and inputs.

use super::*;
use crate::conversation::Conversation;
use crate::message::{dedupe_sources, Message, Role, SourceDocument};
use crate::persistence::{PersistedRecord, Persistence};
use crate::store::MemoryRecordStore;
use crate::transport::TransportError;
use proptest::prelude::*;
use serde_json::json;
use std::collections::HashSet;

const WELCOME: &str = "Hi there! How can I help?";

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> SessionContext {
    SessionContext::new("test-flow", WELCOME)
}

fn conversation_from(messages: Vec<Message>) -> Conversation {
    let mut conv = Conversation::new("test-chat", WELCOME);
    for msg in messages {
        conv.append(msg);
    }
    conv
}

fn appended(effects: &[Effect]) -> Vec<&Message> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::AppendMessage(m) => Some(m),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_message() -> impl Strategy<Value = Message> {
    prop_oneof![
        "[a-zA-Z0-9 ?]{1,30}".prop_map(Message::user),
        "[a-zA-Z0-9 .]{1,30}".prop_map(Message::api),
        Just(Message::user(WELCOME)),
    ]
}

fn arb_history() -> impl Strategy<Value = Vec<Message>> {
    prop::collection::vec(arb_message(), 0..12)
}

fn arb_question() -> impl Strategy<Value = String> {
    "[ ]{0,2}[a-zA-Z0-9?]{1,20}[ ]{0,2}"
}

fn arb_blank() -> impl Strategy<Value = String> {
    "[ \t\n]{0,6}"
}

fn arb_source() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("http://a.com".to_string()),
        Just("https://b.example/doc".to_string()),
        Just("https://b.example/doc#frag".to_string()),
        Just("not-a-url".to_string()),
        Just("docs/readme.md".to_string()),
        "[a-z]{1,6}".prop_map(|s| format!("https://{s}.example/")),
    ]
}

fn arb_sources() -> impl Strategy<Value = Vec<SourceDocument>> {
    prop::collection::vec(
        ("[a-z]{1,8}", arb_source()).prop_map(|(content, source)| SourceDocument::new(content, source)),
        0..10,
    )
}

fn arb_message_with_sources() -> impl Strategy<Value = Message> {
    prop_oneof![
        arb_message(),
        ("[a-zA-Z0-9 .]{1,30}", prop::option::of(arb_sources()))
            .prop_map(|(content, sources)| Message::api_with_sources(content, sources)),
    ]
}

fn arb_cited_history() -> impl Strategy<Value = Vec<Message>> {
    prop::collection::vec(arb_message_with_sources(), 0..12)
}

// ============================================================================
// Submit properties
// ============================================================================

proptest! {
    #[test]
    fn prop_submit_appends_exactly_one_user_message(history in arb_history(), question in arb_question()) {
        let conv = conversation_from(history);
        let result = transition(
            &SessionState::Idle,
            &conv,
            &test_context(),
            Event::Submit { text: question.clone() },
        ).unwrap();

        let added = appended(&result.effects);
        prop_assert_eq!(added.len(), 1);
        prop_assert_eq!(added[0], &Message::user(question));

        // The write happens before the request is issued
        let persist_at = result.effects.iter().position(Effect::is_persist).unwrap();
        let request_at = result.effects.iter()
            .position(|e| matches!(e, Effect::RequestPrediction { .. }))
            .unwrap();
        prop_assert!(persist_at < request_at);
        prop_assert!(result.new_state.is_loading());
    }

    #[test]
    fn prop_blank_submit_has_no_effect(history in arb_history(), blank in arb_blank()) {
        let conv = conversation_from(history);
        let result = transition(&SessionState::Idle, &conv, &test_context(), Event::Submit { text: blank });
        prop_assert_eq!(result.unwrap_err(), TransitionError::EmptyInput);
    }

    #[test]
    fn prop_outbound_history_never_contains_welcome(history in arb_history(), question in arb_question()) {
        let conv = conversation_from(history.clone());
        let result = transition(
            &SessionState::Idle,
            &conv,
            &test_context(),
            Event::Submit { text: question.clone() },
        ).unwrap();

        let input = result.effects.iter().find_map(|e| match e {
            Effect::RequestPrediction { input, .. } => Some(input),
            _ => None,
        }).unwrap();

        prop_assert!(input.history.iter().all(|m| m.content != WELCOME));
        prop_assert!(input.history.iter().all(|m| !m.role.is_placeholder()));
        let expected: Vec<Message> = history.into_iter().filter(|m| m.content != WELCOME).collect();
        prop_assert_eq!(&input.history, &expected);
        prop_assert_eq!(&input.question, &question);
    }

    #[test]
    fn prop_settled_result_appends_one_api_message(history in arb_history(), ok in any::<bool>()) {
        let conv = conversation_from(history);
        let event = if ok {
            Event::PredictionSucceeded { epoch: 0, envelope: json!({ "text": "answer" }) }
        } else {
            Event::PredictionFailed { epoch: 0, error: TransportError::network("down") }
        };
        let result = transition(&SessionState::Submitting { epoch: 0 }, &conv, &test_context(), event).unwrap();

        let added = appended(&result.effects);
        prop_assert_eq!(added.len(), 1);
        prop_assert_eq!(added[0].role, Role::Api);
        prop_assert!(result.effects.iter().any(Effect::is_persist));
        prop_assert_eq!(result.new_state, SessionState::Idle);
    }

    #[test]
    fn prop_results_from_old_epochs_never_apply(history in arb_history(), resets in 1u64..5) {
        let mut conv = conversation_from(history);
        for _ in 0..resets {
            conv.reset(WELCOME, None);
        }
        let current = SessionState::Submitting { epoch: conv.epoch() };
        for state in [SessionState::Idle, current] {
            let result = transition(
                &state,
                &conv,
                &test_context(),
                Event::PredictionSucceeded { epoch: 0, envelope: json!({ "text": "late" }) },
            );
            prop_assert!(
                matches!(result, Err(TransitionError::StaleResult { .. })),
                "stale result was applied"
            );
        }
    }
}

// ============================================================================
// Citation filtering properties
// ============================================================================

proptest! {
    #[test]
    fn prop_dedupe_is_an_order_preserving_subsequence(docs in arb_sources()) {
        let filtered = dedupe_sources(&docs);

        let mut cursor = docs.iter();
        for kept in &filtered {
            prop_assert!(cursor.any(|d| d == kept), "output is not a subsequence of input");
        }
    }

    #[test]
    fn prop_dedupe_keeps_one_per_url_and_every_non_url(docs in arb_sources()) {
        let filtered = dedupe_sources(&docs);

        let urls: Vec<&str> = filtered.iter().filter_map(SourceDocument::source_url).collect();
        let unique: HashSet<&str> = urls.iter().copied().collect();
        prop_assert_eq!(urls.len(), unique.len());

        let input_urls: HashSet<&str> = docs.iter().filter_map(SourceDocument::source_url).collect();
        prop_assert_eq!(unique, input_urls);

        let non_url_in = docs.iter().filter(|d| d.source_url().is_none()).count();
        let non_url_out = filtered.iter().filter(|d| d.source_url().is_none()).count();
        prop_assert_eq!(non_url_in, non_url_out);
    }

    #[test]
    fn prop_dedupe_is_idempotent(docs in arb_sources()) {
        let once = dedupe_sources(&docs);
        prop_assert_eq!(dedupe_sources(&once), once);
    }
}

// ============================================================================
// Persistence properties
// ============================================================================

proptest! {
    #[test]
    fn prop_save_load_round_trip(history in arb_cited_history(), chat_id in "[a-z0-9-]{1,36}") {
        let record = PersistedRecord { chat_id, chat_history: history };
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();

        let loaded = rt.block_on(async {
            let persistence = Persistence::new(MemoryRecordStore::new());
            persistence.save("test-flow_EXTERNAL", &record).await.unwrap();
            persistence.load("test-flow_EXTERNAL").await.unwrap()
        });

        prop_assert_eq!(loaded, Some(record));
    }
}
