//! Turning a prediction response into an assistant message

use crate::message::{Message, SourceDocument};
use crate::transport::GENERIC_ERROR_MESSAGE;
use serde_json::Value;

/// The object the answer lives in: an inner `data` object when the body
/// wraps one, otherwise the body itself.
pub fn answer_object(envelope: &Value) -> &Value {
    match envelope.get("data") {
        Some(inner @ Value::Object(_)) => inner,
        _ => envelope,
    }
}

/// Display text for an answer.
///
/// Precedence: a non-empty `text` field, then the `json` field pretty-printed,
/// then the whole object pretty-printed.
pub fn answer_text(answer: &Value) -> String {
    if let Some(text) = answer.get("text").filter(|v| is_truthy(v)) {
        return match text {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
    }
    if let Some(json) = answer.get("json").filter(|v| is_truthy(v)) {
        return pretty(json);
    }
    pretty(answer)
}

/// Citations carried by an answer, if they decode
pub fn answer_sources(answer: &Value) -> Option<Vec<SourceDocument>> {
    let raw = answer.get("sourceDocuments").filter(|v| !v.is_null())?;
    match serde_json::from_value(raw.clone()) {
        Ok(docs) => Some(docs),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring undecodable sourceDocuments");
            None
        }
    }
}

/// Build the assistant message for a successful response
pub fn answer_message(envelope: &Value) -> Message {
    if envelope.is_null() {
        return Message::api(GENERIC_ERROR_MESSAGE);
    }
    let answer = answer_object(envelope);
    Message::api_with_sources(answer_text(answer), answer_sources(answer))
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Truthiness as the remote's clients read it: null, false, 0 and "" are empty
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
