//! Mapping of upstream error bodies onto `ClientError`
//!
//! The server reports a missing model through a generic client or server
//! error status plus a freeform message, e.g.
//! `{"error":"model 'llama2' not found"}` or
//! `{"error":"pull model manifest: file does not exist"}`.
//! There is no structured error code, so detection is substring matching on
//! that message. The wording is an upstream contract, not a protocol
//! guarantee: when it changes, a missing model falls through to
//! `RequestFailed`. All call sites go through [`classify_failure`] so the
//! heuristic only has to be updated here.

use serde_json::Value;

use crate::errors::{snippet, ClientError};

/// Phrases meaning "absent"
const ABSENCE_PHRASES: &[&str] = &["not found", "does not exist", "no such model"];

/// Words that tie an absence phrase to a model rather than some other resource
const MODEL_MARKERS: &[&str] = &["model", "manifest"];

/// Classify a non-success response
///
/// `model` is the name the caller asked for, when the call is about one.
pub fn classify_failure(status: u16, body: &str, model: Option<&str>) -> ClientError {
    let message = error_message(body);

    if let Some(name) = model {
        if is_missing_model(&message, name) {
            tracing::warn!("Model '{}' reported missing (HTTP {})", name, status);
            return ClientError::ModelNotFound {
                name: name.to_string(),
                message,
            };
        }
    }

    tracing::warn!("Request failed with HTTP {}: {}", status, message);
    ClientError::RequestFailed {
        status,
        body: snippet(body),
    }
}

/// Extract the human-readable message from an error body
///
/// Accepts `{"error": "..."}`, `{"message": "..."}` and the nested
/// `{"error": {"message": "..."}}` shape; anything else is returned as-is.
pub fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };

    let found = match &value["error"] {
        Value::String(s) => Some(s.as_str()),
        Value::Object(_) => value["error"]["message"].as_str(),
        _ => None,
    }
    .or_else(|| value["message"].as_str());

    match found {
        Some(message) => message.to_string(),
        None => body.trim().to_string(),
    }
}

/// True when `message` says the model `name` is absent
pub fn is_missing_model(message: &str, name: &str) -> bool {
    let lower = message.to_lowercase();

    let says_absent = ABSENCE_PHRASES.iter().any(|p| lower.contains(p));
    if !says_absent {
        return false;
    }

    let mentions_model = (!name.is_empty() && lower.contains(&name.to_lowercase()))
        || MODEL_MARKERS.iter().any(|m| lower.contains(m));

    mentions_model
}
