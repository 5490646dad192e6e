//! # HTTP Response Helpers
//!
//! Response bodies are parsed into JSON when possible; anything else is kept
//! as text so the report can still show what came back.

use serde_json::Value;

/// Return a short hint for status codes operators commonly hit.
///
/// # Example
/// ```rust
/// use dashprobe_util::http::status_error_message;
///
/// assert!(status_error_message(401).unwrap().contains("Unauthorized"));
/// assert!(status_error_message(403).unwrap().contains("Forbidden"));
/// assert!(status_error_message(404).is_none());
/// ```
pub fn status_error_message(status_code: u16) -> Option<String> {
    match status_code {
        401 => Some("Unauthorized (401). Hint: set DASHPROBE_AUTH_TOKEN to exercise protected endpoints".into()),
        403 => Some("Forbidden (403). Hint: the caller lacks permission or the route is not mapped".into()),
        502 | 503 | 504 => Some(format!("Upstream unavailable ({status_code}). Hint: check the backing function and gateway integration")),
        _ => None,
    }
}

/// Parse a response body into JSON.
///
/// Empty bodies become `Value::Null`; bodies that are not JSON are returned as
/// `Value::String` so callers never lose the payload.
pub fn parse_response_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str::<Value>(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Byte length of the JSON-serialized form of `value`.
pub fn serialized_size(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        other => serde_json::to_vec(other).map(|bytes| bytes.len()).unwrap_or(0),
    }
}

/// Collapse whitespace and cap `text` at roughly `limit` characters.
pub fn truncate_response_preview(text: &str, limit: usize) -> String {
    if text.trim().is_empty() {
        return "<empty>".to_string();
    }

    let mut preview = String::new();
    for ch in text.chars() {
        if preview.len() >= limit {
            preview.push_str("...");
            break;
        }
        match ch {
            '\n' | '\r' | '\t' => {
                if !preview.ends_with(' ') {
                    preview.push(' ');
                }
            }
            _ => preview.push(ch),
        }
    }

    preview.trim().to_string()
}
