//! Tolerant decoding of host read payloads.
//!
//! Hosts answer in several shapes. A payload is either a JSON array of line
//! records, a JSON object carrying the array under `messages` or `lines`,
//! newline-delimited JSON, or plain text. A line record is either a bare
//! string or an object with a string under `text` or `message`. Anything
//! else decodes to an empty line, which callers skip.

use serde_json::Value;

/// Object fields that may hold the line list, in lookup order.
const LIST_FIELDS: &[&str] = &["messages", "lines"];
/// Object fields that may hold a line's text, in lookup order.
const TEXT_FIELDS: &[&str] = &["text", "message"];

/// Decode a raw payload into line records.
pub fn decode_payload(raw: &str) -> Vec<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if (trimmed.starts_with('[') || trimmed.starts_with('{'))
        && let Ok(value) = serde_json::from_str::<Value>(trimmed)
    {
        return response_lines(value);
    }
    raw.lines().map(decode_line).collect()
}

/// One line of a line-oriented payload: a JSON string/object if it parses
/// as one, otherwise the text itself.
fn decode_line(line: &str) -> Value {
    let trimmed = line.trim();
    if (trimmed.starts_with('{') || trimmed.starts_with('"'))
        && let Ok(v @ (Value::Object(_) | Value::String(_))) = serde_json::from_str(trimmed)
    {
        return v;
    }
    Value::String(line.to_string())
}

/// Extract the line list from a decoded response value.
pub fn response_lines(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => LIST_FIELDS
            .iter()
            .find_map(|field| match map.remove(*field) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Plain text of one line record; empty for unrecognized shapes.
pub fn line_text(record: &Value) -> String {
    match record {
        Value::String(s) => s.clone(),
        Value::Object(map) => TEXT_FIELDS
            .iter()
            .find_map(|field| map.get(*field).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}
