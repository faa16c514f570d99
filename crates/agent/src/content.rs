//! Canonical message content: normalization, text extraction and the
//! serialized message form sent to clients.

use cypherchat_core::message::Message;
use serde_json::{Map, Value};

/// Normalize message content into its canonical JSON form.
///
/// Scalars and maps pass through. In lists, typed text items
/// (`{"type": "text", "text": ...}`) contribute their text, other maps are
/// kept, strings pass through and anything else (nested lists included) is
/// stringified.
/// Applying it twice gives the same result as applying it once.
pub fn normalize(content: &Value) -> Value {
    match content {
        Value::Array(items) => Value::Array(items.iter().map(normalize_item).collect()),
        other => other.clone(),
    }
}

fn normalize_item(item: &Value) -> Value {
    match item {
        Value::Object(map) => match typed_text(map) {
            Some(text) => Value::String(text.to_string()),
            None => item.clone(),
        },
        Value::String(_) => item.clone(),
        other => Value::String(other.to_string()),
    }
}

fn typed_text(map: &Map<String, Value>) -> Option<&str> {
    if map.get("type").and_then(Value::as_str) != Some("text") {
        return None;
    }
    map.get("text").and_then(Value::as_str)
}

/// Extract the readable text of message content, trimmed.
///
/// Lists join their string and typed-text parts with newlines, ignoring
/// untyped maps; a bare map uses its `text` field. Returns `None` when nothing readable remains.
pub fn message_text(content: &Value) -> Option<String> {
    let text = match content {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => {
            let parts: Vec<&str> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim()),
                    Value::Object(map) => typed_text(map).map(str::trim),
                    _ => None,
                })
                .filter(|part| !part.is_empty())
                .collect();
            parts.join("\n")
        }
        Value::Object(map) => match map.get("text") {
            Some(Value::String(s)) => s.trim().to_string(),
            _ => content.to_string(),
        },
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// The canonical, client-facing form of a message.
///
/// Tool calls are flattened to `{name, id, args}` with coerced arguments.
pub fn serialise_message(message: &Message) -> Value {
    let mut payload = Map::new();
    payload.insert("type".into(), Value::String(message.kind().into()));
    payload.insert("content".into(), normalize(message.content()));

    if let Some(name) = message.name() {
        payload.insert("name".into(), Value::String(name.into()));
    }
    if let Some(id) = message.id() {
        payload.insert("id".into(), Value::String(id.into()));
    }

    match message {
        Message::Tool {
            tool_call_id: Some(call_id),
            ..
        } => {
            payload.insert("tool_call_id".into(), Value::String(call_id.clone()));
        }
        Message::Ai {
            tool_calls, usage, ..
        } => {
            if !tool_calls.is_empty() {
                let calls = tool_calls
                    .iter()
                    .map(|call| {
                        let details = call.details();
                        serde_json::json!({
                            "name": details.name,
                            "id": details.call_id,
                            "args": details.args,
                        })
                    })
                    .collect();
                payload.insert("tool_calls".into(), Value::Array(calls));
            }
            if let Some(usage) = usage {
                payload.insert(
                    "usage".into(),
                    serde_json::json!({
                        "prompt_tokens": usage.prompt_tokens,
                        "completion_tokens": usage.completion_tokens,
                        "total_tokens": usage.total_tokens,
                    }),
                );
            }
        }
        _ => {}
    }

    Value::Object(payload)
}
