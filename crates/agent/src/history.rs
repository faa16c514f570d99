//! Trimming conversation history to fit the model's context.
//!
//! Uses a character-based heuristic: ~4 characters per token.

use cypherchat_core::message::Message;
use serde_json::Value;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4)
}

/// Estimate tokens for a single message including per-message overhead.
///
/// Each message costs ~4 tokens of overhead for role name, delimiters,
/// and formatting markers in the API wire format.
pub fn estimate_message_tokens(message: &Message) -> usize {
    let overhead = 4;
    let content = match message.content() {
        Value::String(text) => estimate_tokens(text),
        Value::Null => 0,
        other => estimate_tokens(&other.to_string()),
    };
    let calls: usize = message
        .tool_calls()
        .iter()
        .map(|call| estimate_tokens(&serde_json::to_string(call).unwrap_or_default()))
        .sum();
    overhead + content + calls
}

/// Keep the most recent messages that fit in `max_tokens`.
///
/// The kept window always starts on a human message so tool results are
/// never separated from the call that requested them. If even the latest
/// question does not fit, the window starts at that question anyway.
pub fn trim_history(messages: &[Message], max_tokens: usize) -> Vec<Message> {
    let mut used = 0;
    let mut start = messages.len();
    for (index, message) in messages.iter().enumerate().rev() {
        let cost = estimate_message_tokens(message);
        if used + cost > max_tokens {
            break;
        }
        used += cost;
        start = index;
    }

    let window = &messages[start..];
    match window.iter().position(Message::is_human) {
        Some(offset) => window[offset..].to_vec(),
        None => match messages.iter().rposition(Message::is_human) {
            Some(last_question) => messages[last_question..].to_vec(),
            None => window.to_vec(),
        },
    }
}
