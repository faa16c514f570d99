//! Streaming events for the NDJSON answer protocol.
//!
//! A client that posts a question receives one [`StreamEvent`] per line.
//! The stream always opens with `thinking` and ends with exactly one of
//! `final` or `error`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tracker::AgentAnswer;

/// An event emitted while an agent answers one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Prologue, sent before the agent produces anything.
    Thinking { message: String },

    /// Narrative text the model produced alongside tool calls.
    Reasoning { message: String },

    /// The agent started a tool invocation.
    ToolStart {
        tool_name: String,
        call_id: Option<String>,
        message: String,
        args: Map<String, Value>,
    },

    /// A tool invocation returned.
    ToolEnd {
        tool_name: String,
        call_id: Option<String>,
        message: String,
        success: bool,
        error: Option<String>,
    },

    /// Text the model produced without requesting tools.
    Answer { message: String },

    /// Terminal: the complete answer.
    Final { answer: AgentAnswer },

    /// Terminal: the stream failed.
    Error { message: String },
}

impl StreamEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Get the event type name (for logging).
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Thinking { .. } => "thinking",
            Self::Reasoning { .. } => "reasoning",
            Self::ToolStart { .. } => "tool_start",
            Self::ToolEnd { .. } => "tool_end",
            Self::Answer { .. } => "answer",
            Self::Final { .. } => "final",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final { .. } | Self::Error { .. })
    }

    /// Encode as one newline-terminated JSON line.
    pub fn encode(&self) -> Bytes {
        let mut line = serde_json::to_vec(self).unwrap_or_else(|e| {
            serde_json::json!({
                "type": "error",
                "message": format!("Failed to encode {} event: {e}", self.event_type()),
            })
            .to_string()
            .into_bytes()
        });
        line.push(b'\n');
        Bytes::from(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_start_serializes_null_call_id() {
        let event = StreamEvent::ToolStart {
            tool_name: "search_on_name".into(),
            call_id: None,
            message: "I am using tool search_on_name.".into(),
            args: Map::new(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tool_start");
        assert_eq!(json["call_id"], Value::Null);
        assert_eq!(json["args"], json!({}));
    }

    #[test]
    fn tool_end_carries_error_field() {
        let event = StreamEvent::ToolEnd {
            tool_name: "read_neo4j_cypher".into(),
            call_id: Some("c1".into()),
            message: "read_neo4j_cypher reported an error: boom failed".into(),
            success: false,
            error: Some("boom failed".into()),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tool_end");
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom failed");
    }

    #[test]
    fn encode_is_one_line() {
        let bytes = StreamEvent::Thinking {
            message: "Thinking…".into(),
        }
        .encode();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text.matches('\n').count(), 1);
        let parsed: Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(parsed, json!({"type": "thinking", "message": "Thinking…"}));
    }

    #[test]
    fn terminal_events() {
        assert!(StreamEvent::error("x").is_terminal());
        assert!(
            !StreamEvent::Answer {
                message: "x".into()
            }
            .is_terminal()
        );
        assert_eq!(StreamEvent::error("x").event_type(), "error");
    }

    #[test]
    fn event_deserialization() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"answer","message":"hi"}"#).unwrap();
        match event {
            StreamEvent::Answer { message } => assert_eq!(message, "hi"),
            _ => panic!("Wrong variant"),
        }
    }
}
