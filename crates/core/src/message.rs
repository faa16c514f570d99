//! Message and Conversation domain types.
//!
//! Messages are what the agent loop emits in its update batches and what the
//! streaming tracker ingests. The shape is a tagged union over the four
//! authors a conversation can have; `content` stays an opaque JSON value
//! because tools and models are free to return text, content-part lists or
//! arbitrary structured payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::provider::Usage;

/// Unique identifier for a conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single message in a conversation, discriminated by author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// The end user.
    #[serde(alias = "user")]
    Human {
        #[serde(default)]
        content: Value,
        #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    /// The model. May request tool invocations.
    #[serde(alias = "assistant")]
    Ai {
        #[serde(default)]
        content: Value,
        #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, deserialize_with = "lenient::tool_calls", skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRecord>,
        #[serde(default, deserialize_with = "lenient::usage", skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },

    /// The result of a tool invocation.
    Tool {
        #[serde(default)]
        content: Value,
        #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
    },

    /// System instructions.
    System {
        #[serde(default)]
        content: Value,
        #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
}

impl Message {
    /// Create a new human message.
    pub fn human(content: impl Into<String>) -> Self {
        Self::Human {
            content: Value::String(content.into()),
            id: Some(Uuid::new_v4().to_string()),
            name: None,
        }
    }

    /// Create a new AI message without tool calls.
    pub fn ai(content: impl Into<String>) -> Self {
        Self::ai_with_tool_calls(Value::String(content.into()), Vec::new())
    }

    /// Create a new AI message requesting tool invocations.
    pub fn ai_with_tool_calls(content: Value, tool_calls: Vec<ToolCallRecord>) -> Self {
        Self::Ai {
            content,
            id: Some(Uuid::new_v4().to_string()),
            name: None,
            tool_calls,
            usage: None,
        }
    }

    /// Create a tool result message.
    pub fn tool(
        tool_call_id: Option<String>,
        name: impl Into<String>,
        content: impl Into<Value>,
    ) -> Self {
        Self::Tool {
            content: content.into(),
            id: Some(Uuid::new_v4().to_string()),
            name: Some(name.into()),
            tool_call_id,
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: Value::String(content.into()),
            id: Some(Uuid::new_v4().to_string()),
        }
    }

    /// Decode a raw JSON record into a message.
    ///
    /// This is the single validating step at ingestion: a record that is
    /// not an object, or whose `type` is not one of the known authors,
    /// is rejected with [`Error::MalformedMessage`]. Individual fields are
    /// read leniently: scalar ids become strings, a `null` or lone
    /// `tool_calls` entry becomes an empty or one-element list (non-object
    /// entries are dropped), and an unreadable `usage` is dropped.
    pub fn decode(raw: Value) -> Result<Self> {
        serde_json::from_value(raw).map_err(|e| Error::MalformedMessage(e.to_string()))
    }

    /// The wire discriminator of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Human { .. } => "human",
            Self::Ai { .. } => "ai",
            Self::Tool { .. } => "tool",
            Self::System { .. } => "system",
        }
    }

    pub fn content(&self) -> &Value {
        match self {
            Self::Human { content, .. }
            | Self::Ai { content, .. }
            | Self::Tool { content, .. }
            | Self::System { content, .. } => content,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Human { id, .. }
            | Self::Ai { id, .. }
            | Self::Tool { id, .. }
            | Self::System { id, .. } => id.as_deref(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Human { name, .. } | Self::Ai { name, .. } | Self::Tool { name, .. } => {
                name.as_deref()
            }
            Self::System { .. } => None,
        }
    }

    /// Tool calls requested by an AI message; empty for every other author.
    pub fn tool_calls(&self) -> &[ToolCallRecord] {
        match self {
            Self::Ai { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    pub fn is_human(&self) -> bool {
        matches!(self, Self::Human { .. })
    }
}

/// Field deserializers that default instead of failing.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::ToolCallRecord;
    use crate::provider::Usage;

    /// Strings pass through, numbers and booleans are stringified, anything
    /// else is `None`.
    pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    pub fn tool_calls<'de, D>(deserializer: D) -> Result<Vec<ToolCallRecord>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let items = match Value::deserialize(deserializer)? {
            Value::Null => Vec::new(),
            Value::Array(items) => items,
            single => vec![single],
        };
        Ok(items
            .into_iter()
            .filter(Value::is_object)
            .map(|item| {
                serde_json::from_value(item.clone()).unwrap_or(ToolCallRecord::Other(item))
            })
            .collect())
    }

    pub fn usage<'de, D>(deserializer: D) -> Result<Option<Usage>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
    }
}

/// A tool-call request as it appears inside an AI message.
///
/// Agents emit calls in two shapes: the OpenAI wire shape
/// `{id, function: {name, arguments}}` and the flattened
/// `{id, name, args}` shape. Anything else is kept verbatim and probed
/// leniently so a single odd record never fails a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolCallRecord {
    Nested {
        #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        function: FunctionCall,
    },
    Flat {
        #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default)]
        args: Value,
    },
    Other(Value),
}

/// The `function` member of a nested tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default, deserialize_with = "lenient::string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Usually a JSON-encoded string, occasionally an object.
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCallRecord {
    /// Build a flat record with structured arguments.
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self::Flat {
            id: Some(id.into()),
            name: Some(name.into()),
            args,
        }
    }

    /// The requested tool name, if the record names one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Nested { function, .. } => function.name.as_deref(),
            Self::Flat { name, .. } => name.as_deref(),
            Self::Other(raw) => raw
                .get("function")
                .and_then(|f| f.get("name"))
                .or_else(|| raw.get("name"))
                .and_then(Value::as_str),
        }
    }

    /// The raw arguments, before any coercion. `Null` when absent.
    pub fn raw_arguments(&self) -> &Value {
        match self {
            Self::Nested { function, .. } => &function.arguments,
            Self::Flat { args, .. } => args,
            Self::Other(raw) => match raw.get("function") {
                Some(function) if function.is_object() => {
                    function.get("arguments").unwrap_or(&Value::Null)
                }
                _ => raw.get("args").unwrap_or(&Value::Null),
            },
        }
    }

    /// The correlation key linking this call to its eventual result.
    pub fn call_id(&self) -> Option<String> {
        match self {
            Self::Nested { id, .. } | Self::Flat { id, .. } => id.clone(),
            Self::Other(raw) => match raw.get("id") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Null) | None => None,
                Some(other) => Some(other.to_string()),
            },
        }
    }

    /// Resolve name, coerced arguments and call id, defaulting the name to
    /// `"unknown"` and the arguments to an empty map.
    pub fn details(&self) -> ToolCallDetails {
        let name = match self.name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => "unknown".to_string(),
        };
        ToolCallDetails {
            name,
            args: coerce_tool_args(self.raw_arguments()),
            call_id: self.call_id(),
        }
    }
}

/// A tool call reduced to the parts the stream tracker cares about.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallDetails {
    pub name: String,
    pub args: Map<String, Value>,
    pub call_id: Option<String>,
}

/// Turn raw tool arguments into a string-keyed map.
///
/// Maps pass through. Strings holding a JSON object are parsed; any other
/// string or scalar is wrapped as `{"input": value}`. `Null` is empty.
pub fn coerce_tool_args(raw: &Value) -> Map<String, Value> {
    match raw {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => map,
            _ => wrap_input(raw.clone()),
        },
        other => wrap_input(other.clone()),
    }
}

fn wrap_input(value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("input".to_string(), value);
    map
}

/// A conversation thread: the memory the agent reasons over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,

    /// Ordered messages
    pub messages: Vec<Message>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        Self::with_id(ConversationId::new())
    }

    /// Create an empty conversation with a known ID.
    pub fn with_id(id: ConversationId) -> Self {
        let now = Utc::now();
        Self {
            id,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a message to the conversation.
    pub fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_human_message() {
        let msg = Message::human("Hello, agent!");
        assert_eq!(msg.kind(), "human");
        assert_eq!(msg.content(), &json!("Hello, agent!"));
        assert!(msg.tool_calls().is_empty());
    }

    #[test]
    fn conversation_tracks_updates() {
        let mut conv = Conversation::new();
        let created = conv.created_at;

        conv.push(Message::human("First message"));
        assert_eq!(conv.messages.len(), 1);
        assert!(conv.updated_at >= created);
    }

    #[test]
    fn decode_accepts_role_aliases() {
        let msg = Message::decode(json!({"type": "assistant", "content": "hi"})).unwrap();
        assert_eq!(msg.kind(), "ai");

        let msg = Message::decode(json!({"type": "user", "content": "q"})).unwrap();
        assert!(msg.is_human());
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        let err = Message::decode(json!({"type": "function", "content": "x"})).unwrap_err();
        assert!(matches!(err, Error::MalformedMessage(_)));

        let err = Message::decode(json!(["ai", "tuple-shaped"])).unwrap_err();
        assert!(matches!(err, Error::MalformedMessage(_)));
    }

    #[test]
    fn decode_tool_message_with_call_id() {
        let msg = Message::decode(json!({
            "type": "tool",
            "name": "search_on_name",
            "tool_call_id": "call_1",
            "content": "[]"
        }))
        .unwrap();
        match msg {
            Message::Tool { tool_call_id, .. } => assert_eq!(tool_call_id.as_deref(), Some("call_1")),
            other => panic!("Expected tool message, got {other:?}"),
        }
    }

    #[test]
    fn nested_tool_call_shape() {
        let record: ToolCallRecord = serde_json::from_value(json!({
            "id": "call_9",
            "type": "function",
            "function": {"name": "read_neo4j_cypher", "arguments": "{\"query\": \"RETURN 1\"}"}
        }))
        .unwrap();
        assert!(matches!(record, ToolCallRecord::Nested { .. }));
        assert_eq!(record.name(), Some("read_neo4j_cypher"));
        assert_eq!(record.call_id().as_deref(), Some("call_9"));
        assert!(record.raw_arguments().is_string());
    }

    #[test]
    fn flat_tool_call_shape() {
        let record: ToolCallRecord = serde_json::from_value(json!({
            "name": "search_on_name",
            "args": {"name": "Foo"},
            "id": "c1"
        }))
        .unwrap();
        assert!(matches!(record, ToolCallRecord::Flat { .. }));
        assert_eq!(record.name(), Some("search_on_name"));
        assert_eq!(record.raw_arguments(), &json!({"name": "Foo"}));
    }

    #[test]
    fn odd_tool_call_is_probed_leniently() {
        let record: ToolCallRecord =
            serde_json::from_value(json!({"id": 42, "name": "search_documents"})).unwrap();
        assert!(matches!(record, ToolCallRecord::Flat { .. }));
        assert_eq!(record.name(), Some("search_documents"));
        assert_eq!(record.call_id().as_deref(), Some("42"));
        assert!(record.raw_arguments().is_null());

        let record: ToolCallRecord = serde_json::from_value(json!("garbage")).unwrap();
        assert_eq!(record.name(), None);
        assert_eq!(record.call_id(), None);
        assert_eq!(record.details().name, "unknown");
        assert!(record.details().args.is_empty());
    }

    #[test]
    fn string_arguments_are_parsed() {
        let args = coerce_tool_args(&json!("{\"query\": \"RETURN 1\"}"));
        assert_eq!(args.get("query"), Some(&json!("RETURN 1")));
    }

    #[test]
    fn non_object_arguments_are_wrapped() {
        assert_eq!(coerce_tool_args(&json!("not json")), wrap_input(json!("not json")));
        assert_eq!(coerce_tool_args(&json!("[1, 2]")), wrap_input(json!("[1, 2]")));
        assert_eq!(coerce_tool_args(&json!(7)), wrap_input(json!(7)));
        assert!(coerce_tool_args(&Value::Null).is_empty());
    }

    #[test]
    fn null_tool_calls_decode_as_empty() {
        let msg = Message::decode(json!({
            "type": "ai",
            "content": "Foo was built in 1999.",
            "tool_calls": null
        }))
        .unwrap();
        assert!(msg.tool_calls().is_empty());
        assert_eq!(msg.content(), &json!("Foo was built in 1999."));
    }

    #[test]
    fn lone_tool_call_is_wrapped() {
        let msg = Message::decode(json!({
            "type": "ai",
            "content": "",
            "tool_calls": {"id": "c1", "name": "search_on_name", "args": {"name": "Foo"}}
        }))
        .unwrap();
        assert_eq!(msg.tool_calls().len(), 1);
        assert_eq!(msg.tool_calls()[0].name(), Some("search_on_name"));
    }

    #[test]
    fn scalar_ids_are_stringified() {
        let msg = Message::decode(json!({
            "type": "tool",
            "id": 12,
            "name": "search_on_name",
            "tool_call_id": 7,
            "content": "[]"
        }))
        .unwrap();
        assert_eq!(msg.id(), Some("12"));
        match msg {
            Message::Tool { tool_call_id, .. } => assert_eq!(tool_call_id.as_deref(), Some("7")),
            other => panic!("Expected tool message, got {other:?}"),
        }

        let record: ToolCallRecord = serde_json::from_value(json!({
            "id": 3,
            "function": {"name": "get_neo4j_schema", "arguments": "{}"}
        }))
        .unwrap();
        assert!(matches!(record, ToolCallRecord::Nested { .. }));
        assert_eq!(record.call_id().as_deref(), Some("3"));
    }

    #[test]
    fn unreadable_usage_is_dropped() {
        let msg = Message::decode(json!({
            "type": "ai",
            "content": "done",
            "usage": {"prompt_tokens": "many"}
        }))
        .unwrap();
        match msg {
            Message::Ai { usage, .. } => assert!(usage.is_none()),
            other => panic!("Expected ai message, got {other:?}"),
        }
    }

    #[test]
    fn missing_content_defaults_to_null() {
        let msg = Message::decode(json!({"type": "human"})).unwrap();
        assert!(msg.content().is_null());
    }
}
