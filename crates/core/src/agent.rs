//! The agent contract consumed by the streaming core.
//!
//! An agent turns one question into a lazy, forward-only sequence of
//! [`UpdateBatch`]es. Each batch maps node names to the messages that node
//! produced. The stream owns the conversation guard, so dropping it releases
//! the conversation for the next question.

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OwnedMutexGuard;

use crate::error::Result;
use crate::message::Conversation;
use crate::tool::RenderMode;

/// Node name of the pre-processing step that prepares model input.
/// Its messages are not conversation content.
pub const PRE_MODEL_HOOK: &str = "pre_model_hook";

/// One question for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInput {
    pub question: String,
    #[serde(default)]
    pub render_mode: RenderMode,
}

/// The messages a single node emitted in one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdate {
    pub node: String,
    /// Raw message records, validated by the consumer on ingestion.
    #[serde(default)]
    pub messages: Vec<Value>,
}

impl NodeUpdate {
    pub fn new(node: impl Into<String>, messages: Vec<Value>) -> Self {
        Self {
            node: node.into(),
            messages,
        }
    }

    pub fn is_pre_model_hook(&self) -> bool {
        self.node == PRE_MODEL_HOOK
    }
}

/// One emission from the agent loop, in node order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateBatch {
    pub updates: Vec<NodeUpdate>,
}

impl UpdateBatch {
    /// A batch with a single node update.
    pub fn single(node: impl Into<String>, messages: Vec<Value>) -> Self {
        Self {
            updates: vec![NodeUpdate::new(node, messages)],
        }
    }
}

/// The stream of update batches an agent produces for one question.
pub type UpdateStream = Pin<Box<dyn Stream<Item = Result<UpdateBatch>> + Send>>;

/// A reasoning loop that answers questions against a conversation thread.
pub trait Agent: Send + Sync {
    /// Start answering `input` on `thread`.
    ///
    /// The returned stream holds the guard until it completes or is dropped.
    /// An `Err` item ends the run; implementations yield nothing after it.
    fn stream(&self, thread: OwnedMutexGuard<Conversation>, input: AgentInput) -> UpdateStream;
}
