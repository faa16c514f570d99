//! # cypherchat core
//!
//! Domain types, traits, and error definitions for the cypherchat graph agent.
//! This crate performs no I/O. It defines the domain model that all other
//! crates implement against.
//!
//! Every seam is a trait here ([`Agent`], [`Provider`], [`Tool`],
//! [`GraphStore`]); implementations live in their respective crates and tests
//! swap in scripted stand-ins.

pub mod agent;
pub mod error;
pub mod graph;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{Agent, AgentInput, NodeUpdate, PRE_MODEL_HOOK, UpdateBatch, UpdateStream};
pub use error::{Error, GraphError, ProviderError, Result, ToolError};
pub use graph::{GraphStore, Record};
pub use message::{Conversation, ConversationId, Message, ToolCallDetails, ToolCallRecord};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::{RenderMode, Tool, ToolCall, ToolContext, ToolRegistry, ToolResult};
