//! Error types for the cypherchat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] is the umbrella
//! that stream-level failures are reported through.

use thiserror::Error;

/// The top-level error type for all cypherchat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Graph store errors ---
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    // --- Stream errors ---
    /// The conversation ended without any AI-authored text.
    #[error("Agent did not return a textual response.")]
    NoAnswer,

    /// The reasoning loop failed while being iterated.
    #[error("{0}")]
    UpstreamAgent(String),

    /// The agent exceeded its tool-call iteration budget.
    #[error("Recursion limit of {0} reached without hitting a stop condition.")]
    IterationLimit(u32),

    /// A message record matched none of the known shapes.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// The incoming request was rejected before streaming started.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Graph(#[from] GraphError),

    #[error("{0}")]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Clone, Error)]
pub enum GraphError {
    #[error("Graph store not configured: {0}")]
    NotConfigured(String),

    #[error("Graph connection failed: {0}")]
    Connection(String),

    #[error("Cypher query failed: {code}: {message}")]
    Query { code: String, message: String },

    #[error("Unexpected graph response: {0}")]
    Protocol(String),
}
