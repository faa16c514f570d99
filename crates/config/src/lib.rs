//! Configuration loading, validation, and management for cypherchat.
//!
//! Loads configuration from `~/.cypherchat/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.cypherchat/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the chat and embeddings endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Default chat model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Model used to embed document search queries
    #[serde(default = "default_embeddings_model")]
    pub embeddings_model: String,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Neo4j connection and index names
    #[serde(default)]
    pub graph: GraphConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4.1".into()
}
fn default_temperature() -> f32 {
    0.0
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_embeddings_model() -> String {
    "text-embedding-3-small".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("embeddings_model", &self.embeddings_model)
            .field("agent", &self.agent)
            .field("gateway", &self.gateway)
            .field("graph", &self.graph)
            .finish()
    }
}

/// Reasoning-loop limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model calls per question
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Approximate token budget for the history sent to the model
    #[serde(default = "default_context_token_limit")]
    pub context_token_limit: usize,

    /// Thread used when a request names none
    #[serde(default = "default_conversation_id")]
    pub default_conversation_id: String,
}

fn default_max_iterations() -> u32 {
    25
}
fn default_context_token_limit() -> usize {
    30_000
}
fn default_conversation_id() -> String {
    "1".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            context_token_limit: default_context_token_limit(),
            default_conversation_id: default_conversation_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Events buffered per stream before the agent task waits on the client
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}
fn default_stream_buffer() -> usize {
    64
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            stream_buffer: default_stream_buffer(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// HTTP endpoint of the Neo4j server, e.g. `http://localhost:7474`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default = "default_database")]
    pub database: String,

    /// Full-text index over node names
    #[serde(default = "default_name_index")]
    pub name_index: String,

    /// Vector index over document chunk embeddings
    #[serde(default = "default_vector_index")]
    pub vector_index: String,
}

fn default_database() -> String {
    "neo4j".into()
}
fn default_name_index() -> String {
    "full_text_name".into()
}
fn default_vector_index() -> String {
    "chunk-embeddings".into()
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: None,
            username: None,
            password: None,
            database: default_database(),
            name_index: default_name_index(),
            vector_index: default_vector_index(),
        }
    }
}

impl std::fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphConfig")
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("database", &self.database)
            .field("name_index", &self.name_index)
            .field("vector_index", &self.vector_index)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.cypherchat/config.toml).
    ///
    /// Environment variables take precedence over the file:
    /// - `CYPHERCHAT_API_KEY`, then `OPENAI_API_KEY` (only when no key is configured)
    /// - `CYPHERCHAT_MODEL`, `EMBEDDINGS_MODEL`
    /// - `NEO4J_URI`, `NEO4J_USERNAME`, `NEO4J_PASSWORD`, `NEO4J_DATABASE`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok().filter(|v| !v.is_empty()));
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("CYPHERCHAT_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(model) = lookup("CYPHERCHAT_MODEL") {
            self.default_model = model;
        }
        if let Some(model) = lookup("EMBEDDINGS_MODEL") {
            self.embeddings_model = model;
        }

        if let Some(uri) = lookup("NEO4J_URI") {
            self.graph.uri = Some(uri);
        }
        if let Some(username) = lookup("NEO4J_USERNAME") {
            self.graph.username = Some(username);
        }
        if let Some(password) = lookup("NEO4J_PASSWORD") {
            self.graph.password = Some(password);
        }
        if let Some(database) = lookup("NEO4J_DATABASE") {
            self.graph.database = database;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".cypherchat")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.agent.context_token_limit == 0 {
            return Err(ConfigError::ValidationError(
                "agent.context_token_limit must be > 0".into(),
            ));
        }

        if self.gateway.stream_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.stream_buffer must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Whether enough is configured to reach Neo4j.
    pub fn has_graph(&self) -> bool {
        self.graph.uri.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            embeddings_model: default_embeddings_model(),
            agent: AgentConfig::default(),
            gateway: GatewayConfig::default(),
            graph: GraphConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
