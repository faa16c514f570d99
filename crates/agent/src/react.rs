//! ReAct loop: model call → tool calls → tool results → model call …
//!
//! The loop terminates when the model returns a response with no tool
//! calls, or fails when the iteration limit is reached. Each step is
//! published as an [`UpdateBatch`]:
//!
//! - `pre_model_hook`: the trimmed history sent to the model
//! - `agent`: the model's reply
//! - `tools`: the results of the tool calls the reply requested

use std::sync::Arc;

use cypherchat_config::AppConfig;
use cypherchat_core::agent::{Agent, AgentInput, PRE_MODEL_HOOK, UpdateBatch, UpdateStream};
use cypherchat_core::error::{Error, Result};
use cypherchat_core::message::{Conversation, Message};
use cypherchat_core::provider::{Provider, ProviderRequest};
use cypherchat_core::tool::{ToolCall, ToolContext, ToolRegistry};
use serde_json::Value;
use tokio::sync::{OwnedMutexGuard, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::history::trim_history;

pub const AGENT_NODE: &str = "agent";
pub const TOOLS_NODE: &str = "tools";

/// A tool-calling agent over an OpenAI-style chat model.
pub struct ReactAgent {
    /// LLM provider.
    provider: Arc<dyn Provider>,
    /// Model name.
    model: String,
    /// Temperature.
    temperature: f32,
    /// Max tokens per response.
    max_tokens: Option<u32>,
    /// Tool registry.
    tools: Arc<ToolRegistry>,
    system_prompt: String,
    /// Maximum model calls per question.
    max_iterations: u32,
    /// History budget for each model call, in estimated tokens.
    context_token_limit: usize,
}

impl ReactAgent {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            tools,
            system_prompt: system_prompt.into(),
            max_iterations: 25,
            context_token_limit: 30_000,
        }
    }

    /// Apply model and loop settings from configuration.
    pub fn configured(mut self, config: &AppConfig) -> Self {
        self.temperature = config.default_temperature;
        self.max_tokens = Some(config.default_max_tokens);
        self.max_iterations = config.agent.max_iterations;
        self.context_token_limit = config.agent.context_token_limit;
        self
    }

    /// Set max iterations.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the history budget in estimated tokens.
    pub fn with_context_token_limit(mut self, limit: usize) -> Self {
        self.context_token_limit = limit;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

fn encode_messages(messages: &[Message]) -> Result<Vec<Value>> {
    messages
        .iter()
        .map(|message| serde_json::to_value(message).map_err(Error::from))
        .collect()
}

struct Run {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<ToolRegistry>,
    system_prompt: String,
    max_iterations: u32,
    context_token_limit: usize,
    tx: mpsc::Sender<Result<UpdateBatch>>,
}

impl Run {
    /// Publish a batch. `false` means the consumer is gone.
    async fn publish(&self, node: &str, messages: &[Message]) -> bool {
        let item = encode_messages(messages).map(|encoded| UpdateBatch::single(node, encoded));
        self.tx.send(item).await.is_ok()
    }

    async fn fail(&self, error: Error) {
        let _ = self.tx.send(Err(error)).await;
    }

    async fn drive(self, mut thread: OwnedMutexGuard<Conversation>, input: AgentInput) {
        let conversation_id = thread.id.to_string();
        let context = ToolContext {
            render_mode: input.render_mode,
        };
        let tool_defs = self.tools.definitions();
        thread.push(Message::human(input.question));

        for iteration in 1..=self.max_iterations {
            let history = trim_history(&thread.messages, self.context_token_limit);
            debug!(
                conversation_id = %conversation_id,
                iteration,
                kept = history.len(),
                total = thread.messages.len(),
                "Prepared model input"
            );
            if !self.publish(PRE_MODEL_HOOK, &history).await {
                return;
            }

            let mut messages = vec![Message::system(self.system_prompt.as_str())];
            messages.extend(history);
            let request = ProviderRequest {
                model: self.model.clone(),
                messages,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_defs.clone(),
            };

            let response = tokio::select! {
                _ = self.tx.closed() => return,
                response = self.provider.complete(request) => response,
            };
            let reply = match response {
                Ok(response) => response.message,
                Err(e) => {
                    warn!(conversation_id = %conversation_id, error = %e, "Model call failed");
                    self.fail(e.into()).await;
                    return;
                }
            };

            let calls = reply.tool_calls().to_vec();
            thread.push(reply.clone());
            if !self.publish(AGENT_NODE, std::slice::from_ref(&reply)).await {
                return;
            }
            if calls.is_empty() {
                debug!(conversation_id = %conversation_id, iteration, "Agent finished");
                return;
            }

            let mut results = Vec::with_capacity(calls.len());
            for record in &calls {
                let details = record.details();
                let call = ToolCall {
                    id: details.call_id.clone(),
                    name: details.name.clone(),
                    arguments: Value::Object(details.args),
                };
                let outcome = tokio::select! {
                    _ = self.tx.closed() => return,
                    outcome = self.tools.execute(&call, &context) => outcome,
                };
                let content = match outcome {
                    Ok(result) => {
                        info!(tool = %call.name, success = true, "Tool executed");
                        result.output
                    }
                    Err(e) => {
                        info!(tool = %call.name, success = false, error = %e, "Tool executed");
                        format!("Error: {e}")
                    }
                };
                let message = Message::tool(details.call_id, details.name, content);
                thread.push(message.clone());
                results.push(message);
            }

            if !self.publish(TOOLS_NODE, &results).await {
                return;
            }
        }

        warn!(
            conversation_id = %conversation_id,
            max_iterations = self.max_iterations,
            "Iteration limit reached"
        );
        self.fail(Error::IterationLimit(self.max_iterations)).await;
    }
}

impl Agent for ReactAgent {
    fn stream(&self, thread: OwnedMutexGuard<Conversation>, input: AgentInput) -> UpdateStream {
        let (tx, rx) = mpsc::channel(16);
        let run = Run {
            provider: self.provider.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: self.tools.clone(),
            system_prompt: self.system_prompt.clone(),
            max_iterations: self.max_iterations,
            context_token_limit: self.context_token_limit,
            tx,
        };

        tokio::spawn(run.drive(thread, input));
        Box::pin(ReceiverStream::new(rx))
    }
}
