//! Shared test helpers: scripted providers and agents.

use std::sync::{Arc, Mutex};

use cypherchat_core::agent::{Agent, AgentInput, UpdateBatch, UpdateStream};
use cypherchat_core::error::{ProviderError, Result};
use cypherchat_core::message::{Conversation, Message, ToolCallRecord};
use cypherchat_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::{Notify, OwnedMutexGuard};

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue.
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    call_count: Mutex<usize>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let mut count = self.call_count.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        if *count >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                *count,
                responses.len()
            );
        }

        let response = responses[*count].clone();
        *count += 1;
        Ok(response)
    }
}

fn mock_usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::ai(text),
        usage: mock_usage(),
        model: "mock-model".into(),
    }
}

/// Create a response with tool calls and optional thought content.
pub fn make_tool_call_response(tool_calls: Vec<ToolCallRecord>, thought: &str) -> ProviderResponse {
    let content = if thought.is_empty() {
        Value::Null
    } else {
        Value::String(thought.to_string())
    };
    ProviderResponse {
        message: Message::ai_with_tool_calls(content, tool_calls),
        usage: mock_usage(),
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call.
pub fn make_tool_call(name: &str, args: Value) -> ToolCallRecord {
    ToolCallRecord::new(format!("call_{name}"), name, args)
}

/// An agent that replays a fixed script of update batches.
pub struct ScriptedAgent {
    script: Mutex<Vec<Result<UpdateBatch>>>,
    hang: bool,
    started: Arc<Notify>,
}

impl ScriptedAgent {
    pub fn new(script: Vec<Result<UpdateBatch>>) -> Self {
        Self {
            script: Mutex::new(script),
            hang: false,
            started: Arc::new(Notify::new()),
        }
    }

    /// An agent that records the question, then never yields.
    pub fn pending() -> Self {
        Self {
            hang: true,
            ..Self::new(Vec::new())
        }
    }

    /// Resolves once a pending agent holds the conversation.
    pub async fn started(&self) {
        self.started.notified().await;
    }
}

impl Agent for ScriptedAgent {
    fn stream(&self, thread: OwnedMutexGuard<Conversation>, input: AgentInput) -> UpdateStream {
        if self.hang {
            let started = self.started.clone();
            return Box::pin(futures::stream::once(async move {
                let mut thread = thread;
                thread.push(Message::human(input.question));
                started.notify_one();
                std::future::pending::<Result<UpdateBatch>>().await
            }));
        }

        let script: Vec<_> = self.script.lock().unwrap().drain(..).collect();
        Box::pin(futures::stream::iter(script).map(move |item| {
            let _held = &thread;
            item
        }))
    }
}

/// An agent that answers by echoing the question. The first question
/// holds its conversation until [`GatedAgent::release`] is called.
pub struct GatedAgent {
    gate: Arc<Notify>,
    started: Arc<Notify>,
    calls: Mutex<usize>,
}

impl GatedAgent {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(Notify::new()),
            started: Arc::new(Notify::new()),
            calls: Mutex::new(0),
        }
    }

    /// Resolves once the first question holds the conversation.
    pub async fn started(&self) {
        self.started.notified().await;
    }

    /// Let the first question finish.
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

impl Agent for GatedAgent {
    fn stream(&self, thread: OwnedMutexGuard<Conversation>, input: AgentInput) -> UpdateStream {
        let first = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls == 1
        };
        let gate = self.gate.clone();
        let started = self.started.clone();
        Box::pin(futures::stream::once(async move {
            let mut thread = thread;
            thread.push(Message::human(input.question.as_str()));
            if first {
                started.notify_one();
                gate.notified().await;
            }
            let reply = Message::ai(format!("Answer to {}", input.question));
            thread.push(reply.clone());
            Ok::<_, cypherchat_core::error::Error>(UpdateBatch::single(
                "agent",
                vec![serde_json::to_value(reply).unwrap()],
            ))
        }))
    }
}
