//! Per-question conversation state.
//!
//! The tracker records every message the agent produces, correlates tool
//! calls with their results and collects reasoning steps. Consuming it
//! with [`ConversationStreamTracker::final_answer`] closes it.

use std::collections::HashMap;

use cypherchat_core::error::{Error, Result};
use cypherchat_core::message::{Message, ToolCallRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::classify::classify;
use crate::content::{message_text, serialise_message};
use crate::renderables::extract_renderables;

const UNKNOWN_TOOL: &str = "unknown";

/// One tool invocation as reported to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecution {
    pub name: String,
    pub description: String,
    pub input_args: Map<String, Value>,
    pub success: bool,
    pub error_message: Option<String>,
}

impl ToolExecution {
    fn new(name: String, input_args: Map<String, Value>) -> Self {
        Self {
            description: describe(&name),
            name,
            input_args,
            success: true,
            error_message: None,
        }
    }
}

fn describe(name: &str) -> String {
    format!("Called {name} tool")
}

/// Position of an execution in `tools_used`; stable for the tracker's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecutionId(usize);

/// The complete answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAnswer {
    pub answer: String,
    pub messages: Vec<Value>,
    pub renderables: Vec<Map<String, Value>>,
    pub tools_used: Vec<ToolExecution>,
    pub reasoning_steps: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ConversationStreamTracker {
    raw_messages: Vec<Message>,
    serialised_messages: Vec<Value>,
    tool_executions: Vec<ToolExecution>,
    by_call_id: HashMap<String, usize>,
    reasoning_steps: Vec<String>,
}

impl ConversationStreamTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to both logs and return its canonical form.
    pub fn add_message(&mut self, message: Message) -> &Value {
        self.serialised_messages.push(serialise_message(&message));
        self.raw_messages.push(message);
        &self.serialised_messages[self.serialised_messages.len() - 1]
    }

    /// Open a new execution for a requested tool call.
    pub fn register_tool_call(&mut self, call: &ToolCallRecord) -> (ExecutionId, Option<String>) {
        let details = call.details();
        let index = self.tool_executions.len();
        self.tool_executions
            .push(ToolExecution::new(details.name, details.args));
        if let Some(call_id) = &details.call_id {
            self.by_call_id.insert(call_id.clone(), index);
        }
        (ExecutionId(index), details.call_id)
    }

    /// Record a tool result against the execution it answers.
    ///
    /// A known call id selects its execution. Without a call id the most
    /// recent execution is used. Anything else gets a fresh execution.
    /// Calling this again for the same execution overwrites the verdict.
    pub fn update_tool_result(
        &mut self,
        call_id: Option<&str>,
        name: Option<&str>,
        content: &Value,
    ) -> ExecutionId {
        let existing = match call_id {
            Some(id) => self.by_call_id.get(id).copied(),
            None => self.tool_executions.len().checked_sub(1),
        };

        let index = existing.unwrap_or_else(|| {
            let name = name.filter(|n| !n.is_empty()).unwrap_or(UNKNOWN_TOOL);
            self.tool_executions
                .push(ToolExecution::new(name.to_string(), Map::new()));
            let index = self.tool_executions.len() - 1;
            if let Some(id) = call_id {
                self.by_call_id.insert(id.to_string(), index);
            }
            index
        });

        let execution = &mut self.tool_executions[index];
        if execution.name == UNKNOWN_TOOL
            && let Some(name) = name.filter(|n| !n.is_empty())
        {
            execution.name = name.to_string();
            execution.description = describe(name);
        }

        let verdict = classify(content);
        execution.success = verdict.success;
        execution.error_message = verdict.error;
        ExecutionId(index)
    }

    /// Append a reasoning step unless it is blank or repeats the last one.
    pub fn add_reasoning(&mut self, step: &str) {
        let step = step.trim();
        if step.is_empty() || self.reasoning_steps.last().is_some_and(|last| last == step) {
            return;
        }
        self.reasoning_steps.push(step.to_string());
    }

    pub fn execution(&self, id: ExecutionId) -> &ToolExecution {
        &self.tool_executions[id.0]
    }

    pub fn tool_executions(&self) -> &[ToolExecution] {
        &self.tool_executions
    }

    pub fn reasoning_steps(&self) -> &[String] {
        &self.reasoning_steps
    }

    pub fn messages(&self) -> &[Value] {
        &self.serialised_messages
    }

    /// Build the answer from the last AI message with text.
    pub fn final_answer(mut self) -> Result<AgentAnswer> {
        let answer = self
            .raw_messages
            .iter()
            .rev()
            .filter(|message| matches!(message, Message::Ai { .. }))
            .find_map(|message| message_text(message.content()))
            .ok_or(Error::NoAnswer)?;

        if self
            .reasoning_steps
            .last()
            .is_some_and(|last| last.trim() == answer)
        {
            self.reasoning_steps.pop();
        }

        let renderables = extract_renderables(&self.serialised_messages);
        Ok(AgentAnswer {
            answer,
            messages: self.serialised_messages,
            renderables,
            tools_used: self.tool_executions,
            reasoning_steps: self.reasoning_steps,
        })
    }
}
