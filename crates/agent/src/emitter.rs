//! Maps agent messages onto stream events.

use cypherchat_core::agent::UpdateBatch;
use cypherchat_core::message::Message;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::classify::summarise;
use crate::content::{message_text, normalize};
use crate::stream_event::StreamEvent;
use crate::tracker::ConversationStreamTracker;

pub const THINKING: &str = "Thinking…";

/// Argument summaries must be shorter than this to be quoted in a
/// `tool_start` narration.
const ARGS_SUMMARY_LIMIT: usize = 160;

/// Turns the agent's messages into protocol events for one question.
#[derive(Debug, Default)]
pub struct EventEmitter {
    tracker: ConversationStreamTracker,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The opening `thinking` event.
    pub fn prologue(&mut self) -> StreamEvent {
        self.tracker.add_reasoning(THINKING);
        StreamEvent::Thinking {
            message: THINKING.to_string(),
        }
    }

    /// Events for one update batch, in node and message order.
    ///
    /// Pre-model hook updates are skipped. Records that do not decode as
    /// messages are logged and dropped.
    pub fn on_batch(&mut self, batch: &UpdateBatch) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        for update in &batch.updates {
            if update.is_pre_model_hook() {
                continue;
            }
            for raw in &update.messages {
                match Message::decode(raw.clone()) {
                    Ok(message) => events.extend(self.on_message(message)),
                    Err(e) => warn!(node = %update.node, error = %e, "Skipping malformed message"),
                }
            }
        }
        events
    }

    /// Events for a single message.
    pub fn on_message(&mut self, message: Message) -> Vec<StreamEvent> {
        match &message {
            Message::Ai { .. } => self.on_ai(message),
            Message::Tool { .. } => self.on_tool(message),
            _ => {
                self.tracker.add_message(message);
                Vec::new()
            }
        }
    }

    fn on_ai(&mut self, message: Message) -> Vec<StreamEvent> {
        let text = message_text(message.content());
        let calls = message.tool_calls().to_vec();
        self.tracker.add_message(message);

        let mut events = Vec::new();
        if calls.is_empty() {
            if let Some(text) = text {
                events.push(StreamEvent::Answer { message: text });
            }
            return events;
        }

        if let Some(text) = text {
            self.tracker.add_reasoning(&text);
            events.push(StreamEvent::Reasoning { message: text });
        }
        for call in &calls {
            let (id, call_id) = self.tracker.register_tool_call(call);
            let execution = self.tracker.execution(id);
            let message = tool_start_message(&execution.name, &execution.input_args);
            debug!(tool = %execution.name, call_id = ?call_id, "Tool call requested");
            self.tracker.add_reasoning(&message);
            let execution = self.tracker.execution(id);
            events.push(StreamEvent::ToolStart {
                tool_name: execution.name.clone(),
                call_id,
                message,
                args: execution.input_args.clone(),
            });
        }
        events
    }

    fn on_tool(&mut self, message: Message) -> Vec<StreamEvent> {
        let Message::Tool {
            tool_call_id,
            name,
            content,
            ..
        } = &message
        else {
            return Vec::new();
        };
        let call_id = tool_call_id.clone();
        let name = name.clone();
        let content = normalize(content);
        self.tracker.add_message(message);

        let id = self
            .tracker
            .update_tool_result(call_id.as_deref(), name.as_deref(), &content);
        let execution = self.tracker.execution(id);
        let summary = summarise(&content);
        let narration = if execution.success {
            match &summary {
                Some(summary) => format!("I have found {summary} from {}.", execution.name),
                None => format!("I have received results from {}.", execution.name),
            }
        } else {
            let detail = execution
                .error_message
                .as_deref()
                .or(summary.as_deref())
                .unwrap_or("unknown error");
            format!("{} reported an error: {detail}", execution.name)
        };
        debug!(tool = %execution.name, success = execution.success, "Tool result received");

        let event = StreamEvent::ToolEnd {
            tool_name: execution.name.clone(),
            call_id,
            message: narration.clone(),
            success: execution.success,
            error: execution.error_message.clone(),
        };
        self.tracker.add_reasoning(&narration);
        vec![event]
    }

    /// The terminal event: `final` with the answer, or `error` if the agent
    /// never produced text.
    pub fn finish(self) -> StreamEvent {
        match self.tracker.final_answer() {
            Ok(answer) => StreamEvent::Final { answer },
            Err(e) => StreamEvent::error(e.to_string()),
        }
    }

    pub fn tracker(&self) -> &ConversationStreamTracker {
        &self.tracker
    }
}

/// Render tool arguments as `key=value` pairs, strings unquoted.
pub fn summarise_args(args: &Map<String, Value>) -> Option<String> {
    let parts: Vec<String> = args
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{key}={s}"),
            other => format!("{key}={other}"),
        })
        .collect();
    let summary = parts.join(", ");
    (!summary.trim().is_empty()).then_some(summary)
}

fn tool_start_message(name: &str, args: &Map<String, Value>) -> String {
    match summarise_args(args) {
        Some(summary) if summary.chars().count() < ARGS_SUMMARY_LIMIT => {
            format!("I am using tool {name} to {summary}.")
        }
        _ => format!("I am using tool {name}."),
    }
}
