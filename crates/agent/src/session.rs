//! Drives an agent for one question and streams the resulting events.
//!
//! Each conversation id has its own lock. Questions on the same
//! conversation queue behind each other; questions on different
//! conversations run concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use cypherchat_core::agent::{Agent, AgentInput};
use cypherchat_core::error::{Error, Result};
use cypherchat_core::message::{Conversation, ConversationId, Message};
use cypherchat_core::tool::RenderMode;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info};

use crate::emitter::EventEmitter;
use crate::stream_event::StreamEvent;

/// A question submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default, rename = "responseMode", alias = "response_mode")]
    pub render_mode: RenderMode,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            render_mode: RenderMode::default(),
            conversation_id: None,
        }
    }

    pub fn with_conversation(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }

    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }
}

type Thread = Arc<Mutex<Conversation>>;

pub struct SessionCoordinator {
    agent: Arc<dyn Agent>,
    threads: Mutex<HashMap<String, Thread>>,
    default_conversation_id: String,
    buffer: usize,
}

impl SessionCoordinator {
    pub fn new(agent: Arc<dyn Agent>, default_conversation_id: impl Into<String>) -> Self {
        Self {
            agent,
            threads: Mutex::new(HashMap::new()),
            default_conversation_id: default_conversation_id.into(),
            buffer: 64,
        }
    }

    /// Set the number of events buffered ahead of a slow client.
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    async fn thread(&self, id: &str) -> Thread {
        let mut threads = self.threads.lock().await;
        threads
            .entry(id.to_string())
            .or_insert_with(|| {
                debug!(conversation_id = %id, "Opening conversation");
                Arc::new(Mutex::new(Conversation::with_id(ConversationId::from(id))))
            })
            .clone()
    }

    /// Start answering a question.
    ///
    /// Rejects a blank question before anything is streamed. Otherwise the
    /// receiver yields `thinking`, the per-message events, then exactly one
    /// `final` or `error`. Dropping the receiver stops the agent and
    /// releases the conversation.
    pub async fn ask(&self, request: AskRequest) -> Result<mpsc::Receiver<StreamEvent>> {
        let question = request.question.trim().to_string();
        if question.is_empty() {
            return Err(Error::InvalidRequest("Question must not be empty.".into()));
        }

        let conversation_id = request
            .conversation_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| self.default_conversation_id.clone());
        info!(
            conversation_id = %conversation_id,
            question_len = question.len(),
            render_mode = %request.render_mode,
            "Question accepted"
        );

        let thread = self.thread(&conversation_id).await;
        let agent = self.agent.clone();
        let input = AgentInput {
            question,
            render_mode: request.render_mode,
        };
        let (tx, rx) = mpsc::channel(self.buffer);

        tokio::spawn(async move {
            let mut emitter = EventEmitter::new();
            if tx.send(emitter.prologue()).await.is_err() {
                return;
            }

            debug!(conversation_id = %conversation_id, "Waiting for conversation lock");
            let guard = tokio::select! {
                _ = tx.closed() => return,
                guard = thread.lock_owned() => guard,
            };
            debug!(conversation_id = %conversation_id, "Conversation lock acquired");

            let mut updates = agent.stream(guard, input);
            loop {
                let next = tokio::select! {
                    _ = tx.closed() => {
                        debug!(conversation_id = %conversation_id, "Client disconnected, stopping agent");
                        return;
                    }
                    next = updates.next() => next,
                };

                match next {
                    Some(Ok(batch)) => {
                        for event in emitter.on_batch(&batch) {
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!(conversation_id = %conversation_id, error = %e, "Agent failed while streaming");
                        let _ = tx.send(StreamEvent::error(e.to_string())).await;
                        return;
                    }
                    None => break,
                }
            }
            drop(updates);
            debug!(conversation_id = %conversation_id, "Conversation lock released");

            let terminal = emitter.finish();
            if let StreamEvent::Error { message } = &terminal {
                error!(conversation_id = %conversation_id, error = %message, "Stream ended without an answer");
            }
            let _ = tx.send(terminal).await;
        });

        Ok(rx)
    }

    /// A snapshot of a conversation's messages, waiting for any question in
    /// flight on it to finish.
    pub async fn history(&self, conversation_id: &str) -> Option<Vec<Message>> {
        let thread = self.threads.lock().await.get(conversation_id).cloned()?;
        let conversation = thread.lock().await;
        Some(conversation.messages.clone())
    }

    pub fn default_conversation_id(&self) -> &str {
        &self.default_conversation_id
    }
}

/// Drain a receiver into a vector. Convenient for tests and one-shot callers.
pub async fn collect_events(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}
