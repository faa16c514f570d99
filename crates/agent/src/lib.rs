//! The streaming core of cypherchat and the agent behind it.
//!
//! A question flows through three layers:
//!
//! 1. **Agent**: [`ReactAgent`] calls the model and the graph tools, publishing
//!    each step as an update batch
//! 2. **Emitter**: [`EventEmitter`] turns messages into protocol events while
//!    the [`ConversationStreamTracker`] correlates tool calls with results
//! 3. **Session**: [`SessionCoordinator`] serializes questions per
//!    conversation and guarantees exactly one terminal event
//!
//! Events are encoded as newline-delimited JSON by [`StreamEvent::encode`].

pub mod classify;
pub mod content;
pub mod emitter;
pub mod history;
pub mod init;
pub mod prompt;
pub mod react;
pub mod renderables;
pub mod session;
pub mod stream_event;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use emitter::EventEmitter;
pub use init::{AgentInitialization, initialize_agent};
pub use prompt::{SYSTEM_PROMPT, build_system_prompt};
pub use react::ReactAgent;
pub use session::{AskRequest, SessionCoordinator, collect_events};
pub use stream_event::StreamEvent;
pub use tracker::{AgentAnswer, ConversationStreamTracker, ToolExecution};
