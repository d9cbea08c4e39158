//! # agentchat
//!
//! agentchat coordinates several autonomous agents through a shared conversation.
//! Each agent turns the history into one reply; a group chat schedules who speaks
//! next, keeps the history compact, and stops when someone says the task is done
//! or the round budget runs out.
//!
//! The crate provides carefully layered abstractions for:
//!
//! * **Messages**: [`Message`] with an explicit body (text, pending function call,
//!   function result) and the reserved terminate/clear markers
//! * **Agents**: the [`Agent`] trait, [`ChatAgent`] for model-backed agents,
//!   [`UserProxyAgent`] for a human participant, and [`DecoratedAgent`] for
//!   auto-reply/preprocess/postprocess pipelines
//! * **Function calls**: [`FunctionMap`](function::FunctionMap) dispatch, the built-in
//!   `terminate_group_chat` / `clear_group_chat` functions, and JSON argument repair
//! * **Group chats**: [`GroupChat`] with model-driven or round-robin speaker
//!   selection, history compaction, round budgets and cancellation
//! * **Provider seam**: the [`ClientWrapper`] trait plus a fixed-delay
//!   [`RetryingClient`](client_wrapper::RetryingClient)
//! * **Observability**: `log` output and the [`event`] callback layer
//!
//! ## Core Concepts
//!
//! ### Agents
//!
//! Anything that can answer a conversation is an agent:
//!
//! ```rust
//! use agentchat::{Agent, AgentExt, Message, Role};
//! use agentchat::agent::AgentResult;
//! use async_trait::async_trait;
//!
//! struct Reviewer;
//!
//! #[async_trait]
//! impl Agent for Reviewer {
//!     fn name(&self) -> &str {
//!         "reviewer"
//!     }
//!
//!     async fn reply(&self, _conversation: &[Message]) -> AgentResult<Message> {
//!         Ok(Message::new(Role::Assistant, "LGTM"))
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> AgentResult<()> {
//! let strict = Reviewer.with_auto_reply(|history| {
//!     let last = history.last()?.content()?;
//!     last.contains("unsafe").then(|| Message::new(Role::Assistant, "please justify the unsafe block"))
//! });
//!
//! let reply = strict.send_message("adds an unsafe block").await?;
//! assert_eq!(reply.content(), Some("please justify the unsafe block"));
//! # Ok(())
//! # }
//! ```
//!
//! ### Group chats
//!
//! A round-robin chat needs nothing but agents:
//!
//! ```rust
//! use agentchat::{Agent, GroupChat, GroupChatConfig, Message, Role};
//! use agentchat::agent::AgentResult;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Counter(&'static str);
//!
//! #[async_trait]
//! impl Agent for Counter {
//!     fn name(&self) -> &str {
//!         self.0
//!     }
//!
//!     async fn reply(&self, conversation: &[Message]) -> AgentResult<Message> {
//!         Ok(Message::new(Role::Assistant, conversation.len().to_string()))
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> AgentResult<()> {
//! let agents: Vec<Arc<dyn Agent>> = vec![Arc::new(Counter("x")), Arc::new(Counter("y"))];
//! let chat = GroupChat::sequential(agents)?.with_config(GroupChatConfig {
//!     max_round: 3,
//!     turn_delay: Duration::ZERO,
//!     ..GroupChatConfig::default()
//! });
//!
//! let history = chat.run(Vec::new()).await?;
//! let speakers: Vec<_> = history.iter().filter_map(|m| m.sender.as_deref()).collect();
//! assert_eq!(speakers, ["x", "y", "x"]);
//! # Ok(())
//! # }
//! ```
//!
//! A model-moderated chat uses [`GroupChat::new`] with a completion client and an
//! admin; see the [`group_chat`] module.

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// Applications embedding agentchat can opt in to simple `RUST_LOG` driven
/// diagnostics without choosing a logging backend upfront. Every appended group
/// chat message is written at `info` level.
///
/// ```rust
/// agentchat::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `agentchat` module.
pub mod agentchat;

// Re-exporting key items for easier external access.
pub use agentchat::agent;
pub use agentchat::agent::{Agent, AgentExt};
pub use agentchat::chat_agent;
pub use agentchat::chat_agent::ChatAgent;
pub use agentchat::client_wrapper;
pub use agentchat::client_wrapper::{ClientWrapper, CompletionOptions};
pub use agentchat::config;
pub use agentchat::config::{GroupChatConfig, RetryConfig};
pub use agentchat::conversation;
pub use agentchat::conversation::Conversation;
pub use agentchat::event;
pub use agentchat::event::{AgentEvent, EventHandler, GroupChatEvent};
pub use agentchat::function;
pub use agentchat::group_chat;
pub use agentchat::group_chat::{GroupChat, GroupChatError};
pub use agentchat::message;
pub use agentchat::message::{Message, MessageBody, Role};
pub use agentchat::pipeline;
pub use agentchat::pipeline::DecoratedAgent;
pub use agentchat::speaker;
pub use agentchat::user_proxy;
pub use agentchat::user_proxy::UserProxyAgent;
