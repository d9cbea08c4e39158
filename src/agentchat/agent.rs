//! The agent capability.
//!
//! An [`Agent`] is anything with a stable name that can turn a conversation
//! history into exactly one reply. Language-model backed agents live in
//! [`chat_agent`](crate::chat_agent); scripted agents, human proxies and test
//! doubles only need to implement this trait.
//!
//! [`AgentExt`] is implemented for every agent and adds the conveniences used
//! when driving agents by hand: sending a single message, decorating an agent
//! with auto-reply/preprocess/postprocess steps, and joining a group chat.
//!
//! # Example
//!
//! ```rust
//! use agentchat::agent::{Agent, AgentExt, AgentResult};
//! use agentchat::message::{Message, Role};
//! use async_trait::async_trait;
//!
//! struct Parrot;
//!
//! #[async_trait]
//! impl Agent for Parrot {
//!     fn name(&self) -> &str {
//!         "parrot"
//!     }
//!
//!     async fn reply(&self, conversation: &[Message]) -> AgentResult<Message> {
//!         let last = conversation.last().and_then(|m| m.content()).unwrap_or_default();
//!         Ok(Message::new(Role::Assistant, last).with_sender(self.name()))
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> AgentResult<()> {
//! let reply = Parrot.send_message("hello").await?;
//! assert_eq!(reply.content(), Some("hello"));
//!
//! let polite = Parrot.with_postprocess(|_, reply| {
//!     let text = format!("{}, please", reply.content().unwrap_or_default());
//!     Message::new(reply.role, text)
//! });
//! assert_eq!(polite.send_message("cracker").await?.content(), Some("cracker, please"));
//! # Ok(())
//! # }
//! ```

use crate::agentchat::conversation::Conversation;
use crate::agentchat::group_chat::{GroupChat, GroupChatError};
use crate::agentchat::message::{Message, Role};
use crate::agentchat::pipeline::DecoratedAgent;
use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;

/// Result type shared by agents, handlers and the orchestrator.
pub type AgentResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[async_trait]
pub trait Agent: Send + Sync {
    /// Unique name of the agent inside its group.
    fn name(&self) -> &str;

    /// Produce one reply for `conversation`.
    ///
    /// May suspend while waiting on a remote call. Errors abort the turn that
    /// asked for the reply.
    async fn reply(&self, conversation: &[Message]) -> AgentResult<Message>;
}

#[async_trait]
impl<T: Agent + ?Sized> Agent for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn reply(&self, conversation: &[Message]) -> AgentResult<Message> {
        (**self).reply(conversation).await
    }
}

#[async_trait]
impl<T: Agent + ?Sized> Agent for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn reply(&self, conversation: &[Message]) -> AgentResult<Message> {
        (**self).reply(conversation).await
    }
}

/// Conveniences available on every [`Agent`].
#[async_trait]
pub trait AgentExt: Agent {
    /// Ask for a reply to a single user message.
    async fn send_message(&self, text: &str) -> AgentResult<Message> {
        self.reply(&[Message::new(Role::User, text)]).await
    }

    /// Ask for a reply to an existing history.
    async fn send_history(&self, history: &[Message]) -> AgentResult<Message> {
        self.reply(history).await
    }

    /// Start `group` with `message` as the opening history.
    ///
    /// The message must be authored by this agent, otherwise
    /// [`GroupChatError::SenderMismatch`] is returned and nothing runs.
    async fn send_to_group(&self, group: &GroupChat, message: Message) -> AgentResult<Conversation> {
        if message.sender.as_deref() != Some(self.name()) {
            return Err(Box::new(GroupChatError::SenderMismatch {
                expected: self.name().to_string(),
                actual: message.sender.clone(),
            }));
        }
        group.run(vec![message]).await
    }

    /// Start `group` with a user message authored by this agent.
    async fn say_to_group(&self, group: &GroupChat, text: &str) -> AgentResult<Conversation> {
        let message = Message::new(Role::User, text).with_sender(self.name());
        self.send_to_group(group, message).await
    }

    /// Add a message authored by this agent to the group's initialization
    /// messages.
    fn add_initialization_message(&self, content: &str, group: &mut GroupChat) {
        group.add_initialization_message(
            Message::new(Role::User, content).with_sender(self.name()),
        );
    }

    /// Wrap the agent with an auto-reply step. See [`DecoratedAgent`].
    fn with_auto_reply<F>(self, auto_reply: F) -> DecoratedAgent
    where
        Self: Sized + 'static,
        F: Fn(&[Message]) -> Option<Message> + Send + Sync + 'static,
    {
        DecoratedAgent::new(self).with_auto_reply(auto_reply)
    }

    /// Wrap the agent with a preprocess step. See [`DecoratedAgent`].
    fn with_preprocess<F>(self, preprocess: F) -> DecoratedAgent
    where
        Self: Sized + 'static,
        F: Fn(Vec<Message>) -> Vec<Message> + Send + Sync + 'static,
    {
        DecoratedAgent::new(self).with_preprocess(preprocess)
    }

    /// Wrap the agent with a postprocess step. See [`DecoratedAgent`].
    fn with_postprocess<F>(self, postprocess: F) -> DecoratedAgent
    where
        Self: Sized + 'static,
        F: Fn(&[Message], Message) -> Message + Send + Sync + 'static,
    {
        DecoratedAgent::new(self).with_postprocess(postprocess)
    }
}

impl<T: Agent + ?Sized> AgentExt for T {}
