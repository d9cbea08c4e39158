//! Messages exchanged between agents.
//!
//! A [`Message`] is the atomic unit of a group chat. Its payload is an explicit
//! [`MessageBody`]: plain text, a model-issued [`FunctionCall`] that has not been
//! resolved yet, or a dispatched call together with the handler's output.
//!
//! Two reserved markers travel inside ordinary content and act as control
//! signals for the orchestrator:
//!
//! - [`TERMINATE`] ends a run when it appears anywhere in a reply.
//! - [`CLEAR_MESSAGES`] marks a compaction boundary (see
//!   [`Conversation`](crate::conversation::Conversation)).
//!
//! Both are plain substring checks.
//!
//! # Example
//!
//! ```rust
//! use agentchat::message::{Message, Role, TERMINATE};
//!
//! let msg = Message::new(Role::Assistant, format!("{}: all done", TERMINATE))
//!     .with_sender("admin");
//!
//! assert!(msg.is_terminate());
//! assert!(!msg.is_clear());
//! assert_eq!(msg.sender.as_deref(), Some("admin"));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker that terminates a group chat run.
pub const TERMINATE: &str = "[GROUPCHAT_TERMINATE]";

/// Marker that triggers history compaction.
pub const CLEAR_MESSAGES: &str = "[GROUPCHAT_CLEAR_MESSAGES]";

/// End-of-message marker used when rendering context for a model.
pub const EOF_MSG: &str = "<eof_msg>";

/// Width of the dashed separator in a rendered log block.
const SEPARATOR_WIDTH: usize = 20;

/// Represents the possible roles for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Set by the developer to steer the model's responses.
    System,
    /// A message from a human user, or another agent rendered for the model.
    User,
    /// Content generated by the model.
    Assistant,
    /// The output of a locally executed function.
    Function,
}

impl Role {
    /// Lowercase wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Function => "function",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A function invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function to run.
    pub name: String,
    /// Raw JSON arguments exactly as the model produced them.
    pub arguments: String,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Payload of a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageBody {
    /// Plain text content.
    Text { content: String },

    /// A function call that has not been resolved by a handler.
    FunctionCall { call: FunctionCall },

    /// A resolved function call. `result` holds the handler output, or an
    /// `"Error: ..."` string when the handler failed.
    FunctionResult { call: FunctionCall, result: String },
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Conversation role.
    pub role: Role,
    /// Text, pending function call, or function result.
    pub body: MessageBody,
    /// Name of the agent that produced the message. Always set on messages
    /// appended by a [`GroupChat`](crate::group_chat::GroupChat).
    pub sender: Option<String>,
}

impl Message {
    /// Create a text message with no sender.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            body: MessageBody::Text {
                content: content.into(),
            },
            sender: None,
        }
    }

    /// Create an assistant message carrying an unresolved function call.
    pub fn function_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            body: MessageBody::FunctionCall {
                call: FunctionCall::new(name, arguments),
            },
            sender: None,
        }
    }

    /// Attach the producing agent's name (builder pattern).
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Text content of the message, if any.
    ///
    /// Function results expose the handler output. An unresolved function
    /// call has no content.
    pub fn content(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Text { content } => Some(content),
            MessageBody::FunctionCall { .. } => None,
            MessageBody::FunctionResult { result, .. } => Some(result),
        }
    }

    /// The function call carried by this message, resolved or not.
    pub fn function_call_payload(&self) -> Option<&FunctionCall> {
        match &self.body {
            MessageBody::Text { .. } => None,
            MessageBody::FunctionCall { call } | MessageBody::FunctionResult { call, .. } => {
                Some(call)
            }
        }
    }

    /// Name of the function this message was tagged with by dispatch.
    pub fn function_name(&self) -> Option<&str> {
        match &self.body {
            MessageBody::FunctionResult { call, .. } => Some(&call.name),
            _ => None,
        }
    }

    /// Whether the content contains [`TERMINATE`].
    pub fn is_terminate(&self) -> bool {
        self.content().map_or(false, |c| c.contains(TERMINATE))
    }

    /// Whether the content contains [`CLEAR_MESSAGES`].
    pub fn is_clear(&self) -> bool {
        self.content().map_or(false, |c| c.contains(CLEAR_MESSAGES))
    }

    /// Render the message as a log block:
    ///
    /// ```text
    /// Message from <sender>
    /// --------------------
    /// <content>
    /// --------------------
    /// ```
    ///
    /// ```rust
    /// use agentchat::message::{Message, Role};
    ///
    /// let block = Message::new(Role::Assistant, "hi").with_sender("bob").format_block();
    /// assert_eq!(block, format!("Message from bob\n{0}\nhi\n{0}\n", "-".repeat(20)));
    /// ```
    pub fn format_block(&self) -> String {
        let separator = "-".repeat(SEPARATOR_WIDTH);
        format!(
            "Message from {}\n{}\n{}\n{}\n",
            self.sender.as_deref().unwrap_or_default(),
            separator,
            self.content().unwrap_or_default(),
            separator
        )
    }
}
