//! Conversation history and context assembly.
//!
//! A [`Conversation`] is the append-only record of one group chat run. It is
//! never truncated: compaction is expressed as a *compacted-from* index that is
//! recomputed on every turn, so callers keep the full audit trail while each
//! agent only receives the slice that is still relevant.
//!
//! # Compaction
//!
//! Agents (or the `clear_group_chat` function) emit a message containing
//! [`CLEAR_MESSAGES`](crate::message::CLEAR_MESSAGES) once they have summarised
//! the discussion so far. Before each turn the orchestrator computes:
//!
//! 1. If the history holds more than one clear sentinel, start just after the
//!    second-to-last one.
//! 2. If the tail beginning at the last sentinel has at least `threshold`
//!    messages, start at that sentinel instead.
//!
//! ```text
//! [m0, clr1, m2, clr3, m4, m5]      threshold = 2
//!                  └──────────┘     tail from clr3 has 3 messages, keep it
//! ```
//!
//! # Rendering
//!
//! [`render_for_speaker`] reshapes the compacted history into the message
//! list an agent actually sees, and [`render_for_role_play`] produces the
//! transcript used by the model-driven speaker selector.

use crate::agentchat::message::{Message, MessageBody, Role, EOF_MSG};
use std::ops::Index;

/// Default number of trailing messages (sentinel included) required before
/// history older than the last clear sentinel is dropped.
pub const DEFAULT_COMPACTION_THRESHOLD: usize = 2;

/// Index of the first message that survives compaction.
///
/// Returns `0` when nothing should be dropped. Applying the function to the
/// slice it selects always returns `0` again.
///
/// ```rust
/// use agentchat::conversation::compaction_start;
/// use agentchat::message::{Message, Role, CLEAR_MESSAGES};
///
/// let history = vec![
///     Message::new(Role::User, "task"),
///     Message::new(Role::Assistant, format!("summary {}", CLEAR_MESSAGES)),
///     Message::new(Role::Assistant, "next step"),
/// ];
/// assert_eq!(compaction_start(&history, 2), 1);
/// assert_eq!(compaction_start(&history[1..], 2), 0);
/// ```
pub fn compaction_start(messages: &[Message], threshold: usize) -> usize {
    let sentinels: Vec<usize> = messages
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_clear())
        .map(|(i, _)| i)
        .collect();

    let mut start = 0;
    if sentinels.len() > 1 {
        start = sentinels[sentinels.len() - 2] + 1;
    }

    if let Some(&last) = sentinels.last() {
        if messages.len() - last >= threshold {
            start = last;
        }
    }

    start
}

/// The full, append-only history of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the end of the history.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Every message, including the ones hidden by compaction.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Index of the first message still visible to agents.
    pub fn compacted_from(&self, threshold: usize) -> usize {
        compaction_start(&self.messages, threshold)
    }

    /// The slice of history visible to agents after compaction.
    pub fn compacted(&self, threshold: usize) -> &[Message] {
        &self.messages[self.compacted_from(threshold)..]
    }

    /// Sender of the most recent message.
    pub fn last_sender(&self) -> Option<&str> {
        self.messages.last().and_then(|m| m.sender.as_deref())
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl From<Vec<Message>> for Conversation {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl Index<usize> for Conversation {
    type Output = Message;

    fn index(&self, index: usize) -> &Message {
        &self.messages[index]
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

fn sender_label(message: &Message) -> &str {
    message
        .sender
        .as_deref()
        .unwrap_or_else(|| message.role.as_str())
}

/// Reshape `initialization ++ history` for the agent named `speaker`.
///
/// Messages written by other agents become user messages annotated with their
/// author and a round index. The speaker's own text becomes an assistant
/// continuation, and its dispatched function calls are replayed as the
/// original call/result pair. `round # i` counts the messages emitted so far.
pub fn render_for_speaker(
    speaker: &str,
    initialization: &[Message],
    history: &[Message],
) -> Vec<Message> {
    let mut rendered = Vec::with_capacity(initialization.len() + history.len());

    for message in initialization.iter().chain(history) {
        let round = rendered.len();
        let from = sender_label(message);

        if from != speaker {
            let content = format!(
                "{}\n{}\nFrom {}\nround # {}",
                message.content().unwrap_or_default(),
                EOF_MSG,
                from,
                round
            );
            rendered.push(Message::new(Role::User, content).with_sender(from));
            continue;
        }

        match &message.body {
            MessageBody::FunctionResult { call, .. } => {
                rendered.push(Message {
                    role: Role::Assistant,
                    body: MessageBody::FunctionCall { call: call.clone() },
                    sender: message.sender.clone(),
                });
                rendered.push(Message {
                    role: Role::Function,
                    body: message.body.clone(),
                    sender: message.sender.clone(),
                });
            }
            MessageBody::FunctionCall { .. } => rendered.push(message.clone()),
            MessageBody::Text { content } => {
                let content = format!("{}\n{}\nround # {}", content, EOF_MSG, round);
                rendered.push(Message::new(Role::Assistant, content).with_sender(from));
            }
        }
    }

    rendered
}

/// Render `initialization ++ history` as a role-play transcript where every
/// message starts with `From <sender>:`.
pub fn render_for_role_play(initialization: &[Message], history: &[Message]) -> Vec<Message> {
    initialization
        .iter()
        .chain(history)
        .enumerate()
        .map(|(round, message)| {
            let content = format!(
                "From {}:\n{}\n{}\nround # {}",
                sender_label(message),
                message.content().unwrap_or_default(),
                EOF_MSG,
                round
            );
            Message::new(Role::User, content)
        })
        .collect()
}
