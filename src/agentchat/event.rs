//! Agent and group chat event system.
//!
//! Provides a callback-based observability layer next to the `log` output.
//! Implement [`EventHandler`] to receive real-time notifications about:
//!
//! - **Completion round-trips**: when a [`ChatAgent`](crate::chat_agent::ChatAgent)
//!   calls its model and gets a reply back
//! - **Function dispatch**: which handler resolved a model-issued call
//! - **Group chat lifecycle**: run start, speaker selection, compaction, appended
//!   messages, termination and budget exhaustion
//!
//! Both trait methods have default no-op implementations, so you only override
//! what you care about. Handlers are shared as `Arc<dyn EventHandler>`.
//!
//! # Example
//!
//! ```rust
//! use agentchat::event::{EventHandler, GroupChatEvent};
//! use async_trait::async_trait;
//!
//! struct Progress;
//!
//! #[async_trait]
//! impl EventHandler for Progress {
//!     async fn on_group_chat_event(&self, event: &GroupChatEvent) {
//!         if let GroupChatEvent::SpeakerSelected { speaker, round, .. } = event {
//!             println!("round {}: {} speaks", round, speaker);
//!         }
//!     }
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Events emitted by a [`ChatAgent`](crate::chat_agent::ChatAgent) while
/// producing a reply.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// Fired right before the completion client is called.
    CompletionStarted {
        agent_name: String,
        /// Number of messages sent, system prompt included.
        message_count: usize,
    },

    /// Fired when the completion client returned a reply.
    CompletionCompleted {
        agent_name: String,
        /// Character length of the reply text, zero for a pending function call.
        response_length: usize,
        /// `true` if the model asked for a function instead of answering.
        function_call: bool,
    },

    /// A function call was resolved against the agent's function map.
    FunctionDispatched {
        agent_name: String,
        function_name: String,
        /// `false` when the handler failed or the name was unknown.
        success: bool,
    },
}

/// Events emitted by a [`GroupChat`](crate::group_chat::GroupChat).
///
/// # Event Flow
///
/// ```text
/// RunStarted
///   └─ HistoryCompacted   (only when older messages are hidden)
///   └─ SpeakerSelected
///   └─ MessageAppended
///   └─ ... next turn ...
/// Terminated | RoundBudgetExhausted
/// ```
#[derive(Debug, Clone)]
pub enum GroupChatEvent {
    RunStarted {
        chat_id: String,
        /// Participant names in roster order.
        participants: Vec<String>,
        max_round: usize,
        started_at: DateTime<Utc>,
    },

    SpeakerSelected {
        chat_id: String,
        /// 1-based turn number.
        round: usize,
        speaker: String,
        /// `true` when the selector gave no usable answer and the admin was used.
        fallback: bool,
    },

    /// History before `compacted_from` is hidden from this turn's context.
    HistoryCompacted {
        chat_id: String,
        compacted_from: usize,
    },

    MessageAppended {
        chat_id: String,
        round: usize,
        sender: String,
        content_length: usize,
    },

    /// A reply carried the terminate marker.
    Terminated { chat_id: String, rounds: usize },

    /// The round budget reached zero before anyone terminated.
    RoundBudgetExhausted { chat_id: String, max_round: usize },
}

/// Trait for receiving agent and group chat events.
///
/// The `Send + Sync` bound allows the handler to be shared across agents and
/// tokio tasks. Make sure any internal state uses appropriate synchronization
/// (e.g. `AtomicUsize`, `Mutex`).
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Called when an agent emits an event. No-op by default.
    async fn on_agent_event(&self, _event: &AgentEvent) {}

    /// Called when a group chat emits an event. No-op by default.
    async fn on_group_chat_event(&self, _event: &GroupChatEvent) {}
}
