//! Configuration for group chats and completion retries.
//!
//! Both structs are plain values with sensible [`Default`]s. Users construct
//! them however they want and pass them to the constructors that need them;
//! nothing is read from the environment or from files.
//!
//! # Example
//!
//! ```rust
//! use agentchat::config::{GroupChatConfig, RetryConfig};
//! use std::time::Duration;
//!
//! let config = GroupChatConfig {
//!     max_round: 20,
//!     turn_delay: Duration::ZERO,
//!     ..GroupChatConfig::default()
//! };
//! assert!(!config.throw_on_max_round);
//!
//! let retry = RetryConfig::default();
//! assert_eq!(retry.max_attempts, 5);
//! ```

use crate::agentchat::conversation::DEFAULT_COMPACTION_THRESHOLD;
use std::time::Duration;

/// Settings for one [`GroupChat`](crate::group_chat::GroupChat) run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupChatConfig {
    /// Number of turns the chat may take before it stops.
    pub max_round: usize,
    /// Fail with [`GroupChatError::MaxRoundReached`](crate::group_chat::GroupChatError::MaxRoundReached)
    /// instead of returning the partial history when the budget runs out.
    pub throw_on_max_round: bool,
    /// Pause before each turn. May be zero.
    pub turn_delay: Duration,
    /// Minimum tail length (clear sentinel included) before older history is
    /// compacted away. See [`compaction_start`](crate::conversation::compaction_start).
    pub compaction_threshold: usize,
}

impl Default for GroupChatConfig {
    /// Ten rounds, no hard failure, a one second pause between turns.
    ///
    /// ```rust
    /// use agentchat::config::GroupChatConfig;
    /// use std::time::Duration;
    ///
    /// let config = GroupChatConfig::default();
    /// assert_eq!(config.max_round, 10);
    /// assert_eq!(config.turn_delay, Duration::from_secs(1));
    /// assert_eq!(config.compaction_threshold, 2);
    /// ```
    fn default() -> Self {
        Self {
            max_round: 10,
            throw_on_max_round: false,
            turn_delay: Duration::from_secs(1),
            compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
        }
    }
}

impl GroupChatConfig {
    pub fn with_max_round(mut self, max_round: usize) -> Self {
        self.max_round = max_round;
        self
    }

    pub fn with_throw_on_max_round(mut self, throw: bool) -> Self {
        self.throw_on_max_round = throw;
        self
    }

    pub fn with_turn_delay(mut self, delay: Duration) -> Self {
        self.turn_delay = delay;
        self
    }

    pub fn with_compaction_threshold(mut self, threshold: usize) -> Self {
        self.compaction_threshold = threshold;
        self
    }
}

/// Retry policy for [`RetryingClient`](crate::client_wrapper::RetryingClient).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total number of attempts, the first call included.
    pub max_attempts: usize,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(10),
        }
    }
}
