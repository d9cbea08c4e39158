//! The remote completion seam.
//!
//! Every model-backed component in this crate talks to a language model through
//! [`ClientWrapper`]. Implementations own transport, authentication and prompt
//! serialisation; the core only hands over an ordered list of [`Message`]s plus
//! [`CompletionOptions`] and expects one reply back.
//!
//! [`RetryingClient`] wraps any implementation with a bounded, fixed-delay retry
//! loop driven by [`RetryConfig`].
//!
//! # Example
//!
//! ```rust
//! use agentchat::client_wrapper::{ClientWrapper, CompletionOptions};
//! use agentchat::message::{Message, Role};
//! use async_trait::async_trait;
//! use std::error::Error;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl ClientWrapper for Echo {
//!     async fn send_message(
//!         &self,
//!         messages: &[Message],
//!         _options: &CompletionOptions,
//!     ) -> Result<Message, Box<dyn Error + Send + Sync>> {
//!         let last = messages.last().and_then(|m| m.content()).unwrap_or_default();
//!         Ok(Message::new(Role::Assistant, last))
//!     }
//! }
//! ```

use crate::agentchat::config::RetryConfig;
use crate::agentchat::function::FunctionDefinition;
use crate::agentchat::message::Message;
use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Sampling parameters and function definitions for one completion request.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
    /// Sequences at which the provider should stop generating.
    pub stop: Vec<String>,
    /// Functions the model may call instead of answering with text.
    pub functions: Vec<FunctionDefinition>,
}

impl CompletionOptions {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Append a stop sequence if it is not already present.
    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        let stop = stop.into();
        if !self.stop.contains(&stop) {
            self.stop.push(stop);
        }
        self
    }

    pub fn with_functions(mut self, functions: Vec<FunctionDefinition>) -> Self {
        self.functions = functions;
        self
    }
}

#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Send `messages` to the model and return its single reply.
    ///
    /// A reply may carry text or an unresolved function call.
    async fn send_message(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Message, Box<dyn Error + Send + Sync>>;

    fn model_name(&self) -> &str {
        "unknown"
    }
}

/// Failure raised once a [`RetryingClient`] has used up its attempts.
#[derive(Debug, Clone)]
pub enum CompletionError {
    RetriesExhausted { attempts: usize, last_error: String },
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionError::RetriesExhausted {
                attempts,
                last_error,
            } => write!(
                f,
                "Completion failed after {} attempts: {}",
                attempts, last_error
            ),
        }
    }
}

impl Error for CompletionError {}

/// A [`ClientWrapper`] that retries failed calls with a fixed delay.
///
/// ```rust,no_run
/// # use agentchat::client_wrapper::{ClientWrapper, RetryingClient};
/// # use agentchat::config::RetryConfig;
/// # use std::sync::Arc;
/// # fn wrap(inner: Arc<dyn ClientWrapper>) {
/// let client = RetryingClient::new(inner, RetryConfig::default());
/// assert_eq!(client.config().max_attempts, 5);
/// # }
/// ```
pub struct RetryingClient {
    inner: Arc<dyn ClientWrapper>,
    config: RetryConfig,
}

impl RetryingClient {
    pub fn new(inner: Arc<dyn ClientWrapper>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl ClientWrapper for RetryingClient {
    async fn send_message(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Message, Box<dyn Error + Send + Sync>> {
        let attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.inner.send_message(messages, options).await {
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    last_error = e.to_string();
                    if attempt == attempts {
                        break;
                    }
                    log::warn!(
                        "{} completion failed (attempt {}/{}): {}; retrying in {:?}",
                        self.inner.model_name(),
                        attempt,
                        attempts,
                        last_error,
                        self.config.delay
                    );
                    tokio::time::sleep(self.config.delay).await;
                }
            }
        }

        Err(Box::new(CompletionError::RetriesExhausted {
            attempts,
            last_error,
        }))
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
