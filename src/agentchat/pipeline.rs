//! Decorator pipeline around an agent.
//!
//! [`DecoratedAgent`] owns an inner agent plus three ordered interceptor lists:
//!
//! ```text
//! reply(history)
//!   ├─ auto-reply #1 .. #n   first Some(message) is returned as-is
//!   ├─ preprocess #1 .. #n   each rewrites the history for the next
//!   ├─ inner.reply(history')
//!   └─ postprocess #1 .. #n  each rewrites the reply for the next
//! ```
//!
//! A short-circuiting auto-reply skips preprocessing, the inner agent and
//! postprocessing. Postprocessors receive the history the inner agent actually
//! saw. Adding a step to a `DecoratedAgent` appends to its list instead of
//! wrapping it again, and the decorated agent always answers to the inner
//! agent's name.
//!
//! Each step comes in a synchronous flavour taking a plain closure and an
//! `_async` flavour taking a closure that returns a future. Steps are stored
//! boxed as the function aliases below.

use crate::agentchat::agent::{Agent, AgentResult};
use crate::agentchat::message::Message;
use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;

/// Async auto-reply step. Returning `Ok(None)` lets the pipeline continue.
pub type AutoReplyFn =
    Arc<dyn Fn(Vec<Message>) -> BoxFuture<'static, AgentResult<Option<Message>>> + Send + Sync>;

/// Async preprocess step over the history.
pub type PreprocessFn =
    Arc<dyn Fn(Vec<Message>) -> BoxFuture<'static, AgentResult<Vec<Message>>> + Send + Sync>;

/// Async postprocess step receiving the history and the current reply.
pub type PostprocessFn =
    Arc<dyn Fn(Vec<Message>, Message) -> BoxFuture<'static, AgentResult<Message>> + Send + Sync>;

/// An agent wrapped with auto-reply, preprocess and postprocess steps.
///
/// Steps run in fixed phases whatever order they were registered in: every
/// auto-reply first, on the unmodified history, then every preprocessor, then
/// the inner agent, then every postprocessor. Registration order only matters
/// within a phase. A preprocessor never feeds an auto-reply, even one added
/// after it.
pub struct DecoratedAgent {
    inner: Arc<dyn Agent>,
    auto_replies: Vec<AutoReplyFn>,
    preprocessors: Vec<PreprocessFn>,
    postprocessors: Vec<PostprocessFn>,
}

impl DecoratedAgent {
    /// Wrap `inner` with empty interceptor lists.
    pub fn new(inner: impl Agent + 'static) -> Self {
        Self::from_arc(Arc::new(inner))
    }

    /// Wrap an agent that is already shared.
    pub fn from_arc(inner: Arc<dyn Agent>) -> Self {
        Self {
            inner,
            auto_replies: Vec::new(),
            preprocessors: Vec::new(),
            postprocessors: Vec::new(),
        }
    }

    pub fn inner(&self) -> &Arc<dyn Agent> {
        &self.inner
    }

    pub fn with_auto_reply<F>(self, auto_reply: F) -> Self
    where
        F: Fn(&[Message]) -> Option<Message> + Send + Sync + 'static,
    {
        self.with_auto_reply_async(move |history: Vec<Message>| {
            let reply = auto_reply(&history);
            async move { Ok(reply) }
        })
    }

    pub fn with_auto_reply_async<F, Fut>(mut self, auto_reply: F) -> Self
    where
        F: Fn(Vec<Message>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AgentResult<Option<Message>>> + Send + 'static,
    {
        let auto_reply: AutoReplyFn =
            Arc::new(move |history: Vec<Message>| auto_reply(history).boxed());
        self.auto_replies.push(auto_reply);
        self
    }

    pub fn with_preprocess<F>(self, preprocess: F) -> Self
    where
        F: Fn(Vec<Message>) -> Vec<Message> + Send + Sync + 'static,
    {
        self.with_preprocess_async(move |history: Vec<Message>| {
            let history = preprocess(history);
            async move { Ok(history) }
        })
    }

    pub fn with_preprocess_async<F, Fut>(mut self, preprocess: F) -> Self
    where
        F: Fn(Vec<Message>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AgentResult<Vec<Message>>> + Send + 'static,
    {
        let preprocess: PreprocessFn =
            Arc::new(move |history: Vec<Message>| preprocess(history).boxed());
        self.preprocessors.push(preprocess);
        self
    }

    pub fn with_postprocess<F>(self, postprocess: F) -> Self
    where
        F: Fn(&[Message], Message) -> Message + Send + Sync + 'static,
    {
        self.with_postprocess_async(move |history: Vec<Message>, reply: Message| {
            let reply = postprocess(&history, reply);
            async move { Ok(reply) }
        })
    }

    pub fn with_postprocess_async<F, Fut>(mut self, postprocess: F) -> Self
    where
        F: Fn(Vec<Message>, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AgentResult<Message>> + Send + 'static,
    {
        let postprocess: PostprocessFn = Arc::new(move |history: Vec<Message>, reply: Message| {
            postprocess(history, reply).boxed()
        });
        self.postprocessors.push(postprocess);
        self
    }

    pub fn auto_reply_count(&self) -> usize {
        self.auto_replies.len()
    }

    pub fn preprocess_count(&self) -> usize {
        self.preprocessors.len()
    }

    pub fn postprocess_count(&self) -> usize {
        self.postprocessors.len()
    }
}

#[async_trait]
impl Agent for DecoratedAgent {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn reply(&self, conversation: &[Message]) -> AgentResult<Message> {
        for auto_reply in &self.auto_replies {
            if let Some(reply) = auto_reply(conversation.to_vec()).await? {
                log::debug!("{} answered by auto-reply", self.name());
                return Ok(reply);
            }
        }

        let mut history = conversation.to_vec();
        for preprocess in &self.preprocessors {
            history = preprocess(history).await?;
        }

        let mut reply = self.inner.reply(&history).await?;

        for postprocess in &self.postprocessors {
            reply = postprocess(history.clone(), reply).await?;
        }

        Ok(reply)
    }
}
