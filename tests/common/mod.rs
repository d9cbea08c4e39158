//! Shared test doubles: scripted agents and a mock completion client.

#![allow(dead_code)]

use agentchat::agent::{Agent, AgentResult};
use agentchat::client_wrapper::{ClientWrapper, CompletionOptions};
use agentchat::message::{Message, Role};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An agent that answers with canned replies, in order, and records every
/// context it was given.
pub struct ScriptedAgent {
    name: String,
    replies: Mutex<VecDeque<Message>>,
    contexts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedAgent {
    pub fn new(name: &str, replies: &[&str]) -> Arc<Self> {
        Self::with_messages(
            name,
            replies
                .iter()
                .map(|r| Message::new(Role::Assistant, *r))
                .collect(),
        )
    }

    pub fn with_messages(name: &str, replies: Vec<Message>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            replies: Mutex::new(replies.into()),
            contexts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }

    pub fn contexts(&self) -> Vec<Vec<Message>> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reply(&self, conversation: &[Message]) -> AgentResult<Message> {
        self.contexts.lock().unwrap().push(conversation.to_vec());
        let reply = self.replies.lock().unwrap().pop_front();
        Ok(reply.unwrap_or_else(|| {
            Message::new(Role::Assistant, format!("{} has nothing to add", self.name))
        }))
    }
}

/// An agent whose reply takes a long time, for cancellation tests.
pub struct SlowAgent {
    pub name: String,
    pub delay: Duration,
}

#[async_trait]
impl Agent for SlowAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reply(&self, _conversation: &[Message]) -> AgentResult<Message> {
        tokio::time::sleep(self.delay).await;
        Ok(Message::new(Role::Assistant, "finally done"))
    }
}

/// An agent that always fails.
pub struct BrokenAgent(pub &'static str);

#[async_trait]
impl Agent for BrokenAgent {
    fn name(&self) -> &str {
        self.0
    }

    async fn reply(&self, _conversation: &[Message]) -> AgentResult<Message> {
        Err("agent exploded".into())
    }
}

/// A completion client returning queued replies and recording every request.
#[derive(Default)]
pub struct MockClient {
    replies: Mutex<VecDeque<Message>>,
    requests: Mutex<Vec<(Vec<Message>, CompletionOptions)>>,
}

impl MockClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queue_text(&self, text: &str) {
        self.queue(Message::new(Role::Assistant, text));
    }

    pub fn queue_function_call(&self, name: &str, arguments: &str) {
        self.queue(Message::function_call(name, arguments));
    }

    pub fn queue(&self, message: Message) {
        self.replies.lock().unwrap().push_back(message);
    }

    pub fn requests(&self) -> Vec<(Vec<Message>, CompletionOptions)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClientWrapper for MockClient {
    async fn send_message(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Message, Box<dyn Error + Send + Sync>> {
        self.requests
            .lock()
            .unwrap()
            .push((messages.to_vec(), options.clone()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| "no reply queued".into())
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

pub fn user(sender: &str, content: &str) -> Message {
    Message::new(Role::User, content).with_sender(sender)
}

pub fn senders(messages: &[Message]) -> Vec<String> {
    messages
        .iter()
        .map(|m| m.sender.clone().unwrap_or_default())
        .collect()
}
