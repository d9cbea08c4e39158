//! Model-backed agents.
//!
//! [`ChatAgent`] turns a conversation into a completion request against a
//! [`ClientWrapper`]:
//!
//! 1. a system message `Your name is <name>, <role information>` is prepended,
//! 2. the request stops at `<eof_msg>` and advertises the agent's functions,
//! 3. a function call in the reply is resolved through the agent's
//!    [`FunctionMap`],
//! 4. the reply is tagged with the agent's name.
//!
//! Attach an [`EventHandler`](crate::event::EventHandler) with
//! [`with_event_handler`](ChatAgent::with_event_handler) to observe completion
//! round-trips and function dispatch.
//!
//! # Example
//!
//! ```rust,no_run
//! use agentchat::chat_agent::ChatAgent;
//! use agentchat::client_wrapper::ClientWrapper;
//! use agentchat::function::FunctionMap;
//! use std::sync::Arc;
//!
//! # fn build(client: Arc<dyn ClientWrapper>) {
//! let coder = ChatAgent::new("coder", "you write python code to solve tasks.", client)
//!     .with_temperature(0.0)
//!     .with_functions(FunctionMap::new().with_group_chat_functions());
//! # }
//! ```

use crate::agentchat::agent::{Agent, AgentResult};
use crate::agentchat::client_wrapper::{ClientWrapper, CompletionOptions};
use crate::agentchat::event::{AgentEvent, EventHandler};
use crate::agentchat::function::{DispatchOutcome, FunctionDefinition, FunctionMap};
use crate::agentchat::message::{Message, Role, EOF_MSG};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

pub struct ChatAgent {
    name: String,
    role_information: String,
    client: Arc<dyn ClientWrapper>,
    options: CompletionOptions,
    functions: FunctionMap,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl ChatAgent {
    pub fn new(
        name: impl Into<String>,
        role_information: impl Into<String>,
        client: Arc<dyn ClientWrapper>,
    ) -> Self {
        Self {
            name: name.into(),
            role_information: role_information.into(),
            client,
            options: CompletionOptions::default(),
            functions: FunctionMap::new(),
            event_handler: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.options.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.options.max_tokens = Some(max_tokens);
        self
    }

    /// Replace the agent's function map.
    pub fn with_functions(mut self, functions: FunctionMap) -> Self {
        self.functions = functions;
        self
    }

    /// Register one more function.
    pub fn with_function<F, Fut>(mut self, definition: FunctionDefinition, handler: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AgentResult<String>> + Send + 'static,
    {
        self.functions.register_fn(definition, handler);
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn role_information(&self) -> &str {
        &self.role_information
    }

    pub fn functions(&self) -> &FunctionMap {
        &self.functions
    }

    pub fn system_message(&self) -> Message {
        Message::new(
            Role::System,
            format!("Your name is {}, {}", self.name, self.role_information),
        )
    }

    fn request_options(&self) -> CompletionOptions {
        self.options
            .clone()
            .with_stop(EOF_MSG)
            .with_functions(self.functions.definitions())
    }

    async fn emit(&self, event: AgentEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_agent_event(&event).await;
        }
    }
}

#[async_trait]
impl Agent for ChatAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reply(&self, conversation: &[Message]) -> AgentResult<Message> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(self.system_message());
        messages.extend_from_slice(conversation);

        self.emit(AgentEvent::CompletionStarted {
            agent_name: self.name.clone(),
            message_count: messages.len(),
        })
        .await;

        let reply = self
            .client
            .send_message(&messages, &self.request_options())
            .await?;

        self.emit(AgentEvent::CompletionCompleted {
            agent_name: self.name.clone(),
            response_length: reply.content().map_or(0, str::len),
            function_call: reply.function_call_payload().is_some(),
        })
        .await;

        let requested = reply.function_call_payload().map(|call| call.name.clone());
        let (reply, outcome) = self.functions.resolve(reply).await;
        let dispatched = requested.filter(|_| outcome != DispatchOutcome::NotAFunctionCall);
        if let Some(function_name) = dispatched {
            self.emit(AgentEvent::FunctionDispatched {
                agent_name: self.name.clone(),
                function_name,
                success: outcome == DispatchOutcome::Succeeded,
            })
            .await;
        }

        Ok(reply.with_sender(self.name.as_str()))
    }
}
