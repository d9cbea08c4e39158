//! Function definitions, handlers and dispatch.
//!
//! A model may answer with a [`FunctionCall`] instead of text. The agent that
//! hosts the model resolves that call against its [`FunctionMap`]:
//!
//! | Case | Resulting message |
//! |---|---|
//! | handler found, returns `Ok(s)` | function result `s`, tagged with the function name |
//! | handler found, returns `Err(e)` | function result `"Error: {e}"`, tagged with the function name |
//! | no handler | text `"Unknown function: {name}. Available functions: {names}"`, call cleared |
//!
//! Handler failures never propagate out of dispatch.
//!
//! The module also ships the two built-in group chat functions,
//! `terminate_group_chat` and `clear_group_chat`, and [`fix_invalid_json`], a
//! handler wrapper that asks a model to repair malformed arguments.
//!
//! # Example
//!
//! ```rust
//! use agentchat::function::{FunctionDefinition, FunctionMap};
//! use agentchat::message::Message;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let functions = FunctionMap::new().with_function(
//!     FunctionDefinition::new("shout", "Upper-case a string", json!({"type": "object"})),
//!     |args: String| async move { Ok(args.to_uppercase()) },
//! );
//!
//! let reply = functions.dispatch(Message::function_call("shout", "hey")).await;
//! assert_eq!(reply.content(), Some("HEY"));
//! assert_eq!(reply.function_name(), Some("shout"));
//! # }
//! ```

use crate::agentchat::agent::AgentResult;
use crate::agentchat::client_wrapper::{ClientWrapper, CompletionOptions};
use crate::agentchat::message::{Message, MessageBody, Role, CLEAR_MESSAGES, EOF_MSG, TERMINATE};
use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub const TERMINATE_GROUP_CHAT: &str = "terminate_group_chat";
pub const CLEAR_GROUP_CHAT: &str = "clear_group_chat";

/// Schema of a function the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

impl FunctionDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Async handler receiving the raw JSON arguments and returning a result string.
pub type FunctionHandler =
    Arc<dyn Fn(String) -> BoxFuture<'static, AgentResult<String>> + Send + Sync>;

/// Errors raised by the built-in handlers.
#[derive(Debug, Clone)]
pub enum FunctionError {
    InvalidArguments(String),
}

impl fmt::Display for FunctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionError::InvalidArguments(msg) => write!(f, "Invalid arguments: {}", msg),
        }
    }
}

impl Error for FunctionError {}

/// How [`FunctionMap::resolve`] handled a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The reply carried no pending function call and was left untouched.
    NotAFunctionCall,
    Succeeded,
    Failed,
    UnknownFunction,
}

/// Ordered map from function name to definition and handler.
#[derive(Clone, Default)]
pub struct FunctionMap {
    entries: Vec<(FunctionDefinition, FunctionHandler)>,
}

impl fmt::Debug for FunctionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionMap")
            .field("functions", &self.names())
            .finish()
    }
}

impl FunctionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a boxed handler, replacing any function with the same name.
    pub fn register(&mut self, definition: FunctionDefinition, handler: FunctionHandler) {
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.name == definition.name)
        {
            Some(entry) => *entry = (definition, handler),
            None => self.entries.push((definition, handler)),
        }
    }

    /// Register an async closure as a handler.
    pub fn register_fn<F, Fut>(&mut self, definition: FunctionDefinition, handler: F)
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AgentResult<String>> + Send + 'static,
    {
        let handler: FunctionHandler = Arc::new(move |args: String| handler(args).boxed());
        self.register(definition, handler);
    }

    /// Builder flavour of [`register_fn`](Self::register_fn).
    pub fn with_function<F, Fut>(mut self, definition: FunctionDefinition, handler: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AgentResult<String>> + Send + 'static,
    {
        self.register_fn(definition, handler);
        self
    }

    /// Register `terminate_group_chat` and `clear_group_chat`.
    pub fn with_group_chat_functions(mut self) -> Self {
        self.register_fn(terminate_group_chat_definition(), |args: String| async move {
            let args: TerminateArgs = parse_arguments(&args)?;
            Ok(terminate_group_chat(&args.message))
        });
        self.register_fn(clear_group_chat_definition(), |args: String| async move {
            let args: ClearArgs = parse_arguments(&args)?;
            Ok(clear_group_chat(&args.context))
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(d, _)| d.name.as_str()).collect()
    }

    pub fn definitions(&self) -> Vec<FunctionDefinition> {
        self.entries.iter().map(|(d, _)| d.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&FunctionHandler> {
        self.entries
            .iter()
            .find(|(d, _)| d.name == name)
            .map(|(_, handler)| handler)
    }

    /// Resolve a pending function call on `reply`. Other replies pass through.
    pub async fn dispatch(&self, reply: Message) -> Message {
        self.resolve(reply).await.0
    }

    /// Like [`dispatch`](Self::dispatch), also reporting what happened.
    pub async fn resolve(&self, reply: Message) -> (Message, DispatchOutcome) {
        let Message { role, body, sender } = reply;
        let call = match body {
            MessageBody::FunctionCall { call } => call,
            body => return (Message { role, body, sender }, DispatchOutcome::NotAFunctionCall),
        };

        let handler = match self.get(&call.name) {
            Some(handler) => Arc::clone(handler),
            None => {
                let content = format!(
                    "Unknown function: {}. Available functions: {}",
                    call.name,
                    self.names().join(",")
                );
                log::warn!("{}", content);
                let message = Message {
                    role,
                    body: MessageBody::Text { content },
                    sender,
                };
                return (message, DispatchOutcome::UnknownFunction);
            }
        };

        log::debug!("dispatching {} with arguments {}", call.name, call.arguments);
        let (result, outcome) = match handler(call.arguments.clone()).await {
            Ok(result) => (result, DispatchOutcome::Succeeded),
            Err(e) => {
                log::warn!("function {} failed: {}", call.name, e);
                (format!("Error: {}", e), DispatchOutcome::Failed)
            }
        };

        let message = Message {
            role,
            body: MessageBody::FunctionResult { call, result },
            sender,
        };
        (message, outcome)
    }
}

fn parse_arguments<T: for<'de> Deserialize<'de>>(args: &str) -> Result<T, FunctionError> {
    serde_json::from_str(args).map_err(|e| FunctionError::InvalidArguments(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct TerminateArgs {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ClearArgs {
    context: String,
}

/// Output of the `terminate_group_chat` function.
pub fn terminate_group_chat(message: &str) -> String {
    format!("{}: {}", TERMINATE, message)
}

/// Output of the `clear_group_chat` function: the summary followed by the
/// clear marker.
pub fn clear_group_chat(context: &str) -> String {
    format!("{}\n{}\n{}\n", context, EOF_MSG, CLEAR_MESSAGES)
}

pub fn terminate_group_chat_definition() -> FunctionDefinition {
    FunctionDefinition::new(
        TERMINATE_GROUP_CHAT,
        "terminate the group chat.",
        json!({
            "type": "object",
            "properties": {
                "message": {"type": "string", "description": "terminate message."}
            },
            "required": ["message"]
        }),
    )
}

pub fn clear_group_chat_definition() -> FunctionDefinition {
    FunctionDefinition::new(
        CLEAR_GROUP_CHAT,
        "Summarize the current conversation.",
        json!({
            "type": "object",
            "properties": {
                "context": {"type": "string", "description": "conversation context."}
            },
            "required": ["context"]
        }),
    )
}

fn fix_json_prompt(arguments: &str) -> String {
    format!(
        "Fix the invalid json. Your response should only contain the fixed Json object\n```json\n{}\n```\n\nResponse example:\n{{\n// fixed json\n}}",
        arguments
    )
}

/// Wrap `handler` so that arguments which are not a JSON object are first sent
/// to `client` for repair (temperature 0, at most 1024 tokens).
pub fn fix_invalid_json(
    handler: FunctionHandler,
    client: Arc<dyn ClientWrapper>,
) -> FunctionHandler {
    Arc::new(move |arguments: String| {
        let handler = Arc::clone(&handler);
        let client = Arc::clone(&client);
        async move {
            let arguments = match serde_json::from_str::<serde_json::Map<String, Value>>(&arguments) {
                Ok(_) => arguments,
                Err(e) => {
                    log::warn!(
                        "invalid function arguments ({}), asking {} to fix them",
                        e,
                        client.model_name()
                    );
                    let options = CompletionOptions::default()
                        .with_temperature(0.0)
                        .with_max_tokens(1024);
                    let prompt = [Message::new(Role::System, fix_json_prompt(&arguments))];
                    let fixed = client.send_message(&prompt, &options).await?;
                    let fixed = fixed.content().ok_or_else(|| {
                        FunctionError::InvalidArguments(
                            "repair request returned no content".to_string(),
                        )
                    })?;
                    log::debug!("fixed arguments: {}", fixed);
                    fixed.to_string()
                }
            };
            handler(arguments).await
        }
        .boxed()
    })
}

/// Build a pending function call message, mostly useful in tests and scripted
/// agents.
pub fn call(name: &str, arguments: Value) -> Message {
    Message::function_call(name, arguments.to_string())
}
