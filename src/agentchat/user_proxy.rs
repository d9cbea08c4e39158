//! A human participant.
//!
//! [`UserProxyAgent`] asks a person for the next message instead of calling a
//! model. It writes a short prompt to its output, then reads lines from its
//! input until an empty line (or end of input) ends the message. Leading empty
//! lines are skipped. The text is returned as an assistant message tagged with
//! the agent's name.
//!
//! The agent reads standard input by default. Any
//! [`AsyncBufRead`](tokio::io::AsyncBufRead) source can be injected instead,
//! which is how scripted sessions and tests drive it.
//!
//! # Example
//!
//! ```rust
//! use agentchat::agent::AgentExt;
//! use agentchat::user_proxy::UserProxyAgent;
//! use tokio::io::BufReader;
//!
//! # #[tokio::main]
//! # async fn main() -> agentchat::agent::AgentResult<()> {
//! let human = UserProxyAgent::with_input("human", BufReader::new(&b"ship it\n\n"[..]));
//! let reply = human.send_message("ready?").await?;
//! assert_eq!(reply.content(), Some("ship it"));
//! assert_eq!(reply.sender.as_deref(), Some("human"));
//! # Ok(())
//! # }
//! ```

use crate::agentchat::agent::{Agent, AgentResult};
use crate::agentchat::message::{Message, Role};
use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

type Input = Box<dyn AsyncBufRead + Send + Unpin>;
type Output = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserProxyError {
    /// The input ended before the human typed anything.
    InputClosed(String),
}

impl fmt::Display for UserProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserProxyError::InputClosed(name) => write!(f, "No more user input for {}", name),
        }
    }
}

impl Error for UserProxyError {}

pub struct UserProxyAgent {
    name: String,
    input: Mutex<Input>,
    output: Mutex<Output>,
}

impl UserProxyAgent {
    /// A proxy reading standard input and prompting on standard output.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_io(name, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }

    /// A proxy reading `input`. Prompts are discarded.
    pub fn with_input(
        name: impl Into<String>,
        input: impl AsyncBufRead + Send + Unpin + 'static,
    ) -> Self {
        Self::with_io(name, input, tokio::io::sink())
    }

    pub fn with_io(
        name: impl Into<String>,
        input: impl AsyncBufRead + Send + Unpin + 'static,
        output: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            input: Mutex::new(Box::new(input)),
            output: Mutex::new(Box::new(output)),
        }
    }

    async fn prompt(&self) -> AgentResult<()> {
        let prompt = format!(
            "waiting for user input for {}...\nend the message with an empty line\n",
            self.name
        );
        let mut output = self.output.lock().await;
        output.write_all(prompt.as_bytes()).await?;
        output.flush().await?;
        Ok(())
    }

    async fn read_message(&self) -> AgentResult<String> {
        let mut input = self.input.lock().await;
        let mut lines: Vec<String> = Vec::new();
        let mut buf = String::new();

        loop {
            buf.clear();
            let n = input.read_line(&mut buf).await?;
            if n == 0 {
                if lines.is_empty() {
                    return Err(Box::new(UserProxyError::InputClosed(self.name.clone())));
                }
                break;
            }

            let line = buf.trim_end_matches(&['\r', '\n'][..]);
            if line.is_empty() {
                if lines.is_empty() {
                    continue;
                }
                break;
            }
            lines.push(line.to_string());
        }

        Ok(lines.join("\n"))
    }
}

#[async_trait]
impl Agent for UserProxyAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reply(&self, _conversation: &[Message]) -> AgentResult<Message> {
        self.prompt().await?;
        let content = self.read_message().await?;
        log::debug!("{} typed {} bytes", self.name, content.len());
        Ok(Message::new(Role::Assistant, content).with_sender(self.name.as_str()))
    }
}
