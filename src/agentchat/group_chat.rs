//! The group chat turn scheduler.
//!
//! A [`GroupChat`] owns a roster of agents and drives them through sequential
//! turns. Every turn:
//!
//! 1. stops if the round budget is used up (returning the history, or failing
//!    when [`throw_on_max_round`](GroupChatConfig::throw_on_max_round) is set),
//! 2. waits [`turn_delay`](GroupChatConfig::turn_delay),
//! 3. compacts the history at the latest clear sentinels,
//! 4. asks the [`SpeakerSelector`] for the next speaker, falling back to the
//!    admin when it has no answer,
//! 5. renders `initialization ++ compacted history` for that speaker and asks
//!    it for a reply,
//! 6. tags the reply with the speaker's name and appends it, then logs it and
//!    emits [`GroupChatEvent::MessageAppended`],
//! 7. stops if the reply carries the terminate marker.
//!
//! Agent errors abort the run. Cancelling the token passed to
//! [`run_with_cancellation`](GroupChat::run_with_cancellation) aborts the
//! in-flight turn without appending anything. Logging and event delivery for
//! an appended message are not cancellable; a cancellation that arrives during
//! them takes effect before the next turn.
//!
//! # Example
//!
//! ```rust,no_run
//! use agentchat::agent::Agent;
//! use agentchat::chat_agent::ChatAgent;
//! use agentchat::client_wrapper::ClientWrapper;
//! use agentchat::function::FunctionMap;
//! use agentchat::group_chat::GroupChat;
//! use agentchat::message::{Message, Role};
//! use std::sync::Arc;
//!
//! # async fn demo(client: Arc<dyn ClientWrapper>) -> agentchat::agent::AgentResult<()> {
//! let admin: Arc<dyn Agent> = Arc::new(
//!     ChatAgent::new("admin", "you assign tasks and end the chat when done.", client.clone())
//!         .with_functions(FunctionMap::new().with_group_chat_functions()),
//! );
//! let coder: Arc<dyn Agent> = Arc::new(ChatAgent::new("coder", "you write code.", client.clone()));
//!
//! let chat = GroupChat::new(client, admin, vec![coder])?;
//! let task = Message::new(Role::User, "print the first 10 primes").with_sender("admin");
//! let history = chat.run(vec![task]).await?;
//!
//! for message in history.iter() {
//!     println!("{}", message.format_block());
//! }
//! # Ok(())
//! # }
//! ```

use crate::agentchat::agent::{Agent, AgentResult};
use crate::agentchat::client_wrapper::ClientWrapper;
use crate::agentchat::config::GroupChatConfig;
use crate::agentchat::conversation::{render_for_speaker, Conversation};
use crate::agentchat::event::{EventHandler, GroupChatEvent};
use crate::agentchat::message::{Message, Role};
use crate::agentchat::speaker::{
    RolePlaySelector, RoundRobinSelector, SelectionRequest, SpeakerSelector,
};
use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Errors raised by a [`GroupChat`].
///
/// ```rust
/// use agentchat::group_chat::GroupChatError;
///
/// let err = GroupChatError::UnknownSpeaker("ghost".into());
/// assert_eq!(err.to_string(), "The agent is not in the group chat: ghost");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupChatError {
    /// The roster is empty.
    NoParticipants,
    /// Two participants share a name.
    DuplicateAgent(String),
    /// Round-robin selection found a last sender outside the roster.
    UnknownSpeaker(String),
    /// The selector had no answer and there is no admin to fall back to.
    NoSpeakerSelected,
    /// The round budget ran out and the config asked for a hard failure.
    MaxRoundReached(usize),
    /// A message sent into a group on behalf of an agent was authored by
    /// someone else.
    SenderMismatch {
        expected: String,
        actual: Option<String>,
    },
    /// The run was cancelled before the current turn finished.
    Cancelled,
}

impl fmt::Display for GroupChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupChatError::NoParticipants => write!(f, "No agents in group chat"),
            GroupChatError::DuplicateAgent(name) => {
                write!(f, "Agent with name '{}' already exists", name)
            }
            GroupChatError::UnknownSpeaker(name) => {
                write!(f, "The agent is not in the group chat: {}", name)
            }
            GroupChatError::NoSpeakerSelected => write!(f, "No speaker selected"),
            GroupChatError::MaxRoundReached(n) => write!(f, "Max round reached: {}", n),
            GroupChatError::SenderMismatch { expected, actual } => write!(
                f,
                "The message is not from the agent: expected {}, found {}",
                expected,
                actual.as_deref().unwrap_or("no sender")
            ),
            GroupChatError::Cancelled => write!(f, "Group chat cancelled"),
        }
    }
}

impl Error for GroupChatError {}

pub struct GroupChat {
    id: String,
    participants: Vec<Arc<dyn Agent>>,
    admin: Option<usize>,
    selector: Arc<dyn SpeakerSelector>,
    initialization: Vec<Message>,
    config: GroupChatConfig,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl GroupChat {
    /// A model-moderated group chat. `admin` joins the roster after `members`
    /// and speaks whenever the selector gives no usable answer.
    pub fn new(
        client: Arc<dyn ClientWrapper>,
        admin: Arc<dyn Agent>,
        members: Vec<Arc<dyn Agent>>,
    ) -> Result<Self, GroupChatError> {
        let mut participants = members;
        participants.push(admin);
        let admin = participants.len() - 1;
        Self::build(participants, Some(admin), Arc::new(RolePlaySelector::new(client)))
    }

    /// A round-robin group chat without an admin.
    pub fn sequential(participants: Vec<Arc<dyn Agent>>) -> Result<Self, GroupChatError> {
        Self::build(participants, None, Arc::new(RoundRobinSelector))
    }

    fn build(
        participants: Vec<Arc<dyn Agent>>,
        admin: Option<usize>,
        selector: Arc<dyn SpeakerSelector>,
    ) -> Result<Self, GroupChatError> {
        if participants.is_empty() {
            return Err(GroupChatError::NoParticipants);
        }

        let mut seen = HashSet::new();
        for agent in &participants {
            if !seen.insert(agent.name().to_string()) {
                return Err(GroupChatError::DuplicateAgent(agent.name().to_string()));
            }
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            participants,
            admin,
            selector,
            initialization: Vec::new(),
            config: GroupChatConfig::default(),
            event_handler: None,
        })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_config(mut self, config: GroupChatConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the speaker selection strategy.
    pub fn with_selector(mut self, selector: Arc<dyn SpeakerSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn with_initialization_messages(mut self, messages: Vec<Message>) -> Self {
        self.initialization = messages;
        self
    }

    /// Append a message to the context every speaker sees before the history.
    pub fn add_initialization_message(&mut self, message: Message) {
        self.initialization.push(message);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn participants(&self) -> &[Arc<dyn Agent>] {
        &self.participants
    }

    pub fn admin(&self) -> Option<&Arc<dyn Agent>> {
        self.admin.map(|index| &self.participants[index])
    }

    pub fn config(&self) -> &GroupChatConfig {
        &self.config
    }

    pub fn initialization_messages(&self) -> &[Message] {
        &self.initialization
    }

    async fn emit(&self, event: GroupChatEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_group_chat_event(&event).await;
        }
    }

    /// Run the chat starting from `history` until a terminate marker appears
    /// or the round budget is exhausted.
    pub async fn run(&self, history: Vec<Message>) -> AgentResult<Conversation> {
        self.run_with_cancellation(history, &CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run), aborting with [`GroupChatError::Cancelled`]
    /// as soon as `cancel` fires.
    pub async fn run_with_cancellation(
        &self,
        history: Vec<Message>,
        cancel: &CancellationToken,
    ) -> AgentResult<Conversation> {
        let mut conversation = Conversation::from(history);
        let mut remaining = self.config.max_round;
        let mut round = 0;

        self.emit(GroupChatEvent::RunStarted {
            chat_id: self.id.clone(),
            participants: self.participants.iter().map(|a| a.name().to_string()).collect(),
            max_round: self.config.max_round,
            started_at: chrono::Utc::now(),
        })
        .await;

        loop {
            if remaining == 0 {
                self.emit(GroupChatEvent::RoundBudgetExhausted {
                    chat_id: self.id.clone(),
                    max_round: self.config.max_round,
                })
                .await;
                if self.config.throw_on_max_round {
                    return Err(Box::new(GroupChatError::MaxRoundReached(
                        self.config.max_round,
                    )));
                }
                log::info!(
                    "group chat {} stopped after {} rounds without termination",
                    self.id,
                    self.config.max_round
                );
                return Ok(conversation);
            }

            round += 1;
            let message = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::info!("group chat {} cancelled in round {}", self.id, round);
                    return Err(Box::new(GroupChatError::Cancelled));
                }
                result = self.take_turn(&conversation, round) => result?,
            };

            let terminated = message.is_terminate();
            conversation.push(message);

            let appended = &conversation[conversation.len() - 1];
            log::info!("{}", appended.format_block());
            let event = GroupChatEvent::MessageAppended {
                chat_id: self.id.clone(),
                round,
                sender: appended.sender.clone().unwrap_or_default(),
                content_length: appended.content().map_or(0, str::len),
            };
            self.emit(event).await;

            if terminated {
                self.emit(GroupChatEvent::Terminated {
                    chat_id: self.id.clone(),
                    rounds: round,
                })
                .await;
                return Ok(conversation);
            }

            remaining -= 1;
        }
    }

    async fn take_turn(&self, conversation: &Conversation, round: usize) -> AgentResult<Message> {
        if !self.config.turn_delay.is_zero() {
            tokio::time::sleep(self.config.turn_delay).await;
        }

        let start = conversation.compacted_from(self.config.compaction_threshold);
        if start > 0 {
            log::debug!("group chat {} compacted history from {}", self.id, start);
            self.emit(GroupChatEvent::HistoryCompacted {
                chat_id: self.id.clone(),
                compacted_from: start,
            })
            .await;
        }
        let history = &conversation.messages()[start..];

        let request = SelectionRequest {
            participants: &self.participants,
            initialization: &self.initialization,
            history,
            last_speaker: conversation.last_sender(),
        };
        let (index, fallback) = match self.selector.select_next(&request).await? {
            Some(index) if index < self.participants.len() => (index, false),
            _ => match self.admin {
                Some(admin) => (admin, true),
                None => return Err(Box::new(GroupChatError::NoSpeakerSelected)),
            },
        };

        let speaker = &self.participants[index];
        if fallback {
            log::debug!("no speaker selected, falling back to {}", speaker.name());
        }
        self.emit(GroupChatEvent::SpeakerSelected {
            chat_id: self.id.clone(),
            round,
            speaker: speaker.name().to_string(),
            fallback,
        })
        .await;

        let context = render_for_speaker(speaker.name(), &self.initialization, history);
        let mut reply = speaker.reply(&context).await?;
        reply.sender = Some(speaker.name().to_string());
        Ok(reply)
    }
}

/// Let `sender` and `receiver` take turns on `history`, starting with
/// whoever did not write the last message.
pub async fn two_agent_chat(
    sender: Arc<dyn Agent>,
    receiver: Arc<dyn Agent>,
    history: Vec<Message>,
    config: GroupChatConfig,
) -> AgentResult<Conversation> {
    GroupChat::sequential(vec![sender, receiver])?
        .with_config(config)
        .run(history)
        .await
}

/// Send `text` from `sender` to `receiver` and let them talk it through.
pub async fn send_message_to_agent(
    sender: Arc<dyn Agent>,
    receiver: Arc<dyn Agent>,
    text: &str,
    config: GroupChatConfig,
) -> AgentResult<Conversation> {
    let message = Message::new(Role::User, text).with_sender(sender.name());
    two_agent_chat(sender, receiver, vec![message], config).await
}
