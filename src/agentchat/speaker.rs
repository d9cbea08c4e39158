//! Speaker selection.
//!
//! Before every turn the group chat asks its [`SpeakerSelector`] which
//! participant should talk next. Two strategies are provided:
//!
//! - [`RolePlaySelector`] asks a model to continue a role-play transcript and
//!   reads the speaker from its `From <name>:` answer. An answer that cannot be
//!   parsed or names nobody in the roster yields `None`, and the group chat
//!   falls back to its admin.
//! - [`RoundRobinSelector`] picks the participant after the last speaker,
//!   wrapping around. An empty history starts with the first participant.

use crate::agentchat::agent::{Agent, AgentResult};
use crate::agentchat::client_wrapper::{ClientWrapper, CompletionOptions};
use crate::agentchat::conversation::render_for_role_play;
use crate::agentchat::group_chat::GroupChatError;
use crate::agentchat::message::{Message, Role};
use async_trait::async_trait;
use std::sync::Arc;

/// Everything a selector may look at when choosing the next speaker.
pub struct SelectionRequest<'a> {
    /// The roster, admin included.
    pub participants: &'a [Arc<dyn Agent>],
    pub initialization: &'a [Message],
    /// History after compaction.
    pub history: &'a [Message],
    /// Sender of the most recent message in the full history.
    pub last_speaker: Option<&'a str>,
}

#[async_trait]
pub trait SpeakerSelector: Send + Sync {
    /// Index into `request.participants` of the next speaker, or `None` when
    /// no participant could be determined.
    async fn select_next(&self, request: &SelectionRequest<'_>) -> AgentResult<Option<usize>>;
}

/// Extract the speaker name from a `From <name>:` answer.
///
/// ```rust
/// use agentchat::speaker::parse_speaker_name;
///
/// assert_eq!(parse_speaker_name("From coder:"), Some("coder"));
/// assert_eq!(parse_speaker_name("  From admin"), Some("admin"));
/// assert_eq!(parse_speaker_name("coder"), None);
/// assert_eq!(parse_speaker_name("From :"), None);
/// ```
pub fn parse_speaker_name(answer: &str) -> Option<&str> {
    let name = answer
        .trim_start()
        .strip_prefix("From ")?
        .trim()
        .trim_end_matches(':')
        .trim_end();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn role_play_prompt(names: &[&str]) -> String {
    format!(
        "You are in a role play game. Carefully read the conversation history and carry on the conversation.\nThe available roles are:\n{}\n\nEach message will start with 'From name:', e.g:\nFrom admin:\n//your message//.",
        names.join(",")
    )
}

/// Model-driven selection through a role-play prompt.
pub struct RolePlaySelector {
    client: Arc<dyn ClientWrapper>,
}

impl RolePlaySelector {
    pub fn new(client: Arc<dyn ClientWrapper>) -> Self {
        Self { client }
    }

    /// The full request sent to the model for `request`.
    pub fn build_prompt(&self, request: &SelectionRequest<'_>) -> Vec<Message> {
        let names: Vec<&str> = request.participants.iter().map(|a| a.name()).collect();
        let mut messages = vec![Message::new(Role::System, role_play_prompt(&names))];
        messages.extend(render_for_role_play(request.initialization, request.history));
        messages
    }
}

#[async_trait]
impl SpeakerSelector for RolePlaySelector {
    async fn select_next(&self, request: &SelectionRequest<'_>) -> AgentResult<Option<usize>> {
        let options = CompletionOptions::default()
            .with_temperature(0.0)
            .with_stop(":");
        let answer = self
            .client
            .send_message(&self.build_prompt(request), &options)
            .await?;

        let content = answer.content().unwrap_or_default();
        let selected = parse_speaker_name(content).and_then(|name| {
            request
                .participants
                .iter()
                .position(|agent| agent.name().eq_ignore_ascii_case(name))
        });

        if selected.is_none() {
            log::debug!("could not resolve a speaker from {:?}", content);
        }
        Ok(selected)
    }
}

/// Deterministic selection in roster order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRobinSelector;

#[async_trait]
impl SpeakerSelector for RoundRobinSelector {
    async fn select_next(&self, request: &SelectionRequest<'_>) -> AgentResult<Option<usize>> {
        if request.participants.is_empty() {
            return Err(Box::new(GroupChatError::NoParticipants));
        }

        let last = match request.last_speaker {
            None => return Ok(Some(0)),
            Some(last) => last,
        };

        match request.participants.iter().position(|a| a.name() == last) {
            Some(index) => Ok(Some((index + 1) % request.participants.len())),
            None => Err(Box::new(GroupChatError::UnknownSpeaker(last.to_string()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_speaker_name_requires_prefix() {
        assert_eq!(parse_speaker_name("From coder"), Some("coder"));
        assert_eq!(parse_speaker_name("From  Coder :"), Some("Coder"));
        assert_eq!(parse_speaker_name("Fromcoder"), None);
        assert_eq!(parse_speaker_name("I think coder"), None);
        assert_eq!(parse_speaker_name(""), None);
        assert_eq!(parse_speaker_name("From "), None);
    }

    #[test]
    fn test_role_play_prompt_lists_names() {
        let prompt = role_play_prompt(&["coder", "admin"]);
        assert!(prompt.contains("The available roles are:\ncoder,admin\n"));
        assert!(prompt.ends_with("From admin:\n//your message//."));
    }
}
