//! Conversation transcript: the ordered, append-only message log of one session.
//!
//! Layout of the model context:
//! 1. the system brief (exactly one, set when the interview opens);
//! 2. the opening exchange (kick-off instruction and the greeting);
//! 3. the candidate turns, in order.
//!
//! `len()` counts the brief plus the turn messages; the opening exchange is
//! preamble and is not part of the counted conversation.

use crate::llm_client::ChatMessage;

/// Messages in the opening exchange: the kick-off and the greeting.
pub const PREAMBLE_LEN: usize = 2;

/// Message log of one interview.
///
/// The counted conversation is the brief plus the candidate turns; after `n`
/// turns it holds `1 + 2n` messages. The model context carries two more, the
/// kick-off instruction and the greeting (`PREAMBLE_LEN`).
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    brief: Option<ChatMessage>,
    opening: Vec<ChatMessage>,
    turns: Vec<ChatMessage>,
}

impl Transcript {
    /// Context for the very first model call: the brief plus the kick-off.
    pub fn opening_request(brief: &str, kickoff: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::system(brief), ChatMessage::user(kickoff)]
    }

    /// A transcript for an interview whose greeting has been produced.
    pub fn open(brief: String, kickoff: &str, greeting: String) -> Self {
        let opening: [ChatMessage; PREAMBLE_LEN] =
            [ChatMessage::user(kickoff), ChatMessage::assistant(greeting)];
        Self {
            brief: Some(ChatMessage::system(brief)),
            opening: opening.into(),
            turns: Vec::new(),
        }
    }

    /// Brief plus turn messages. The opening exchange is not counted.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        usize::from(self.brief.is_some()) + self.turns.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    /// Number of system messages anywhere in the transcript.
    #[cfg(test)]
    pub fn system_messages(&self) -> usize {
        self.messages()
            .filter(|m| m.role == crate::llm_client::Role::System)
            .count()
    }

    /// Every message in model-context order.
    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.brief
            .iter()
            .chain(self.opening.iter())
            .chain(self.turns.iter())
    }

    /// Full model context for a request that would append `pending`.
    /// Nothing is recorded until `append` is called.
    pub fn with_pending(&self, pending: &[ChatMessage]) -> Vec<ChatMessage> {
        self.messages().chain(pending.iter()).cloned().collect()
    }

    /// Records messages after the backend call that produced them succeeded.
    pub fn append(&mut self, messages: impl IntoIterator<Item = ChatMessage>) {
        self.turns.extend(messages);
    }
}
