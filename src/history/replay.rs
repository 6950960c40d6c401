//! Rebuilding model messages from stored turns.

use serde::{Deserialize, Serialize};

use crate::db::ConversationTurn;

/// Instruction that opens every conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// A message in the conversation sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "content", rename_all = "lowercase")]
pub enum Message {
    System(String),
    Human(String),
    Ai(String),
}

impl Message {
    /// Build an AI message from a segmented response.
    ///
    /// The thinking span, when present, is kept ahead of the answer on its
    /// own line so the payload can be segmented again later.
    pub fn ai_from_parts(thinking: Option<&str>, answer: &str) -> Self {
        match thinking {
            Some(thinking) => Self::Ai(format!("{}\n{}", thinking, answer)),
            None => Self::Ai(answer.to_string()),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::System(text) | Self::Human(text) | Self::Ai(text) => text,
        }
    }

    /// Role name on OpenAI-compatible endpoints.
    pub fn role(&self) -> &'static str {
        match self {
            Self::System(_) => "system",
            Self::Human(_) => "user",
            Self::Ai(_) => "assistant",
        }
    }
}

/// Rebuild the message list for stored turns.
///
/// Always starts with the system instruction, followed by a human/AI pair
/// per turn in the order given.
pub fn reconstruct(turns: &[ConversationTurn], system_prompt: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(turns.len() * 2 + 1);
    messages.push(Message::System(system_prompt.to_string()));

    for turn in turns {
        messages.push(Message::Human(turn.user_message.clone()));
        messages.push(Message::ai_from_parts(
            turn.thinking.as_deref(),
            &turn.ai_message,
        ));
    }

    messages
}
