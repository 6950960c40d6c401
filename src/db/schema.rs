//! Database schema types.

use serde::{Deserialize, Serialize};

/// A stored setting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: i64,
}

/// One completed exchange, as stored in `chat_history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: i64,
    pub session_id: String,
    /// Optional user-supplied label for the conversation.
    pub chat_id: Option<String>,
    pub user_message: String,
    /// The delimited thinking span, markers included.
    pub thinking: Option<String>,
    pub ai_message: String,
    /// Ordering key, strictly increasing within a session.
    pub sequence: i64,
    pub created_at: i64,
}

/// A turn waiting to be appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTurn {
    pub session_id: String,
    pub chat_id: Option<String>,
    pub user_message: String,
    pub thinking: Option<String>,
    pub ai_message: String,
    /// Assigned by the store when `None`.
    pub sequence: Option<i64>,
}

impl NewTurn {
    pub fn new(
        session_id: impl Into<String>,
        user_message: impl Into<String>,
        thinking: Option<String>,
        ai_message: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            chat_id: None,
            user_message: user_message.into(),
            thinking,
            ai_message: ai_message.into(),
            sequence: None,
        }
    }

    pub fn with_chat_id(mut self, chat_id: Option<String>) -> Self {
        self.chat_id = chat_id;
        self
    }

    pub fn with_sequence(mut self, sequence: i64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Materialize as a stored turn.
    pub fn into_turn(self, id: i64, sequence: i64, created_at: i64) -> ConversationTurn {
        ConversationTurn {
            id,
            session_id: self.session_id,
            chat_id: self.chat_id,
            user_message: self.user_message,
            thinking: self.thinking,
            ai_message: self.ai_message,
            sequence,
            created_at,
        }
    }
}

/// Per-session overview for listing resumable sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub chat_id: Option<String>,
    pub turn_count: i64,
    pub last_active: i64,
    /// First user message, for recognising the session.
    pub opening_message: String,
}
