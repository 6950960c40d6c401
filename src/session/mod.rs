//! Conversation sessions.
//!
//! A [`ChatSession`] owns the state of one conversation: its id, the
//! message list sent to the model, and the optional chat label. The history
//! store is the durable source of truth; a session is a cache that can be
//! rebuilt from it at any time with [`ChatSession::resume`].
//!
//! ## Usage
//!
//! ```ignore
//! use ponder::session::ChatSession;
//!
//! let mut session = ChatSession::resume(&store, &id, DEFAULT_SYSTEM_PROMPT).0;
//! let outcome = session
//!     .run_turn(&model, &store, "Why is the sky blue?", &cancel, |frame| render(frame))
//!     .await?;
//! ```

mod turn;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::history::{reconstruct, HistoryStore, Message, RetryPolicy, StoreError};

pub use turn::{TurnError, TurnOutcome};

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// A fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a resumed session was obtained.
#[derive(Debug)]
pub enum ResumeStatus {
    /// History loaded (possibly empty for a session with no turns yet).
    Restored { turns: usize },
    /// The store failed; the session starts with no history.
    Degraded(StoreError),
}

/// One conversation and its in-memory message list.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: SessionId,
    chat_id: Option<String>,
    system_prompt: String,
    messages: Vec<Message>,
    retry: RetryPolicy,
}

impl ChatSession {
    /// Start a new, empty session.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        Self {
            id: SessionId::generate(),
            chat_id: None,
            messages: reconstruct(&[], &system_prompt),
            system_prompt,
            retry: RetryPolicy::default(),
        }
    }

    /// Rebuild a session from the store.
    ///
    /// A store failure is not fatal: the session comes back with only the
    /// system message and a [`ResumeStatus::Degraded`] status so the caller
    /// can tell it apart from a session that genuinely has no turns.
    pub fn resume(
        store: &dyn HistoryStore,
        id: impl Into<SessionId>,
        system_prompt: impl Into<String>,
    ) -> (Self, ResumeStatus) {
        let id = id.into();
        let system_prompt = system_prompt.into();

        let (turns, status) = match store.try_load(id.as_str()) {
            Ok(turns) => {
                let count = turns.len();
                (turns, ResumeStatus::Restored { turns: count })
            }
            Err(e) => {
                warn!(session_id = %id, "Resuming without history: {}", e);
                (Vec::new(), ResumeStatus::Degraded(e))
            }
        };

        // Keep the most recent label so new turns stay grouped with it.
        let chat_id = turns.iter().rev().find_map(|t| t.chat_id.clone());

        info!(session_id = %id, turns = turns.len(), "Session resumed");
        let session = Self {
            messages: reconstruct(&turns, &system_prompt),
            id,
            chat_id,
            system_prompt,
            retry: RetryPolicy::default(),
        };
        (session, status)
    }

    /// Label every following turn with `chat_id` (blank clears it).
    pub fn with_chat_id(mut self, chat_id: Option<String>) -> Self {
        self.set_chat_id(chat_id);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn set_chat_id(&mut self, chat_id: Option<String>) {
        self.chat_id = chat_id
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
    }

    /// Start over under a new id. Old turns stay in the store.
    pub fn reset(&mut self) {
        let previous = std::mem::replace(&mut self.id, SessionId::generate());
        self.messages = reconstruct(&[], &self.system_prompt);
        info!(previous = %previous, session_id = %self.id, "Session reset");
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Messages sent to the model, system message first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Completed exchanges held in memory.
    pub fn turn_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| matches!(m, Message::Human(_)))
            .count()
    }
}


/// Format a unix timestamp as relative time (e.g., "2 hours ago").
pub fn format_relative_time(timestamp: i64) -> String {
    let Some(dt) = DateTime::<Utc>::from_timestamp(timestamp, 0) else {
        return "unknown".to_string();
    };
    let diff = Utc::now().signed_duration_since(dt);

    if diff.num_seconds() < 60 {
        "just now".to_string()
    } else if diff.num_minutes() < 60 {
        let mins = diff.num_minutes();
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if diff.num_hours() < 24 {
        let hours = diff.num_hours();
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if diff.num_days() < 7 {
        let days = diff.num_days();
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        dt.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ConversationTurn, NewTurn};
    use crate::history::{MemoryHistory, DEFAULT_SYSTEM_PROMPT};

    struct DownStore;

    impl HistoryStore for DownStore {
        fn append(&self, _turn: &NewTurn) -> Result<ConversationTurn, StoreError> {
            Err(StoreError::Unavailable(rusqlite::Error::InvalidQuery))
        }

        fn try_load(&self, _session_id: &str) -> Result<Vec<ConversationTurn>, StoreError> {
            Err(StoreError::Unavailable(rusqlite::Error::InvalidQuery))
        }
    }

    #[test]
    fn new_session_has_only_system_message() {
        let session = ChatSession::new(DEFAULT_SYSTEM_PROMPT);

        assert_eq!(
            session.messages(),
            &[Message::System(DEFAULT_SYSTEM_PROMPT.to_string())]
        );
        assert_eq!(session.turn_count(), 0);
        assert!(!session.id().as_str().is_empty());
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = ChatSession::new(DEFAULT_SYSTEM_PROMPT);
        let b = ChatSession::new(DEFAULT_SYSTEM_PROMPT);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn resume_rebuilds_messages_from_store() {
        let store = MemoryHistory::new();
        store
            .append(&NewTurn::new("abc", "q1", Some("<think>t</think>".into()), "a1"))
            .unwrap();
        store
            .append(&NewTurn::new("abc", "q2", None, "a2").with_chat_id(Some("label".into())))
            .unwrap();

        let (session, status) = ChatSession::resume(&store, "abc", DEFAULT_SYSTEM_PROMPT);

        assert!(matches!(status, ResumeStatus::Restored { turns: 2 }));
        assert_eq!(session.id().as_str(), "abc");
        assert_eq!(session.chat_id(), Some("label"));
        assert_eq!(session.turn_count(), 2);
        assert_eq!(
            session.messages()[2],
            Message::Ai("<think>t</think>\na1".to_string())
        );
    }

    #[test]
    fn resume_unknown_session_is_restored_and_empty() {
        let store = MemoryHistory::new();
        let (session, status) = ChatSession::resume(&store, "fresh", DEFAULT_SYSTEM_PROMPT);

        assert!(matches!(status, ResumeStatus::Restored { turns: 0 }));
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn resume_with_failing_store_is_degraded() {
        let (session, status) = ChatSession::resume(&DownStore, "abc", DEFAULT_SYSTEM_PROMPT);

        assert!(matches!(status, ResumeStatus::Degraded(_)));
        assert_eq!(session.id().as_str(), "abc");
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn reset_changes_id_and_clears_messages() {
        let store = MemoryHistory::new();
        store.append(&NewTurn::new("abc", "q", None, "a")).unwrap();
        let (mut session, _) = ChatSession::resume(&store, "abc", "Be brief.");

        session.reset();

        assert_ne!(session.id().as_str(), "abc");
        assert_eq!(session.messages(), &[Message::System("Be brief.".to_string())]);
        // Old turns stay in the store.
        assert_eq!(store.load("abc").len(), 1);
    }

    #[test]
    fn chat_id_is_trimmed_and_blank_clears() {
        let mut session = ChatSession::new(DEFAULT_SYSTEM_PROMPT)
            .with_chat_id(Some("  project-x ".to_string()));
        assert_eq!(session.chat_id(), Some("project-x"));

        session.set_chat_id(Some("   ".to_string()));
        assert_eq!(session.chat_id(), None);
    }

    #[test]
    fn session_id_display_and_conversions() {
        let id = SessionId::from("abc");
        assert_eq!(id.to_string(), "abc");
        assert_eq!(SessionId::from(String::from("abc")), id);
    }

    #[test]
    fn relative_time_buckets() {
        let now = Utc::now().timestamp();
        assert_eq!(format_relative_time(now), "just now");
        assert_eq!(format_relative_time(now - 60), "1 min ago");
        assert_eq!(format_relative_time(now - 5 * 60), "5 mins ago");
        assert_eq!(format_relative_time(now - 3600), "1 hour ago");
        assert_eq!(format_relative_time(now - 3 * 86_400), "3 days ago");

        let old = DateTime::<Utc>::from_timestamp(now - 30 * 86_400, 0).unwrap();
        assert_eq!(
            format_relative_time(old.timestamp()),
            old.format("%Y-%m-%d").to_string()
        );
    }

    #[test]
    fn relative_time_out_of_range() {
        assert_eq!(format_relative_time(i64::MAX), "unknown");
    }
}
