//! Append-only conversation history.
//!
//! A [`HistoryStore`] durably records one [`ConversationTurn`] per completed
//! exchange and replays a session's turns in order. [`reconstruct`] turns
//! that replay back into the message list a model expects.
//!
//! Implementations:
//! - [`crate::db::HistoryRepository`] - SQLite, the durable store
//! - [`MemoryHistory`] - in-process, used when no database is reachable

mod memory;
mod replay;
mod retry;

use thiserror::Error;
use tracing::warn;

use crate::db::{ConversationTurn, NewTurn};

pub use memory::MemoryHistory;
pub use replay::{reconstruct, Message, DEFAULT_SYSTEM_PROMPT};
pub use retry::{append_with_retry, RetryPolicy};

/// Errors from a history store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("History store unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),

    #[error("History store lock poisoned")]
    Poisoned,

    #[error("Sequence {supplied} is not after {latest} in session {session_id}")]
    SequenceConflict {
        session_id: String,
        supplied: i64,
        latest: i64,
    },
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Durable, append-only log of turns keyed by session id.
pub trait HistoryStore {
    /// Append one turn.
    ///
    /// Assigns the next sequence for the session when the turn carries none.
    /// Not idempotent: every call writes a new row.
    fn append(&self, turn: &NewTurn) -> Result<ConversationTurn, StoreError>;

    /// All turns of a session, ascending by sequence.
    fn try_load(&self, session_id: &str) -> Result<Vec<ConversationTurn>, StoreError>;

    /// Like [`try_load`](Self::try_load), but a failing store reads as an
    /// empty history.
    fn load(&self, session_id: &str) -> Vec<ConversationTurn> {
        match self.try_load(session_id) {
            Ok(turns) => turns,
            Err(e) => {
                warn!(session_id, "Failed to load history, treating as empty: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    impl HistoryStore for BrokenStore {
        fn append(&self, _turn: &NewTurn) -> Result<ConversationTurn, StoreError> {
            Err(StoreError::Poisoned)
        }

        fn try_load(&self, _session_id: &str) -> Result<Vec<ConversationTurn>, StoreError> {
            Err(StoreError::Unavailable(rusqlite::Error::InvalidQuery))
        }
    }

    #[test]
    fn load_folds_store_failure_into_empty() {
        assert!(BrokenStore.load("any").is_empty());
        assert!(BrokenStore.try_load("any").is_err());
    }

    #[test]
    fn only_unavailable_is_transient() {
        assert!(StoreError::Unavailable(rusqlite::Error::InvalidQuery).is_transient());
        assert!(!StoreError::Poisoned.is_transient());
        assert!(!StoreError::SequenceConflict {
            session_id: "s".into(),
            supplied: 1,
            latest: 1,
        }
        .is_transient());
    }

    #[test]
    fn store_error_display() {
        let err = StoreError::SequenceConflict {
            session_id: "abc".into(),
            supplied: 2,
            latest: 5,
        };
        assert_eq!(err.to_string(), "Sequence 2 is not after 5 in session abc");
    }
}
