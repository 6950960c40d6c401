//! In-process history store.

use std::sync::Mutex;

use chrono::Utc;

use super::{HistoryStore, StoreError};
use crate::db::{ConversationTurn, NewTurn};

/// Keeps turns in memory for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    turns: Mutex<Vec<ConversationTurn>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored turns across all sessions.
    pub fn len(&self) -> usize {
        self.turns.lock().map(|turns| turns.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&self, turn: &NewTurn) -> Result<ConversationTurn, StoreError> {
        let mut turns = self.turns.lock().map_err(|_| StoreError::Poisoned)?;

        let latest = turns
            .iter()
            .filter(|t| t.session_id == turn.session_id)
            .map(|t| t.sequence)
            .max()
            .unwrap_or(0);

        let sequence = match turn.sequence {
            Some(supplied) if supplied <= latest => {
                return Err(StoreError::SequenceConflict {
                    session_id: turn.session_id.clone(),
                    supplied,
                    latest,
                })
            }
            Some(supplied) => supplied,
            None => latest + 1,
        };

        let id = turns.len() as i64 + 1;
        let stored = turn
            .clone()
            .into_turn(id, sequence, Utc::now().timestamp());
        turns.push(stored.clone());
        Ok(stored)
    }

    fn try_load(&self, session_id: &str) -> Result<Vec<ConversationTurn>, StoreError> {
        let turns = self.turns.lock().map_err(|_| StoreError::Poisoned)?;

        let mut session: Vec<ConversationTurn> = turns
            .iter()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect();
        session.sort_by_key(|t| t.sequence);
        Ok(session)
    }
}
