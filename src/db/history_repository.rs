//! SQLite-backed chat history.
//!
//! All SQL against `chat_history` lives here: appending turns, replaying a
//! session in order, and summarising sessions for the resume picker.

use chrono::Utc;
use rusqlite::{OptionalExtension, Transaction, TransactionBehavior};

use crate::db::{ConversationTurn, Database, NewTurn, SessionSummary};
use crate::history::{HistoryStore, StoreError};

/// History persistence operations.
pub struct HistoryRepository<'a> {
    db: &'a Database,
}

impl<'a> HistoryRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Highest sequence stored for a session, if any.
    pub fn latest_sequence(&self, session_id: &str) -> Result<Option<i64>, rusqlite::Error> {
        self.db.conn().query_row(
            "SELECT MAX(sequence) FROM chat_history WHERE session_id = ?",
            [session_id],
            |row| row.get(0),
        )
    }

    /// Number of turns stored for a session.
    pub fn count_turns(&self, session_id: &str) -> Result<i64, rusqlite::Error> {
        self.db.conn().query_row(
            "SELECT COUNT(*) FROM chat_history WHERE session_id = ?",
            [session_id],
            |row| row.get(0),
        )
    }

    /// Most recently active sessions first.
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>, rusqlite::Error> {
        let mut stmt = self.db.conn().prepare(
            "SELECT h.session_id,
                    (SELECT chat_id FROM chat_history
                      WHERE session_id = h.session_id AND chat_id IS NOT NULL
                      ORDER BY sequence DESC LIMIT 1),
                    COUNT(*),
                    MAX(h.created_at),
                    (SELECT user_message FROM chat_history
                      WHERE session_id = h.session_id
                      ORDER BY sequence LIMIT 1)
             FROM chat_history h
             GROUP BY h.session_id
             ORDER BY MAX(h.created_at) DESC, MAX(h.id) DESC
             LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            Ok(SessionSummary {
                session_id: row.get(0)?,
                chat_id: row.get(1)?,
                turn_count: row.get(2)?,
                last_active: row.get(3)?,
                opening_message: row.get(4)?,
            })
        })?;

        rows.collect()
    }

    /// Look up a single turn by row id.
    pub fn get_turn(&self, id: i64) -> Result<Option<ConversationTurn>, rusqlite::Error> {
        self.db
            .conn()
            .query_row(
                "SELECT id, session_id, chat_id, user_message, thinking_process,
                        ai_message, sequence, created_at
                 FROM chat_history
                 WHERE id = ?",
                [id],
                row_to_turn,
            )
            .optional()
    }
}

fn row_to_turn(row: &rusqlite::Row<'_>) -> Result<ConversationTurn, rusqlite::Error> {
    Ok(ConversationTurn {
        id: row.get(0)?,
        session_id: row.get(1)?,
        chat_id: row.get(2)?,
        user_message: row.get(3)?,
        thinking: row.get(4)?,
        ai_message: row.get(5)?,
        sequence: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl HistoryStore for HistoryRepository<'_> {
    fn append(&self, turn: &NewTurn) -> Result<ConversationTurn, StoreError> {
        // Rolls back on drop, including after a failed COMMIT.
        let tx = Transaction::new_unchecked(self.db.conn(), TransactionBehavior::Immediate)?;

        let latest = self.latest_sequence(&turn.session_id)?.unwrap_or(0);
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
        let created_at = Utc::now().timestamp();

        tx.execute(
            "INSERT INTO chat_history
                (session_id, chat_id, user_message, thinking_process, ai_message, sequence, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                turn.session_id,
                turn.chat_id,
                turn.user_message,
                turn.thinking,
                turn.ai_message,
                sequence,
                created_at,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(turn.clone().into_turn(id, sequence, created_at))
    }

    fn try_load(&self, session_id: &str) -> Result<Vec<ConversationTurn>, StoreError> {
        let mut stmt = self.db.conn().prepare(
            "SELECT id, session_id, chat_id, user_message, thinking_process,
                    ai_message, sequence, created_at
             FROM chat_history
             WHERE session_id = ?
             ORDER BY sequence",
        )?;

        let rows = stmt.query_map([session_id], row_to_turn)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
