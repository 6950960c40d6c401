//! Bounded retry for history appends.

use std::time::Duration;

use tracing::{debug, warn};

use super::{HistoryStore, StoreError};
use crate::db::{ConversationTurn, NewTurn};

/// How often and how patiently to retry a failed append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Try once, never wait.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before the given retry (1-based), doubling each time.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Append a turn, retrying transient failures with exponential backoff.
///
/// Only [`StoreError::is_transient`] errors are retried. Returns the last
/// error once attempts are exhausted.
pub async fn append_with_retry(
    store: &dyn HistoryStore,
    turn: &NewTurn,
    policy: &RetryPolicy,
) -> Result<ConversationTurn, StoreError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match store.append(turn) {
            Ok(stored) => {
                debug!(
                    session_id = %stored.session_id,
                    sequence = stored.sequence,
                    attempt,
                    "Turn persisted"
                );
                return Ok(stored);
            }
            Err(e) if e.is_transient() && attempt < attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    "Failed to persist turn (attempt {}/{}), retrying in {:?}: {}",
                    attempt, attempts, delay, e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
