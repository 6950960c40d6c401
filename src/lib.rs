//! Ponder Library
//!
//! Core functionality for the `ponder` CLI: a streaming chat client for
//! reasoning models that separates the model's thinking from its answer and
//! keeps every exchange in a durable, replayable history.
//!
//! ## Main Components
//!
//! - [`segmenter`] - Splits responses into thinking span and answer, live and final
//! - [`history`] - `HistoryStore` trait, message reconstruction, append retry
//! - [`db`] - SQLite database for persistence
//! - [`provider`] - Streaming OpenAI-compatible model client
//! - [`session`] - Conversation sessions and turns
//! - [`config`] - Configuration and settings management
//! - [`cli`] - Command-line interface (REPL, commands, rendering)
//!
//! ## Quick Start
//!
//! ```ignore
//! use ponder::{ChatSession, Database, HistoryRepository, OpenAiCompatClient};
//!
//! let db = Database::open()?;
//! db.migrate()?;
//! let store = HistoryRepository::new(&db);
//! let model = OpenAiCompatClient::new(DEFAULT_API_BASE, api_key, DEFAULT_MODEL);
//! let mut session = ChatSession::new(DEFAULT_SYSTEM_PROMPT);
//! let outcome = session.run_turn(&model, &store, "Hi", &cancel, |_| {}).await?;
//! ```

pub mod cli;
pub mod config;
pub mod db;
pub mod history;
pub mod provider;
pub mod segmenter;
pub mod session;

// Re-export commonly used types
pub use config::{AppConfig, ConfigOverrides, Settings};
pub use db::{ConversationTurn, Database, HistoryRepository, NewTurn};
pub use history::{
    reconstruct, HistoryStore, MemoryHistory, Message, RetryPolicy, StoreError,
    DEFAULT_SYSTEM_PROMPT,
};
pub use provider::{ChatModel, ModelError, OpenAiCompatClient, DEFAULT_API_BASE, DEFAULT_MODEL};
pub use segmenter::{split_thinking, DisplayFrame, Segments, ThinkingSegmenter};
pub use session::{ChatSession, ResumeStatus, SessionId, TurnError, TurnOutcome};
