//! CLI components.

pub mod commands;
pub mod prompt;
pub mod render;
pub mod repl;
pub mod runner;

pub use commands::{Command, COMMANDS};
pub use prompt::{create_reedline, PonderCompleter, PonderHighlighter, PonderPrompt};
pub use render::{NoticeLevel, TurnRenderer};
pub use repl::Repl;
pub use runner::{list_sessions, open_database, run_interactive, run_single_prompt};
