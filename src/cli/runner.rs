//! CLI runner for interactive, single-prompt, and listing modes.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::cli::repl::Repl;
use crate::cli::render::{NoticeLevel, TurnRenderer};
use crate::config::AppConfig;
use crate::db::{Database, HistoryRepository};
use crate::history::{HistoryStore, MemoryHistory};
use crate::session::{ChatSession, ResumeStatus};

/// Sessions printed by `--list-sessions`.
const LIST_LIMIT: usize = 50;

/// Open and migrate the history database.
///
/// Failure is not fatal: the caller falls back to in-memory history and the
/// user is told their conversation will not be saved.
pub fn open_database(path: Option<PathBuf>) -> Option<Database> {
    let opened = match path {
        Some(path) => Database::open_at(path),
        None => Database::open(),
    };

    let result = opened.and_then(|db| {
        db.migrate()?;
        Ok(db)
    });

    match result {
        Ok(db) => {
            info!(path = %db.path().display(), "History database ready");
            Some(db)
        }
        Err(e) => {
            warn!("History database unavailable: {:#}", e);
            let _ = TurnRenderer::stdout(false).notice(
                NoticeLevel::Warning,
                &format!("History database unavailable ({:#}); this conversation will not be saved", e),
            );
            None
        }
    }
}

/// Start a fresh session, or resume `session_id` from the store.
fn open_session(
    store: &dyn HistoryStore,
    config: &AppConfig,
    session_id: Option<&str>,
) -> (ChatSession, Option<ResumeStatus>) {
    let (session, status) = match session_id {
        Some(id) => {
            let (session, status) = ChatSession::resume(store, id, config.system_prompt.as_str());
            (session, Some(status))
        }
        None => (ChatSession::new(config.system_prompt.as_str()), None),
    };

    // An explicit label wins over the one found in history.
    let session = match &config.chat_id {
        Some(chat_id) => session.with_chat_id(Some(chat_id.clone())),
        None => session,
    };
    (session, status)
}

/// Run a single prompt and exit.
pub async fn run_single_prompt(
    db: Option<&Database>,
    config: AppConfig,
    session_id: Option<&str>,
    prompt: &str,
) -> anyhow::Result<()> {
    let memory = MemoryHistory::new();
    let repo = db.map(HistoryRepository::new);
    let store: &dyn HistoryStore = match &repo {
        Some(repo) => repo,
        None => &memory,
    };

    let (session, status) = open_session(store, &config, session_id);
    let mut repl = Repl::new(db, store, config, session);
    if let Some(ResumeStatus::Degraded(e)) = &status {
        warn!("Continuing without history: {}", e);
    }

    repl.handle_prompt(prompt).await
}

/// Run in interactive mode.
pub async fn run_interactive(
    db: Option<&Database>,
    config: AppConfig,
    session_id: Option<&str>,
) -> anyhow::Result<()> {
    print_banner();

    let memory = MemoryHistory::new();
    let repo = db.map(HistoryRepository::new);
    let store: &dyn HistoryStore = match &repo {
        Some(repo) => repo,
        None => &memory,
    };

    let (session, status) = open_session(store, &config, session_id);
    let mut repl = Repl::new(db, store, config, session);
    if let Some(status) = &status {
        repl.report_resume(status, true)?;
    }

    repl.run().await
}

/// Print saved sessions and exit.
pub fn list_sessions(db: Option<&Database>) -> anyhow::Result<()> {
    let Some(db) = db else {
        anyhow::bail!("No history database available");
    };

    let sessions = HistoryRepository::new(db).list_sessions(LIST_LIMIT)?;
    TurnRenderer::stdout(false).sessions(&sessions)?;
    Ok(())
}

/// Print the welcome banner.
pub fn print_banner() {
    println!();
    println!(
        "  \x1b[1;35mponder\x1b[0m  \x1b[2mv{}\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    println!("  \x1b[2mStreaming chat with reasoning models\x1b[0m");
    println!("  \x1b[2mType \x1b[0m\x1b[1;36m/help\x1b[0m\x1b[2m for commands, Ctrl-C stops a response.\x1b[0m");
    println!();
}
