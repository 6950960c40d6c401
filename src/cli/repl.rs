//! Interactive REPL implementation.

use std::io::Stdout;

use reedline::{FileBackedHistory, Signal};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::commands::{help_lines, Command};
use super::prompt::{create_reedline, PonderPrompt};
use super::render::{NoticeLevel, TurnRenderer};
use crate::config::{AppConfig, Settings, SettingsError, KNOWN_KEYS};
use crate::db::{Database, HistoryRepository};
use crate::history::HistoryStore;
use crate::provider::{ChatModel, OpenAiCompatClient};
use crate::session::{ChatSession, ResumeStatus, TurnError};

/// Sessions shown by `/sessions`.
const SESSION_LIST_LIMIT: usize = 20;

/// Entries kept in the line editor's input history.
const INPUT_HISTORY_SIZE: usize = 500;

/// REPL state.
pub struct Repl<'a> {
    db: Option<&'a Database>,
    store: &'a dyn HistoryStore,
    config: AppConfig,
    model: OpenAiCompatClient,
    session: ChatSession,
    renderer: TurnRenderer<Stdout>,
}

impl<'a> Repl<'a> {
    /// Create a new REPL around an open session.
    pub fn new(
        db: Option<&'a Database>,
        store: &'a dyn HistoryStore,
        config: AppConfig,
        session: ChatSession,
    ) -> Self {
        let model = build_model(&config);
        let renderer = TurnRenderer::stdout(config.show_thinking);
        Self {
            db,
            store,
            config,
            model,
            session,
            renderer,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Tell the user how a resumed session came back.
    pub fn report_resume(&mut self, status: &ResumeStatus, replay: bool) -> anyhow::Result<()> {
        match status {
            ResumeStatus::Restored { turns: 0 } => {
                self.renderer.notice(
                    NoticeLevel::Info,
                    &format!("Session {} has no saved turns yet", self.session.id()),
                )?;
            }
            ResumeStatus::Restored { turns } => {
                self.renderer.notice(
                    NoticeLevel::Info,
                    &format!(
                        "Resumed session {} ({} turn{})",
                        self.session.id(),
                        turns,
                        if *turns == 1 { "" } else { "s" }
                    ),
                )?;
                if replay {
                    self.renderer.history(self.session.messages())?;
                }
            }
            ResumeStatus::Degraded(e) => {
                self.renderer.notice(
                    NoticeLevel::Warning,
                    &format!("Could not load history ({}); continuing without it", e),
                )?;
            }
        }
        Ok(())
    }

    /// Run the REPL loop.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut line_editor = create_reedline();
        if let Some(db) = self.db {
            let history_path = db.path().with_file_name("input_history.txt");
            match FileBackedHistory::with_file(INPUT_HISTORY_SIZE, history_path) {
                Ok(h) => line_editor = line_editor.with_history(Box::new(h)),
                Err(e) => debug!("Input history unavailable: {}", e),
            }
        }

        loop {
            let prompt = PonderPrompt::new(
                self.model.name(),
                self.session.id().as_str(),
                self.session.chat_id(),
            );

            match line_editor.read_line(&prompt) {
                Ok(Signal::Success(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    match self.handle_input(line).await {
                        Ok(true) => {
                            println!("Bye.");
                            break;
                        }
                        Ok(false) => {}
                        Err(e) => {
                            let _ = self
                                .renderer
                                .notice(NoticeLevel::Error, &format!("Error: {}", e));
                        }
                    }
                }
                Ok(Signal::CtrlC) => {
                    println!("^C");
                    continue;
                }
                Ok(Signal::CtrlD) => {
                    println!("Bye.");
                    break;
                }
                Err(err) => {
                    let _ = self
                        .renderer
                        .notice(NoticeLevel::Error, &format!("Readline error: {}", err));
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle one line. Returns `true` when the user wants to quit.
    async fn handle_input(&mut self, input: &str) -> anyhow::Result<bool> {
        match Command::parse(input) {
            Command::Prompt(prompt) => self.handle_prompt(&prompt).await?,
            Command::Quit => return Ok(true),
            command => self.handle_command(command)?,
        }
        Ok(false)
    }

    /// Send a prompt to the model and render the response.
    ///
    /// Ctrl-C while the response streams cancels the turn.
    pub async fn handle_prompt(&mut self, prompt: &str) -> anyhow::Result<()> {
        self.model.ensure_ready()?;

        let cancel = CancellationToken::new();
        let watcher = cancel_on_ctrl_c(cancel.clone());

        self.renderer.begin()?;
        let renderer = &mut self.renderer;
        let result = self
            .session
            .run_turn(&self.model, self.store, prompt, &cancel, |frame| {
                if let Err(e) = renderer.frame(frame) {
                    debug!("Failed to render frame: {}", e);
                }
            })
            .await;
        watcher.abort();

        match result {
            Ok(outcome) => {
                self.renderer.finish(&outcome.segments)?;
                if let Err(e) = outcome.persisted {
                    self.renderer
                        .notice(NoticeLevel::Warning, &format!("Not saved to history: {}", e))?;
                }
                Ok(())
            }
            Err(TurnError::Cancelled) => {
                self.renderer.abandon()?;
                self.renderer
                    .notice(NoticeLevel::Warning, "Response cancelled; nothing was saved")?;
                Ok(())
            }
            Err(e) => {
                self.renderer.abandon()?;
                Err(e.into())
            }
        }
    }

    fn handle_command(&mut self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::New => {
                self.session.reset();
                self.renderer.notice(
                    NoticeLevel::Info,
                    &format!("Started a new conversation ({})", self.session.id()),
                )?;
            }
            Command::Session => self.show_session()?,
            Command::Sessions => self.show_sessions()?,
            Command::History => {
                if self.session.turn_count() == 0 {
                    self.renderer
                        .notice(NoticeLevel::Info, "No messages in this session yet")?;
                } else {
                    self.renderer.history(self.session.messages())?;
                }
            }
            Command::Thinking => {
                let show = !self.renderer.show_thinking();
                self.renderer.set_show_thinking(show);
                self.renderer.notice(
                    NoticeLevel::Info,
                    if show {
                        "Thinking will be shown"
                    } else {
                        "Thinking will be hidden"
                    },
                )?;
            }
            Command::ChatId(label) => {
                self.session.set_chat_id(label);
                let text = match self.session.chat_id() {
                    Some(chat) => format!("Following turns are labelled #{}", chat),
                    None => "Chat label cleared".to_string(),
                };
                self.renderer.notice(NoticeLevel::Info, &text)?;
            }
            Command::Set { key, value } => self.handle_set(key, value)?,
            Command::Help => show_help(),
            Command::Unknown(input) => {
                self.renderer.notice(
                    NoticeLevel::Warning,
                    &format!("Unknown command: {} (type /help)", input),
                )?;
            }
            Command::Prompt(_) | Command::Quit => {}
        }
        Ok(())
    }

    fn show_session(&mut self) -> anyhow::Result<()> {
        println!("  Session:  {}", self.session.id());
        println!("  Label:    {}", self.session.chat_id().unwrap_or("(none)"));
        println!("  Turns:    {}", self.session.turn_count());
        println!("  Model:    {} @ {}", self.model.name(), self.model.api_base());
        match self.db {
            Some(db) => println!("  History:  {}", db.path().display()),
            None => println!("  History:  memory only (not saved)"),
        }
        println!();
        Ok(())
    }

    fn show_sessions(&mut self) -> anyhow::Result<()> {
        let Some(db) = self.db else {
            self.renderer
                .notice(NoticeLevel::Warning, "No history database; sessions are not saved")?;
            return Ok(());
        };

        match HistoryRepository::new(db).list_sessions(SESSION_LIST_LIMIT) {
            Ok(sessions) => {
                self.renderer.sessions(&sessions)?;
                if !sessions.is_empty() {
                    self.renderer.notice(
                        NoticeLevel::Info,
                        "Resume one with: ponder --session <id>",
                    )?;
                }
            }
            Err(e) => {
                warn!("Failed to list sessions: {}", e);
                self.renderer
                    .notice(NoticeLevel::Error, &format!("Could not list sessions: {}", e))?;
            }
        }
        Ok(())
    }

    fn handle_set(&mut self, key: Option<String>, value: Option<String>) -> anyhow::Result<()> {
        let Some(db) = self.db else {
            self.renderer
                .notice(NoticeLevel::Warning, "No settings database; nothing to change")?;
            return Ok(());
        };
        let settings = Settings::new(db);

        let (key, value) = match (key, value) {
            (None, _) => {
                let stored = settings.list()?;
                for (key, desc) in KNOWN_KEYS {
                    let current = stored
                        .iter()
                        .find(|(k, _)| k == key)
                        .map(|(_, v)| v.as_str())
                        .unwrap_or("(default)");
                    println!("  \x1b[1m{:<14}\x1b[0m {}", key, current);
                    println!("  \x1b[2m{:<14} {}\x1b[0m", "", desc);
                }
                return Ok(());
            }
            (Some(key), None) => {
                let current = settings.get(&key)?;
                println!("  {} = {}", key, current.as_deref().unwrap_or("(default)"));
                return Ok(());
            }
            (Some(key), Some(value)) => (key, value),
        };

        match settings.set(&key, &value) {
            Ok(()) => {}
            Err(SettingsError::UnknownKey(key)) => {
                self.renderer
                    .notice(NoticeLevel::Warning, &format!("Unknown setting: {}", key))?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        match key.as_str() {
            "model" => {
                self.config.model = value.clone();
                self.model = build_model(&self.config);
            }
            "api_base" => {
                self.config.api_base = value.clone();
                self.model = build_model(&self.config);
            }
            "show_thinking" => {
                self.config.show_thinking = settings.show_thinking();
                self.renderer.set_show_thinking(self.config.show_thinking);
            }
            "system_prompt" => {
                self.config.system_prompt = value.clone();
                self.renderer.notice(
                    NoticeLevel::Info,
                    "The new system prompt applies from the next launch",
                )?;
            }
            _ => {}
        }

        self.renderer
            .notice(NoticeLevel::Info, &format!("Set {} = {}", key, value))?;
        Ok(())
    }
}

fn build_model(config: &AppConfig) -> OpenAiCompatClient {
    OpenAiCompatClient::new(&config.api_base, config.api_key.clone(), &config.model)
}

/// Cancel `token` when Ctrl-C arrives. Abort the handle once the turn ends.
fn cancel_on_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Ctrl-C received, cancelling response");
            token.cancel();
        }
    })
}

/// Show help.
pub fn show_help() {
    println!("\n\x1b[1mCommands:\x1b[0m\n");
    for (usage, desc) in help_lines() {
        println!("  \x1b[36m{:<18}\x1b[0m {}", usage, desc);
    }
    println!("\n  Anything else is sent to the model.\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigOverrides;
    use crate::db::NewTurn;
    use crate::history::MemoryHistory;
    use tempfile::TempDir;

    fn setup_test_db() -> (TempDir, Database) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_at(temp_dir.path().join("test.db")).unwrap();
        db.migrate().unwrap();
        (temp_dir, db)
    }

    fn config() -> AppConfig {
        AppConfig::resolve(ConfigOverrides::default(), None)
    }

    #[tokio::test]
    async fn missing_key_leaves_session_untouched() {
        let store = MemoryHistory::new();
        let session = ChatSession::new(config().system_prompt);
        let mut repl = Repl::new(None, &store, config(), session);

        let err = repl.handle_prompt("hello").await.unwrap_err();

        assert!(err.to_string().contains("No API key"));
        assert_eq!(repl.session().messages().len(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn quit_and_commands_dispatch() {
        let store = MemoryHistory::new();
        let session = ChatSession::new(config().system_prompt);
        let mut repl = Repl::new(None, &store, config(), session);
        let first_id = repl.session().id().clone();

        assert!(repl.handle_input("/quit").await.unwrap());
        assert!(!repl.handle_input("/new").await.unwrap());
        assert_ne!(repl.session().id(), &first_id);

        assert!(!repl.handle_input("/chat work").await.unwrap());
        assert_eq!(repl.session().chat_id(), Some("work"));
        assert!(!repl.handle_input("/chat").await.unwrap());
        assert_eq!(repl.session().chat_id(), None);

        assert!(!repl.handle_input("/thinking").await.unwrap());
        assert!(repl.renderer.show_thinking());
    }

    #[tokio::test]
    async fn set_model_rebuilds_client_and_persists() {
        let (_tmp, db) = setup_test_db();
        let repo = HistoryRepository::new(&db);
        let session = ChatSession::new(config().system_prompt);
        let mut repl = Repl::new(Some(&db), &repo, config(), session);

        repl.handle_input("/set model qwen-qwq-32b").await.unwrap();

        assert_eq!(repl.model.name(), "qwen-qwq-32b");
        assert_eq!(Settings::new(&db).model(), "qwen-qwq-32b");
    }

    #[tokio::test]
    async fn set_unknown_key_is_not_an_error() {
        let (_tmp, db) = setup_test_db();
        let repo = HistoryRepository::new(&db);
        let session = ChatSession::new(config().system_prompt);
        let mut repl = Repl::new(Some(&db), &repo, config(), session);

        assert!(repl.handle_input("/set colour blue").await.is_ok());
        assert!(Settings::new(&db).list().unwrap().is_empty());
    }

    #[test]
    fn report_resume_variants() {
        let store = MemoryHistory::new();
        store.append(&NewTurn::new("abc", "q", None, "a")).unwrap();
        let (session, status) = ChatSession::resume(&store, "abc", "sys");
        let mut repl = Repl::new(None, &store, config(), session);

        assert!(repl.report_resume(&status, false).is_ok());
        assert_eq!(repl.session().turn_count(), 1);
    }
}
