//! Reedline prompt, highlighter, and slash command completion.
//!
//! Type "/" then Tab to see commands. Menu filters as you type.

use nu_ansi_term::{Color, Style};
use reedline::{
    ColumnarMenu, Completer, Emacs, Highlighter, KeyCode, KeyModifiers, MenuBuilder, Prompt,
    PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, Reedline, ReedlineEvent,
    ReedlineMenu, Span, StyledText, Suggestion,
};
use std::borrow::Cow;

use super::commands::COMMANDS;
use crate::config::KNOWN_KEYS;

/// Interactive prompt showing the model and the current session.
pub struct PonderPrompt {
    pub model_name: String,
    pub session_id: String,
    pub chat_id: Option<String>,
}

impl PonderPrompt {
    pub fn new(model: &str, session_id: &str, chat_id: Option<&str>) -> Self {
        Self {
            model_name: model.to_string(),
            session_id: session_id.to_string(),
            chat_id: chat_id.map(str::to_string),
        }
    }

    /// First block of the session id, enough to tell sessions apart.
    fn short_session(&self) -> &str {
        self.session_id
            .split('-')
            .next()
            .unwrap_or(&self.session_id)
    }
}

impl Prompt for PonderPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        match &self.chat_id {
            Some(chat) => Cow::Owned(format!(
                "\x1b[1;35mponder\x1b[0m \x1b[2m[{} · {}]\x1b[0m \x1b[36m#{}\x1b[0m",
                self.model_name,
                self.short_session(),
                chat
            )),
            None => Cow::Owned(format!(
                "\x1b[1;35mponder\x1b[0m \x1b[2m[{} · {}]\x1b[0m",
                self.model_name,
                self.short_session()
            )),
        }
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed(" › ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(&self, hs: PromptHistorySearch) -> Cow<'_, str> {
        let prefix = match hs.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!("({}search: {}) ", prefix, hs.term))
    }
}

/// Syntax highlighter for slash commands
#[derive(Clone)]
pub struct PonderHighlighter;

impl Highlighter for PonderHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled = StyledText::new();

        if line.starts_with('/') {
            let cmd_end = line.find(' ').unwrap_or(line.len());
            let cmd = &line[..cmd_end];
            let is_valid = COMMANDS.iter().any(|(c, _)| *c == cmd);

            if is_valid {
                styled.push((Style::new().fg(Color::Cyan).bold(), cmd.to_string()));
            } else {
                styled.push((Style::new().fg(Color::Yellow), cmd.to_string()));
            }

            if cmd_end < line.len() {
                styled.push((Style::default(), line[cmd_end..].to_string()));
            }
        } else {
            styled.push((Style::default(), line.to_string()));
        }

        styled
    }
}

/// Completer for slash commands and `/set` keys.
#[derive(Clone, Default)]
pub struct PonderCompleter;

impl Completer for PonderCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        if pos > line.len() || !line.is_char_boundary(pos) {
            return Vec::new();
        }

        let input = &line[..pos];

        if input.is_empty() || !input.starts_with('/') {
            return Vec::new();
        }

        // Command completion (no space yet)
        if !input.contains(' ') {
            let prefix = input.to_lowercase();
            return COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(&prefix))
                .map(|(cmd, desc)| Suggestion {
                    value: cmd.to_string(),
                    description: Some(desc.to_string()),
                    extra: None,
                    span: Span::new(0, pos),
                    append_whitespace: true,
                    style: None,
                })
                .collect();
        }

        // Setting keys: /set xxx
        if let Some(rest) = input.strip_prefix("/set ") {
            if rest.contains(' ') {
                return Vec::new();
            }
            let prefix = rest.to_lowercase();
            let start = pos - rest.len();
            return KNOWN_KEYS
                .iter()
                .filter(|(key, _)| key.starts_with(&prefix))
                .map(|(key, desc)| Suggestion {
                    value: key.to_string(),
                    description: Some(desc.to_string()),
                    extra: None,
                    span: Span::new(start, pos),
                    append_whitespace: true,
                    style: None,
                })
                .collect();
        }

        Vec::new()
    }
}

/// Create a configured Reedline instance.
pub fn create_reedline() -> Reedline {
    let completion_menu = Box::new(
        ColumnarMenu::default()
            .with_name("completion_menu")
            .with_columns(1)
            .with_column_padding(2)
            .with_text_style(Style::new().fg(Color::Default))
            .with_selected_text_style(Style::new().fg(Color::Black).on(Color::Cyan))
            .with_description_text_style(Style::new().fg(Color::DarkGray)),
    );

    let mut keybindings = reedline::default_emacs_keybindings();

    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::UntilFound(vec![
            ReedlineEvent::Menu("completion_menu".to_string()),
            ReedlineEvent::MenuNext,
        ]),
    );
    keybindings.add_binding(
        KeyModifiers::SHIFT,
        KeyCode::BackTab,
        ReedlineEvent::MenuPrevious,
    );

    Reedline::create()
        .with_completer(Box::new(PonderCompleter))
        .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
        .with_quick_completions(true)
        .with_partial_completions(true)
        .with_highlighter(Box::new(PonderHighlighter))
        .with_edit_mode(Box::new(Emacs::new(keybindings)))
}
