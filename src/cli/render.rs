//! Terminal rendering of turns, history, and notices.
//!
//! A terminal cannot take back what it printed, so the renderer only ever
//! appends: each frame prints the part of the answer not yet on screen.

use std::io::{self, stdout, Stdout, Write};

use crossterm::{
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    ExecutableCommand,
};

use crate::db::SessionSummary;
use crate::history::Message;
use crate::segmenter::{split_thinking, Delimiters, DisplayFrame, Segments};
use crate::session::format_relative_time;

/// Longest opening message shown in a session listing.
const PREVIEW_CHARS: usize = 48;

/// Notice levels for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

impl NoticeLevel {
    fn color(self) -> Color {
        match self {
            Self::Info => Color::Cyan,
            Self::Warning => Color::Yellow,
            Self::Error => Color::Red,
        }
    }
}

/// Renders conversation output to a terminal-like writer.
pub struct TurnRenderer<W: Write> {
    out: W,
    show_thinking: bool,
    /// Answer text already on screen for the current turn.
    printed: String,
    thinking_shown: bool,
}

impl TurnRenderer<Stdout> {
    pub fn stdout(show_thinking: bool) -> Self {
        Self::new(stdout(), show_thinking)
    }
}

impl<W: Write> TurnRenderer<W> {
    pub fn new(out: W, show_thinking: bool) -> Self {
        Self {
            out,
            show_thinking,
            printed: String::new(),
            thinking_shown: false,
        }
    }

    pub fn show_thinking(&self) -> bool {
        self.show_thinking
    }

    pub fn set_show_thinking(&mut self, show: bool) {
        self.show_thinking = show;
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Start rendering a new assistant response.
    pub fn begin(&mut self) -> io::Result<()> {
        self.printed.clear();
        self.thinking_shown = false;
        self.out.execute(SetForegroundColor(Color::Green))?;
        self.out.execute(SetAttribute(Attribute::Bold))?;
        self.out.execute(Print("assistant › "))?;
        self.out.execute(SetAttribute(Attribute::Reset))?;
        self.out.execute(ResetColor)?;
        self.out.flush()
    }

    /// Render a live frame.
    pub fn frame(&mut self, frame: &DisplayFrame<'_>) -> io::Result<()> {
        if frame.thinking_visible && !self.thinking_shown {
            if !self.printed.is_empty() {
                writeln!(self.out)?;
            }
            self.thinking(frame.thinking_text.unwrap_or_default())?;
            self.thinking_shown = true;
            self.printed.clear();
        }

        match frame.answer_text.strip_prefix(self.printed.as_str()) {
            Some(rest) => {
                write!(self.out, "{}", rest)?;
                self.printed.push_str(rest);
            }
            None => {
                // The answer was rewritten (e.g. an unclosed span fell back
                // to the whole buffer); start it on a fresh line.
                writeln!(self.out)?;
                write!(self.out, "{}", frame.answer_text)?;
                self.printed = frame.answer_text.to_string();
            }
        }
        self.out.flush()
    }

    /// Render the final classification and end the response.
    pub fn finish(&mut self, segments: &Segments) -> io::Result<()> {
        // Without a span the live frames showed the raw buffer; keep
        // comparing against it so nothing is printed twice.
        let frame = if segments.has_thinking() {
            DisplayFrame::from(segments)
        } else {
            DisplayFrame::answer(&segments.answer)
        };
        self.frame(&frame)?;
        writeln!(self.out)?;
        writeln!(self.out)?;
        self.out.flush()
    }

    /// End a response that did not complete.
    pub fn abandon(&mut self) -> io::Result<()> {
        self.printed.clear();
        self.thinking_shown = false;
        writeln!(self.out)?;
        self.out.flush()
    }

    /// Render a thinking span, collapsed unless thinking is shown.
    pub fn thinking(&mut self, span: &str) -> io::Result<()> {
        let body = Delimiters::default().inner(span);

        self.out.execute(SetForegroundColor(Color::DarkGrey))?;
        if self.show_thinking {
            self.out.execute(Print("▾ Thinking\n"))?;
            for line in body.lines() {
                self.out.execute(Print(format!("  │ {}\n", line)))?;
            }
        } else {
            let words = body.split_whitespace().count();
            self.out.execute(Print(format!(
                "▸ Thinking hidden ({} word{}, /thinking to show)\n",
                words,
                if words == 1 { "" } else { "s" }
            )))?;
        }
        self.out.execute(ResetColor)?;
        Ok(())
    }

    /// Echo a user message.
    pub fn user(&mut self, text: &str) -> io::Result<()> {
        self.out.execute(SetForegroundColor(Color::Blue))?;
        self.out.execute(SetAttribute(Attribute::Bold))?;
        self.out.execute(Print("you › "))?;
        self.out.execute(SetAttribute(Attribute::Reset))?;
        self.out.execute(ResetColor)?;
        writeln!(self.out, "{}", text)?;
        Ok(())
    }

    /// Replay a conversation, skipping the system message.
    pub fn history(&mut self, messages: &[Message]) -> io::Result<()> {
        for message in messages {
            match message {
                Message::System(_) => {}
                Message::Human(text) => self.user(text)?,
                Message::Ai(text) => {
                    let segments = split_thinking(text);
                    self.begin()?;
                    if let Some(span) = segments.thinking.as_deref() {
                        writeln!(self.out)?;
                        self.thinking(span)?;
                    }
                    writeln!(self.out, "{}", segments.display_answer())?;
                    writeln!(self.out)?;
                }
            }
        }
        self.out.flush()
    }

    /// List saved sessions, most recent first.
    pub fn sessions(&mut self, sessions: &[SessionSummary]) -> io::Result<()> {
        if sessions.is_empty() {
            writeln!(self.out, "No saved sessions")?;
            return self.out.flush();
        }

        for summary in sessions {
            self.out.execute(SetAttribute(Attribute::Bold))?;
            self.out.execute(Print(&summary.session_id))?;
            self.out.execute(SetAttribute(Attribute::Reset))?;
            if let Some(chat) = &summary.chat_id {
                self.out.execute(SetForegroundColor(Color::Cyan))?;
                self.out.execute(Print(format!(" #{}", chat)))?;
                self.out.execute(ResetColor)?;
            }
            self.out.execute(SetForegroundColor(Color::DarkGrey))?;
            self.out.execute(Print(format!(
                "  {} turn{}, {}\n",
                summary.turn_count,
                if summary.turn_count == 1 { "" } else { "s" },
                format_relative_time(summary.last_active)
            )))?;
            self.out.execute(ResetColor)?;
            writeln!(self.out, "  {}", preview(&summary.opening_message))?;
        }
        self.out.flush()
    }

    /// Print a one-line notice.
    pub fn notice(&mut self, level: NoticeLevel, text: &str) -> io::Result<()> {
        self.out.execute(SetForegroundColor(level.color()))?;
        self.out.execute(Print(text))?;
        self.out.execute(ResetColor)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}

/// First line of `text`, shortened to [`PREVIEW_CHARS`].
fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    if line.chars().count() > PREVIEW_CHARS {
        let cut: String = line.chars().take(PREVIEW_CHARS - 1).collect();
        format!("{}…", cut)
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::ThinkingSegmenter;

    fn render_stream(fragments: &[&str], show_thinking: bool) -> String {
        let mut renderer = TurnRenderer::new(Vec::new(), show_thinking);
        let mut segmenter = ThinkingSegmenter::new();

        renderer.begin().unwrap();
        for fragment in fragments {
            if let Some(frame) = segmenter.push(fragment) {
                renderer.frame(&frame).unwrap();
            }
        }
        renderer.finish(&segmenter.finish()).unwrap();

        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn plain_answer_printed_once() {
        let out = render_stream(&["Hello", ", world", "!"], false);
        assert_eq!(out.matches("Hello, world!").count(), 1);
        assert!(!out.contains("Thinking"));
    }

    #[test]
    fn thinking_collapsed_by_default() {
        let out = render_stream(&["<think>", "two words", "</think>", "Answer."], false);
        assert!(out.contains("Thinking hidden (2 words"));
        assert!(!out.contains("two words"));
        assert_eq!(out.matches("Answer.").count(), 1);
    }

    #[test]
    fn thinking_expanded_when_enabled() {
        let out = render_stream(&["<think>line one\nline two</think>", "Done"], true);
        assert!(out.contains("▾ Thinking"));
        assert!(out.contains("│ line one"));
        assert!(out.contains("│ line two"));
        assert!(!out.contains("<think>"));
        assert_eq!(out.matches("Done").count(), 1);
    }

    #[test]
    fn unclosed_span_reveals_whole_buffer() {
        let out = render_stream(&["<think>", "never closed"], false);
        assert!(out.contains("<think>never closed"));
        assert!(!out.contains("Thinking hidden"));
    }

    #[test]
    fn raw_whitespace_is_not_reprinted() {
        let out = render_stream(&["  padded ", "answer \n"], false);
        assert_eq!(out.matches("padded").count(), 1);
    }

    #[test]
    fn history_splits_ai_payloads() {
        let mut renderer = TurnRenderer::new(Vec::new(), false);
        renderer
            .history(&[
                Message::System("sys".into()),
                Message::Human("Why?".into()),
                Message::Ai("<think>because reasons</think>\nBecause.".into()),
            ])
            .unwrap();

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(!out.contains("sys"));
        assert!(out.contains("you › "));
        assert!(out.contains("Why?"));
        assert!(out.contains("Thinking hidden (2 words"));
        assert!(out.contains("Because."));
        assert!(!out.contains("because reasons"));
    }

    #[test]
    fn notice_is_printed_with_text() {
        let mut renderer = TurnRenderer::new(Vec::new(), false);
        renderer
            .notice(NoticeLevel::Warning, "Not saved to history")
            .unwrap();

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(out.contains("Not saved to history"));
    }

    #[test]
    fn toggle_show_thinking() {
        let mut renderer = TurnRenderer::new(Vec::new(), false);
        assert!(!renderer.show_thinking());
        renderer.set_show_thinking(true);
        assert!(renderer.show_thinking());
    }

    #[test]
    fn empty_session_list() {
        let mut renderer = TurnRenderer::new(Vec::new(), false);
        renderer.sessions(&[]).unwrap();
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out, "No saved sessions\n");
    }

    #[test]
    fn session_list_shows_summary() {
        let mut renderer = TurnRenderer::new(Vec::new(), false);
        renderer
            .sessions(&[SessionSummary {
                session_id: "abc-123".into(),
                chat_id: Some("work".into()),
                turn_count: 1,
                last_active: chrono::Utc::now().timestamp(),
                opening_message: "First line\nsecond line".into(),
            }])
            .unwrap();

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(out.contains("abc-123"));
        assert!(out.contains("#work"));
        assert!(out.contains("1 turn, just now"));
        assert!(out.contains("First line"));
        assert!(!out.contains("second line"));
    }

    #[test]
    fn preview_truncates_long_lines() {
        let long = "x".repeat(100);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), PREVIEW_CHARS);
        assert!(shown.ends_with('…'));
        assert_eq!(preview("short"), "short");
    }
}
