//! Thinking/answer segmentation for reasoning-model output.
//!
//! Reasoning models emit their intermediate reasoning wrapped in a delimiter
//! pair (`<think>` ... `</think>`) ahead of the final answer. This module
//! classifies text into those two parts:
//!
//! - [`split_thinking`] classifies a complete buffer (persistence, history
//!   display).
//! - [`ThinkingSegmenter`] follows a response while it streams in and decides
//!   what may be shown live.
//!
//! Both agree on the final classification for any input, however it was
//! fragmented.

mod stream;

pub use stream::{Phase, ThinkingSegmenter};

/// Opening marker of a thinking span.
pub const THINK_OPEN: &str = "<think>";

/// Closing marker of a thinking span.
pub const THINK_CLOSE: &str = "</think>";

/// The delimiter pair that brackets a thinking span.
///
/// Markers are matched literally and case-sensitively. Nesting is not
/// supported; only the first span is recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub open: &'static str,
    pub close: &'static str,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            open: THINK_OPEN,
            close: THINK_CLOSE,
        }
    }
}

impl Delimiters {
    /// Byte range of the span in `text`, markers included.
    ///
    /// Only the first occurrence of each marker counts: when the first
    /// closing marker comes before the first opening marker there is no
    /// span. Markers must not overlap each other.
    pub fn locate(&self, text: &str) -> Option<(usize, usize)> {
        let start = text.find(self.open)?;
        let close = text.find(self.close)?;
        if close < start + self.open.len() {
            return None;
        }
        Some((start, close + self.close.len()))
    }

    /// The reasoning text inside a span, without its markers.
    pub fn inner<'t>(&self, span: &'t str) -> &'t str {
        let body = span.strip_prefix(self.open).unwrap_or(span);
        body.strip_suffix(self.close).unwrap_or(body).trim()
    }
}

/// Final classification of a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segments {
    /// The delimited span, markers included, if one was found.
    pub thinking: Option<String>,
    /// The answer. Trimmed when a span was found, verbatim otherwise.
    pub answer: String,
}

impl Segments {
    /// Answer text as it should be presented.
    pub fn display_answer(&self) -> &str {
        self.answer.trim()
    }

    pub fn has_thinking(&self) -> bool {
        self.thinking.is_some()
    }
}

/// What a caller should render after a refresh.
///
/// Borrows from the buffer it was built from, so producing a frame per
/// fragment costs nothing proportional to the response length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayFrame<'a> {
    pub thinking_visible: bool,
    pub thinking_text: Option<&'a str>,
    pub answer_text: &'a str,
}

impl<'a> DisplayFrame<'a> {
    /// A frame carrying only answer text.
    pub fn answer(text: &'a str) -> Self {
        Self {
            thinking_visible: false,
            thinking_text: None,
            answer_text: text,
        }
    }
}

impl<'a> From<&'a Segments> for DisplayFrame<'a> {
    fn from(segments: &'a Segments) -> Self {
        Self {
            thinking_visible: segments.thinking.is_some(),
            thinking_text: segments.thinking.as_deref(),
            answer_text: segments.display_answer(),
        }
    }
}

/// Classify a complete buffer using the default `<think>` markers.
pub fn split_thinking(text: &str) -> Segments {
    split_with(text, Delimiters::default())
}

/// Classify a complete buffer.
///
/// With a well-formed span, the thinking part runs from the opening marker
/// through the closing marker and the answer is whatever follows, trimmed.
/// Without one (including an opening marker that is never closed) there is
/// no thinking part and the whole buffer is the answer.
pub fn split_with(text: &str, delimiters: Delimiters) -> Segments {
    match delimiters.locate(text) {
        Some((start, end)) => Segments {
            thinking: Some(text[start..end].to_string()),
            answer: text[end..].trim().to_string(),
        },
        None => Segments {
            thinking: None,
            answer: text.to_string(),
        },
    }
}
