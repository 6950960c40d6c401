//! Incremental segmentation of a streaming response.

use super::{Delimiters, DisplayFrame, Segments};

/// Where the scanner is relative to the thinking span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No opening marker seen yet.
    BeforeThinking,
    /// Opening marker seen at `open_at`, closing marker still pending.
    InsideThinking { open_at: usize },
    /// Both markers seen; the span is `open_at..close_end`.
    AfterThinking { open_at: usize, close_end: usize },
    /// A closing marker arrived before any opening marker; no span can form.
    Unmatched,
}

/// Follows a growing response buffer and classifies it as it grows.
///
/// Each [`push`](Self::push) only scans the newly appended text plus enough
/// of the previous tail to catch a marker split across fragments.
#[derive(Debug, Clone)]
pub struct ThinkingSegmenter {
    delimiters: Delimiters,
    buffer: String,
    phase: Phase,
    /// Earliest offset at which a marker being sought could still begin.
    search_from: usize,
}

impl Default for ThinkingSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl ThinkingSegmenter {
    pub fn new() -> Self {
        Self::with_delimiters(Delimiters::default())
    }

    pub fn with_delimiters(delimiters: Delimiters) -> Self {
        Self {
            delimiters,
            buffer: String::new(),
            phase: Phase::BeforeThinking,
            search_from: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Everything received so far.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Append a fragment and return the frame to display, if any.
    ///
    /// Returns `None` while inside an unterminated thinking span: the
    /// caller keeps its previous display frozen until the span closes.
    pub fn push(&mut self, fragment: &str) -> Option<DisplayFrame<'_>> {
        self.buffer.push_str(fragment);
        self.advance();
        self.live_frame()
    }

    /// The live frame for the current buffer, if display is not suspended.
    pub fn live_frame(&self) -> Option<DisplayFrame<'_>> {
        match self.phase {
            Phase::BeforeThinking | Phase::Unmatched => Some(DisplayFrame::answer(&self.buffer)),
            Phase::InsideThinking { .. } => None,
            Phase::AfterThinking { open_at, close_end } => Some(DisplayFrame {
                thinking_visible: true,
                thinking_text: Some(&self.buffer[open_at..close_end]),
                answer_text: self.buffer[close_end..].trim(),
            }),
        }
    }

    /// Final classification of what has been received.
    ///
    /// An opening marker that never closed yields no thinking part and the
    /// whole buffer as the answer.
    pub fn segments(&self) -> Segments {
        match self.phase {
            Phase::AfterThinking { open_at, close_end } => Segments {
                thinking: Some(self.buffer[open_at..close_end].to_string()),
                answer: self.buffer[close_end..].trim().to_string(),
            },
            _ => Segments {
                thinking: None,
                answer: self.buffer.clone(),
            },
        }
    }

    /// Consume the segmenter and return the final classification.
    pub fn finish(self) -> Segments {
        self.segments()
    }

    fn advance(&mut self) {
        loop {
            match self.phase {
                Phase::BeforeThinking => {
                    let open = self.delimiters.open;
                    let close = self.delimiters.close;
                    match (self.find_from(open), self.find_from(close)) {
                        (Some(open_at), Some(close_at)) if close_at < open_at => {
                            self.phase = Phase::Unmatched;
                        }
                        (None, Some(_)) => self.phase = Phase::Unmatched,
                        (Some(open_at), _) => {
                            self.phase = Phase::InsideThinking { open_at };
                            self.search_from = open_at + open.len();
                        }
                        (None, None) => {
                            self.hold_tail(open.len().max(close.len()));
                            return;
                        }
                    }
                }
                Phase::InsideThinking { open_at } => {
                    let marker = self.delimiters.close;
                    match self.find_from(marker) {
                        Some(close_at) => {
                            self.phase = Phase::AfterThinking {
                                open_at,
                                close_end: close_at + marker.len(),
                            };
                            self.search_from = self.buffer.len();
                        }
                        None => {
                            self.hold_tail(marker.len());
                            return;
                        }
                    }
                }
                Phase::AfterThinking { .. } | Phase::Unmatched => return,
            }
        }
    }

    fn find_from(&self, marker: &str) -> Option<usize> {
        self.buffer[self.search_from..]
            .find(marker)
            .map(|at| at + self.search_from)
    }

    /// After a miss, only the last `marker_len - 1` bytes can still start
    /// a match once more text arrives.
    fn hold_tail(&mut self, marker_len: usize) {
        let mut at = self
            .buffer
            .len()
            .saturating_sub(marker_len.saturating_sub(1));
        while !self.buffer.is_char_boundary(at) {
            at -= 1;
        }
        self.search_from = self.search_from.max(at);
    }
}
