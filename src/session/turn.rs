//! Running one exchange: model call, segmentation, persistence.

use futures::StreamExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ChatSession;
use crate::db::NewTurn;
use crate::history::{append_with_retry, HistoryStore, Message, StoreError};
use crate::provider::{ChatModel, ModelError};
use crate::segmenter::{DisplayFrame, Segments, ThinkingSegmenter};

/// Why a turn did not complete.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Response cancelled")]
    Cancelled,
}

/// Result of a completed turn.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Final classification of the response.
    pub segments: Segments,
    /// Sequence of the stored turn, or why it could not be stored. The
    /// conversation continues in memory either way.
    pub persisted: Result<i64, StoreError>,
}

impl ChatSession {
    /// Send `prompt`, stream the response, and record the exchange.
    ///
    /// `on_frame` is called after every fragment that changes what should
    /// be displayed; nothing is called while a thinking span is still open.
    /// The final frame is `DisplayFrame::from(&outcome.segments)`.
    ///
    /// If the model is not usable (e.g. no API key) the session is left
    /// untouched. If the stream fails or `cancel` fires, the prompt is
    /// dropped from the conversation and nothing is persisted.
    pub async fn run_turn<F>(
        &mut self,
        model: &dyn ChatModel,
        store: &dyn HistoryStore,
        prompt: &str,
        cancel: &CancellationToken,
        mut on_frame: F,
    ) -> Result<TurnOutcome, TurnError>
    where
        F: FnMut(&DisplayFrame<'_>),
    {
        model.ensure_ready()?;

        self.messages.push(Message::Human(prompt.to_string()));
        let segments = match self.stream_response(model, cancel, &mut on_frame).await {
            Ok(segments) => segments,
            Err(e) => {
                self.messages.pop();
                warn!(session_id = %self.id, "Turn abandoned: {}", e);
                return Err(e);
            }
        };

        self.messages.push(Message::ai_from_parts(
            segments.thinking.as_deref(),
            &segments.answer,
        ));

        let turn = NewTurn::new(
            self.id.as_str(),
            prompt,
            segments.thinking.clone(),
            segments.answer.clone(),
        )
        .with_chat_id(self.chat_id.clone());

        let persisted = append_with_retry(store, &turn, &self.retry)
            .await
            .map(|stored| stored.sequence);

        match &persisted {
            Ok(sequence) => info!(session_id = %self.id, sequence, "Turn complete"),
            Err(e) => warn!(session_id = %self.id, "Turn kept in memory only: {}", e),
        }

        Ok(TurnOutcome {
            segments,
            persisted,
        })
    }

    async fn stream_response<F>(
        &self,
        model: &dyn ChatModel,
        cancel: &CancellationToken,
        on_frame: &mut F,
    ) -> Result<Segments, TurnError>
    where
        F: FnMut(&DisplayFrame<'_>),
    {
        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TurnError::Cancelled),
            stream = model.stream(&self.messages) => stream?,
        };

        let mut segmenter = ThinkingSegmenter::new();
        let mut fragments = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TurnError::Cancelled),
                next = stream.next() => next,
            };

            match next {
                Some(Ok(fragment)) => {
                    fragments += 1;
                    if let Some(frame) = segmenter.push(&fragment) {
                        on_frame(&frame);
                    }
                }
                Some(Err(e)) => return Err(e.into()),
                None => break,
            }
        }

        debug!(
            model = model.name(),
            fragments,
            bytes = segmenter.buffer().len(),
            "Response stream finished"
        );
        Ok(segmenter.finish())
    }
}
