//! Streaming chat-model endpoints.
//!
//! A [`ChatModel`] takes the conversation so far and streams back text
//! fragments that concatenate, in order, into the full response.

mod openai;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::history::Message;

pub use openai::{OpenAiCompatClient, DEFAULT_API_BASE, DEFAULT_MODEL};

/// Errors from a model endpoint.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("No API key configured (set GROQ_API_KEY or pass --api-key)")]
    MissingCredential,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error: {0}")]
    Api(String),
}

pub type ModelResult<T> = Result<T, ModelError>;

/// Ordered text fragments of one response.
pub type TextStream = Pin<Box<dyn Stream<Item = ModelResult<String>> + Send>>;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for display and logging.
    fn name(&self) -> &str;

    /// Check that a request could be attempted at all.
    ///
    /// Called before a turn touches the conversation, so a failure here
    /// leaves the session unchanged.
    fn ensure_ready(&self) -> ModelResult<()> {
        Ok(())
    }

    /// Start streaming a response to `messages`.
    async fn stream(&self, messages: &[Message]) -> ModelResult<TextStream>;
}
