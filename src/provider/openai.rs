//! OpenAI-compatible streaming client (Groq by default).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::{ChatModel, ModelError, ModelResult, TextStream};
use crate::history::Message;
use crate::segmenter::{THINK_CLOSE, THINK_OPEN};

pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "deepseek-r1-distill-llama-70b";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default, alias = "reasoning")]
    reasoning_content: Option<String>,
}

/// Folds separate reasoning deltas into the text stream.
///
/// Some endpoints send reasoning in its own field instead of inline
/// `<think>` tags; wrapping it keeps one text format downstream.
#[derive(Debug, Default)]
struct DeltaAssembler {
    reasoning_open: bool,
}

impl DeltaAssembler {
    fn on_delta(&mut self, delta: &Delta) -> Option<String> {
        let mut out = String::new();

        if let Some(reasoning) = delta.reasoning_content.as_deref().filter(|r| !r.is_empty()) {
            if !self.reasoning_open {
                out.push_str(THINK_OPEN);
                out.push('\n');
                self.reasoning_open = true;
            }
            out.push_str(reasoning);
        }

        if let Some(content) = delta.content.as_deref().filter(|c| !c.is_empty()) {
            if let Some(close) = self.close() {
                out.push_str(&close);
            }
            out.push_str(content);
        }

        (!out.is_empty()).then_some(out)
    }

    fn close(&mut self) -> Option<String> {
        if self.reasoning_open {
            self.reasoning_open = false;
            Some(format!("\n{}\n\n", THINK_CLOSE))
        } else {
            None
        }
    }
}

/// Streaming client for `/chat/completions` endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatClient {
    pub fn new(api_base: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            api_base,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn build_request<'a>(&'a self, messages: &'a [Message]) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role(),
                    content: m.content(),
                })
                .collect(),
            stream: true,
        }
    }

    /// Drain complete SSE events from `buffer`, returning their data payloads.
    ///
    /// `buffer` holds raw bytes so a character split across network chunks
    /// is only decoded once its event is complete. Carriage returns are
    /// expected to have been stripped already.
    fn parse_sse_events(buffer: &mut Vec<u8>) -> Vec<String> {
        let mut events = Vec::new();
        while let Some(pos) = buffer.windows(2).position(|w| w == b"\n\n") {
            let raw: Vec<u8> = buffer.drain(..pos + 2).take(pos).collect();
            let raw = String::from_utf8_lossy(&raw);

            let data_lines: Vec<&str> = raw
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(str::trim)
                .collect();

            if !data_lines.is_empty() {
                events.push(data_lines.join("\n"));
            }
        }
        events
    }

    /// Text carried by one SSE payload.
    fn payload_text(payload: &str, assembler: &mut DeltaAssembler) -> ModelResult<Option<String>> {
        let chunk: StreamChunk = serde_json::from_str(payload)?;
        Ok(chunk
            .choices
            .first()
            .and_then(|choice| assembler.on_delta(&choice.delta)))
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.model
    }

    fn ensure_ready(&self) -> ModelResult<()> {
        match self.api_key {
            Some(_) => Ok(()),
            None => Err(ModelError::MissingCredential),
        }
    }

    async fn stream(&self, messages: &[Message]) -> ModelResult<TextStream> {
        let api_key = self.api_key.as_deref().ok_or(ModelError::MissingCredential)?;
        let request = self.build_request(messages);

        debug!(
            "Sending streaming chat request to {} with model {}",
            self.api_base, self.model
        );

        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ModelError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut response = response;
            let mut buffer: Vec<u8> = Vec::new();
            let mut assembler = DeltaAssembler::default();

            loop {
                let chunk = match response.chunk().await {
                    Ok(Some(bytes)) => bytes,
                    Ok(None) => break,
                    Err(err) => {
                        let _ = tx.send(Err(ModelError::Http(err)));
                        return;
                    }
                };

                buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

                for payload in Self::parse_sse_events(&mut buffer) {
                    if payload == "[DONE]" {
                        if let Some(close) = assembler.close() {
                            let _ = tx.send(Ok(close));
                        }
                        return;
                    }
                    trace!("SSE payload: {}", payload);

                    match Self::payload_text(&payload, &mut assembler) {
                        Ok(Some(text)) => {
                            if tx.send(Ok(text)).is_err() {
                                // Receiver dropped: the turn was cancelled.
                                return;
                            }
                        }
                        Ok(None) => {}
                        Err(err) => {
                            let _ = tx.send(Err(err));
                            return;
                        }
                    }
                }
            }

            if let Some(close) = assembler.close() {
                let _ = tx.send(Ok(close));
            }
        });

        Ok(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })))
    }
}
