//! DeepSeek streaming chat client
//!
//! Speaks the OpenAI-compatible `/chat/completions` API with `stream: true`
//! and relays SSE delta fragments onto a bounded channel. The HTTP
//! connection lives in a spawned task so the caller never holds the socket
//! across pipeline turns.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use datavoice_core::Message;

use crate::{ChatModel, LlmError};

/// Client configuration for an OpenAI-compatible chat endpoint.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com/v1".to_string(),
            api_key: String::new(),
            model: "deepseek-chat".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Deserialize)]
struct Delta {
    content: Option<String>,
}

/// DeepSeek chat-completions client with SSE streaming.
pub struct DeepSeekChat {
    client: reqwest::Client,
    config: LlmConfig,
}

impl DeepSeekChat {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

/// Extract the delta text from one SSE line, if it carries any.
///
/// Lines that are not `data:` events, the `[DONE]` sentinel, and chunks
/// without content (role announcements, finish markers) all yield `None`.
fn parse_sse_line(line: &str) -> Option<String> {
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|s| !s.is_empty()),
        Err(e) => {
            debug!(error = %e, "unparseable stream chunk, skipping");
            None
        }
    }
}

#[async_trait]
impl ChatModel for DeepSeekChat {
    async fn stream_chat(&self, messages: &[Message]) -> Result<mpsc::Receiver<String>, LlmError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: true,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let (tx, rx) = mpsc::channel(64);

        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(error = %e, "chat stream interrupted");
                        break;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // SSE events are newline-delimited; keep any partial line
                // in the buffer for the next chunk.
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim_end_matches('\r').to_string();
                    buffer.drain(..=pos);
                    if let Some(fragment) = parse_sse_line(&line) {
                        if tx.send(fragment).await.is_err() {
                            return;
                        }
                    }
                }
            }

            if let Some(fragment) = parse_sse_line(buffer.trim_end()) {
                let _ = tx.send(fragment).await;
            }
        });

        Ok(rx)
    }
}
