//! Conversational-model boundary
//!
//! The pipeline talks to the language model through [`ChatModel`]: a context
//! snapshot goes in, reply text comes back as a bounded channel of
//! fragments, and the channel closing is the completion signal. The shipped
//! implementation speaks the OpenAI-compatible streaming chat API that
//! DeepSeek exposes.

pub mod deepseek;

pub use deepseek::{DeepSeekChat, LlmConfig};

use async_trait::async_trait;
use tokio::sync::mpsc;

use datavoice_core::Message;

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Request error: {0}")]
    Request(String),

    #[error("Provider error ({status}): {body}")]
    Provider { status: u16, body: String },

    #[error("Stream error: {0}")]
    Stream(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Request(err.to_string())
    }
}

/// Streaming conversational model.
///
/// `stream_chat` suspends only to open the stream; fragments arrive on the
/// returned channel and the sender side is dropped when the reply is
/// complete.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn stream_chat(&self, messages: &[Message]) -> Result<mpsc::Receiver<String>, LlmError>;
}
