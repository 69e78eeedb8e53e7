//! Conversation context aggregation
//!
//! Two stages bracket the model: the user aggregator appends each settled
//! caller turn before the model sees the context, and the assistant
//! aggregator appends the reply after synthesis has flushed, so the context
//! always alternates in wall-clock order.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use datavoice_core::{ConversationContext, Frame};

use crate::stage::{Stage, StageOutput};
use crate::PipelineError;

/// Appends final caller transcripts to the shared context.
pub struct UserContextAggregator {
    context: Arc<Mutex<ConversationContext>>,
}

impl UserContextAggregator {
    pub fn new(context: Arc<Mutex<ConversationContext>>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Stage for UserContextAggregator {
    fn name(&self) -> &'static str {
        "user_context"
    }

    async fn process(&mut self, frame: Frame, out: &mut StageOutput) -> Result<(), PipelineError> {
        if let Frame::Transcript(t) = &frame {
            if t.is_final && !t.is_blank() {
                self.context.lock().push_user(t.text.clone());
            }
        }
        out.push(frame);
        Ok(())
    }
}

/// Collects streamed reply fragments and commits them as one assistant
/// message when the reply-end marker arrives.
///
/// Sits at the end of the chain, after the audio has gone to the wire, so a
/// reply only enters the context once it was actually delivered.
pub struct AssistantContextAggregator {
    context: Arc<Mutex<ConversationContext>>,
    reply: String,
}

impl AssistantContextAggregator {
    pub fn new(context: Arc<Mutex<ConversationContext>>) -> Self {
        Self {
            context,
            reply: String::new(),
        }
    }
}

#[async_trait]
impl Stage for AssistantContextAggregator {
    fn name(&self) -> &'static str {
        "assistant_context"
    }

    async fn process(&mut self, frame: Frame, _out: &mut StageOutput) -> Result<(), PipelineError> {
        match frame {
            Frame::Text(t) => self.reply.push_str(&t.text),
            Frame::Control(c) if c.message_type() == Some("reply_end") => {
                let reply = std::mem::take(&mut self.reply);
                let reply = reply.trim();
                if !reply.is_empty() {
                    debug!(chars = reply.chars().count(), "assistant reply committed");
                    self.context.lock().push_assistant(reply);
                }
            }
            _ => {}
        }
        Ok(())
    }
}
