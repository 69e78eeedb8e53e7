//! Language model stage
//!
//! A settled caller turn triggers one streamed model call. Reply fragments
//! go downstream as text frames, followed by a `reply_end` marker so the
//! synthesis flush and the assistant aggregation know the reply is whole.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{info, instrument};

use datavoice_core::{ControlFrame, ConversationContext, Frame, TextFrame};
use datavoice_llm::ChatModel;

use crate::stage::{Stage, StageOutput};
use crate::PipelineError;

pub struct LanguageModelStage {
    model: Arc<dyn ChatModel>,
    context: Arc<Mutex<ConversationContext>>,
}

impl LanguageModelStage {
    pub fn new(model: Arc<dyn ChatModel>, context: Arc<Mutex<ConversationContext>>) -> Self {
        Self { model, context }
    }
}

#[async_trait]
impl Stage for LanguageModelStage {
    fn name(&self) -> &'static str {
        "language_model"
    }

    #[instrument(skip_all, name = "llm_turn")]
    async fn process(&mut self, frame: Frame, out: &mut StageOutput) -> Result<(), PipelineError> {
        match frame {
            Frame::Transcript(t) if t.is_final => {
                // Snapshot outside the await: the lock must not be held
                // across the model call.
                let messages = self.context.lock().snapshot();

                let mut rx = self.model.stream_chat(&messages).await?;
                let mut fragments = 0usize;
                while let Some(fragment) = rx.recv().await {
                    out.push(TextFrame::new(fragment));
                    fragments += 1;
                }
                info!(turn_id = t.turn_id, fragments, "model reply streamed");
                out.push(ControlFrame::reply_end());
            }
            // Partials never reach the model.
            Frame::Transcript(_) => {}
            other => out.push(other),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datavoice_core::{Message, TranscriptFrame};
    use datavoice_llm::LlmError;
    use tokio::sync::mpsc;

    /// Streams a fixed fragment script for every call.
    struct ScriptedModel {
        fragments: Vec<&'static str>,
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn stream_chat(
            &self,
            _messages: &[Message],
        ) -> Result<mpsc::Receiver<String>, LlmError> {
            let (tx, rx) = mpsc::channel(8);
            let fragments: Vec<String> = self.fragments.iter().map(|s| s.to_string()).collect();
            tokio::spawn(async move {
                for f in fragments {
                    if tx.send(f).await.is_err() {
                        return;
                    }
                }
            });
            Ok(rx)
        }
    }

    fn context() -> Arc<Mutex<ConversationContext>> {
        Arc::new(Mutex::new(ConversationContext::new("prompt")))
    }

    #[tokio::test]
    async fn test_final_transcript_streams_reply_and_marker() {
        let model = Arc::new(ScriptedModel {
            fragments: vec!["120", "万"],
        });
        let mut stage = LanguageModelStage::new(model, context());

        let mut out = StageOutput::default();
        stage
            .process(TranscriptFrame::final_result("销售额多少", 0).into(), &mut out)
            .await
            .unwrap();

        assert_eq!(
            out.frames(),
            &[
                TextFrame::new("120").into(),
                TextFrame::new("万").into(),
                ControlFrame::reply_end().into(),
            ]
        );
    }

    #[tokio::test]
    async fn test_partial_transcript_is_consumed() {
        let model = Arc::new(ScriptedModel { fragments: vec![] });
        let mut stage = LanguageModelStage::new(model, context());

        let mut out = StageOutput::default();
        stage
            .process(TranscriptFrame::partial("销售", 0).into(), &mut out)
            .await
            .unwrap();
        assert!(out.is_empty());
    }
}
