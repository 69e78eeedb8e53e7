//! Transcript side channel
//!
//! Final transcripts are pushed to the client as `{"type": "transcript"}`
//! control events, independent of the main audio flow, so the UI can render
//! what the caller said without waiting for the reply.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use datavoice_core::{ControlFrame, Frame};

use crate::stage::{Stage, StageOutput};
use crate::PipelineError;

pub struct TranscriptForwarderStage {
    outbound: mpsc::Sender<Frame>,
}

impl TranscriptForwarderStage {
    pub fn new(outbound: mpsc::Sender<Frame>) -> Self {
        Self { outbound }
    }
}

#[async_trait]
impl Stage for TranscriptForwarderStage {
    fn name(&self) -> &'static str {
        "transcript_forwarder"
    }

    async fn process(&mut self, frame: Frame, out: &mut StageOutput) -> Result<(), PipelineError> {
        if let Frame::Transcript(t) = &frame {
            // Partials are forwarded too so the client can render speech as
            // it is being recognized; blanks produce no side effect.
            if !t.is_blank() {
                let event = ControlFrame::transcript(t.text.clone());
                if self.outbound.send(event.into()).await.is_err() {
                    debug!("outbound channel closed, transcript event dropped");
                }
            }
        }
        out.push(frame);
        Ok(())
    }
}
