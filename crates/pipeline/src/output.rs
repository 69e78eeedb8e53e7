//! Transport output stage
//!
//! Hands synthesized audio to the connection's outbound channel; everything
//! else flows on toward the assistant aggregation at the chain tail.

use async_trait::async_trait;
use tokio::sync::mpsc;

use datavoice_core::{AudioDirection, Frame};

use crate::stage::{Stage, StageOutput};
use crate::PipelineError;

pub struct TransportOutputStage {
    outbound: mpsc::Sender<Frame>,
}

impl TransportOutputStage {
    pub fn new(outbound: mpsc::Sender<Frame>) -> Self {
        Self { outbound }
    }
}

#[async_trait]
impl Stage for TransportOutputStage {
    fn name(&self) -> &'static str {
        "transport_output"
    }

    async fn process(&mut self, frame: Frame, out: &mut StageOutput) -> Result<(), PipelineError> {
        match frame {
            Frame::Audio(audio) if audio.direction() == AudioDirection::Output => self
                .outbound
                .send(audio.into())
                .await
                .map_err(|_| PipelineError::ChannelClosed)?,
            other => out.push(other),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datavoice_core::{AudioFrame, TextFrame};

    #[tokio::test]
    async fn test_output_audio_goes_to_wire() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut stage = TransportOutputStage::new(tx);

        let audio: Frame = AudioFrame::output(vec![1u8, 2, 3, 4], 24000, 1).into();
        let mut out = StageOutput::default();
        stage.process(audio.clone(), &mut out).await.unwrap();

        assert_eq!(rx.try_recv().ok(), Some(audio));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_text_forwarded_down_chain() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut stage = TransportOutputStage::new(tx);

        let text: Frame = TextFrame::new("120万").into();
        let mut out = StageOutput::default();
        stage.process(text.clone(), &mut out).await.unwrap();

        assert!(rx.try_recv().is_err());
        assert_eq!(out.frames(), &[text]);
    }

    #[tokio::test]
    async fn test_closed_channel_is_an_error() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let mut stage = TransportOutputStage::new(tx);

        let audio: Frame = AudioFrame::output(vec![0u8; 8], 24000, 1).into();
        let mut out = StageOutput::default();
        let result = stage.process(audio, &mut out).await;
        assert!(matches!(result, Err(PipelineError::ChannelClosed)));
    }
}
