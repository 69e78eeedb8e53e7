//! Speech recognition boundary and stage
//!
//! [`SpeechToText`] is fed turn audio frame-by-frame and settles a final
//! transcript when the gate closes the turn. The stage owns the per-session
//! turn counter so every transcript downstream carries a monotonic
//! `turn_id`.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tracing::info;

use datavoice_core::audio::wrap_wav;
use datavoice_core::{AudioDirection, AudioFrame, Frame, TranscriptFrame};

use crate::stage::{Stage, StageOutput};
use crate::PipelineError;

/// A recognition result from the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    pub is_final: bool,
}

/// Recognition backend configuration.
#[derive(Debug, Clone)]
pub struct SttConfig {
    pub endpoint: String,
    pub api_key: String,
    /// BCP-47 language tag sent to the recognizer.
    pub language: String,
    /// Backend model name.
    pub model: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            language: "zh-CN".to_string(),
            model: "nova-2".to_string(),
        }
    }
}

/// Streaming speech recognizer for one session.
#[async_trait]
pub trait SpeechToText: Send {
    /// Feed one frame of turn audio; may yield partial transcripts.
    async fn feed(&mut self, audio: &AudioFrame) -> Result<Vec<Transcript>, PipelineError>;

    /// Settle the current turn into a final transcript, if any speech was
    /// recognized.
    async fn finalize(&mut self) -> Result<Option<Transcript>, PipelineError>;

    /// Discard any buffered turn audio.
    fn reset(&mut self);
}

#[derive(Deserialize)]
struct SttResponse {
    text: String,
}

/// Batch HTTP recognizer: accumulates a turn's PCM and posts it as WAV when
/// the turn settles. Yields no partials.
pub struct HttpStt {
    client: reqwest::Client,
    config: SttConfig,
    buffer: Vec<u8>,
    sample_rate: u32,
    channels: u16,
}

impl HttpStt {
    pub fn new(config: SttConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            buffer: Vec::new(),
            sample_rate: datavoice_core::audio::DEFAULT_SAMPLE_RATE,
            channels: datavoice_core::audio::DEFAULT_CHANNELS,
        }
    }
}

#[async_trait]
impl SpeechToText for HttpStt {
    async fn feed(&mut self, audio: &AudioFrame) -> Result<Vec<Transcript>, PipelineError> {
        self.sample_rate = audio.sample_rate;
        self.channels = audio.channels;
        self.buffer.extend_from_slice(audio.payload());
        Ok(Vec::new())
    }

    async fn finalize(&mut self) -> Result<Option<Transcript>, PipelineError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let wav = wrap_wav(&std::mem::take(&mut self.buffer), self.sample_rate, self.channels);

        let response = self
            .client
            .post(&self.config.endpoint)
            .query(&[
                ("language", self.config.language.as_str()),
                ("model", self.config.model.as_str()),
            ])
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .body(Bytes::from(wav))
            .send()
            .await
            .map_err(|e| PipelineError::Stt(e.to_string()))?
            .error_for_status()
            .map_err(|e| PipelineError::Stt(e.to_string()))?;

        let body: SttResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Stt(e.to_string()))?;

        if body.text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(Transcript {
            text: body.text,
            is_final: true,
        }))
    }

    fn reset(&mut self) {
        self.buffer.clear();
    }
}

/// Recognition stage: audio in, transcripts out.
///
/// Typed client text is treated as an already-settled turn and converted to
/// a final transcript here, so turn-id allocation stays in one place.
pub struct SttStage {
    backend: Box<dyn SpeechToText>,
    turn_id: u64,
}

impl SttStage {
    pub fn new(backend: Box<dyn SpeechToText>) -> Self {
        Self { backend, turn_id: 0 }
    }
}

#[async_trait]
impl Stage for SttStage {
    fn name(&self) -> &'static str {
        "stt"
    }

    async fn process(&mut self, frame: Frame, out: &mut StageOutput) -> Result<(), PipelineError> {
        match frame {
            Frame::Audio(audio) if audio.direction() == AudioDirection::Input => {
                for transcript in self.backend.feed(&audio).await? {
                    if transcript.text.trim().is_empty() {
                        continue;
                    }
                    if transcript.is_final {
                        // A streaming backend may settle a turn on its own.
                        info!(turn_id = self.turn_id, "turn transcribed");
                        out.push(TranscriptFrame::final_result(transcript.text, self.turn_id));
                        self.turn_id += 1;
                    } else {
                        out.push(TranscriptFrame::partial(transcript.text, self.turn_id));
                    }
                }
            }
            Frame::Control(c) if c.message_type() == Some("turn_end") => {
                let settled = self.backend.finalize().await;
                self.backend.reset();
                if let Some(transcript) = settled? {
                    if !transcript.text.trim().is_empty() {
                        info!(turn_id = self.turn_id, "turn transcribed");
                        out.push(TranscriptFrame::final_result(transcript.text, self.turn_id));
                        self.turn_id += 1;
                    }
                }
            }
            Frame::Text(t) => {
                if !t.text.trim().is_empty() {
                    out.push(TranscriptFrame::final_result(t.text, self.turn_id));
                    self.turn_id += 1;
                }
            }
            other => out.push(other),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datavoice_core::ControlFrame;

    /// Scripted recognizer: yields one partial per feed, settles the
    /// scripted final on finalize.
    struct ScriptedStt {
        partial: Option<String>,
        final_text: Option<String>,
        resets: usize,
    }

    #[async_trait]
    impl SpeechToText for ScriptedStt {
        async fn feed(&mut self, _audio: &AudioFrame) -> Result<Vec<Transcript>, PipelineError> {
            Ok(self
                .partial
                .clone()
                .map(|text| {
                    vec![Transcript {
                        text,
                        is_final: false,
                    }]
                })
                .unwrap_or_default())
        }

        async fn finalize(&mut self) -> Result<Option<Transcript>, PipelineError> {
            Ok(self.final_text.clone().map(|text| Transcript {
                text,
                is_final: true,
            }))
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    fn audio() -> Frame {
        AudioFrame::input(vec![0u8; 320], 16000, 1).into()
    }

    #[tokio::test]
    async fn test_partial_then_final_with_turn_ids() {
        let mut stage = SttStage::new(Box::new(ScriptedStt {
            partial: Some("销售".into()),
            final_text: Some("销售额多少".into()),
            resets: 0,
        }));

        let mut out = StageOutput::default();
        stage.process(audio(), &mut out).await.unwrap();
        stage
            .process(ControlFrame::turn_end().into(), &mut out)
            .await
            .unwrap();

        assert_eq!(
            out.frames(),
            &[
                TranscriptFrame::partial("销售", 0).into(),
                TranscriptFrame::final_result("销售额多少", 0).into(),
            ]
        );

        // Next turn gets the next id.
        let mut out = StageOutput::default();
        stage
            .process(ControlFrame::turn_end().into(), &mut out)
            .await
            .unwrap();
        assert_eq!(
            out.frames(),
            &[TranscriptFrame::final_result("销售额多少", 1).into()]
        );
    }

    #[tokio::test]
    async fn test_blank_final_is_dropped() {
        let mut stage = SttStage::new(Box::new(ScriptedStt {
            partial: None,
            final_text: Some("   ".into()),
            resets: 0,
        }));

        let mut out = StageOutput::default();
        stage
            .process(ControlFrame::turn_end().into(), &mut out)
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    /// Streaming-style recognizer that settles the turn from feed itself.
    struct SelfSettlingStt;

    #[async_trait]
    impl SpeechToText for SelfSettlingStt {
        async fn feed(&mut self, _audio: &AudioFrame) -> Result<Vec<Transcript>, PipelineError> {
            Ok(vec![Transcript {
                text: "销售额多少".into(),
                is_final: true,
            }])
        }

        async fn finalize(&mut self) -> Result<Option<Transcript>, PipelineError> {
            Ok(None)
        }

        fn reset(&mut self) {}
    }

    #[tokio::test]
    async fn test_final_from_feed_stays_final() {
        let mut stage = SttStage::new(Box::new(SelfSettlingStt));

        let mut out = StageOutput::default();
        stage.process(audio(), &mut out).await.unwrap();
        stage.process(audio(), &mut out).await.unwrap();

        assert_eq!(
            out.frames(),
            &[
                TranscriptFrame::final_result("销售额多少", 0).into(),
                TranscriptFrame::final_result("销售额多少", 1).into(),
            ]
        );
    }

    #[tokio::test]
    async fn test_typed_text_becomes_final_transcript() {
        let mut stage = SttStage::new(Box::new(ScriptedStt {
            partial: None,
            final_text: None,
            resets: 0,
        }));

        let mut out = StageOutput::default();
        stage
            .process(datavoice_core::TextFrame::new("你好").into(), &mut out)
            .await
            .unwrap();
        assert_eq!(
            out.frames(),
            &[TranscriptFrame::final_result("你好", 0).into()]
        );
    }
}
