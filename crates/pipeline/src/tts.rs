//! Speech synthesis boundary and stage
//!
//! Reply fragments are buffered into complete sentences before synthesis:
//! one network call per sentence keeps latency low without feeding the
//! synthesizer mid-word fragments. The `reply_end` marker flushes whatever
//! is left in the buffer.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use datavoice_core::{AudioFrame, Frame, TextFrame};

use crate::stage::{Stage, StageOutput};
use crate::PipelineError;

/// One synthesized utterance.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub pcm: Bytes,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Synthesis backend configuration.
#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub endpoint: String,
    pub api_key: String,
    /// Backend voice identifier.
    pub voice: String,
    /// Sample rate the backend returns.
    pub sample_rate: u32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            voice: "default".to_string(),
            sample_rate: 24000,
        }
    }
}

impl TtsConfig {
    /// Session config with the persona's voice override applied; `None`
    /// keeps the configured default voice.
    pub fn for_voice(&self, voice: Option<&str>) -> Self {
        let mut config = self.clone();
        if let Some(voice) = voice {
            config.voice = voice.to_string();
        }
        config
    }
}

/// Turns one sentence of text into audio.
#[async_trait]
pub trait SpeechSynthesizer: Send {
    async fn synthesize(&mut self, text: &str) -> Result<SynthesizedAudio, PipelineError>;
}

#[derive(Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    voice: &'a str,
}

/// HTTP synthesizer: posts `{text, voice}` and receives raw PCM bytes.
pub struct HttpTts {
    client: reqwest::Client,
    config: TtsConfig,
}

impl HttpTts {
    pub fn new(config: TtsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpTts {
    async fn synthesize(&mut self, text: &str) -> Result<SynthesizedAudio, PipelineError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&TtsRequest {
                text,
                voice: &self.config.voice,
            })
            .send()
            .await
            .map_err(|e| PipelineError::Tts(e.to_string()))?
            .error_for_status()
            .map_err(|e| PipelineError::Tts(e.to_string()))?;

        let pcm = response
            .bytes()
            .await
            .map_err(|e| PipelineError::Tts(e.to_string()))?;

        Ok(SynthesizedAudio {
            pcm,
            sample_rate: self.config.sample_rate,
            channels: 1,
        })
    }
}

/// True for characters that end a speakable sentence, covering both CJK and
/// ASCII punctuation.
fn is_sentence_boundary(c: char) -> bool {
    matches!(c, '。' | '！' | '？' | '；' | '.' | '!' | '?' | ';' | '\n')
}

/// Splits buffered text at sentence boundaries, leaving the incomplete tail
/// in place.
fn drain_sentences(buffer: &mut String) -> Vec<String> {
    let mut sentences = Vec::new();
    while let Some(pos) = buffer.find(is_sentence_boundary) {
        let split = pos + buffer[pos..].chars().next().map_or(1, |c| c.len_utf8());
        let sentence: String = buffer.drain(..split).collect();
        let sentence = sentence.trim().to_string();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
    }
    sentences
}

/// Synthesis stage: text fragments in, output audio (and the same text,
/// forwarded for aggregation) out.
pub struct TtsStage {
    backend: Box<dyn SpeechSynthesizer>,
    buffer: String,
}

impl TtsStage {
    pub fn new(backend: Box<dyn SpeechSynthesizer>) -> Self {
        Self {
            backend,
            buffer: String::new(),
        }
    }

    async fn speak(&mut self, text: &str, out: &mut StageOutput) -> Result<(), PipelineError> {
        let audio = self.backend.synthesize(text).await?;
        debug!(chars = text.chars().count(), bytes = audio.pcm.len(), "sentence synthesized");
        out.push(AudioFrame::output(audio.pcm, audio.sample_rate, audio.channels));
        Ok(())
    }
}

#[async_trait]
impl Stage for TtsStage {
    fn name(&self) -> &'static str {
        "tts"
    }

    async fn process(&mut self, frame: Frame, out: &mut StageOutput) -> Result<(), PipelineError> {
        match frame {
            Frame::Text(t) => {
                self.buffer.push_str(&t.text);
                for sentence in drain_sentences(&mut self.buffer) {
                    self.speak(&sentence, out).await?;
                }
                // Fragments also feed the assistant aggregation downstream.
                out.push(t);
            }
            Frame::Control(c) if c.message_type() == Some("reply_end") => {
                let tail = std::mem::take(&mut self.buffer);
                let tail = tail.trim();
                if !tail.is_empty() {
                    self.speak(tail, out).await?;
                }
                out.push(c);
            }
            other => out.push(other),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datavoice_core::{AudioDirection, ControlFrame};

    /// Records requested text, returns a fixed-size PCM blob.
    struct FakeTts {
        spoken: Vec<String>,
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeTts {
        async fn synthesize(&mut self, text: &str) -> Result<SynthesizedAudio, PipelineError> {
            self.spoken.push(text.to_string());
            Ok(SynthesizedAudio {
                pcm: Bytes::from(vec![0u8; 64]),
                sample_rate: 24000,
                channels: 1,
            })
        }
    }

    #[test]
    fn test_for_voice_override() {
        let base = TtsConfig {
            voice: "alloy".to_string(),
            ..TtsConfig::default()
        };
        assert_eq!(base.for_voice(Some("shimmer")).voice, "shimmer");
        assert_eq!(base.for_voice(None).voice, "alloy");
    }

    #[test]
    fn test_drain_sentences_cjk_and_ascii() {
        let mut buffer = "本季度销售额120万。环比增长15%！还有".to_string();
        let sentences = drain_sentences(&mut buffer);
        assert_eq!(sentences, vec!["本季度销售额120万。", "环比增长15%！"]);
        assert_eq!(buffer, "还有");
    }

    #[test]
    fn test_drain_sentences_no_boundary() {
        let mut buffer = "尚未结束".to_string();
        assert!(drain_sentences(&mut buffer).is_empty());
        assert_eq!(buffer, "尚未结束");
    }

    #[tokio::test]
    async fn test_fragments_buffered_until_sentence_complete() {
        let mut stage = TtsStage::new(Box::new(FakeTts { spoken: vec![] }));

        let mut out = StageOutput::default();
        stage.process(TextFrame::new("120").into(), &mut out).await.unwrap();
        // No boundary yet: only the forwarded text fragment.
        assert_eq!(out.frames(), &[TextFrame::new("120").into()]);

        let mut out = StageOutput::default();
        stage.process(TextFrame::new("万。好").into(), &mut out).await.unwrap();
        let frames = out.frames();
        assert_eq!(frames.len(), 2);
        match &frames[0] {
            Frame::Audio(a) => {
                assert_eq!(a.direction(), AudioDirection::Output);
                assert_eq!(a.sample_rate, 24000);
            }
            other => panic!("expected output audio, got {:?}", other),
        }
        assert_eq!(frames[1], TextFrame::new("万。好").into());
    }

    #[tokio::test]
    async fn test_reply_end_flushes_tail() {
        let mut stage = TtsStage::new(Box::new(FakeTts { spoken: vec![] }));

        let mut out = StageOutput::default();
        stage.process(TextFrame::new("尾巴").into(), &mut out).await.unwrap();

        let mut out = StageOutput::default();
        stage
            .process(ControlFrame::reply_end().into(), &mut out)
            .await
            .unwrap();
        let frames = out.frames();
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[0], Frame::Audio(_)));
        match &frames[1] {
            Frame::Control(c) => assert_eq!(c.message_type(), Some("reply_end")),
            other => panic!("expected reply_end, got {:?}", other),
        }
    }
}
