//! End-to-end chain test: caller audio in, transcript event, synthesized
//! reply audio and context updates out, with every external service
//! scripted.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use datavoice_core::audio::samples_to_pcm;
use datavoice_core::{
    AudioDirection, AudioFrame, ConversationContext, Frame, Message, Role, SystemFrame,
};
use datavoice_llm::{ChatModel, LlmError};
use datavoice_pipeline::{
    build_voice_chain, BackendFactory, EnergyGateConfig, EnergyTurnDetector, PipelineError,
    SpeechSynthesizer, SpeechToText, SynthesizedAudio, Transcript, TurnDetector,
};
use datavoice_transport::FrameSerializer;

struct ScriptedStt {
    final_text: String,
}

#[async_trait]
impl SpeechToText for ScriptedStt {
    async fn feed(&mut self, _audio: &AudioFrame) -> Result<Vec<Transcript>, PipelineError> {
        Ok(Vec::new())
    }

    async fn finalize(&mut self) -> Result<Option<Transcript>, PipelineError> {
        Ok(Some(Transcript {
            text: self.final_text.clone(),
            is_final: true,
        }))
    }

    fn reset(&mut self) {}
}

struct ScriptedModel;

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn stream_chat(&self, messages: &[Message]) -> Result<mpsc::Receiver<String>, LlmError> {
        assert_eq!(messages[0].role, Role::System);
        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            for fragment in ["120", "万。"] {
                if tx.send(fragment.to_string()).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}

struct FakeTts;

#[async_trait]
impl SpeechSynthesizer for FakeTts {
    async fn synthesize(&mut self, _text: &str) -> Result<SynthesizedAudio, PipelineError> {
        Ok(SynthesizedAudio {
            pcm: Bytes::from(samples_to_pcm(&vec![2000i16; 240])),
            sample_rate: 24000,
            channels: 1,
        })
    }
}

#[derive(Default)]
struct ScriptedBackends {
    /// Voice requested for each synthesizer the chain builds.
    requested_voices: Mutex<Vec<Option<String>>>,
}

impl BackendFactory for ScriptedBackends {
    fn turn_detector(&self) -> Box<dyn TurnDetector> {
        Box::new(EnergyTurnDetector::new(EnergyGateConfig {
            speech_threshold: 0.01,
            hangover_ms: 50,
        }))
    }

    fn speech_to_text(&self) -> Box<dyn SpeechToText> {
        Box::new(ScriptedStt {
            final_text: "销售额多少".to_string(),
        })
    }

    fn synthesizer(&self, voice: Option<&str>) -> Box<dyn SpeechSynthesizer> {
        self.requested_voices.lock().push(voice.map(String::from));
        Box::new(FakeTts)
    }

    fn chat_model(&self) -> Arc<dyn ChatModel> {
        Arc::new(ScriptedModel)
    }
}

fn caller_audio(amplitude: i16, ms: u64) -> Frame {
    // 16kHz mono: 16 samples per ms
    let samples = vec![amplitude; (ms * 16) as usize];
    AudioFrame::input(samples_to_pcm(&samples), 16000, 1).into()
}

fn drain(rx: &mut mpsc::Receiver<Frame>) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

#[tokio::test]
async fn test_voice_turn_end_to_end() {
    let context = Arc::new(Mutex::new(ConversationContext::new("你是数据分析助手。")));
    let (out_tx, mut out_rx) = mpsc::channel(64);
    let backends = ScriptedBackends::default();
    let mut chain = build_voice_chain("session-1", &backends, None, context.clone(), out_tx);

    // One spoken turn: speech, then enough silence to settle it.
    chain.dispatch(caller_audio(8000, 100)).await;
    chain.dispatch(caller_audio(0, 60)).await;

    let frames = drain(&mut out_rx);

    // Transcript side-channel event for the settled turn.
    let transcript = frames
        .iter()
        .find_map(|f| match f {
            Frame::Control(c) if c.message_type() == Some("transcript") => Some(c),
            _ => None,
        })
        .expect("transcript event");
    assert_eq!(transcript.payload["text"], "销售额多少");

    // Synthesized reply audio reached the wire.
    let audio = frames
        .iter()
        .find_map(|f| match f {
            Frame::Audio(a) => Some(a),
            _ => None,
        })
        .expect("reply audio");
    assert_eq!(audio.direction(), AudioDirection::Output);
    assert_eq!(audio.sample_rate, 24000);

    // Context carries the full exchange in order.
    let context = context.lock();
    let messages = context.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].role, Role::User);
    assert_eq!(messages[1].content, "销售额多少");
    assert_eq!(messages[2].role, Role::Assistant);
    assert_eq!(messages[2].content, "120万。");
}

#[tokio::test]
async fn test_system_frames_pass_straight_through() {
    let context = Arc::new(Mutex::new(ConversationContext::new("prompt")));
    let (out_tx, mut out_rx) = mpsc::channel(8);
    let backends = ScriptedBackends::default();
    let mut chain = build_voice_chain("session-2", &backends, None, context, out_tx);

    let start: Frame = SystemFrame::Start {
        session_id: "session-2".to_string(),
    }
    .into();
    chain.dispatch(start.clone()).await;

    assert_eq!(out_rx.recv().await, Some(start));
}

#[tokio::test]
async fn test_reply_audio_carries_wav_header_on_the_wire() {
    let context = Arc::new(Mutex::new(ConversationContext::new("prompt")));
    let (out_tx, mut out_rx) = mpsc::channel(64);
    let backends = ScriptedBackends::default();
    let mut chain = build_voice_chain("session-3", &backends, None, context, out_tx);

    chain.dispatch(caller_audio(8000, 100)).await;
    chain.dispatch(caller_audio(0, 60)).await;

    let serializer = FrameSerializer::default();
    let audio = drain(&mut out_rx)
        .into_iter()
        .find(|f| matches!(f, Frame::Audio(_)))
        .expect("reply audio");
    let wire = serializer.serialize(&audio).unwrap();

    let reader = hound::WavReader::new(std::io::Cursor::new(wire.to_vec())).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 24000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
}

#[tokio::test]
async fn test_persona_voice_reaches_synthesis() {
    let context = Arc::new(Mutex::new(ConversationContext::new("prompt")));
    let (out_tx, _out_rx) = mpsc::channel(8);

    let backends = ScriptedBackends::default();
    let _chain = build_voice_chain(
        "session-4",
        &backends,
        Some("shimmer"),
        context.clone(),
        out_tx,
    );
    assert_eq!(
        backends.requested_voices.lock().as_slice(),
        &[Some("shimmer".to_string())]
    );

    // No persona override keeps the configured default.
    let (out_tx, _out_rx) = mpsc::channel(8);
    let backends = ScriptedBackends::default();
    let _chain = build_voice_chain("session-5", &backends, None, context, out_tx);
    assert_eq!(backends.requested_voices.lock().as_slice(), &[None]);
}
