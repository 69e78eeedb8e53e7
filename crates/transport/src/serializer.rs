//! Hybrid wire codec
//!
//! One duplex byte channel carries three payload shapes without a universal
//! envelope:
//!
//! - Output audio dominates throughput, so it goes out verbatim (optionally
//!   with a WAV header prefixed exactly once per frame) with no framing at
//!   all.
//! - Every other frame kind pays a small structured-encoding cost: a 2-byte
//!   magic prefix followed by a serde-tagged JSON body that unambiguously
//!   reconstructs the tagged union on the far side.
//! - Inbound bytes that fail structured decoding are assumed to be raw
//!   caller PCM (mono, 16 kHz) unless they look like UTF-8 text beginning
//!   with `{` — that sniff keeps a malformed control message from being
//!   replayed as audio garbage. It is a best-effort heuristic, not a
//!   guaranteed-correct protocol: raw audio that happens to start with the
//!   magic or with `{` is misclassified, an accepted limitation of the wire
//!   format.
//!
//! The serializer is stateless and freely shared across sessions.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use datavoice_core::audio::{self, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE};
use datavoice_core::{
    AudioContainer, AudioDirection, AudioFrame, ControlFrame, Frame, SystemFrame, TextFrame,
    TranscriptFrame,
};

use crate::TransportError;

/// Magic prefix marking a structured (non-audio) frame on the wire.
pub const FRAME_MAGIC: [u8; 2] = [0xDA, 0x7E];

/// Wire representation of the structured frame kinds.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
enum WireFrame {
    System(SystemFrame),
    Transcript(TranscriptFrame),
    Text(TextFrame),
    Control(ControlFrame),
}

impl From<WireFrame> for Frame {
    fn from(wire: WireFrame) -> Self {
        match wire {
            WireFrame::System(f) => Frame::System(f),
            WireFrame::Transcript(f) => Frame::Transcript(f),
            WireFrame::Text(f) => Frame::Text(f),
            WireFrame::Control(f) => Frame::Control(f),
        }
    }
}

/// Serializer configuration.
#[derive(Debug, Clone)]
pub struct SerializerConfig {
    /// Prefix output audio with a WAV header so the client can decode it
    /// without out-of-band format negotiation.
    pub add_wav_header: bool,
    /// Sample rate assumed for raw inbound audio (Hz).
    pub input_sample_rate: u32,
    /// Channel count assumed for raw inbound audio.
    pub input_channels: u16,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            add_wav_header: true,
            input_sample_rate: DEFAULT_SAMPLE_RATE,
            input_channels: DEFAULT_CHANNELS,
        }
    }
}

/// Hybrid frame serializer for one physical connection direction.
#[derive(Debug, Clone, Default)]
pub struct FrameSerializer {
    config: SerializerConfig,
}

impl FrameSerializer {
    pub fn new(config: SerializerConfig) -> Self {
        Self { config }
    }

    /// Encode a frame for the wire.
    pub fn serialize(&self, frame: &Frame) -> Result<Bytes, TransportError> {
        match frame {
            Frame::Audio(audio) => Ok(self.serialize_audio(audio)),
            Frame::System(f) => self.serialize_structured(WireFrame::System(f.clone())),
            Frame::Transcript(f) => self.serialize_structured(WireFrame::Transcript(f.clone())),
            Frame::Text(f) => self.serialize_structured(WireFrame::Text(f.clone())),
            Frame::Control(f) => self.serialize_structured(WireFrame::Control(f.clone())),
        }
    }

    fn serialize_audio(&self, audio: &AudioFrame) -> Bytes {
        // A payload already carrying a container header goes out untouched;
        // the header must appear exactly once per frame.
        let add_header = self.config.add_wav_header
            && audio.direction() == AudioDirection::Output
            && audio.container.is_none();

        if add_header {
            Bytes::from(audio::wrap_wav(
                audio.payload(),
                audio.sample_rate,
                audio.channels,
            ))
        } else {
            audio.payload().clone()
        }
    }

    fn serialize_structured(&self, wire: WireFrame) -> Result<Bytes, TransportError> {
        let body = serde_json::to_vec(&wire)
            .map_err(|e| TransportError::Serialize(e.to_string()))?;
        let mut out = Vec::with_capacity(FRAME_MAGIC.len() + body.len());
        out.extend_from_slice(&FRAME_MAGIC);
        out.extend_from_slice(&body);
        Ok(Bytes::from(out))
    }

    /// Decode wire bytes into a frame.
    ///
    /// Returns `None` for payloads shorter than 2 bytes, for structured
    /// payloads that fail to decode and look like JSON text, and never
    /// errors: decode failures are non-fatal, the caller drops the frame.
    pub fn deserialize(&self, data: &[u8]) -> Option<Frame> {
        if data.len() < 2 {
            return None;
        }

        if data[..2] == FRAME_MAGIC {
            match serde_json::from_slice::<WireFrame>(&data[2..]) {
                Ok(wire) => return Some(wire.into()),
                Err(e) => {
                    tracing::debug!(error = %e, "structured frame with magic prefix failed to decode");
                }
            }
        }

        // JSON sniff: a malformed control message must not be replayed as
        // audio. Let the structured decoder's own failure stand.
        if let Ok(text) = std::str::from_utf8(data) {
            if text.trim_start().starts_with('{') {
                return None;
            }
        }

        Some(Frame::Audio(AudioFrame::input(
            Bytes::copy_from_slice(data),
            self.config.input_sample_rate,
            self.config.input_channels,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datavoice_core::audio::samples_to_pcm;

    fn serializer() -> FrameSerializer {
        FrameSerializer::default()
    }

    fn raw_serializer() -> FrameSerializer {
        FrameSerializer::new(SerializerConfig {
            add_wav_header: false,
            ..SerializerConfig::default()
        })
    }

    #[test]
    fn test_short_payload_rejected() {
        let s = serializer();
        assert_eq!(s.deserialize(&[]), None);
        assert_eq!(s.deserialize(&[0x42]), None);
    }

    #[test]
    fn test_audio_round_trip_preserves_bytes() {
        let s = raw_serializer();
        let pcm: Vec<u8> = (0..320u32).flat_map(|i| ((i * 7) as i16).to_le_bytes()).collect();
        let frame = Frame::Audio(AudioFrame::output(pcm.clone(), 16000, 1));

        let wire = s.serialize(&frame).unwrap();
        assert_eq!(&wire[..], &pcm[..]);

        match s.deserialize(&wire) {
            Some(Frame::Audio(decoded)) => {
                assert_eq!(&decoded.payload()[..], &pcm[..]);
                assert_eq!(decoded.direction(), AudioDirection::Input);
                assert_eq!(decoded.sample_rate, 16000);
                assert_eq!(decoded.channels, 1);
            }
            other => panic!("expected audio frame, got {:?}", other),
        }
    }

    #[test]
    fn test_wav_header_prefixed_once() {
        let s = serializer();
        let pcm = samples_to_pcm(&vec![1000i16; 480]);
        let frame = Frame::Audio(AudioFrame::output(pcm.clone(), 24000, 1));

        let wire = s.serialize(&frame).unwrap();
        assert_eq!(&wire[..4], b"RIFF");
        assert_eq!(wire.len(), 44 + pcm.len());

        let mut reader = hound::WavReader::new(std::io::Cursor::new(wire.to_vec())).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 24000);
        assert_eq!(spec.channels, 1);
        let decoded: Vec<i16> = reader.samples::<i16>().map(|r| r.unwrap()).collect();
        assert_eq!(decoded, vec![1000i16; 480]);
    }

    #[test]
    fn test_container_marked_payload_not_double_wrapped() {
        let s = serializer();
        let wav_image = datavoice_core::audio::wrap_wav(&samples_to_pcm(&[1, 2, 3]), 16000, 1);
        let frame = Frame::Audio(
            AudioFrame::output(wav_image.clone(), 16000, 1).with_container(AudioContainer::Wav),
        );
        let wire = s.serialize(&frame).unwrap();
        assert_eq!(&wire[..], &wav_image[..]);
    }

    #[test]
    fn test_structured_round_trip() {
        let s = serializer();
        let frames = vec![
            Frame::System(SystemFrame::Start {
                session_id: "abc".into(),
            }),
            Frame::System(SystemFrame::End { reason: None }),
            Frame::System(SystemFrame::Error {
                message: "boom".into(),
            }),
            Frame::Transcript(TranscriptFrame::partial("你好", 3)),
            Frame::Transcript(TranscriptFrame::final_result("销售额多少", 3)),
            Frame::Text(TextFrame::new("本季度销售额增长了15.8%")),
            Frame::Control(ControlFrame::transcript("hello")),
        ];

        for frame in frames {
            let wire = s.serialize(&frame).unwrap();
            assert_eq!(&wire[..2], &FRAME_MAGIC);
            let decoded = s.deserialize(&wire).expect("structured frame must decode");
            assert_eq!(decoded, frame);
        }
    }

    #[test]
    fn test_json_sniff_returns_none() {
        let s = serializer();
        assert_eq!(s.deserialize(b"{\"type\": \"garbled"), None);
        assert_eq!(s.deserialize(b"  {\"not\": \"a frame\"}"), None);
    }

    #[test]
    fn test_non_json_text_falls_back_to_audio() {
        // Text without a leading brace cannot be told apart from PCM.
        let s = serializer();
        match s.deserialize(b"hello world") {
            Some(Frame::Audio(a)) => assert_eq!(&a.payload()[..], b"hello world"),
            other => panic!("expected audio fallback, got {:?}", other),
        }
    }

    #[test]
    fn test_magic_with_invalid_body_falls_back_to_audio() {
        let s = serializer();
        let mut data = FRAME_MAGIC.to_vec();
        data.extend_from_slice(b"\xff\xfe\x00\x01");
        // Not valid JSON after the magic, not UTF-8 text: audio fallback.
        match s.deserialize(&data) {
            Some(Frame::Audio(_)) => {}
            other => panic!("expected audio fallback, got {:?}", other),
        }
    }
}
