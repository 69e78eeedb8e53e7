//! Frame types for the voice pipeline
//!
//! Every piece of data moving through the pipeline is a [`Frame`]: a closed
//! tagged union of session-lifecycle signals, audio, transcripts, plain text
//! and structured control messages. Stages dispatch with exhaustive pattern
//! matching, never runtime type inspection.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Session lifecycle signal. Always routed with highest priority: the chain
/// runner propagates system frames past every stage unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SystemFrame {
    /// Session established.
    Start { session_id: String },
    /// Session ended (client disconnect or server shutdown).
    End { reason: Option<String> },
    /// Unrecoverable session error.
    Error { message: String },
}

/// Direction of an audio frame relative to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioDirection {
    /// Caller microphone audio arriving over the wire.
    Input,
    /// Synthesized audio on its way back to the caller.
    Output,
}

/// Optional container format wrapped around the raw samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioContainer {
    /// RIFF/WAVE container (44-byte header followed by PCM data).
    Wav,
}

/// A chunk of audio: 16-bit little-endian PCM samples plus format metadata.
///
/// The payload is immutable once constructed; clones share the underlying
/// buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    direction: AudioDirection,
    payload: Bytes,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count (1 = mono).
    pub channels: u16,
    /// Container format of the payload, if any.
    pub container: Option<AudioContainer>,
}

impl AudioFrame {
    /// Create an input-direction frame (caller audio).
    pub fn input(payload: impl Into<Bytes>, sample_rate: u32, channels: u16) -> Self {
        Self {
            direction: AudioDirection::Input,
            payload: payload.into(),
            sample_rate,
            channels,
            container: None,
        }
    }

    /// Create an output-direction frame (synthesized audio).
    pub fn output(payload: impl Into<Bytes>, sample_rate: u32, channels: u16) -> Self {
        Self {
            direction: AudioDirection::Output,
            payload: payload.into(),
            sample_rate,
            channels,
            container: None,
        }
    }

    /// Mark the payload as already carrying a container header.
    pub fn with_container(mut self, container: AudioContainer) -> Self {
        self.container = Some(container);
        self
    }

    /// Frame direction.
    pub fn direction(&self) -> AudioDirection {
        self.direction
    }

    /// Raw sample bytes.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Duration of the PCM payload in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        let bytes_per_second = self.sample_rate as u64 * self.channels as u64 * 2;
        if bytes_per_second == 0 {
            return 0;
        }
        self.payload.len() as u64 * 1000 / bytes_per_second
    }

    /// True if the payload holds no samples.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Recognized caller speech from the speech-to-text boundary.
///
/// A partial transcript may be superseded by a later frame for the same turn
/// with `is_final = true`; partials must never be treated as conversational
/// input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptFrame {
    /// Transcribed text.
    pub text: String,
    /// Final (settled) result for the current turn?
    pub is_final: bool,
    /// Monotonic turn counter within the session.
    pub turn_id: u64,
}

impl TranscriptFrame {
    /// An in-progress transcript for the given turn.
    pub fn partial(text: impl Into<String>, turn_id: u64) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            turn_id,
        }
    }

    /// The settled transcript for the given turn.
    pub fn final_result(text: impl Into<String>, turn_id: u64) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            turn_id,
        }
    }

    /// True when the text is empty after trimming whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Plain text: model reply fragments, client text input, status text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFrame {
    pub text: String,
}

impl TextFrame {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Structured signalling outside the audio/text main flow. The payload is an
/// opaque JSON object; well-known message types get constructors here so the
/// string tags live in one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlFrame {
    pub payload: serde_json::Value,
}

impl ControlFrame {
    pub fn new(payload: serde_json::Value) -> Self {
        Self { payload }
    }

    /// Out-of-band transcript event pushed to the client.
    pub fn transcript(text: impl Into<String>) -> Self {
        Self::new(serde_json::json!({ "type": "transcript", "text": text.into() }))
    }

    /// End of a caller speech turn (turn gate -> speech-to-text).
    pub fn turn_end() -> Self {
        Self::new(serde_json::json!({ "type": "turn_end" }))
    }

    /// End of a streamed model reply (model -> synthesis flush -> context).
    pub fn reply_end() -> Self {
        Self::new(serde_json::json!({ "type": "reply_end" }))
    }

    /// The `type` tag of the payload, when present.
    pub fn message_type(&self) -> Option<&str> {
        self.payload.get("type").and_then(|v| v.as_str())
    }
}

/// The unit of data moving through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    System(SystemFrame),
    Audio(AudioFrame),
    Transcript(TranscriptFrame),
    Text(TextFrame),
    Control(ControlFrame),
}

impl Frame {
    /// True for session-lifecycle frames.
    pub fn is_system(&self) -> bool {
        matches!(self, Frame::System(_))
    }

    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::System(_) => "system",
            Frame::Audio(_) => "audio",
            Frame::Transcript(_) => "transcript",
            Frame::Text(_) => "text",
            Frame::Control(_) => "control",
        }
    }
}

impl From<SystemFrame> for Frame {
    fn from(f: SystemFrame) -> Self {
        Frame::System(f)
    }
}

impl From<AudioFrame> for Frame {
    fn from(f: AudioFrame) -> Self {
        Frame::Audio(f)
    }
}

impl From<TranscriptFrame> for Frame {
    fn from(f: TranscriptFrame) -> Self {
        Frame::Transcript(f)
    }
}

impl From<TextFrame> for Frame {
    fn from(f: TextFrame) -> Self {
        Frame::Text(f)
    }
}

impl From<ControlFrame> for Frame {
    fn from(f: ControlFrame) -> Self {
        Frame::Control(f)
    }
}
