//! DataVoice stage chain
//!
//! Everything between the wire and the external services: the [`Stage`]
//! trait, the per-session [`StageChain`] runner, the eight concrete stages,
//! and the service traits they call out through.
//!
//! Chain order is fixed by [`build_voice_chain`]:
//!
//! ```text
//! turn gate -> stt -> transcript forwarder -> user context
//!   -> language model -> tts -> transport output -> assistant context
//! ```

pub mod aggregator;
pub mod forwarder;
pub mod model;
pub mod output;
pub mod stage;
pub mod stt;
pub mod tts;
pub mod turn;

pub use aggregator::{AssistantContextAggregator, UserContextAggregator};
pub use forwarder::TranscriptForwarderStage;
pub use model::LanguageModelStage;
pub use output::TransportOutputStage;
pub use stage::{Stage, StageChain, StageOutput};
pub use stt::{HttpStt, SpeechToText, SttConfig, SttStage, Transcript};
pub use tts::{HttpTts, SpeechSynthesizer, SynthesizedAudio, TtsConfig, TtsStage};
pub use turn::{EnergyGateConfig, EnergyTurnDetector, TurnDetector, TurnEvent, TurnGateStage};

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use datavoice_core::{ConversationContext, Frame};
use datavoice_llm::ChatModel;

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("STT error: {0}")]
    Stt(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("LLM error: {0}")]
    Llm(#[from] datavoice_llm::LlmError),

    #[error("Outbound channel closed")]
    ChannelClosed,
}

/// Produces the per-session service backends.
///
/// One factory serves the whole process; each session gets fresh stateful
/// backends (detector, recognizer, synthesizer) and a shared model handle.
pub trait BackendFactory: Send + Sync {
    fn turn_detector(&self) -> Box<dyn TurnDetector>;
    fn speech_to_text(&self) -> Box<dyn SpeechToText>;
    /// Build the session's synthesizer. `voice` carries the persona's voice
    /// override; `None` keeps the configured default.
    fn synthesizer(&self, voice: Option<&str>) -> Box<dyn SpeechSynthesizer>;
    fn chat_model(&self) -> Arc<dyn ChatModel>;
}

/// Assemble the full voice chain for one session.
pub fn build_voice_chain(
    session_id: impl Into<String>,
    factory: &dyn BackendFactory,
    voice: Option<&str>,
    context: Arc<Mutex<ConversationContext>>,
    outbound: mpsc::Sender<Frame>,
) -> StageChain {
    StageChain::new(session_id, outbound.clone())
        .add_stage(TurnGateStage::new(factory.turn_detector()))
        .add_stage(SttStage::new(factory.speech_to_text()))
        .add_stage(TranscriptForwarderStage::new(outbound.clone()))
        .add_stage(UserContextAggregator::new(context.clone()))
        .add_stage(LanguageModelStage::new(factory.chat_model(), context.clone()))
        .add_stage(TtsStage::new(factory.synthesizer(voice)))
        .add_stage(TransportOutputStage::new(outbound))
        .add_stage(AssistantContextAggregator::new(context))
}
