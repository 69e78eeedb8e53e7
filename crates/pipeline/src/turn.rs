//! Turn detection and the turn gate stage
//!
//! The detector is a narrow boundary: it observes caller audio and reports
//! where speech turns start and end. The shipped [`EnergyTurnDetector`] is
//! an RMS threshold gate with a hangover window; anything smarter plugs in
//! behind the same trait.

use async_trait::async_trait;
use tracing::debug;

use datavoice_core::audio::pcm_rms;
use datavoice_core::{AudioDirection, AudioFrame, ControlFrame, Frame};

use crate::stage::{Stage, StageOutput};
use crate::PipelineError;

/// What one audio frame meant for the current speech turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEvent {
    /// No turn in progress, frame is background.
    Quiet,
    /// This frame opened a new turn.
    Started,
    /// Turn in progress.
    Continuing,
    /// This frame closed the turn (hangover elapsed).
    Ended,
}

/// Observes caller audio frame-by-frame and segments it into turns.
pub trait TurnDetector: Send {
    fn observe(&mut self, frame: &AudioFrame) -> TurnEvent;

    /// Forget any in-progress turn.
    fn reset(&mut self);
}

/// Energy gate configuration.
#[derive(Debug, Clone)]
pub struct EnergyGateConfig {
    /// Normalized RMS (0..1) at or above which a frame counts as speech.
    pub speech_threshold: f32,
    /// Silence to tolerate inside a turn before declaring it over (ms).
    pub hangover_ms: u64,
}

impl Default for EnergyGateConfig {
    fn default() -> Self {
        Self {
            speech_threshold: 0.015,
            hangover_ms: 600,
        }
    }
}

/// RMS-threshold turn detector with hangover.
pub struct EnergyTurnDetector {
    config: EnergyGateConfig,
    in_turn: bool,
    silence_ms: u64,
}

impl EnergyTurnDetector {
    pub fn new(config: EnergyGateConfig) -> Self {
        Self {
            config,
            in_turn: false,
            silence_ms: 0,
        }
    }
}

impl Default for EnergyTurnDetector {
    fn default() -> Self {
        Self::new(EnergyGateConfig::default())
    }
}

impl TurnDetector for EnergyTurnDetector {
    fn observe(&mut self, frame: &AudioFrame) -> TurnEvent {
        let is_speech = pcm_rms(frame.payload()) >= self.config.speech_threshold;

        if !self.in_turn {
            if is_speech {
                self.in_turn = true;
                self.silence_ms = 0;
                return TurnEvent::Started;
            }
            return TurnEvent::Quiet;
        }

        if is_speech {
            self.silence_ms = 0;
            return TurnEvent::Continuing;
        }

        self.silence_ms += frame.duration_ms();
        if self.silence_ms >= self.config.hangover_ms {
            self.in_turn = false;
            self.silence_ms = 0;
            return TurnEvent::Ended;
        }
        TurnEvent::Continuing
    }

    fn reset(&mut self) {
        self.in_turn = false;
        self.silence_ms = 0;
    }
}

/// First stage of the chain: gates caller audio on turn activity.
///
/// Audio inside a turn flows downstream for recognition; background audio is
/// dropped. When the detector closes a turn, a `turn_end` control marker
/// follows the last audio frame so the recognizer knows to settle.
pub struct TurnGateStage {
    detector: Box<dyn TurnDetector>,
}

impl TurnGateStage {
    pub fn new(detector: Box<dyn TurnDetector>) -> Self {
        Self { detector }
    }
}

#[async_trait]
impl Stage for TurnGateStage {
    fn name(&self) -> &'static str {
        "turn_gate"
    }

    async fn process(&mut self, frame: Frame, out: &mut StageOutput) -> Result<(), PipelineError> {
        match frame {
            Frame::Audio(audio) if audio.direction() == AudioDirection::Input => {
                match self.detector.observe(&audio) {
                    TurnEvent::Quiet => {}
                    TurnEvent::Started | TurnEvent::Continuing => out.push(audio),
                    TurnEvent::Ended => {
                        debug!("speech turn ended");
                        out.push(audio);
                        out.push(ControlFrame::turn_end());
                    }
                }
            }
            other => out.push(other),
        }
        Ok(())
    }
}
