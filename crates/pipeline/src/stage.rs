//! Stage trait and chain runner
//!
//! A session owns one [`StageChain`]: an ordered list of stages that every
//! inbound frame flows through. The runner drives one frame's full effects
//! through the whole chain before accepting the next, so per-session
//! ordering is sequential by construction.
//!
//! The system-frame fast path lives here, not in the stages: a
//! `Frame::System` never enters any stage and goes straight to the outbound
//! channel, so lifecycle signals cannot be delayed or buffered behind
//! content processing.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use datavoice_core::Frame;

use crate::PipelineError;

/// Frames a stage emits for the next stage in the chain.
///
/// Side channels (wire output, transcript events) are not routed through
/// here; stages that need them hold their own sender.
#[derive(Debug, Default)]
pub struct StageOutput {
    frames: Vec<Frame>,
}

impl StageOutput {
    pub fn push(&mut self, frame: impl Into<Frame>) {
        self.frames.push(frame.into());
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames pushed so far, in order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    fn take(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.frames)
    }
}

/// One processing step in the chain.
///
/// `process` consumes a frame and pushes zero or more frames for the next
/// stage. A stage that does not understand a frame kind forwards it
/// unchanged; consuming without forwarding drops it from the chain.
#[async_trait]
pub trait Stage: Send {
    /// Stable name for logs.
    fn name(&self) -> &'static str;

    async fn process(&mut self, frame: Frame, out: &mut StageOutput) -> Result<(), PipelineError>;
}

/// Ordered stage list plus the outbound channel toward the wire.
pub struct StageChain {
    session_id: String,
    stages: Vec<Box<dyn Stage>>,
    outbound: mpsc::Sender<Frame>,
}

impl StageChain {
    pub fn new(session_id: impl Into<String>, outbound: mpsc::Sender<Frame>) -> Self {
        Self {
            session_id: session_id.into(),
            stages: Vec::new(),
            outbound,
        }
    }

    /// Append a stage to the end of the chain.
    pub fn add_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run one frame to completion through the chain.
    ///
    /// A failing stage loses only that frame's outputs: the error is logged
    /// and the session continues degraded. Non-system frames that survive
    /// the last stage are dropped; system frames are forwarded outbound.
    pub async fn dispatch(&mut self, frame: Frame) {
        if frame.is_system() {
            if self.outbound.send(frame).await.is_err() {
                debug!(session_id = %self.session_id, "outbound channel closed, system frame dropped");
            }
            return;
        }

        let mut frontier = vec![frame];

        for stage in &mut self.stages {
            let mut next = Vec::new();
            for frame in frontier {
                let mut out = StageOutput::default();
                match stage.process(frame, &mut out).await {
                    Ok(()) => next.append(&mut out.take()),
                    Err(e) => {
                        warn!(
                            session_id = %self.session_id,
                            stage = stage.name(),
                            error = %e,
                            "stage failed, dropping frame"
                        );
                    }
                }
            }
            frontier = next;
            if frontier.is_empty() {
                return;
            }
        }

        for frame in frontier {
            if frame.is_system() && self.outbound.send(frame).await.is_err() {
                debug!(session_id = %self.session_id, "outbound channel closed at chain tail");
            }
        }
    }
}
