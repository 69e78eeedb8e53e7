//! Core types for the DataVoice pipeline
//!
//! This crate provides the foundational types used across all other crates:
//! - The `Frame` tagged union every pipeline stage operates on
//! - PCM/WAV audio byte helpers
//! - The per-session conversation context
//! - Agent persona profiles and the read-only registry

pub mod agent;
pub mod audio;
pub mod context;
pub mod frame;

pub use agent::{AgentProfile, AgentRegistry, DEFAULT_AGENT_ID};
pub use context::{ConversationContext, Message, Role};
pub use frame::{
    AudioContainer, AudioDirection, AudioFrame, ControlFrame, Frame, SystemFrame, TextFrame,
    TranscriptFrame,
};
