//! Agent personas
//!
//! Read-only persona configuration: each profile maps an agent identifier to
//! a system prompt and an optional voice. The registry is built once at
//! process start and shared by immutable reference across sessions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Agent id used when the requested id is unknown.
pub const DEFAULT_AGENT_ID: &str = "default";

/// One selectable persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Identifier the client selects by.
    pub id: String,
    /// System prompt: fixed behavioral rules plus persona-specific rules.
    pub prompt: String,
    /// Voice identifier for speech synthesis, if the persona overrides it.
    #[serde(default)]
    pub voice: Option<String>,
}

impl AgentProfile {
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            voice: None,
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }
}

/// Immutable agent id -> profile table with default fallback.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    profiles: HashMap<String, AgentProfile>,
    default: AgentProfile,
}

impl AgentRegistry {
    /// Build a registry. The profile with id [`DEFAULT_AGENT_ID`] becomes
    /// the fallback; without one, the first profile in the list does.
    pub fn new(profiles: Vec<AgentProfile>) -> Self {
        let default = profiles
            .iter()
            .find(|p| p.id == DEFAULT_AGENT_ID)
            .or_else(|| profiles.first())
            .cloned()
            .unwrap_or_else(|| AgentProfile::new(DEFAULT_AGENT_ID, ""));

        let profiles = profiles.into_iter().map(|p| (p.id.clone(), p)).collect();

        Self { profiles, default }
    }

    /// Resolve an agent id, falling back to the default persona for unknown
    /// ids. Pure lookup; called once at session start.
    pub fn select(&self, agent_id: &str) -> &AgentProfile {
        self.profiles.get(agent_id).unwrap_or(&self.default)
    }

    /// Exact lookup without fallback.
    pub fn get(&self, agent_id: &str) -> Option<&AgentProfile> {
        self.profiles.get(agent_id)
    }

    /// The fallback profile.
    pub fn default_profile(&self) -> &AgentProfile {
        &self.default
    }

    /// All registered agent ids.
    pub fn ids(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
