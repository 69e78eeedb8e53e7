//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Turn detection configuration
    #[serde(default)]
    pub turn: TurnConfig,

    /// Speech recognition configuration
    #[serde(default)]
    pub stt: SttSettings,

    /// Speech synthesis configuration
    #[serde(default)]
    pub tts: TtsSettings,

    /// Language model configuration
    #[serde(default)]
    pub llm: LlmSettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_sessions".to_string(),
                message: "must allow at least one session".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.turn.speech_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "turn.speech_threshold".to_string(),
                message: "normalized RMS threshold must be within 0..=1".to_string(),
            });
        }
        if self.llm.api_key.is_empty() {
            return Err(ConfigError::MissingValue {
                field: "llm.api_key".to_string(),
            });
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum concurrent voice sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// CORS allowed origins (empty = any origin)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_max_sessions() -> usize {
    256
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_sessions: default_max_sessions(),
            cors_origins: Vec::new(),
        }
    }
}

/// Turn detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Normalized RMS (0..1) at or above which a frame counts as speech
    #[serde(default = "default_speech_threshold")]
    pub speech_threshold: f32,

    /// Silence tolerated inside a turn before it is declared over (ms)
    #[serde(default = "default_hangover_ms")]
    pub hangover_ms: u64,
}

fn default_speech_threshold() -> f32 {
    0.015
}
fn default_hangover_ms() -> u64 {
    600
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            speech_threshold: default_speech_threshold(),
            hangover_ms: default_hangover_ms(),
        }
    }
}

/// Speech recognition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttSettings {
    /// Recognition endpoint URL
    #[serde(default)]
    pub endpoint: String,

    /// API key (set via DATAVOICE__STT__API_KEY)
    #[serde(default)]
    pub api_key: String,

    /// BCP-47 language tag
    #[serde(default = "default_stt_language")]
    pub language: String,

    /// Recognition model name
    #[serde(default = "default_stt_model")]
    pub model: String,
}

fn default_stt_language() -> String {
    "zh-CN".to_string()
}
fn default_stt_model() -> String {
    "nova-2".to_string()
}

impl Default for SttSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            language: default_stt_language(),
            model: default_stt_model(),
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsSettings {
    /// Synthesis endpoint URL
    #[serde(default)]
    pub endpoint: String,

    /// API key (set via DATAVOICE__TTS__API_KEY)
    #[serde(default)]
    pub api_key: String,

    /// Voice used when the persona does not override it
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Sample rate of the returned audio (Hz)
    #[serde(default = "default_tts_sample_rate")]
    pub sample_rate: u32,
}

fn default_voice() -> String {
    "alloy".to_string()
}
fn default_tts_sample_rate() -> u32 {
    24000
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            voice: default_voice(),
            sample_rate: default_tts_sample_rate(),
        }
    }
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// OpenAI-compatible API base URL
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// API key (set via DATAVOICE__LLM__API_KEY)
    #[serde(default)]
    pub api_key: String,

    /// Model name
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Reply length cap in tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_llm_base_url() -> String {
    "https://api.deepseek.com/v1".to_string()
}
fn default_llm_model() -> String {
    "deepseek-chat".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: String::new(),
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level filter
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (DATAVOICE prefix, `__` separator)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("DATAVOICE")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.stt.language, "zh-CN");
        assert_eq!(settings.stt.model, "nova-2");
        assert_eq!(settings.llm.model, "deepseek-chat");
    }

    #[test]
    fn test_validation_requires_api_key() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_err());

        settings.llm.api_key = "sk-test".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_threshold() {
        let mut settings = Settings::default();
        settings.llm.api_key = "sk-test".to_string();
        settings.turn.speech_threshold = 1.5;
        assert!(settings.validate().is_err());
    }
}
