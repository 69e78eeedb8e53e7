//! DataVoice configuration
//!
//! Settings loading (file + environment) and the built-in persona table.

pub mod personas;
pub mod settings;

pub use personas::{builtin_registry, COMMON_VOICE_RULES};
pub use settings::{
    load_settings, LlmSettings, ObservabilityConfig, ServerConfig, Settings, SttSettings,
    TtsSettings, TurnConfig,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config load error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Missing required value: {field}")]
    MissingValue { field: String },
}
