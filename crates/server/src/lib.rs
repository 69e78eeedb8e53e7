//! DataVoice server
//!
//! axum HTTP/WebSocket front: router, session management, and the
//! per-connection wiring of serializer and stage chain.

pub mod http;
pub mod session;
pub mod state;
pub mod ws;

pub use http::create_router;
pub use session::{Session, SessionManager};
pub use state::{AppState, HttpBackendFactory};

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session error: {0}")]
    Session(String),

    #[error("Transport error: {0}")]
    Transport(#[from] datavoice_transport::TransportError),

    #[error("Config error: {0}")]
    Config(#[from] datavoice_config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
