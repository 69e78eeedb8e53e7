//! DataVoice transport layer
//!
//! Wire-level concerns for one duplex connection: the hybrid frame
//! serializer and the connection-lifecycle events the orchestration
//! subscribes to. The physical WebSocket is owned by the server crate; this
//! crate defines how frames map to bytes on it.

pub mod serializer;

pub use serializer::{FrameSerializer, SerializerConfig, FRAME_MAGIC};

use thiserror::Error;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Connection closed")]
    Closed,

    #[error("Send failed: {0}")]
    Send(String),
}

/// Connection-lifecycle events emitted per physical connection.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Listener is up and accepting connections.
    Ready { addr: String },
    /// A client connected.
    Connected { session_id: String },
    /// The client went away.
    Disconnected {
        session_id: String,
        reason: Option<String>,
    },
}
