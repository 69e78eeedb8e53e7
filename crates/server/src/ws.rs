//! WebSocket connection handling
//!
//! One upgraded socket = one session = one stage chain. A writer task
//! drains the chain's outbound channel through the frame serializer; the
//! read loop feeds wire bytes into the chain until the client goes away.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Path, State},
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use datavoice_core::{Frame, SystemFrame, TextFrame};
use datavoice_pipeline::build_voice_chain;
use datavoice_transport::{FrameSerializer, TransportEvent};

use crate::state::AppState;

/// WebSocket upgrade endpoint: `/ws/{agent_id}`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(agent_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, agent_id))
}

/// Client text messages accepted on the socket.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientTextMessage {
    Text { text: String },
}

/// Parse a client text message into a frame. Malformed or unknown messages
/// are dropped.
fn parse_text_message(text: &str) -> Option<Frame> {
    match serde_json::from_str::<ClientTextMessage>(text) {
        Ok(ClientTextMessage::Text { text }) => Some(TextFrame::new(text).into()),
        Err(e) => {
            debug!(error = %e, "unrecognized text message dropped");
            None
        }
    }
}

/// Drive one session: the read loop awaits each frame's full trip through
/// the chain before taking the next message. A disconnect during an
/// in-flight model or synthesis call is therefore observed only once that
/// turn completes; the late outputs go to a closed socket and are dropped
/// by the writer.
async fn handle_socket(socket: WebSocket, state: AppState, agent_id: String) {
    let profile = state.agents.select(&agent_id).clone();
    if profile.id != agent_id {
        info!(requested = %agent_id, resolved = %profile.id, "unknown agent, using default persona");
    }

    let session = match state.sessions.create(&profile) {
        Ok(session) => session,
        Err(e) => {
            warn!(agent_id = %agent_id, error = %e, "refusing connection");
            refuse(socket, &state.serializer, e.to_string()).await;
            return;
        }
    };

    state.emit(TransportEvent::Connected {
        session_id: session.id.clone(),
    });

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<Frame>(64);

    let serializer = state.serializer.clone();
    let writer_session = session.id.clone();
    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            let bytes = match serializer.serialize(&frame) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(session_id = %writer_session, error = %e, "frame serialization failed");
                    continue;
                }
            };
            if ws_tx.send(Message::Binary(bytes)).await.is_err() {
                break;
            }
        }
    });

    let mut chain = build_voice_chain(
        session.id.clone(),
        state.backends.as_ref(),
        profile.voice.as_deref(),
        session.context.clone(),
        out_tx,
    );

    chain
        .dispatch(
            SystemFrame::Start {
                session_id: session.id.clone(),
            }
            .into(),
        )
        .await;

    while let Some(msg) = ws_rx.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                debug!(session_id = %session.id, error = %e, "socket read error");
                break;
            }
        };
        match msg {
            Message::Binary(data) => {
                if let Some(frame) = state.serializer.deserialize(&data) {
                    chain.dispatch(frame).await;
                }
            }
            Message::Text(text) => {
                if let Some(frame) = parse_text_message(text.as_str()) {
                    chain.dispatch(frame).await;
                }
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    chain
        .dispatch(
            SystemFrame::End {
                reason: Some("client disconnected".to_string()),
            }
            .into(),
        )
        .await;

    info!(session_id = %session.id, "session closed");
    state.sessions.remove(&session.id);
    state.emit(TransportEvent::Disconnected {
        session_id: session.id.clone(),
        reason: Some("client disconnected".to_string()),
    });

    // Dropping the chain releases the outbound senders; the writer drains
    // what is left and exits.
    drop(chain);
    let _ = writer.await;
}

/// Tell the client why it is being turned away, then drop the socket.
async fn refuse(mut socket: WebSocket, serializer: &FrameSerializer, message: String) {
    let frame: Frame = SystemFrame::Error { message }.into();
    if let Ok(bytes) = serializer.serialize(&frame) {
        let _ = socket.send(Message::Binary(bytes)).await;
    }
}
