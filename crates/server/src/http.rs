//! HTTP Endpoints
//!
//! Health, persona listing, and the WebSocket upgrade route.

use axum::{
    extract::State,
    http::HeaderValue,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::ws::ws_handler;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.server.cors_origins);
    Router::new()
        .route("/health", get(health_check))
        .route("/api/agents", get(list_agents))
        .route("/ws/{agent_id}", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS from settings: an empty origin list means any origin is allowed.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(parse_origins(origins)))
    }
}

/// Parse configured origins into header values, dropping invalid entries.
fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

/// Health check
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.sessions.count(),
    }))
}

/// List selectable personas
async fn list_agents(State(state): State<AppState>) -> impl IntoResponse {
    let mut ids = state.agents.ids();
    ids.sort_unstable();

    let agents: Vec<serde_json::Value> = ids
        .into_iter()
        .map(|id| {
            let profile = state.agents.select(id);
            serde_json::json!({
                "id": profile.id,
                "voice": profile.voice,
            })
        })
        .collect();

    Json(serde_json::json!({
        "count": agents.len(),
        "agents": agents,
    }))
}
