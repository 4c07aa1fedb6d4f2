use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::header::{HeaderName, AUTHORIZATION};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TrySendError;

use crate::coordinator::{PlayerCommand, PlayerSnapshot, SessionCoordinator};
use crate::session::{Session, SessionSpec};
use crate::telemetry::TelemetrySnapshot;

use super::sse;

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct DebugHttpState {
    pub coordinator: Arc<SessionCoordinator>,
    token: Arc<String>,
}

impl DebugHttpState {
    pub fn new(coordinator: Arc<SessionCoordinator>, token: String) -> Self {
        Self {
            coordinator,
            token: Arc::new(token),
        }
    }

    fn authorize(
        &self,
        headers: &HeaderMap,
        query_token: Option<&str>,
    ) -> Result<(), HttpServerError> {
        let provided = extract_token(headers, query_token);
        match provided {
            Some(value) if value == *self.token => Ok(()),
            _ => Err(HttpServerError::Unauthorized),
        }
    }

    fn submit(&self, command: PlayerCommand) -> Result<Json<CommandAck>, HttpServerError> {
        self.coordinator
            .command_sender()
            .try_send(command)
            .map_err(map_try_send_error)?;
        Ok(Json(CommandAck { accepted: true }))
    }
}

/// Query payload for extracting token from URL.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub token: Option<String>,
}

/// HTTP error variants mapped to JSON responses.
#[derive(Debug)]
pub enum HttpServerError {
    Unauthorized,
    BadRequest(String),
    Backpressure,
    ServiceUnavailable(&'static str),
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "missing or invalid token".into()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Backpressure => (
                StatusCode::TOO_MANY_REQUESTS,
                "command queue saturated".into(),
            ),
            Self::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.into()),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Health endpoint response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub session_active: bool,
    pub engine_loaded: bool,
    pub generation: u64,
}

/// Snapshot plus its rendered time label.
#[derive(Debug, Serialize)]
pub struct PlayerResponse {
    pub snapshot: PlayerSnapshot,
    pub time_label: Option<String>,
}

/// Command acknowledgement payload.
#[derive(Debug, Serialize)]
pub struct CommandAck {
    pub accepted: bool,
}

/// Build the Axum router with all handlers.
pub fn build_router(state: DebugHttpState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/player", get(player))
        .route("/player/stream", get(player_stream_handler))
        .route("/player/start", post(start))
        .route("/player/toggle", post(toggle))
        .route("/player/close", post(close))
        .route("/telemetry", get(telemetry))
        .with_state(state)
}

/// Run the HTTP server loop.
pub async fn run_http_server(state: DebugHttpState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding debug HTTP listener")?;
    let router = build_router(state);
    axum::serve(listener, router)
        .await
        .context("serving debug HTTP router")?;
    Ok(())
}

pub async fn health(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<HealthResponse>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;

    let engine = state.coordinator.engine();
    Ok(Json(HealthResponse {
        status: "ok",
        session_active: state.coordinator.view().is_visible(),
        engine_loaded: engine.is_loaded(),
        generation: engine.current_generation(),
    }))
}

pub async fn player(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<PlayerResponse>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;

    let snapshot = state.coordinator.snapshot();
    let time_label = snapshot.time_label();
    Ok(Json(PlayerResponse {
        snapshot,
        time_label,
    }))
}

pub async fn player_stream_handler(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<sse::SnapshotStream, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;
    Ok(sse::snapshots(state.coordinator.view()))
}

pub async fn start(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
    Json(spec): Json<SessionSpec>,
) -> Result<Json<CommandAck>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;

    // reject bad input synchronously; the queued command revalidates
    Session::try_from(spec.clone()).map_err(|err| HttpServerError::BadRequest(err.to_string()))?;
    state.submit(PlayerCommand::Start(spec))
}

pub async fn toggle(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<CommandAck>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;
    state.submit(PlayerCommand::TogglePlayPause)
}

pub async fn close(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<CommandAck>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;
    state.submit(PlayerCommand::Close)
}

pub async fn telemetry(
    State(state): State<DebugHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<TelemetrySnapshot>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;
    Ok(Json(state.coordinator.telemetry().snapshot()))
}

fn map_try_send_error(err: TrySendError<PlayerCommand>) -> HttpServerError {
    match err {
        TrySendError::Full(_) => HttpServerError::Backpressure,
        TrySendError::Closed(_) => {
            HttpServerError::ServiceUnavailable("player command channel closed")
        }
    }
}

fn extract_token(headers: &HeaderMap, query_token: Option<&str>) -> Option<String> {
    if let Some(token) = query_token {
        return Some(token.to_string());
    }

    static X_DEBUG_TOKEN: HeaderName = HeaderName::from_static("x-debug-token");

    headers
        .get(&X_DEBUG_TOKEN)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| raw.strip_prefix("Bearer ").map(|v| v.to_string()))
        })
}
