use super::state::AppState;
use crate::session::SessionError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StartConversationRequest {
    /// Agent to talk to (defaults to the configured agent)
    pub agent_id: Option<String>,

    /// Values substituted into the agent's prompt
    #[serde(default)]
    pub dynamic_variables: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ArchiveRetryResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match &self {
            SessionError::PermissionDenied => StatusCode::FORBIDDEN,
            SessionError::AlreadyActive | SessionError::NoActiveSession | SessionError::Cancelled => {
                StatusCode::CONFLICT
            }
            SessionError::Connection(_) | SessionError::Send(_) => StatusCode::BAD_GATEWAY,
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /conversation/toggle
/// Stop the live session, or start one if none is live
pub async fn toggle_conversation(
    State(state): State<AppState>,
    body: Option<Json<StartConversationRequest>>,
) -> Result<impl IntoResponse, SessionError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let agent_id = req.agent_id.unwrap_or_else(|| state.default_agent_id.clone());

    let snapshot = state
        .controller
        .toggle(&agent_id, req.dynamic_variables)
        .await?;

    Ok(Json(snapshot))
}

/// POST /conversation/start
pub async fn start_conversation(
    State(state): State<AppState>,
    body: Option<Json<StartConversationRequest>>,
) -> Result<impl IntoResponse, SessionError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let agent_id = req.agent_id.unwrap_or_else(|| state.default_agent_id.clone());

    info!("Starting conversation with agent: {}", agent_id);

    let snapshot = state
        .controller
        .start(&agent_id, req.dynamic_variables)
        .await?;

    Ok(Json(snapshot))
}

/// POST /conversation/stop
pub async fn stop_conversation(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.controller.stop().await)
}

/// POST /conversation/message
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, SessionError> {
    state.controller.send_message(&req.text).await?;
    Ok(Json(state.controller.snapshot()))
}

/// POST /conversation/mute
pub async fn toggle_mute(State(state): State<AppState>) -> Result<impl IntoResponse, SessionError> {
    Ok(Json(state.controller.toggle_mute().await?))
}

/// POST /conversation/speaker
pub async fn toggle_speaker(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.controller.toggle_speaker_output().await)
}

/// GET /conversation/status
pub async fn get_conversation_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.controller.snapshot())
}

/// GET /archive/status
pub async fn get_archive_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.reconciler.status())
}

/// POST /archive/retry
/// Re-run archival for the last unarchived session in the background
pub async fn retry_archive(State(state): State<AppState>) -> impl IntoResponse {
    // Detached: progress is visible through /archive/status
    let _ = state.reconciler.retry_pending().await;

    (
        StatusCode::ACCEPTED,
        Json(ArchiveRetryResponse {
            status: "scheduled".to_string(),
            message: "Archive retry scheduled".to_string(),
        }),
    )
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
