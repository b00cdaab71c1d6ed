use super::state::AppState;
use crate::audio::{SourceFactory, SourceSpec};
use crate::error::SessionError;
use crate::session::{LiveSessionController, SessionDeps, SessionHandle};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,

    /// Override the default slice interval
    pub slice_interval_ms: Option<u64>,

    /// Capture source (default: microphone)
    pub source: Option<SourceSpec>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub session_id: String,
    pub status: String,
    /// True when the backend never acknowledged the stop.
    pub unacknowledged: bool,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub job_id: String,
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

impl ErrorResponse {
    fn from_session_error(error: &SessionError) -> Self {
        Self {
            error: error.to_string(),
            kind: error.kind().to_string(),
        }
    }
}

/// Map a controller error to the HTTP status it deserves.
fn session_error_status(error: &SessionError) -> StatusCode {
    match error {
        SessionError::InvalidTransition { .. } => StatusCode::CONFLICT,
        SessionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::Device(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SessionError::Channel(_) | SessionError::Finalize(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn session_error_response(error: &SessionError) -> axum::response::Response {
    (
        session_error_status(error),
        Json(ErrorResponse::from_session_error(error)),
    )
        .into_response()
}

fn not_found(session_id: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Session {session_id} not found"),
            kind: "not_found".to_string(),
        }),
    )
        .into_response()
}

async fn lookup(state: &AppState, session_id: &str) -> Option<SessionHandle> {
    let sessions = state.sessions.read().await;
    sessions.get(session_id).cloned()
}

// ============================================================================
// Session handlers
// ============================================================================

/// POST /sessions/start
/// Create and start a new live recording session
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("session-{}", uuid::Uuid::new_v4()));

    info!("Starting session: {}", session_id);

    // Check for a duplicate before doing any work
    {
        let sessions = state.sessions.read().await;
        if sessions.contains_key(&session_id) {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: format!("Session {session_id} already exists"),
                    kind: "duplicate".to_string(),
                }),
            )
                .into_response();
        }
    }

    let mut config = state.session_defaults.clone();
    config.session_id = session_id.clone();
    if let Some(interval) = req.slice_interval_ms {
        config.slice_interval_ms = interval;
    }

    let source_spec = req.source.unwrap_or(SourceSpec::Microphone);
    let capture = match SourceFactory::create(&source_spec) {
        Ok(capture) => capture,
        Err(e) => {
            error!("Failed to create capture source: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to create capture source: {e}"),
                    kind: "device".to_string(),
                }),
            )
                .into_response();
        }
    };

    let handle = LiveSessionController::spawn(
        config,
        SessionDeps {
            capture,
            channel: Arc::clone(&state.channel),
            finalizer: Arc::clone(&state.finalizer),
        },
    );

    if let Err(e) = handle.start().await {
        error!("Failed to start session: {}", e);
        return session_error_response(&e);
    }

    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(session_id.clone(), handle);
    }

    info!("Session started: {}", session_id);

    (
        StatusCode::OK,
        Json(StartSessionResponse {
            session_id: session_id.clone(),
            status: "streaming".to_string(),
            message: format!("Session {session_id} is recording"),
        }),
    )
        .into_response()
}

/// POST /sessions/:session_id/stop
/// Stop capturing; the session moves to awaiting-decision
pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(handle) = lookup(&state, &session_id).await else {
        return not_found(&session_id);
    };

    if let Err(e) = handle.stop().await {
        return session_error_response(&e);
    }

    let unacknowledged = match handle.snapshot().await {
        Ok(snapshot) => snapshot.unacknowledged,
        Err(e) => return session_error_response(&e),
    };

    (
        StatusCode::OK,
        Json(StopSessionResponse {
            session_id,
            status: "awaiting_decision".to_string(),
            unacknowledged,
        }),
    )
        .into_response()
}

/// POST /sessions/:session_id/save
/// Run the finalization pipeline; returns the persisted job
pub async fn save_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(handle) = lookup(&state, &session_id).await else {
        return not_found(&session_id);
    };

    match handle.save().await {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(e) => {
            error!("Save failed for {}: {}", session_id, e);
            session_error_response(&e)
        }
    }
}

/// POST /sessions/:session_id/discard
/// Drop the recording and remove the session
pub async fn discard_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let handle = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&session_id)
    };

    let Some(handle) = handle else {
        return not_found(&session_id);
    };

    if let Err(e) = handle.discard().await {
        return session_error_response(&e);
    }

    info!("Session discarded: {}", session_id);
    StatusCode::OK.into_response()
}

/// POST /sessions/:session_id/reset
/// Forced teardown back to idle; the session stays registered
pub async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(handle) = lookup(&state, &session_id).await else {
        return not_found(&session_id);
    };

    if let Err(e) = handle.reset().await {
        return session_error_response(&e);
    }

    StatusCode::OK.into_response()
}

/// GET /sessions/:session_id/status
pub async fn get_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(handle) = lookup(&state, &session_id).await else {
        return not_found(&session_id);
    };

    match handle.snapshot().await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => session_error_response(&e),
    }
}

/// GET /sessions/:session_id/transcript
/// The reconciled live transcript (finals plus in-flight partial)
pub async fn get_session_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(handle) = lookup(&state, &session_id).await else {
        return not_found(&session_id);
    };

    match handle.transcript().await {
        Ok(transcript) => (StatusCode::OK, Json(transcript)).into_response(),
        Err(e) => session_error_response(&e),
    }
}

// ============================================================================
// Job handlers
// ============================================================================

/// GET /jobs
pub async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    match state.jobs.list().await {
        Ok(summaries) => (StatusCode::OK, Json(summaries)).into_response(),
        Err(e) => {
            error!("Failed to list jobs: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                    kind: "store".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /jobs/:job_id
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    match state.jobs.get(&job_id).await {
        Ok(Some(job)) => (StatusCode::OK, Json(job)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Job {job_id} not found"),
                kind: "not_found".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to get job {}: {}", job_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                    kind: "store".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// DELETE /jobs/:job_id
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    match state.jobs.delete(&job_id).await {
        Ok(true) => (
            StatusCode::OK,
            Json(DeletedResponse {
                job_id,
                deleted: true,
            }),
        )
            .into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Job {job_id} not found"),
                kind: "not_found".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to delete job {}: {}", job_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                    kind: "store".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
