//! HTTP API server for external control (dashboard / recorder UI)
//!
//! This module provides a REST API for driving live sessions and reading
//! persisted jobs:
//! - POST /sessions/start - Start a new live session
//! - POST /sessions/:id/stop|save|discard|reset - Session lifecycle
//! - GET /sessions/:id/status - Session snapshot
//! - GET /sessions/:id/transcript - Reconciled live transcript
//! - GET /jobs, GET /jobs/:id, DELETE /jobs/:id - Job store
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::{StartSessionRequest, StartSessionResponse};
pub use routes::create_router;
pub use state::AppState;
