use crate::channel::TranscriptionChannel;
use crate::finalize::Finalizer;
use crate::jobs::JobStore;
use crate::session::{SessionConfig, SessionHandle};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers.
///
/// Everything a session controller needs is carried here explicitly;
/// handlers pass it in rather than reaching for globals.
#[derive(Clone)]
pub struct AppState {
    /// Registered sessions (session_id → handle)
    pub sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,

    /// Transcription channel connector shared by all sessions
    pub channel: Arc<dyn TranscriptionChannel>,

    /// Finalization pipeline invoked on save
    pub finalizer: Arc<dyn Finalizer>,

    /// Job persistence
    pub jobs: Arc<dyn JobStore>,

    /// Template for per-session configuration; the session id is
    /// replaced for each new session.
    pub session_defaults: SessionConfig,
}

impl AppState {
    pub fn new(
        channel: Arc<dyn TranscriptionChannel>,
        finalizer: Arc<dyn Finalizer>,
        jobs: Arc<dyn JobStore>,
        session_defaults: SessionConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            channel,
            finalizer,
            jobs,
            session_defaults,
        }
    }
}
