use super::state::SessionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last error recorded by the controller, in snapshot form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionErrorInfo {
    /// Machine-readable kind ("device", "channel", "validation", ...)
    pub kind: String,
    pub message: String,
    /// Whether `save` may be retried without re-recording.
    pub save_retryable: bool,
}

/// Point-in-time status of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub state: SessionState,
    pub started_at: Option<DateTime<Utc>>,

    /// Number of slices captured into the local buffer
    pub slices_captured: usize,

    /// Total captured audio duration in milliseconds
    pub captured_ms: u64,

    /// Total buffered payload size in bytes
    pub captured_bytes: usize,

    /// Length of the reconciled live transcript in characters
    pub transcript_chars: usize,

    /// Number of confirmed (final) transcript segments
    pub final_segments: usize,

    /// Whether an in-flight partial fragment is currently displayed
    pub has_pending_partial: bool,

    /// False once the channel dropped mid-session; capture continues
    /// buffering locally in that condition.
    pub channel_healthy: bool,

    /// Set when `stop` proceeded without a backend acknowledgment.
    pub unacknowledged: bool,

    pub error: Option<SessionErrorInfo>,

    /// Job produced by a successful save.
    pub job_id: Option<String>,
}

/// The live transcript as exposed read-only to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveTranscript {
    /// Confirmed text (finals only, in order).
    pub committed: String,

    /// The in-flight partial fragment, if any. Supersedable; not durable.
    pub pending_partial: Option<String>,

    /// What a live caption view should display.
    pub rendered: String,
}
