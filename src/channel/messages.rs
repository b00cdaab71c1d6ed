use crate::jobs::Job;
use serde::{Deserialize, Serialize};

/// Control frames sent client→server on the session's control subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlFrame {
    /// Session handshake. Must be acknowledged before audio flows.
    Config {
        sample_rate_hz: u32,
        channels: u16,
        slice_interval_ms: u64,
    },
    /// End of stream; the server flushes pending transcription and
    /// acknowledges with a `completed` frame.
    Stop,
    /// Terminal decision: keep the session's results.
    Save,
    /// Terminal decision: drop the session server-side. Best effort.
    Discard,
}

/// Machine-readable cause on a server `error` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The backend is missing credentials or otherwise misconfigured.
    MissingCredentials,
    MalformedAudio,
    Timeout,
    Internal,
}

/// Frames sent server→client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    ConfigAck,
    Transcription {
        slice_index: u64,
        text: String,
        is_final: bool,
    },
    /// With no job attached this acknowledges `stop` (live preview is
    /// flushed). With a job it reports channel-side finalization.
    Completed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        job: Option<Job>,
    },
    Error {
        message: String,
        code: ErrorCode,
    },
}

/// One partial or final recognition result for a slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub slice_index: u64,
    pub text: String,
    pub is_final: bool,
}

/// Transcript message as published by the STT service on `stt.text.>`.
/// Carries the session id so one subscription serves every session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    pub slice_index: u64,
    pub text: String,
    #[serde(rename = "final")]
    pub is_final: bool,
    pub timestamp: String,
    pub confidence: Option<f32>,
}

/// Completion message published on `stt.done.<session_id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedMessage {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<Job>,
}

/// Error message published on `stt.error.<session_id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendErrorMessage {
    pub session_id: String,
    pub code: ErrorCode,
    pub message: String,
}
