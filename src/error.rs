use thiserror::Error;

/// Errors raised while acquiring or running an audio capture device.
///
/// Permission problems are user-actionable and must stay distinguishable
/// from "there is simply no device here".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("no capture device available")]
    NoDevice,

    #[error("audio capture is not supported in this build: {0}")]
    Unsupported(String),

    #[error("capture device failed: {0}")]
    Failed(String),
}

/// Errors raised by the transcription channel transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("transcription backend refused connection: {0}")]
    Refused(String),

    #[error("transcription channel dropped: {0}")]
    Dropped(String),

    #[error("transcription backend handshake timed out")]
    HandshakeTimeout,
}

/// Local rejection of a save, raised before any backend call is made.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("recording too short: {captured_ms}ms captured, minimum is {min_ms}ms")]
    TooShort { captured_ms: u64, min_ms: u64 },

    #[error("no usable speech: transcript has {chars} characters, minimum is {min_chars}")]
    NoSpeech { chars: usize, min_chars: usize },
}

/// The stage of the finalization pipeline that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeStage {
    Transcription,
    Extraction,
    Synthesis,
    Persistence,
}

impl std::fmt::Display for FinalizeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FinalizeStage::Transcription => "transcription",
            FinalizeStage::Extraction => "extraction",
            FinalizeStage::Synthesis => "synthesis",
            FinalizeStage::Persistence => "persistence",
        };
        f.write_str(name)
    }
}

/// Errors from the finalization pipeline. Every failure names the stage it
/// came from; persistence failures are distinguished from processing
/// failures because their retry semantics differ.
#[derive(Debug, Clone, Error)]
pub enum FinalizeError {
    #[error("{stage} failed: {message}")]
    Stage { stage: FinalizeStage, message: String },

    #[error("finalization timed out after {timeout_secs}s")]
    TimedOut { timeout_secs: u64 },
}

impl FinalizeError {
    pub fn stage(stage: FinalizeStage, source: anyhow::Error) -> Self {
        FinalizeError::Stage {
            stage,
            message: format!("{source:#}"),
        }
    }

    pub fn failed_stage(&self) -> Option<FinalizeStage> {
        match self {
            FinalizeError::Stage { stage, .. } => Some(*stage),
            FinalizeError::TimedOut { .. } => None,
        }
    }
}

/// Top-level session error surfaced by the controller. This is the single
/// taxonomy user-facing messaging is derived from.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Finalize(#[from] FinalizeError),

    #[error("cannot {command} while session is {state}")]
    InvalidTransition {
        state: &'static str,
        command: &'static str,
    },

    #[error("session cancelled by {0}")]
    Cancelled(&'static str),

    #[error("internal session failure: {0}")]
    Internal(String),

    #[error("session controller is no longer running")]
    ControllerGone,
}

impl SessionError {
    /// Short machine-readable kind, used in snapshots and HTTP payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Device(_) => "device",
            SessionError::Channel(_) => "channel",
            SessionError::Validation(_) => "validation",
            SessionError::Finalize(_) => "finalize",
            SessionError::InvalidTransition { .. } => "invalid_transition",
            SessionError::Cancelled(_) => "cancelled",
            SessionError::Internal(_) => "internal",
            SessionError::ControllerGone => "gone",
        }
    }

    /// Whether a failed save may be retried without re-recording. The raw
    /// audio buffer survives channel and pipeline failures; it cannot cure
    /// a recording that was rejected as too short.
    pub fn save_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::Channel(_) | SessionError::Finalize(_)
        )
    }
}
