use serde::{Deserialize, Serialize};

/// Lifecycle state of a live recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    /// Channel handshake and device acquisition in flight.
    Connecting,
    /// Capturing; slices buffered locally and forwarded for live preview.
    Streaming,
    /// Capture closed, stop frame sent, waiting (bounded) for the backend
    /// to flush and acknowledge.
    Stopping,
    /// The user decides: save or discard. Buffer and transcript readable.
    AwaitingDecision,
    /// Finalization pipeline running.
    Finalizing,
    Complete,
    Error,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Streaming => "streaming",
            SessionState::Stopping => "stopping",
            SessionState::AwaitingDecision => "awaiting_decision",
            SessionState::Finalizing => "finalizing",
            SessionState::Complete => "complete",
            SessionState::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Complete | SessionState::Error)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
