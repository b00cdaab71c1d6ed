use crate::audio::CaptureConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one live recording session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Capture sample rate (16kHz default, what speech models expect)
    pub sample_rate_hz: u32,

    /// Number of audio channels (1 = mono)
    pub channel_count: u16,

    /// Capture slice interval. Shorter slices lower preview latency but
    /// fragment words at slice boundaries.
    pub slice_interval_ms: u64,

    /// Budget for the channel handshake (per attempt).
    pub connect_timeout: Duration,

    /// How long to wait after `stop` for the backend's acknowledgment
    /// before proceeding unacknowledged.
    pub stop_ack_timeout: Duration,

    /// Ceiling on the finalization pipeline. Elapsing means "stop
    /// waiting", not "abort the backend job".
    pub finalize_timeout: Duration,

    /// Saves with less captured audio than this are rejected locally.
    pub min_audio_ms: u64,

    /// Byte-size floor on the captured payload, a second guard against
    /// saving a recording that cannot contain speech.
    pub min_audio_bytes: usize,

    /// Saves whose reconciled transcript is shorter than this are
    /// rejected locally.
    pub min_transcript_chars: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            sample_rate_hz: 16_000,
            channel_count: 1,
            slice_interval_ms: 1_000,
            connect_timeout: Duration::from_secs(5),
            stop_ack_timeout: Duration::from_secs(30),
            finalize_timeout: Duration::from_secs(120),
            min_audio_ms: 1_000,
            min_audio_bytes: 4_096,
            min_transcript_chars: 8,
        }
    }
}

impl SessionConfig {
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate_hz: self.sample_rate_hz,
            channels: self.channel_count,
            slice_interval_ms: self.slice_interval_ms,
        }
    }
}
