use crate::session::SessionConfig;
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub nats: NatsConfig,
    pub audio: AudioConfig,
    pub session: SessionLimitsConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct NatsConfig {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub slice_interval_ms: u64,
    /// Where synthesized instruction artifacts are written
    pub artifacts_path: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionLimitsConfig {
    pub connect_timeout_secs: u64,
    pub stop_ack_timeout_secs: u64,
    pub finalize_timeout_secs: u64,
    pub min_audio_ms: u64,
    pub min_audio_bytes: usize,
    pub min_transcript_chars: usize,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Per-session configuration template derived from the service config.
    pub fn session_defaults(&self) -> SessionConfig {
        SessionConfig {
            sample_rate_hz: self.audio.sample_rate,
            channel_count: self.audio.channels,
            slice_interval_ms: self.audio.slice_interval_ms,
            connect_timeout: Duration::from_secs(self.session.connect_timeout_secs),
            stop_ack_timeout: Duration::from_secs(self.session.stop_ack_timeout_secs),
            finalize_timeout: Duration::from_secs(self.session.finalize_timeout_secs),
            min_audio_ms: self.session.min_audio_ms,
            min_audio_bytes: self.session.min_audio_bytes,
            min_transcript_chars: self.session.min_transcript_chars,
            ..SessionConfig::default()
        }
    }
}
