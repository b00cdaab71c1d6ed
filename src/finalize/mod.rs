//! One-shot, higher-accuracy post-recording pipeline.
//!
//! On save the full recording is re-transcribed authoritatively,
//! instruction-bearing sentences are extracted, one speech artifact is
//! synthesized per instruction, and the result is persisted as a job. The
//! pipeline is atomic from the caller's point of view: any stage failure
//! aborts the whole run with the failing stage named.

pub mod artifacts;
pub mod nats;
pub mod pipeline;

pub use artifacts::{ArtifactStore, FsArtifactStore};
pub use nats::{NatsInstructionExtractor, NatsSpeechSynthesizer, NatsSpeechTranscriber};
pub use pipeline::FinalizationPipeline;

use crate::error::FinalizeError;
use crate::jobs::Job;

/// What a save submits: the assembled recording plus the live transcript
/// as a hint. The pipeline's own transcription is authoritative; the hint
/// never replaces it.
#[derive(Debug, Clone)]
pub struct FinalizeRequest {
    pub session_id: String,
    /// The full recording as one WAV payload.
    pub audio_wav: Vec<u8>,
    pub live_transcript_hint: Option<String>,
}

/// Entry point the session controller calls on save.
#[async_trait::async_trait]
pub trait Finalizer: Send + Sync {
    async fn finalize(&self, request: FinalizeRequest) -> Result<Job, FinalizeError>;
}

/// Authoritative speech-to-text over a complete recording.
#[async_trait::async_trait]
pub trait SpeechTranscriber: Send + Sync {
    async fn transcribe(&self, audio_wav: &[u8], hint: Option<&str>) -> anyhow::Result<String>;
}

/// Extracts instruction-bearing sentences from a transcript, in spoken
/// order, discarding greetings, filler and commentary. An empty result is
/// a valid outcome.
#[async_trait::async_trait]
pub trait InstructionExtractor: Send + Sync {
    async fn extract(&self, transcript: &str) -> anyhow::Result<Vec<String>>;
}

/// Synthesizes one spoken-audio artifact for a piece of text.
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> anyhow::Result<Vec<u8>>;
}
