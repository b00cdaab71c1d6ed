use super::{
    ArtifactStore, FinalizeRequest, Finalizer, InstructionExtractor, SpeechSynthesizer,
    SpeechTranscriber,
};
use crate::error::{FinalizeError, FinalizeStage};
use crate::jobs::{Instruction, Job, JobStore, Step};
use anyhow::Context;
use chrono::Utc;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::info;

/// Composes the finalization collaborators into one atomic operation.
///
/// Stage attribution: `transcribe` failures are Transcription, `extract`
/// failures Extraction, `synthesize` failures Synthesis, and artifact or
/// job-store writes Persistence. Artifacts for all instructions are
/// synthesized concurrently, but the job is assembled and persisted only
/// once every artifact exists.
pub struct FinalizationPipeline {
    transcriber: Arc<dyn SpeechTranscriber>,
    extractor: Arc<dyn InstructionExtractor>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    artifacts: Arc<dyn ArtifactStore>,
    jobs: Arc<dyn JobStore>,
}

impl FinalizationPipeline {
    pub fn new(
        transcriber: Arc<dyn SpeechTranscriber>,
        extractor: Arc<dyn InstructionExtractor>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        artifacts: Arc<dyn ArtifactStore>,
        jobs: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            transcriber,
            extractor,
            synthesizer,
            artifacts,
            jobs,
        }
    }

    async fn build_instruction(
        &self,
        job_id: &str,
        index: usize,
        text: &str,
    ) -> Result<Instruction, FinalizeError> {
        let audio = self
            .synthesizer
            .synthesize(text)
            .await
            .with_context(|| format!("instruction {index}"))
            .map_err(|e| FinalizeError::stage(FinalizeStage::Synthesis, e))?;

        let key = format!("{job_id}/instruction_{index}.wav");
        let artifact_ref = self
            .artifacts
            .put(&key, &audio)
            .await
            .with_context(|| format!("instruction {index}"))
            .map_err(|e| FinalizeError::stage(FinalizeStage::Persistence, e))?;

        Ok(Instruction {
            instruction_text: text.to_string(),
            steps: vec![Step {
                text: text.to_string(),
                audio_artifact_ref: artifact_ref,
            }],
        })
    }
}

#[async_trait::async_trait]
impl Finalizer for FinalizationPipeline {
    async fn finalize(&self, request: FinalizeRequest) -> Result<Job, FinalizeError> {
        let session_id = &request.session_id;
        info!(
            "finalizing session {session_id}: {} bytes of audio",
            request.audio_wav.len()
        );

        let transcription = self
            .transcriber
            .transcribe(&request.audio_wav, request.live_transcript_hint.as_deref())
            .await
            .map_err(|e| FinalizeError::stage(FinalizeStage::Transcription, e))?;

        let sentences = self
            .extractor
            .extract(&transcription)
            .await
            .map_err(|e| FinalizeError::stage(FinalizeStage::Extraction, e))?;

        info!(
            "session {session_id}: {} instruction(s) extracted",
            sentences.len()
        );

        let job_id = format!("job-{}", uuid::Uuid::new_v4());

        let instructions = try_join_all(
            sentences
                .iter()
                .enumerate()
                .map(|(index, text)| self.build_instruction(&job_id, index, text)),
        )
        .await?;

        let job = Job {
            job_id,
            transcription,
            instructions,
            created_at: Utc::now(),
        };

        self.jobs
            .insert(job.clone())
            .await
            .map_err(|e| FinalizeError::stage(FinalizeStage::Persistence, e.into()))?;

        info!("session {session_id}: job {} persisted", job.job_id);
        Ok(job)
    }
}
