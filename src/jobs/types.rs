use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One step of an instruction: its text and a reference to the synthesized
/// audio reading of it. In the canonical shape an instruction has exactly
/// one step (the instruction itself, read aloud).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub text: String,
    pub audio_artifact_ref: String,
}

/// An actionable sentence extracted from a transcript, paired with its
/// synthesized audio. Immutable once created; owned by the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub instruction_text: String,
    pub steps: Vec<Step>,
}

/// The persisted result of one saved recording: the authoritative
/// transcription plus every extracted instruction. Created by the
/// finalization pipeline, never mutated, deletable as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub transcription: String,
    pub instructions: Vec<Instruction>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            job_id: self.job_id.clone(),
            instruction_count: self.instructions.len(),
            created_at: self.created_at,
        }
    }
}

/// Summary fields for the listing view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: String,
    pub instruction_count: usize,
    pub created_at: DateTime<Utc>,
}
