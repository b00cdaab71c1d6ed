pub mod audio;
pub mod channel;
pub mod config;
pub mod error;
pub mod finalize;
pub mod http;
pub mod jobs;
pub mod session;

pub use audio::{
    AudioCaptureSource, AudioSlice, CaptureConfig, ScriptedSource, SliceBuffer, SliceCodec,
    SourceFactory, SourceSpec, WavFileSource,
};
pub use channel::{
    ControlFrame, ErrorCode, NatsChannel, OpenChannel, Outbound, ServerEvent, ServerFrame,
    TranscriptEvent, TranscriptionChannel,
};
pub use config::Config;
pub use error::{
    ChannelError, DeviceError, FinalizeError, FinalizeStage, SessionError, ValidationError,
};
pub use finalize::{
    ArtifactStore, FinalizationPipeline, FinalizeRequest, Finalizer, FsArtifactStore,
    InstructionExtractor, SpeechSynthesizer, SpeechTranscriber,
};
pub use http::{create_router, AppState};
pub use jobs::{Instruction, Job, JobStore, JobSummary, MemoryJobStore, Step};
pub use session::{
    LiveSessionController, LiveTranscript, SessionConfig, SessionDeps, SessionHandle,
    SessionSnapshot, SessionState, TranscriptReconciler,
};
