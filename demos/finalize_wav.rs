// Finalize WAV Demo: run an on-disk recording through the full pipeline
//
// The file-upload flow is the degenerate case of a live session: the WAV
// source replays the file as slices, the session stops itself when the
// file ends, and save runs the authoritative pipeline.
//
// Prerequisites:
// - NATS server plus STT/NLU/TTS peers (see live_session demo)
//
// Usage: cargo run --example finalize_wav -- recording.wav

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use stepvoice::finalize::{
    FinalizationPipeline, FsArtifactStore, NatsInstructionExtractor, NatsSpeechSynthesizer,
    NatsSpeechTranscriber,
};
use stepvoice::session::{LiveSessionController, SessionConfig, SessionDeps, SessionState};
use stepvoice::{MemoryJobStore, NatsChannel, WavFileSource};

#[derive(Debug, Parser)]
struct Args {
    /// Path to a 16-bit PCM WAV file
    wav_path: String,

    #[arg(long, default_value = "nats://localhost:4222")]
    nats_url: String,

    #[arg(long, default_value = "artifacts")]
    artifacts_dir: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let nats = async_nats::connect(&args.nats_url).await?;

    let jobs = Arc::new(MemoryJobStore::new());
    let finalizer = Arc::new(FinalizationPipeline::new(
        Arc::new(NatsSpeechTranscriber::new(nats.clone())),
        Arc::new(NatsInstructionExtractor::new(nats.clone())),
        Arc::new(NatsSpeechSynthesizer::new(nats.clone())),
        Arc::new(FsArtifactStore::new(&args.artifacts_dir)),
        jobs,
    ));

    let handle = LiveSessionController::spawn(
        SessionConfig::default(),
        SessionDeps {
            capture: Box::new(WavFileSource::new(&args.wav_path)),
            channel: Arc::new(NatsChannel::new(nats)),
            finalizer,
        },
    );

    handle.start().await?;
    println!("Replaying {}...", args.wav_path);

    // The file source ends on its own; wait for the decision point.
    loop {
        let snapshot = handle.snapshot().await?;
        if snapshot.state == SessionState::AwaitingDecision {
            println!(
                "Replay done: {} slices, {}ms of audio",
                snapshot.slices_captured, snapshot.captured_ms
            );
            break;
        }
        if snapshot.state == SessionState::Error {
            anyhow::bail!("session failed: {:?}", snapshot.error);
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    let job = handle.save().await?;
    println!("\nJob {}", job.job_id);
    println!("Transcription: {}", job.transcription);
    for (index, instruction) in job.instructions.iter().enumerate() {
        println!("  {}. {}", index + 1, instruction.instruction_text);
        for step in &instruction.steps {
            println!("     audio: {}", step.audio_artifact_ref);
        }
    }

    Ok(())
}
