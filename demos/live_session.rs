// Live Session Demo: drive a full session against a real backend
//
// Walks the whole lifecycle with a scripted tone generator standing in
// for the microphone:
// 1. Connect to NATS and handshake a transcription channel
// 2. Stream sliced audio while printing live transcript snapshots
// 3. Stop, wait for the backend acknowledgment, save
// 4. Print the finalized job (instructions + artifact refs)
//
// Prerequisites:
// - NATS server running: docker run -p 4222:4222 nats
// - An STT peer serving audio.control.* handshakes and stt.* subjects
//
// Usage: cargo run --example live_session -- --nats-url nats://localhost:4222

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use stepvoice::finalize::{
    FinalizationPipeline, FsArtifactStore, NatsInstructionExtractor, NatsSpeechSynthesizer,
    NatsSpeechTranscriber,
};
use stepvoice::session::{LiveSessionController, SessionConfig, SessionDeps};
use stepvoice::{MemoryJobStore, NatsChannel, ScriptedSource};
use tracing::info;

#[derive(Debug, Parser)]
struct Args {
    #[arg(long, default_value = "nats://localhost:4222")]
    nats_url: String,

    /// Seconds of tone to stream
    #[arg(long, default_value_t = 5)]
    seconds: u32,
}

/// One second of A4 sine per slice, the classic test signal.
fn tone_schedule(seconds: u32, sample_rate: u32) -> Vec<Vec<i16>> {
    (0..seconds)
        .map(|_| {
            (0..sample_rate)
                .map(|i| {
                    let t = i as f32 / sample_rate as f32;
                    (0.3 * f32::sin(2.0 * std::f32::consts::PI * 440.0 * t) * i16::MAX as f32)
                        as i16
                })
                .collect()
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let nats = async_nats::connect(&args.nats_url).await?;
    info!("Connected to NATS at {}", args.nats_url);

    let jobs = Arc::new(MemoryJobStore::new());
    let finalizer = Arc::new(FinalizationPipeline::new(
        Arc::new(NatsSpeechTranscriber::new(nats.clone())),
        Arc::new(NatsInstructionExtractor::new(nats.clone())),
        Arc::new(NatsSpeechSynthesizer::new(nats.clone())),
        Arc::new(FsArtifactStore::new("artifacts")),
        jobs,
    ));

    let config = SessionConfig::default();
    let source = ScriptedSource::new(tone_schedule(args.seconds, config.sample_rate_hz))
        .paced(Duration::from_millis(config.slice_interval_ms))
        .finite();

    let handle = LiveSessionController::spawn(
        config,
        SessionDeps {
            capture: Box::new(source),
            channel: Arc::new(NatsChannel::new(nats)),
            finalizer,
        },
    );

    handle.start().await?;
    println!("Streaming {} seconds of audio...", args.seconds);

    // Print live transcript snapshots while the source plays out.
    for _ in 0..args.seconds {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let transcript = handle.transcript().await?;
        if !transcript.rendered.is_empty() {
            println!("live: {}", transcript.rendered);
        }
    }

    handle.stop().await?;
    let snapshot = handle.snapshot().await?;
    println!(
        "Stopped ({} slices, {}ms captured, acknowledged: {})",
        snapshot.slices_captured, snapshot.captured_ms, !snapshot.unacknowledged
    );

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
