use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use stepvoice::finalize::{
    FinalizationPipeline, FsArtifactStore, NatsInstructionExtractor, NatsSpeechSynthesizer,
    NatsSpeechTranscriber,
};
use stepvoice::{create_router, AppState, Config, MemoryJobStore, NatsChannel};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "stepvoice", about = "Live instruction-recording service")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/stepvoice")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config))?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let nats = async_nats::connect(&cfg.nats.url)
        .await
        .with_context(|| format!("failed to connect to NATS at {}", cfg.nats.url))?;
    info!("Connected to NATS at {}", cfg.nats.url);

    let jobs = Arc::new(MemoryJobStore::new());
    let finalizer = Arc::new(FinalizationPipeline::new(
        Arc::new(NatsSpeechTranscriber::new(nats.clone())),
        Arc::new(NatsInstructionExtractor::new(nats.clone())),
        Arc::new(NatsSpeechSynthesizer::new(nats.clone())),
        Arc::new(FsArtifactStore::new(&cfg.audio.artifacts_path)),
        jobs.clone(),
    ));
    let channel = Arc::new(NatsChannel::new(nats));

    let state = AppState::new(channel, finalizer, jobs, cfg.session_defaults());
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
