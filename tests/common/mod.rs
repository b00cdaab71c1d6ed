// Shared fakes for driving the session controller headlessly.
//
// The channel fake plays the backend's side of the wire: tests feed it
// server events and inspect what the controller sent. The finalizer fake
// counts invocations so tests can assert that rejected saves never reach
// the pipeline.

#![allow(dead_code)]

use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stepvoice::channel::{ControlFrame, OpenChannel, Outbound, ServerEvent, TranscriptionChannel};
use stepvoice::error::{ChannelError, FinalizeError};
use stepvoice::finalize::{FinalizeRequest, Finalizer};
use stepvoice::jobs::{Instruction, Job, Step};
use stepvoice::session::{
    LiveSessionController, SessionConfig, SessionDeps, SessionHandle, SessionSnapshot,
};
use stepvoice::ScriptedSource;
use tokio::sync::{mpsc, oneshot, Mutex};

/// What the controller pushed onto the wire, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SentFrame {
    Audio { sequence: u64 },
    Control(ControlFrame),
}

/// Test double for the transcription channel. The test script drives the
/// server side through `emit` and `drop_connection`.
pub struct FakeChannel {
    pub connect_attempts: AtomicUsize,
    fail_connects: AtomicUsize,
    events_tx: Arc<Mutex<Option<mpsc::Sender<ServerEvent>>>>,
    sent: Arc<Mutex<Vec<SentFrame>>>,
    pub close_count: Arc<AtomicUsize>,
}

impl FakeChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connect_attempts: AtomicUsize::new(0),
            fail_connects: AtomicUsize::new(0),
            events_tx: Arc::new(Mutex::new(None)),
            sent: Arc::new(Mutex::new(Vec::new())),
            close_count: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Fail the next `n` connect attempts before letting one succeed.
    pub fn failing_connects(self: Arc<Self>, n: usize) -> Arc<Self> {
        self.fail_connects.store(n, Ordering::SeqCst);
        self
    }

    /// Deliver a server event to the controller.
    pub async fn emit(&self, event: ServerEvent) {
        let guard = self.events_tx.lock().await;
        if let Some(tx) = guard.as_ref() {
            let _ = tx.send(event).await;
        }
    }

    /// Simulate the connection dropping mid-session.
    pub async fn drop_connection(&self) {
        self.events_tx.lock().await.take();
    }

    pub async fn sent(&self) -> Vec<SentFrame> {
        self.sent.lock().await.clone()
    }

    pub fn closes(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TranscriptionChannel for FakeChannel {
    async fn connect(&self, _config: &SessionConfig) -> Result<OpenChannel, ChannelError> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);

        let remaining = self.fail_connects.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_connects.store(remaining - 1, Ordering::SeqCst);
            return Err(ChannelError::Refused("test refusal".to_string()));
        }

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Outbound>();
        let (events_tx, events_rx) = mpsc::channel::<ServerEvent>(64);
        let (closer_tx, closer_rx) = oneshot::channel::<()>();

        *self.events_tx.lock().await = Some(events_tx);

        let sent = Arc::clone(&self.sent);
        tokio::spawn(async move {
            while let Some(item) = outbound_rx.recv().await {
                let frame = match item {
                    Outbound::Audio(slice) => SentFrame::Audio {
                        sequence: slice.sequence,
                    },
                    Outbound::Control(control) => SentFrame::Control(control),
                };
                sent.lock().await.push(frame);
            }
        });

        let close_count = Arc::clone(&self.close_count);
        let events_slot = Arc::clone(&self.events_tx);
        tokio::spawn(async move {
            let _ = closer_rx.await;
            close_count.fetch_add(1, Ordering::SeqCst);
            events_slot.lock().await.take();
        });

        Ok(OpenChannel::new(outbound_tx, events_rx, closer_tx))
    }
}

/// Test double for the finalization pipeline. Counts invocations and
/// replays a configurable result.
pub struct FakeFinalizer {
    pub calls: AtomicUsize,
    result: Mutex<FinalizeOutcome>,
    pub last_request: Mutex<Option<FinalizeRequest>>,
}

pub enum FinalizeOutcome {
    Succeed,
    Fail(FinalizeError),
    /// Never resolves; used to exercise the finalize timeout and reset.
    Hang,
}

impl FakeFinalizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            result: Mutex::new(FinalizeOutcome::Succeed),
            last_request: Mutex::new(None),
        })
    }

    pub async fn set_outcome(&self, outcome: FinalizeOutcome) {
        *self.result.lock().await = outcome;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Build the job a successful run returns: one instruction carrying
    /// the whole transcript, the canonical one-step shape.
    fn job_for(request: &FinalizeRequest) -> Job {
        let text = request
            .live_transcript_hint
            .clone()
            .unwrap_or_else(|| "transcribed text".to_string());
        Job {
            job_id: "job-test".to_string(),
            transcription: text.clone(),
            instructions: vec![Instruction {
                instruction_text: text.clone(),
                steps: vec![Step {
                    text,
                    audio_artifact_ref: "mem://job-test/instruction_0.wav".to_string(),
                }],
            }],
            created_at: Utc::now(),
        }
    }
}

#[async_trait::async_trait]
impl Finalizer for FakeFinalizer {
    async fn finalize(&self, request: FinalizeRequest) -> Result<Job, FinalizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let job = Self::job_for(&request);
        *self.last_request.lock().await = Some(request);

        let outcome = {
            let guard = self.result.lock().await;
            match &*guard {
                FinalizeOutcome::Succeed => Some(Ok(job)),
                FinalizeOutcome::Fail(error) => Some(Err(error.clone())),
                FinalizeOutcome::Hang => None,
            }
        };

        match outcome {
            Some(result) => result,
            None => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

/// Session config tuned for tests: tight timeouts, no validation floors
/// (tests that exercise validation raise them explicitly).
pub fn test_config() -> SessionConfig {
    SessionConfig {
        session_id: "session-under-test".to_string(),
        slice_interval_ms: 100,
        connect_timeout: Duration::from_secs(1),
        stop_ack_timeout: Duration::from_secs(10),
        finalize_timeout: Duration::from_secs(10),
        min_audio_ms: 0,
        min_audio_bytes: 0,
        min_transcript_chars: 0,
        ..SessionConfig::default()
    }
}

/// A schedule of `count` slices, 100ms of audio each at 16kHz mono.
pub fn slice_schedule(count: usize) -> Vec<Vec<i16>> {
    (0..count)
        .map(|i| vec![(i as i16 + 1) * 100; 1600])
        .collect()
}

/// Spawn a controller over a scripted source, returning the handle and the
/// source's close counter.
pub fn spawn_session(
    config: SessionConfig,
    source: ScriptedSource,
    channel: Arc<FakeChannel>,
    finalizer: Arc<FakeFinalizer>,
) -> (SessionHandle, Arc<AtomicUsize>) {
    let closes = source.close_counter();
    let handle = LiveSessionController::spawn(
        config,
        SessionDeps {
            capture: Box::new(source),
            channel,
            finalizer,
        },
    );
    (handle, closes)
}

/// Poll snapshots until the predicate holds. Snapshot requests serialize
/// through the controller's queue, so a matching snapshot means every
/// earlier event was applied.
pub async fn wait_for(
    handle: &SessionHandle,
    what: &str,
    predicate: impl Fn(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let mut last = None;
    for _ in 0..400 {
        let snapshot = handle.snapshot().await.expect("controller alive");
        if predicate(&snapshot) {
            return snapshot;
        }
        last = Some(snapshot);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}; last snapshot: {last:?}");
}
