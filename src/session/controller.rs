use super::config::SessionConfig;
use super::snapshot::{LiveTranscript, SessionErrorInfo, SessionSnapshot};
use super::state::SessionState;
use super::transcript::TranscriptReconciler;
use crate::audio::{AudioCaptureSource, AudioSlice, SliceBuffer};
use crate::channel::{
    ControlFrame, OpenChannel, Outbound, ServerEvent, TranscriptionChannel,
};
use crate::error::{ChannelError, FinalizeError, SessionError, ValidationError};
use crate::finalize::{FinalizeRequest, Finalizer};
use crate::jobs::Job;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// Everything a session needs from the outside world, passed in
/// explicitly so the controller holds no ambient references and can be
/// driven headlessly by fakes.
pub struct SessionDeps {
    pub capture: Box<dyn AudioCaptureSource>,
    pub channel: Arc<dyn TranscriptionChannel>,
    pub finalizer: Arc<dyn Finalizer>,
}

enum Command {
    Start(oneshot::Sender<Result<(), SessionError>>),
    Stop(oneshot::Sender<Result<(), SessionError>>),
    Save(oneshot::Sender<Result<Job, SessionError>>),
    Discard(oneshot::Sender<Result<(), SessionError>>),
    Reset(oneshot::Sender<()>),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Transcript(oneshot::Sender<LiveTranscript>),
}

/// Internal event queue. Everything that mutates the session flows
/// through here and is applied one at a time, in arrival order.
enum Event {
    Slice { epoch: u64, slice: AudioSlice },
    CaptureEnded { epoch: u64 },
    Server { epoch: u64, event: ServerEvent },
    ChannelGone { epoch: u64 },
    StopDeadline { epoch: u64 },
    FinalizeDone {
        epoch: u64,
        result: Result<Job, FinalizeError>,
    },
}

/// Cloneable handle to a running session controller task.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: String,
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| SessionError::ControllerGone)?;
        rx.await.map_err(|_| SessionError::ControllerGone)
    }

    /// Begin a session: acquire the device and the channel, then stream.
    pub async fn start(&self) -> Result<(), SessionError> {
        self.request(Command::Start).await?
    }

    /// Stop capturing. Resolves once the session reaches
    /// `AwaitingDecision` (acknowledged or timed out).
    pub async fn stop(&self) -> Result<(), SessionError> {
        self.request(Command::Stop).await?
    }

    /// Save the recording. Resolves with the persisted job, or with the
    /// error that moved the session to `Error`.
    pub async fn save(&self) -> Result<Job, SessionError> {
        self.request(Command::Save).await?
    }

    /// Drop the recording and return to `Idle`. Accepted in any state.
    pub async fn discard(&self) -> Result<(), SessionError> {
        self.request(Command::Discard).await?
    }

    /// Forced teardown back to `Idle`. Always succeeds.
    pub async fn reset(&self) -> Result<(), SessionError> {
        self.request(Command::Reset).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(Command::Snapshot).await
    }

    pub async fn transcript(&self) -> Result<LiveTranscript, SessionError> {
        self.request(Command::Transcript).await
    }
}

/// The live-session state machine.
///
/// Owns the session lifecycle, the authoritative slice buffer and the
/// transcript reconciliation. Capture, channel I/O and finalization run as
/// separate tasks; they communicate with the controller exclusively
/// through its event queue, so all state mutation is serialized.
pub struct LiveSessionController {
    config: SessionConfig,
    capture: Box<dyn AudioCaptureSource>,
    channel: Arc<dyn TranscriptionChannel>,
    finalizer: Arc<dyn Finalizer>,

    state: SessionState,
    started_at: Option<DateTime<Utc>>,
    buffer: SliceBuffer,
    reconciler: TranscriptReconciler,

    /// Incremented on every teardown; events stamped with an older epoch
    /// come from a previous generation's tasks and are dropped.
    epoch: u64,
    capture_open: bool,
    open_channel: Option<OpenChannel>,
    channel_healthy: bool,
    unacknowledged: bool,
    last_error: Option<SessionErrorInfo>,
    job: Option<Job>,

    pending_stop: Option<oneshot::Sender<Result<(), SessionError>>>,
    pending_save: Option<oneshot::Sender<Result<Job, SessionError>>>,

    events_tx: mpsc::Sender<Event>,
}

impl LiveSessionController {
    /// Spawn the controller task and return a handle to it.
    pub fn spawn(config: SessionConfig, deps: SessionDeps) -> SessionHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, event_rx) = mpsc::channel(256);
        let session_id = config.session_id.clone();

        let controller = Self {
            config,
            capture: deps.capture,
            channel: deps.channel,
            finalizer: deps.finalizer,
            state: SessionState::Idle,
            started_at: None,
            buffer: SliceBuffer::new(),
            reconciler: TranscriptReconciler::new(),
            epoch: 0,
            capture_open: false,
            open_channel: None,
            channel_healthy: false,
            unacknowledged: false,
            last_error: None,
            job: None,
            pending_stop: None,
            pending_save: None,
            events_tx: event_tx,
        };

        tokio::spawn(controller.run(cmd_rx, event_rx));

        SessionHandle {
            session_id,
            commands: cmd_tx,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut events: mpsc::Receiver<Event>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        // Every handle is gone; release resources and stop.
                        self.teardown().await;
                        break;
                    }
                },
                Some(event) = events.recv() => self.handle_event(event).await,
            }
        }
        info!("session {} controller stopped", self.config.session_id);
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start(reply) => {
                let result = if self.state == SessionState::Idle {
                    self.do_start().await
                } else {
                    // A second start must never interleave with an
                    // in-progress session.
                    Err(SessionError::InvalidTransition {
                        state: self.state.name(),
                        command: "start",
                    })
                };
                let _ = reply.send(result);
            }
            Command::Stop(reply) => match self.state {
                SessionState::Streaming => self.begin_stop(Some(reply)).await,
                SessionState::Stopping | SessionState::AwaitingDecision => {
                    warn!(
                        "session {}: stop while already {}",
                        self.config.session_id, self.state
                    );
                    let _ = reply.send(Ok(()));
                }
                _ => {
                    let _ = reply.send(Err(SessionError::InvalidTransition {
                        state: self.state.name(),
                        command: "stop",
                    }));
                }
            },
            Command::Save(reply) => self.handle_save(reply),
            Command::Discard(reply) => {
                self.send_control_best_effort(ControlFrame::Discard);
                self.teardown().await;
                self.clear_session("discard");
                let _ = reply.send(Ok(()));
            }
            Command::Reset(reply) => {
                self.teardown().await;
                self.clear_session("reset");
                let _ = reply.send(());
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Transcript(reply) => {
                let _ = reply.send(LiveTranscript {
                    committed: self.reconciler.committed(),
                    pending_partial: self.reconciler.pending_partial().map(str::to_string),
                    rendered: self.reconciler.rendered(),
                });
            }
        }
    }

    async fn do_start(&mut self) -> Result<(), SessionError> {
        self.state = SessionState::Connecting;
        self.started_at = Some(Utc::now());
        info!("session {} connecting", self.config.session_id);

        // Open the channel and the capture device concurrently; streaming
        // begins only when both are ready.
        let channel = Arc::clone(&self.channel);
        let config = self.config.clone();
        let connect = async move { connect_with_retry(channel.as_ref(), &config).await };
        let capture_config = self.config.capture_config();

        let (channel_result, capture_result) =
            tokio::join!(connect, self.capture.open(&capture_config));

        match (channel_result, capture_result) {
            (Ok(mut open), Ok(slices)) => {
                self.capture_open = true;
                self.channel_healthy = true;
                if let Some(events) = open.take_events() {
                    self.spawn_channel_pump(events);
                }
                self.open_channel = Some(open);
                self.spawn_capture_pump(slices);
                self.state = SessionState::Streaming;
                info!("session {} streaming", self.config.session_id);
                Ok(())
            }
            (Ok(mut open), Err(device_error)) => {
                open.close();
                let error = SessionError::Device(device_error);
                self.fail(&error);
                Err(error)
            }
            (Err(channel_error), Ok(_slices)) => {
                // Receiver drops here; close releases the device.
                self.capture_open = true;
                self.close_capture().await;
                let error = SessionError::Channel(channel_error);
                self.fail(&error);
                Err(error)
            }
            (Err(_), Err(device_error)) => {
                // Both failed; the device denial is the user-actionable
                // cause.
                let error = SessionError::Device(device_error);
                self.fail(&error);
                Err(error)
            }
        }
    }

    async fn begin_stop(&mut self, reply: Option<oneshot::Sender<Result<(), SessionError>>>) {
        self.state = SessionState::Stopping;
        self.pending_stop = reply;
        info!("session {} stopping", self.config.session_id);

        // Capture closes immediately: no new slices. Slices still sitting
        // in the event queue were captured before this point and are kept.
        self.close_capture().await;

        if self.channel_healthy && self.open_channel.is_some() {
            // Every captured slice was already enqueued in order; the
            // stop frame queues behind them on the same ordered outbound.
            self.send_control_best_effort(ControlFrame::Stop);
            let events_tx = self.events_tx.clone();
            let epoch = self.epoch;
            let deadline = self.config.stop_ack_timeout;
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                let _ = events_tx.send(Event::StopDeadline { epoch }).await;
            });
        } else {
            // No channel to acknowledge the stop; the decision must not
            // block on backend latency.
            self.unacknowledged = true;
            self.enter_awaiting();
        }
    }

    fn handle_save(&mut self, reply: oneshot::Sender<Result<Job, SessionError>>) {
        let allowed = match self.state {
            SessionState::AwaitingDecision => true,
            SessionState::Error => {
                // A failed save may be retried from Error while the
                // buffer survived; a too-short recording cannot be cured
                // by retrying.
                !self.buffer.is_empty()
                    && self
                        .last_error
                        .as_ref()
                        .map(|e| e.save_retryable)
                        .unwrap_or(false)
            }
            _ => false,
        };
        if !allowed {
            let _ = reply.send(Err(SessionError::InvalidTransition {
                state: self.state.name(),
                command: "save",
            }));
            return;
        }

        if let Err(validation) = self.validate_save() {
            let error = SessionError::Validation(validation);
            self.fail(&error);
            let _ = reply.send(Err(error));
            return;
        }

        let audio_wav = match self.buffer.assemble_wav() {
            Ok(wav) => wav,
            Err(e) => {
                let error = SessionError::Internal(format!("buffer assembly failed: {e}"));
                self.fail(&error);
                let _ = reply.send(Err(error));
                return;
            }
        };

        // The live channel's job is done: notify it best-effort and close.
        self.send_control_best_effort(ControlFrame::Save);
        self.close_channel();

        self.state = SessionState::Finalizing;
        self.pending_save = Some(reply);
        info!(
            "session {} finalizing: {}ms of audio, {} slices",
            self.config.session_id,
            self.buffer.duration_ms(),
            self.buffer.len()
        );

        let hint = self.reconciler.rendered();
        let request = FinalizeRequest {
            session_id: self.config.session_id.clone(),
            audio_wav,
            live_transcript_hint: (!hint.trim().is_empty()).then_some(hint),
        };

        let finalizer = Arc::clone(&self.finalizer);
        let timeout = self.config.finalize_timeout;
        let events_tx = self.events_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, finalizer.finalize(request)).await
            {
                Ok(result) => result,
                Err(_) => Err(FinalizeError::TimedOut {
                    timeout_secs: timeout.as_secs(),
                }),
            };
            let _ = events_tx.send(Event::FinalizeDone { epoch, result }).await;
        });
    }

    fn validate_save(&self) -> Result<(), ValidationError> {
        let captured_ms = self.buffer.duration_ms();
        if captured_ms < self.config.min_audio_ms
            || self.buffer.total_bytes() < self.config.min_audio_bytes
        {
            return Err(ValidationError::TooShort {
                captured_ms,
                min_ms: self.config.min_audio_ms,
            });
        }

        let chars = self.reconciler.rendered().trim().chars().count();
        if chars < self.config.min_transcript_chars {
            return Err(ValidationError::NoSpeech {
                chars,
                min_chars: self.config.min_transcript_chars,
            });
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Slice { epoch, slice } if epoch == self.epoch => self.on_slice(slice),
            Event::CaptureEnded { epoch } if epoch == self.epoch => {
                self.on_capture_ended().await
            }
            Event::Server { epoch, event } if epoch == self.epoch => {
                self.on_server_event(event)
            }
            Event::ChannelGone { epoch } if epoch == self.epoch => {
                self.on_channel_gone("server event stream ended")
            }
            Event::StopDeadline { epoch } if epoch == self.epoch => self.on_stop_deadline(),
            Event::FinalizeDone { epoch, result } if epoch == self.epoch => {
                self.on_finalize_done(result)
            }
            // Stamped with an older epoch: a previous generation's task.
            _ => {}
        }
    }

    fn on_slice(&mut self, slice: AudioSlice) {
        match self.state {
            SessionState::Streaming => {
                let forward = slice.clone();
                if let Err(e) = self.buffer.push(slice) {
                    warn!(
                        "session {}: dropping malformed slice: {e}",
                        self.config.session_id
                    );
                    return;
                }
                // Buffer first, then preview: the local buffer is
                // authoritative, the channel is best-effort.
                let mut send_failed = false;
                if self.channel_healthy {
                    if let Some(open) = &self.open_channel {
                        send_failed = open.outbound().send(Outbound::Audio(forward)).is_err();
                    }
                }
                if send_failed {
                    self.on_channel_gone("outbound queue closed");
                }
            }
            SessionState::Stopping => {
                // Slices already in flight when stop landed; keep them,
                // but the stop frame is already queued so they are not
                // forwarded.
                if let Err(e) = self.buffer.push(slice) {
                    warn!(
                        "session {}: dropping malformed slice: {e}",
                        self.config.session_id
                    );
                }
            }
            _ => {}
        }
    }

    async fn on_capture_ended(&mut self) {
        if self.state == SessionState::Streaming {
            // Finite sources (files) end on their own; treat it as stop.
            info!(
                "session {}: capture source ended",
                self.config.session_id
            );
            self.begin_stop(None).await;
        }
    }

    fn on_server_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Transcript(transcript) => {
                if matches!(
                    self.state,
                    SessionState::Streaming | SessionState::Stopping
                ) {
                    self.reconciler.apply(&transcript);
                }
            }
            ServerEvent::Completed { job: None } => {
                if self.state == SessionState::Stopping {
                    info!("session {}: stop acknowledged", self.config.session_id);
                    self.enter_awaiting();
                }
            }
            ServerEvent::Completed { job: Some(_) } => {
                // Channel-side finalization is not used here; saving goes
                // through the submission path.
                warn!(
                    "session {}: ignoring unsolicited completed-with-job frame",
                    self.config.session_id
                );
            }
            ServerEvent::Backend { code, message } => {
                // The transport is still up; the preview may be degraded
                // but the local buffer is unaffected.
                warn!(
                    "session {}: backend error {code:?}: {message}",
                    self.config.session_id
                );
            }
            ServerEvent::Dropped { reason } => self.on_channel_gone(&reason),
        }
    }

    fn on_channel_gone(&mut self, reason: &str) {
        if !self.channel_healthy && self.open_channel.is_none() {
            return;
        }
        self.close_channel();

        match self.state {
            SessionState::Streaming => {
                // Degraded, not fatal: capture keeps buffering locally and
                // a later save still has everything it needs.
                warn!(
                    "session {}: channel dropped ({reason}); buffering locally",
                    self.config.session_id
                );
            }
            SessionState::Stopping => {
                warn!(
                    "session {}: channel dropped while stopping ({reason})",
                    self.config.session_id
                );
                self.unacknowledged = true;
                self.enter_awaiting();
            }
            _ => {}
        }
    }

    fn on_stop_deadline(&mut self) {
        if self.state == SessionState::Stopping {
            warn!(
                "session {}: stop not acknowledged within {:?}",
                self.config.session_id, self.config.stop_ack_timeout
            );
            self.unacknowledged = true;
            self.enter_awaiting();
        }
    }

    fn on_finalize_done(&mut self, result: Result<Job, FinalizeError>) {
        if self.state != SessionState::Finalizing {
            return;
        }
        match result {
            Ok(job) => {
                info!(
                    "session {}: finalized as job {}",
                    self.config.session_id, job.job_id
                );
                self.state = SessionState::Complete;
                self.job = Some(job.clone());
                if let Some(reply) = self.pending_save.take() {
                    let _ = reply.send(Ok(job));
                }
            }
            Err(finalize_error) => {
                // The raw buffer stays; the caller may retry the save
                // without re-recording.
                let error = SessionError::Finalize(finalize_error);
                self.fail(&error);
                if let Some(reply) = self.pending_save.take() {
                    let _ = reply.send(Err(error));
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Shared transitions
    // ------------------------------------------------------------------

    fn enter_awaiting(&mut self) {
        self.state = SessionState::AwaitingDecision;
        if let Some(reply) = self.pending_stop.take() {
            let _ = reply.send(Ok(()));
        }
    }

    fn fail(&mut self, error: &SessionError) {
        warn!("session {} error: {error}", self.config.session_id);
        self.state = SessionState::Error;
        self.last_error = Some(SessionErrorInfo {
            kind: error.kind().to_string(),
            message: error.to_string(),
            save_retryable: error.save_retryable(),
        });
    }

    /// Release device and channel. Bumps the epoch so in-flight events
    /// from this generation's tasks are dropped.
    async fn teardown(&mut self) {
        self.epoch += 1;
        self.close_capture().await;
        self.close_channel();
        if let Some(reply) = self.pending_stop.take() {
            let _ = reply.send(Ok(()));
        }
        if let Some(reply) = self.pending_save.take() {
            let _ = reply.send(Err(SessionError::Cancelled("teardown")));
        }
    }

    fn clear_session(&mut self, cause: &'static str) {
        info!("session {} cleared by {cause}", self.config.session_id);
        self.state = SessionState::Idle;
        self.started_at = None;
        self.buffer.clear();
        self.reconciler.clear();
        self.unacknowledged = false;
        self.last_error = None;
        self.job = None;
    }

    async fn close_capture(&mut self) {
        if !self.capture_open {
            return;
        }
        self.capture_open = false;
        if let Err(e) = self.capture.close().await {
            warn!(
                "session {}: capture close failed: {e}",
                self.config.session_id
            );
        }
    }

    fn close_channel(&mut self) {
        self.channel_healthy = false;
        if let Some(mut open) = self.open_channel.take() {
            open.close();
        }
    }

    fn send_control_best_effort(&mut self, frame: ControlFrame) {
        if let Some(open) = &self.open_channel {
            if open.outbound().send(Outbound::Control(frame)).is_err() {
                self.channel_healthy = false;
            }
        }
    }

    fn spawn_capture_pump(&self, mut slices: mpsc::Receiver<AudioSlice>) {
        let events_tx = self.events_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            while let Some(slice) = slices.recv().await {
                if events_tx.send(Event::Slice { epoch, slice }).await.is_err() {
                    return;
                }
            }
            let _ = events_tx.send(Event::CaptureEnded { epoch }).await;
        });
    }

    fn spawn_channel_pump(&self, mut events: mpsc::Receiver<ServerEvent>) {
        let events_tx = self.events_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if events_tx
                    .send(Event::Server { epoch, event })
                    .await
                    .is_err()
                {
                    return;
                }
            }
            let _ = events_tx.send(Event::ChannelGone { epoch }).await;
        });
    }

    fn snapshot(&self) -> SessionSnapshot {
        let rendered = self.reconciler.rendered();
        SessionSnapshot {
            session_id: self.config.session_id.clone(),
            state: self.state,
            started_at: self.started_at,
            slices_captured: self.buffer.len(),
            captured_ms: self.buffer.duration_ms(),
            captured_bytes: self.buffer.total_bytes(),
            transcript_chars: rendered.trim().chars().count(),
            final_segments: self.reconciler.final_segments().len(),
            has_pending_partial: self.reconciler.pending_partial().is_some(),
            channel_healthy: self.channel_healthy,
            unacknowledged: self.unacknowledged,
            error: self.last_error.clone(),
            job_id: self.job.as_ref().map(|job| job.job_id.clone()),
        }
    }
}

/// The initial connect handshake is the only operation retried
/// automatically, and only once.
async fn connect_with_retry(
    channel: &dyn TranscriptionChannel,
    config: &SessionConfig,
) -> Result<OpenChannel, ChannelError> {
    match channel.connect(config).await {
        Ok(open) => Ok(open),
        Err(first) => {
            warn!(
                "session {}: connect failed ({first}), retrying once",
                config.session_id
            );
            channel.connect(config).await
        }
    }
}
