//! Duplex session channel to the transcription backend.
//!
//! The channel is a thin transport: it moves binary audio slices and small
//! control frames in send order and delivers typed server events back. All
//! semantic state (buffers, transcript, lifecycle) lives in the session
//! controller.

pub mod messages;
pub mod nats;

pub use messages::{
    BackendErrorMessage, CompletedMessage, ControlFrame, ErrorCode, ServerFrame,
    TranscriptEvent, TranscriptMessage,
};
pub use nats::NatsChannel;

use crate::audio::AudioSlice;
use crate::error::ChannelError;
use crate::session::SessionConfig;
use tokio::sync::{mpsc, oneshot};

/// One outbound unit. Audio and control share a single ordered queue so a
/// `stop` enqueued after slice N reaches the backend after slice N.
#[derive(Debug)]
pub enum Outbound {
    Audio(AudioSlice),
    Control(ControlFrame),
}

/// Typed events delivered to the controller.
#[derive(Debug)]
pub enum ServerEvent {
    Transcript(TranscriptEvent),
    Completed { job: Option<crate::jobs::Job> },
    /// A structured error frame from the backend. The transport is still
    /// up; the live preview may be degraded.
    Backend { code: ErrorCode, message: String },
    /// The connection was lost mid-session. Distinct from `Backend` so the
    /// controller can keep the local buffer and let the user retry save.
    Dropped { reason: String },
}

/// A connected session channel: an ordered outbound sender, a typed event
/// receiver, and a close signal for the transport's internal tasks.
pub struct OpenChannel {
    outbound: mpsc::UnboundedSender<Outbound>,
    events: Option<mpsc::Receiver<ServerEvent>>,
    closer: Option<oneshot::Sender<()>>,
}

impl OpenChannel {
    pub fn new(
        outbound: mpsc::UnboundedSender<Outbound>,
        events: mpsc::Receiver<ServerEvent>,
        closer: oneshot::Sender<()>,
    ) -> Self {
        Self {
            outbound,
            events: Some(events),
            closer: Some(closer),
        }
    }

    pub fn outbound(&self) -> &mpsc::UnboundedSender<Outbound> {
        &self.outbound
    }

    /// Take the event receiver. The controller hands it to its event pump;
    /// subsequent calls return `None`.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<ServerEvent>> {
        self.events.take()
    }

    /// Signal the transport to shut down. Idempotent.
    pub fn close(&mut self) {
        if let Some(closer) = self.closer.take() {
            let _ = closer.send(());
        }
    }
}

impl Drop for OpenChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Connector for transcription session channels.
///
/// `connect` performs the config handshake and only returns once the
/// backend acknowledged it; a refused or unacknowledged handshake is a
/// `ChannelError`. The controller retries the handshake once.
#[async_trait::async_trait]
pub trait TranscriptionChannel: Send + Sync {
    async fn connect(&self, config: &SessionConfig) -> Result<OpenChannel, ChannelError>;
}
