use super::messages::{
    BackendErrorMessage, CompletedMessage, ControlFrame, ServerFrame, TranscriptEvent,
    TranscriptMessage,
};
use super::{OpenChannel, Outbound, ServerEvent, TranscriptionChannel};
use crate::error::ChannelError;
use crate::session::SessionConfig;
use futures::stream::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// NATS-backed transcription channel.
///
/// Binary slice payloads go to `audio.slice.<sid>` as-is; control frames go
/// to `audio.control.<sid>` as JSON. Both are published from one task
/// draining one queue, which preserves send order. Transcript events come
/// from the STT service on `stt.text.>` (filtered by session id), completion
/// on `stt.done.<sid>` and structured errors on `stt.error.<sid>`.
pub struct NatsChannel {
    client: async_nats::Client,
}

impl NatsChannel {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }

    fn slice_subject(session_id: &str) -> String {
        format!("audio.slice.{session_id}")
    }

    fn control_subject(session_id: &str) -> String {
        format!("audio.control.{session_id}")
    }
}

#[async_trait::async_trait]
impl TranscriptionChannel for NatsChannel {
    async fn connect(&self, config: &SessionConfig) -> Result<OpenChannel, ChannelError> {
        let session_id = config.session_id.clone();
        let client = self.client.clone();

        // Subscribe before the handshake so no early event is lost.
        let transcripts = client
            .subscribe("stt.text.>")
            .await
            .map_err(|e| ChannelError::Refused(e.to_string()))?;
        let done = client
            .subscribe(format!("stt.done.{session_id}"))
            .await
            .map_err(|e| ChannelError::Refused(e.to_string()))?;
        let errors = client
            .subscribe(format!("stt.error.{session_id}"))
            .await
            .map_err(|e| ChannelError::Refused(e.to_string()))?;

        // Config handshake over request/reply on the control subject. The
        // session does not stream until the backend acknowledges.
        let handshake = ControlFrame::Config {
            sample_rate_hz: config.sample_rate_hz,
            channels: config.channel_count,
            slice_interval_ms: config.slice_interval_ms,
        };
        let payload = serde_json::to_vec(&handshake)
            .map_err(|e| ChannelError::Refused(e.to_string()))?;

        let reply = tokio::time::timeout(
            config.connect_timeout,
            client.request(Self::control_subject(&session_id), payload.into()),
        )
        .await
        .map_err(|_| ChannelError::HandshakeTimeout)?
        .map_err(|e| ChannelError::Refused(e.to_string()))?;

        match serde_json::from_slice::<ServerFrame>(&reply.payload) {
            Ok(ServerFrame::ConfigAck) => {}
            Ok(ServerFrame::Error { message, .. }) => {
                return Err(ChannelError::Refused(message));
            }
            Ok(other) => {
                return Err(ChannelError::Refused(format!(
                    "unexpected handshake reply: {other:?}"
                )));
            }
            Err(e) => {
                return Err(ChannelError::Refused(format!(
                    "unparseable handshake reply: {e}"
                )));
            }
        }

        info!("transcription channel ready: {session_id}");

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Outbound>();
        let (event_tx, event_rx) = mpsc::channel::<ServerEvent>(256);
        let (closer_tx, closer_rx) = oneshot::channel::<()>();

        tokio::spawn(send_task(
            client.clone(),
            session_id.clone(),
            outbound_rx,
            event_tx.clone(),
        ));
        tokio::spawn(recv_task(
            session_id,
            transcripts,
            done,
            errors,
            event_tx,
            closer_rx,
        ));

        Ok(OpenChannel::new(outbound_tx, event_rx, closer_tx))
    }
}

/// Drains the outbound queue into NATS. A publish failure is surfaced as a
/// `Dropped` event; the local slice buffer is unaffected by it.
async fn send_task(
    client: async_nats::Client,
    session_id: String,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::Sender<ServerEvent>,
) {
    let slice_subject = NatsChannel::slice_subject(&session_id);
    let control_subject = NatsChannel::control_subject(&session_id);

    while let Some(item) = outbound.recv().await {
        let result = match item {
            Outbound::Audio(slice) => {
                client
                    .publish(slice_subject.clone(), slice.data.into())
                    .await
            }
            Outbound::Control(frame) => {
                let payload = match serde_json::to_vec(&frame) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("failed to encode control frame: {e}");
                        continue;
                    }
                };
                client.publish(control_subject.clone(), payload.into()).await
            }
        };

        if let Err(e) = result {
            warn!("publish failed on {session_id}: {e}");
            let _ = events
                .send(ServerEvent::Dropped {
                    reason: e.to_string(),
                })
                .await;
            return;
        }
    }

    // Outbound sender dropped: session side is done with the channel.
    if let Err(e) = client.flush().await {
        warn!("flush on channel close failed: {e}");
    }
}

/// Forwards backend messages to the controller as typed events. Malformed
/// frames are logged and skipped; they never take the session down.
async fn recv_task(
    session_id: String,
    mut transcripts: async_nats::Subscriber,
    mut done: async_nats::Subscriber,
    mut errors: async_nats::Subscriber,
    events: mpsc::Sender<ServerEvent>,
    mut closer: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut closer => {
                break;
            }
            msg = transcripts.next() => {
                let Some(msg) = msg else {
                    let _ = events.send(ServerEvent::Dropped {
                        reason: "transcript subscription ended".to_string(),
                    }).await;
                    break;
                };
                match serde_json::from_slice::<TranscriptMessage>(&msg.payload) {
                    Ok(message) => {
                        if message.session_id != session_id {
                            continue;
                        }
                        let event = ServerEvent::Transcript(TranscriptEvent {
                            slice_index: message.slice_index,
                            text: message.text,
                            is_final: message.is_final,
                        });
                        if events.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("unparseable transcript message: {e}");
                    }
                }
            }
            msg = done.next() => {
                let Some(msg) = msg else {
                    let _ = events.send(ServerEvent::Dropped {
                        reason: "completion subscription ended".to_string(),
                    }).await;
                    break;
                };
                match serde_json::from_slice::<CompletedMessage>(&msg.payload) {
                    Ok(message) => {
                        if events.send(ServerEvent::Completed { job: message.job }).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("unparseable completion message: {e}");
                    }
                }
            }
            msg = errors.next() => {
                let Some(msg) = msg else {
                    let _ = events.send(ServerEvent::Dropped {
                        reason: "error subscription ended".to_string(),
                    }).await;
                    break;
                };
                match serde_json::from_slice::<BackendErrorMessage>(&msg.payload) {
                    Ok(message) => {
                        let event = ServerEvent::Backend {
                            code: message.code,
                            message: message.message,
                        };
                        if events.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("unparseable backend error message: {e}");
                    }
                }
            }
        }
    }

    // Dropping the subscribers unsubscribes them.
    info!("transcription channel closed: {session_id}");
}
