use crate::audio::slice::AudioSlice;
use crate::error::DeviceError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// Capture configuration for one session.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (16kHz default, what speech models expect)
    pub sample_rate_hz: u32,
    /// Number of channels (1 = mono)
    pub channels: u16,
    /// Duration of each emitted slice. Shorter slices reduce preview
    /// latency but fragment words at slice boundaries.
    pub slice_interval_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 16_000,
            channels: 1,
            slice_interval_ms: 1_000,
        }
    }
}

impl CaptureConfig {
    pub fn samples_per_slice(&self) -> usize {
        (self.sample_rate_hz as u64 * self.channels as u64 * self.slice_interval_ms / 1000)
            as usize
    }
}

/// Audio capture source trait
///
/// Implementations wrap a concrete audio origin (microphone device, WAV
/// file, scripted schedule). Opening may request OS permission and must
/// surface a denial as `DeviceError::PermissionDenied`, not a generic
/// failure. `close` is idempotent and safe to call when never opened.
#[async_trait::async_trait]
pub trait AudioCaptureSource: Send + Sync {
    /// Start capturing. Returns a channel receiver of encoded slices in
    /// sequence order. The receiver ends when the source is exhausted or
    /// closed.
    async fn open(
        &mut self,
        config: &CaptureConfig,
    ) -> Result<mpsc::Receiver<AudioSlice>, DeviceError>;

    /// Release the device. Idempotent.
    async fn close(&mut self) -> Result<(), DeviceError>;

    fn is_capturing(&self) -> bool;

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Declarative description of a capture source, accepted over the API.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    /// OS microphone device.
    Microphone,
    /// Replay a WAV file from disk at the configured slice interval.
    WavFile { path: String },
}

/// Capture source factory
pub struct SourceFactory;

impl SourceFactory {
    pub fn create(spec: &SourceSpec) -> Result<Box<dyn AudioCaptureSource>, DeviceError> {
        match spec {
            SourceSpec::Microphone => {
                // No OS device backend is linked into this build; the seam
                // is the trait, so a cpal- or platform-specific source can
                // slot in without touching the controller.
                Err(DeviceError::Unsupported(
                    "microphone capture requires a platform audio backend".to_string(),
                ))
            }
            SourceSpec::WavFile { path } => {
                let source = super::file::WavFileSource::new(path);
                Ok(Box::new(source))
            }
        }
    }
}

/// A capture source that replays a programmed schedule of PCM slices.
///
/// Used by tests and demos. Behaves like a microphone: after the schedule
/// is exhausted the stream stays open (silent) until closed, and `open`
/// can be scripted to fail the way a denied device would.
pub struct ScriptedSource {
    schedule: Vec<Vec<i16>>,
    pace: Option<Duration>,
    fail_open: Option<DeviceError>,
    /// When set, the stream ends after the schedule instead of idling.
    end_after_schedule: bool,
    capturing: Arc<AtomicBool>,
    close_calls: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(schedule: Vec<Vec<i16>>) -> Self {
        Self {
            schedule,
            pace: None,
            fail_open: None,
            end_after_schedule: false,
            capturing: Arc::new(AtomicBool::new(false)),
            close_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Emit slices spaced by `interval` instead of all at once.
    pub fn paced(mut self, interval: Duration) -> Self {
        self.pace = Some(interval);
        self
    }

    /// Make `open` fail with the given device error.
    pub fn failing(mut self, error: DeviceError) -> Self {
        self.fail_open = Some(error);
        self
    }

    /// End the slice stream once the schedule is exhausted (file-like)
    /// instead of idling open (microphone-like).
    pub fn finite(mut self) -> Self {
        self.end_after_schedule = true;
        self
    }

    /// Counter of `close` invocations, shared with the emitting task.
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.close_calls)
    }
}

#[async_trait::async_trait]
impl AudioCaptureSource for ScriptedSource {
    async fn open(
        &mut self,
        config: &CaptureConfig,
    ) -> Result<mpsc::Receiver<AudioSlice>, DeviceError> {
        if let Some(error) = self.fail_open.take() {
            return Err(error);
        }

        let (tx, rx) = mpsc::channel(64);
        let schedule = self.schedule.clone();
        let pace = self.pace;
        let end_after_schedule = self.end_after_schedule;
        let capturing = Arc::clone(&self.capturing);
        let sample_rate = config.sample_rate_hz;
        let channels = config.channels;

        capturing.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            for (sequence, samples) in schedule.into_iter().enumerate() {
                if !capturing.load(Ordering::SeqCst) {
                    return;
                }
                if let Some(interval) = pace {
                    tokio::time::sleep(interval).await;
                }
                let slice = match AudioSlice::from_pcm16(
                    sequence as u64,
                    &samples,
                    sample_rate,
                    channels,
                ) {
                    Ok(slice) => slice,
                    Err(_) => return,
                };
                if tx.send(slice).await.is_err() {
                    return;
                }
            }

            if end_after_schedule {
                return;
            }

            // Schedule exhausted: hold the stream open like an idle
            // microphone until the source is closed.
            while capturing.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        });

        Ok(rx)
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.capturing.swap(false, Ordering::SeqCst) {
            info!("scripted capture source closed");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
