use crate::audio::slice::AudioSlice;
use crate::audio::source::{AudioCaptureSource, CaptureConfig};
use crate::error::DeviceError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Capture source backed by a WAV file on disk.
///
/// Slices the file's samples at the configured interval, emitting them as
/// the same encoded slices a live device would. This is the upload flow's
/// degenerate case and the batch/testing path. The stream ends when the
/// file is exhausted.
pub struct WavFileSource {
    path: PathBuf,
    capturing: Arc<AtomicBool>,
}

impl WavFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            capturing: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait::async_trait]
impl AudioCaptureSource for WavFileSource {
    async fn open(
        &mut self,
        config: &CaptureConfig,
    ) -> Result<mpsc::Receiver<AudioSlice>, DeviceError> {
        let reader = hound::WavReader::open(&self.path).map_err(|e| match e {
            hound::Error::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                DeviceError::NoDevice
            }
            other => DeviceError::Failed(other.to_string()),
        })?;

        let spec = reader.spec();
        if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
            return Err(DeviceError::Failed(format!(
                "unsupported WAV format: {} bits {:?}",
                spec.bits_per_sample, spec.sample_format
            )));
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DeviceError::Failed(e.to_string()))?;

        let duration_secs =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);
        info!(
            "WAV source opened: {} ({:.1}s, {}Hz, {} channels)",
            self.path.display(),
            duration_secs,
            spec.sample_rate,
            spec.channels
        );

        // Slice size follows the file's own spec; the backend resamples.
        let samples_per_slice = (spec.sample_rate as u64
            * spec.channels as u64
            * config.slice_interval_ms
            / 1000) as usize;
        if samples_per_slice == 0 {
            return Err(DeviceError::Failed(
                "slice interval too small for file sample rate".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(64);
        let capturing = Arc::clone(&self.capturing);
        capturing.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            for (sequence, chunk) in samples.chunks(samples_per_slice).enumerate() {
                if !capturing.load(Ordering::SeqCst) {
                    break;
                }
                let slice = match AudioSlice::from_pcm16(
                    sequence as u64,
                    chunk,
                    spec.sample_rate,
                    spec.channels,
                ) {
                    Ok(slice) => slice,
                    Err(_) => break,
                };
                if tx.send(slice).await.is_err() {
                    break;
                }
            }
            capturing.store(false, Ordering::SeqCst);
        });

        Ok(rx)
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        self.capturing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}
