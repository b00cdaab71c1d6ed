// Tests for capture sources: WAV-file replay and factory gating.

use anyhow::Result;
use stepvoice::audio::{
    AudioCaptureSource, CaptureConfig, SliceBuffer, SourceFactory, SourceSpec, WavFileSource,
};
use stepvoice::error::DeviceError;
use tempfile::TempDir;

fn write_wav(dir: &TempDir, name: &str, samples: &[i16]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).expect("create wav");
    for &sample in samples {
        writer.write_sample(sample).expect("write sample");
    }
    writer.finalize().expect("finalize wav");
    path
}

#[tokio::test]
async fn wav_file_source_slices_at_the_configured_interval() -> Result<()> {
    let dir = TempDir::new()?;
    // 350ms of audio at 16kHz mono
    let samples: Vec<i16> = (0..5600).map(|i| (i % 100) as i16).collect();
    let path = write_wav(&dir, "fixture.wav", &samples);

    let mut source = WavFileSource::new(&path);
    let config = CaptureConfig {
        sample_rate_hz: 16_000,
        channels: 1,
        slice_interval_ms: 100,
    };

    let mut rx = source.open(&config).await?;
    let mut buffer = SliceBuffer::new();
    while let Some(slice) = rx.recv().await {
        buffer.push(slice)?;
    }

    // 3 full 100ms slices plus a 50ms tail
    assert_eq!(buffer.len(), 4);
    assert_eq!(buffer.duration_ms(), 350);

    // The reassembled recording is the original file's PCM.
    let wav = buffer.assemble_wav()?;
    let reader = hound::WavReader::new(std::io::Cursor::new(&wav))?;
    let round_tripped: Vec<i16> = reader.into_samples::<i16>().collect::<Result<_, _>>()?;
    assert_eq!(round_tripped, samples);

    source.close().await?;
    Ok(())
}

#[tokio::test]
async fn missing_file_is_a_no_device_error() {
    let mut source = WavFileSource::new("/nonexistent/recording.wav");
    let config = CaptureConfig::default();

    let error = source.open(&config).await.expect_err("open must fail");
    assert_eq!(error, DeviceError::NoDevice);
}

#[tokio::test]
async fn close_is_idempotent_and_safe_when_never_opened() -> Result<()> {
    let mut source = WavFileSource::new("/nonexistent/recording.wav");
    source.close().await?;
    source.close().await?;
    assert!(!source.is_capturing());
    Ok(())
}

#[test]
fn factory_gates_the_microphone_backend() {
    let result = SourceFactory::create(&SourceSpec::Microphone);
    assert!(matches!(result, Err(DeviceError::Unsupported(_))));
}

#[test]
fn factory_builds_a_wav_file_source() {
    let source = SourceFactory::create(&SourceSpec::WavFile {
        path: "recordings/sample.wav".to_string(),
    })
    .expect("wav source");
    assert_eq!(source.name(), "wav-file");
}
