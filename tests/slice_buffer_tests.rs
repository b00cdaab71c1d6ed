// Unit tests for the authoritative slice buffer.
//
// The buffer must hold exactly the captured slices in sequence order, and
// its assembled WAV must be their PCM concatenation.

use anyhow::Result;
use std::io::Cursor;
use stepvoice::audio::{AudioSlice, SliceBuffer, SliceError};

fn slice(sequence: u64, samples: &[i16]) -> AudioSlice {
    AudioSlice::from_pcm16(sequence, samples, 16_000, 1).expect("encodable slice")
}

#[test]
fn buffer_preserves_order_and_content() -> Result<()> {
    let mut buffer = SliceBuffer::new();

    let first: Vec<i16> = vec![10; 1600];
    let second: Vec<i16> = vec![20; 1600];
    let third: Vec<i16> = vec![30; 1600];

    buffer.push(slice(0, &first))?;
    buffer.push(slice(1, &second))?;
    buffer.push(slice(2, &third))?;

    assert_eq!(buffer.len(), 3);
    // 1600 samples at 16kHz mono = 100ms per slice
    assert_eq!(buffer.duration_ms(), 300);
    assert!(buffer.total_bytes() > 0);

    let wav = buffer.assemble_wav()?;
    let reader = hound::WavReader::new(Cursor::new(&wav))?;
    assert_eq!(reader.spec().sample_rate, 16_000);
    assert_eq!(reader.spec().channels, 1);

    let samples: Vec<i16> = reader.into_samples::<i16>().collect::<Result<_, _>>()?;
    let mut expected = first;
    expected.extend(second);
    expected.extend(third);
    assert_eq!(samples, expected);

    Ok(())
}

#[test]
fn out_of_order_slice_is_rejected() {
    let mut buffer = SliceBuffer::new();
    buffer.push(slice(0, &[1; 160])).unwrap();

    let result = buffer.push(slice(2, &[2; 160]));
    assert!(matches!(
        result,
        Err(SliceError::OutOfOrder {
            expected: 1,
            got: 2
        })
    ));

    // The buffer is unchanged by the rejection.
    assert_eq!(buffer.len(), 1);
}

#[test]
fn sample_rate_change_is_rejected() {
    let mut buffer = SliceBuffer::new();
    buffer.push(slice(0, &[1; 160])).unwrap();

    let other_rate = AudioSlice::from_pcm16(1, &[2; 160], 48_000, 1).unwrap();
    let result = buffer.push(other_rate);
    assert!(matches!(result, Err(SliceError::RateMismatch { .. })));
}

#[test]
fn assembling_an_empty_buffer_fails() {
    let buffer = SliceBuffer::new();
    assert!(matches!(buffer.assemble_wav(), Err(SliceError::Empty)));
}

#[test]
fn clear_resets_accounting() -> Result<()> {
    let mut buffer = SliceBuffer::new();
    buffer.push(slice(0, &[5; 1600]))?;
    assert_eq!(buffer.duration_ms(), 100);

    buffer.clear();

    assert!(buffer.is_empty());
    assert_eq!(buffer.duration_ms(), 0);
    assert_eq!(buffer.total_bytes(), 0);

    // A fresh sequence starts at 0 again.
    buffer.push(slice(0, &[6; 1600]))?;
    assert_eq!(buffer.len(), 1);

    Ok(())
}

#[test]
fn malformed_payload_is_rejected() {
    let mut buffer = SliceBuffer::new();
    let bogus = AudioSlice {
        sequence: 0,
        captured_at: chrono::Utc::now(),
        codec: stepvoice::audio::SliceCodec::WavPcm16,
        data: vec![0xde, 0xad, 0xbe, 0xef],
    };
    assert!(matches!(
        buffer.push(bogus),
        Err(SliceError::Malformed(_))
    ));
}
