use chrono::{DateTime, Utc};
use std::io::Cursor;
use thiserror::Error;

/// Encoding of a slice's payload. Every slice in one session must use the
/// same codec; switching encoders mid-session breaks concatenation on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceCodec {
    /// WAV container around 16-bit little-endian PCM.
    WavPcm16,
}

/// One capture-interval's worth of encoded audio.
///
/// Slices are immutable after creation. The payload is a self-contained
/// blob (not bare PCM) so each slice is decodable on its own end-to-end.
#[derive(Debug, Clone)]
pub struct AudioSlice {
    /// Monotonic sequence number, starting at 0 for each session.
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub codec: SliceCodec,
    pub data: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum SliceError {
    #[error("slice {got} arrived out of order, expected sequence {expected}")]
    OutOfOrder { expected: u64, got: u64 },

    #[error("codec changed mid-session: buffer holds {buffered:?}, slice is {got:?}")]
    CodecMismatch { buffered: SliceCodec, got: SliceCodec },

    #[error("sample rate changed mid-session: buffer holds {buffered}Hz, slice is {got}Hz")]
    RateMismatch { buffered: u32, got: u32 },

    #[error("undecodable slice payload: {0}")]
    Malformed(String),

    #[error("cannot assemble an empty buffer")]
    Empty,
}

impl AudioSlice {
    /// Encode PCM16 samples into a self-contained WAV slice.
    pub fn from_pcm16(
        sequence: u64,
        samples: &[i16],
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self, SliceError> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| SliceError::Malformed(e.to_string()))?;
            for &sample in samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| SliceError::Malformed(e.to_string()))?;
            }
            writer
                .finalize()
                .map_err(|e| SliceError::Malformed(e.to_string()))?;
        }

        Ok(Self {
            sequence,
            captured_at: Utc::now(),
            codec: SliceCodec::WavPcm16,
            data: cursor.into_inner(),
        })
    }

    /// Decode the payload back into interleaved PCM16 samples plus its spec.
    pub fn decode(&self) -> Result<DecodedSlice, SliceError> {
        let reader = hound::WavReader::new(Cursor::new(&self.data))
            .map_err(|e| SliceError::Malformed(e.to_string()))?;
        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SliceError::Malformed(e.to_string()))?;

        Ok(DecodedSlice {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

/// Decoded payload of a single slice.
#[derive(Debug)]
pub struct DecodedSlice {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl DecodedSlice {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let frames = self.samples.len() as u64 / self.channels as u64;
        frames * 1000 / self.sample_rate as u64
    }
}

/// Ordered, append-only buffer of every slice captured in one session.
///
/// This buffer is the authoritative copy of the recording: the channel only
/// feeds the live preview, so its content must be independent of network
/// state. Slices are validated (decodable, in sequence, one codec, one
/// sample rate) at append time.
#[derive(Debug, Default)]
pub struct SliceBuffer {
    slices: Vec<AudioSlice>,
    codec: Option<SliceCodec>,
    sample_rate: Option<u32>,
    channels: Option<u16>,
    total_payload_bytes: usize,
    total_duration_ms: u64,
}

impl SliceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, slice: AudioSlice) -> Result<(), SliceError> {
        let expected = self.slices.len() as u64;
        if slice.sequence != expected {
            return Err(SliceError::OutOfOrder {
                expected,
                got: slice.sequence,
            });
        }

        if let Some(codec) = self.codec {
            if codec != slice.codec {
                return Err(SliceError::CodecMismatch {
                    buffered: codec,
                    got: slice.codec,
                });
            }
        }

        let decoded = slice.decode()?;
        if let Some(rate) = self.sample_rate {
            if rate != decoded.sample_rate {
                return Err(SliceError::RateMismatch {
                    buffered: rate,
                    got: decoded.sample_rate,
                });
            }
        }

        self.codec = Some(slice.codec);
        self.sample_rate = Some(decoded.sample_rate);
        self.channels = Some(decoded.channels);
        self.total_payload_bytes += slice.data.len();
        self.total_duration_ms += decoded.duration_ms();
        self.slices.push(slice);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn slices(&self) -> &[AudioSlice] {
        &self.slices
    }

    /// Total size of buffered payloads in bytes.
    pub fn total_bytes(&self) -> usize {
        self.total_payload_bytes
    }

    /// Total captured audio duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.total_duration_ms
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Assemble the full recording: the ordered concatenation of every
    /// buffered slice's PCM, re-encoded as one WAV payload.
    pub fn assemble_wav(&self) -> Result<Vec<u8>, SliceError> {
        let (sample_rate, channels) = match (self.sample_rate, self.channels) {
            (Some(rate), Some(ch)) => (rate, ch),
            _ => return Err(SliceError::Empty),
        };

        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| SliceError::Malformed(e.to_string()))?;
            for slice in &self.slices {
                let decoded = slice.decode()?;
                for sample in decoded.samples {
                    writer
                        .write_sample(sample)
                        .map_err(|e| SliceError::Malformed(e.to_string()))?;
                }
            }
            writer
                .finalize()
                .map_err(|e| SliceError::Malformed(e.to_string()))?;
        }

        Ok(cursor.into_inner())
    }
}
