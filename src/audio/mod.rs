pub mod file;
pub mod slice;
pub mod source;

pub use file::WavFileSource;
pub use slice::{AudioSlice, DecodedSlice, SliceBuffer, SliceCodec, SliceError};
pub use source::{AudioCaptureSource, CaptureConfig, ScriptedSource, SourceFactory, SourceSpec};
