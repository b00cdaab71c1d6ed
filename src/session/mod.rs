//! Live recording session management
//!
//! This module provides the session state machine that ties audio capture
//! to the transcription channel:
//! - Session lifecycle (idle → connecting → streaming → stopping →
//!   awaiting-decision → finalizing → complete/error)
//! - Authoritative local buffering of every captured slice
//! - Reconciliation of partial/final transcript events into the live
//!   preview transcript
//! - The terminal save/discard decision and finalization hand-off

mod config;
mod controller;
mod snapshot;
mod state;
mod transcript;

pub use config::SessionConfig;
pub use controller::{LiveSessionController, SessionDeps, SessionHandle};
pub use snapshot::{LiveTranscript, SessionErrorInfo, SessionSnapshot};
pub use state::SessionState;
pub use transcript::{FinalSegment, TranscriptReconciler};
