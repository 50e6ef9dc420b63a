//! Speech-to-text module using sherpa-rs.
//!
//! Provides voice activity detection and Whisper transcription behind a
//! single-utterance recognition session.

mod recognizer;

pub use recognizer::{Recognizer, SessionError, SessionEvent};
