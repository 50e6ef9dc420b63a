//! Text-to-speech module using sherpa-rs.
//!
//! Provides speech synthesis using the Kokoro model, behind a speaker with
//! flush-on-speak semantics.

mod speaker;
mod synthesizer;

pub use speaker::Speaker;
