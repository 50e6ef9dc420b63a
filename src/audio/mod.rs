//! Audio I/O for the microphone and speaker paths.
//!
//! Cross-platform capture and playback via cpal, with rubato resampling
//! when device rates differ from the model rates.

mod capture;
mod playback;
pub mod resampler;
pub mod util;

pub use capture::Capturer;
pub use playback::Player;
