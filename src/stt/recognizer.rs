//! Single-utterance speech recognition over Silero VAD and Whisper.
//!
//! A session owns the microphone until one speech segment completes. VAD
//! edges and the final transcript are delivered to the controller as
//! [`SessionEvent`]s over one channel.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use parking_lot::Mutex;
use sherpa_rs::silero_vad::{SileroVad, SileroVadConfig};
use sherpa_rs::whisper::{WhisperConfig, WhisperRecognizer};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::AppConfig;

/// Minimum speech duration in seconds to count as an utterance.
const MIN_SPEECH_DURATION: f32 = 0.1;

/// Maximum utterance length in seconds.
const MAX_SPEECH_DURATION: f32 = 30.0;

/// VAD window size in samples (512 samples = 32ms at 16kHz).
const VAD_WINDOW_SIZE: i32 = 512;

/// Seconds of audio the VAD may buffer.
const VAD_BUFFER_SIZE_SECONDS: f32 = 60.0;

/// The teller understands English only.
const STT_LANGUAGE: &str = "en";

/// Lifecycle notifications for one recognition session.
#[derive(Debug)]
pub enum SessionEvent {
    /// The session claimed the microphone and is waiting for speech.
    Ready,
    /// Speech detected.
    SpeechBegin,
    /// Speech ended; transcription is running.
    SpeechEnd,
    /// Best transcript, or `None` when nothing usable was heard.
    Transcript(Option<String>),
}

/// Errors raised when driving sessions.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a recognition session is already active")]
    Busy,
}

/// VAD state touched from the capture drain thread.
/// Kept apart from Whisper to avoid lock contention (VAD is fast, Whisper is slow).
struct VadState {
    vad: SileroVad,
    in_speech: bool,
}

/// Speech recognizer combining VAD and Whisper behind a single-utterance session.
pub struct Recognizer {
    vad_state: Mutex<VadState>,
    whisper: Mutex<WhisperRecognizer>,
    segment_tx: mpsc::Sender<Vec<f32>>,
    event_tx: mpsc::Sender<SessionEvent>,
    active: AtomicBool,
    captured: AtomicBool,
    sample_rate: u32,
}

impl Recognizer {
    /// Build the recognizer.
    ///
    /// Returns the segment channel consumed by the transcription task and the
    /// event channel consumed by the controller.
    ///
    /// # Errors
    /// Returns an error if the VAD or Whisper models fail to load.
    pub fn new(config: &AppConfig) -> Result<(Self, mpsc::Receiver<Vec<f32>>, mpsc::Receiver<SessionEvent>)> {
        let provider = config.effective_provider();

        info!("Initializing speech recognizer with {} provider", provider);

        let vad_config = SileroVadConfig {
            model: config.vad_model_path().to_string_lossy().to_string(),
            threshold: config.vad_threshold,
            sample_rate: config.sample_rate,
            min_silence_duration: config.vad_silence_duration,
            min_speech_duration: MIN_SPEECH_DURATION,
            max_speech_duration: MAX_SPEECH_DURATION,
            window_size: VAD_WINDOW_SIZE,
            provider: Some(provider.as_sherpa_provider().to_string()),
            num_threads: Some(1),
            debug: config.verbose,
        };

        let vad = SileroVad::new(vad_config, VAD_BUFFER_SIZE_SECONDS)
            .map_err(|e| anyhow::anyhow!("Failed to initialize Silero VAD: {}", e))?;

        let whisper_config = WhisperConfig {
            encoder: config.whisper_encoder_path().to_string_lossy().to_string(),
            decoder: config.whisper_decoder_path().to_string_lossy().to_string(),
            tokens: config.whisper_tokens_path().to_string_lossy().to_string(),
            language: STT_LANGUAGE.to_string(),
            provider: Some(provider.as_sherpa_provider().to_string()),
            num_threads: Some(config.effective_num_threads().try_into().unwrap_or(2)),
            debug: config.verbose,
            ..Default::default()
        };

        let whisper =
            WhisperRecognizer::new(whisper_config).map_err(|e| anyhow::anyhow!("Failed to initialize Whisper: {}", e))?;

        info!("Speech models loaded");

        let (segment_tx, segment_rx) = mpsc::channel(4);
        let (event_tx, event_rx) = mpsc::channel(16);

        let recognizer = Self {
            vad_state: Mutex::new(VadState { vad, in_speech: false }),
            whisper: Mutex::new(whisper),
            segment_tx,
            event_tx,
            active: AtomicBool::new(false),
            captured: AtomicBool::new(false),
            sample_rate: config.sample_rate,
        };

        Ok((recognizer, segment_rx, event_rx))
    }

    /// Claim the single recognition session.
    ///
    /// # Errors
    /// Returns [`SessionError::Busy`] if a session is already active.
    pub fn begin_session(&self) -> Result<(), SessionError> {
        if self.active.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return Err(SessionError::Busy);
        }
        self.captured.store(false, Ordering::SeqCst);
        let _ = self.event_tx.try_send(SessionEvent::Ready);
        Ok(())
    }

    /// Release the session; audio arriving afterwards is ignored.
    pub fn end_session(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.vad_state.lock().in_speech = false;
    }

    /// Feed captured audio. Called from the capture drain thread; audio
    /// outside an active session, or after the session's utterance completed,
    /// is dropped.
    pub fn accept_waveform(&self, samples: &[f32]) {
        if !self.active.load(Ordering::Relaxed) || self.captured.load(Ordering::Relaxed) {
            return;
        }

        let mut state = self.vad_state.lock();
        state.vad.accept_waveform(samples.to_vec());

        let speaking = state.vad.is_speech();
        if speaking && !state.in_speech {
            debug!("Speech detected");
            let _ = self.event_tx.try_send(SessionEvent::SpeechBegin);
        }
        state.in_speech = speaking;

        if !state.vad.is_empty() {
            let segment = state.vad.front();
            state.vad.pop();
            drop(state);

            if segment.samples.is_empty() {
                return;
            }

            debug!("Utterance complete: {} samples", segment.samples.len());
            self.captured.store(true, Ordering::SeqCst);
            let _ = self.event_tx.try_send(SessionEvent::SpeechEnd);

            if self.segment_tx.try_send(segment.samples).is_err() {
                warn!("Dropping utterance, transcription backlog full");
            }
        }
    }

    /// Run Whisper over a completed utterance.
    pub fn transcribe(&self, samples: &[f32]) -> Option<String> {
        if samples.is_empty() {
            return None;
        }

        debug!("Transcribing {} samples", samples.len());

        let mut whisper = self.whisper.lock();
        let result = whisper.transcribe(self.sample_rate, samples);
        drop(whisper);

        let text = result.text.trim().to_string();
        if text.is_empty() {
            debug!("Empty transcription result");
            return None;
        }

        info!("🗣️  \"{}\"", text);
        Some(text)
    }

    /// A sender for posting session events from the transcription task.
    pub fn event_sender(&self) -> mpsc::Sender<SessionEvent> {
        self.event_tx.clone()
    }
}
