//! Spoken output with flush-on-speak semantics.
//!
//! Couples the synthesizer to the output device. `speak` discards any audio
//! still queued from the previous reply before rendering the new one. If
//! either half fails to initialize, the failure is reported once and the
//! speaker stays muted for the process lifetime; replies are still logged.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::synthesizer::Synthesizer;
use crate::audio::Player;
use crate::config::AppConfig;

/// Speech output for the active screen.
pub struct Speaker {
    inner: Option<Voice>,
}

struct Voice {
    synthesizer: Mutex<Synthesizer>,
    player: Arc<Player>,
}

impl Speaker {
    /// Initialize synthesis and playback.
    pub fn new(config: &AppConfig) -> Self {
        let synthesizer = match Synthesizer::new(config) {
            Ok(s) => s,
            Err(e) => {
                warn!("Speech synthesis unavailable: {}", e);
                return Self { inner: None };
            }
        };

        let player = match Player::new(synthesizer.sample_rate()) {
            Ok(p) => Arc::new(p),
            Err(e) => {
                warn!("Audio output unavailable: {}", e);
                return Self { inner: None };
            }
        };

        Self { inner: Some(Voice { synthesizer: Mutex::new(synthesizer), player }) }
    }

    /// Speak `text`, cutting off anything still playing.
    ///
    /// Blocks until playback finishes; the controller sequences interactions,
    /// so nothing else is waiting on this thread.
    pub fn speak(&self, text: &str) {
        info!("🔊 {}", text);

        let Some(voice) = &self.inner else {
            warn!("Speech output unavailable, reply not spoken");
            return;
        };

        voice.player.flush();

        for sentence in split_sentences(text) {
            let samples = {
                let mut synth = voice.synthesizer.lock();
                match synth.synthesize(&sentence) {
                    Ok(s) => s,
                    Err(e) => {
                        warn!("Skipping sentence after TTS error: {}", e);
                        continue;
                    }
                }
            };

            if samples.is_empty() {
                continue;
            }

            debug!("Playing {} samples", samples.len());
            if !voice.player.play(&samples) {
                debug!("Playback cut short");
                break;
            }
        }
    }
}

/// Split a reply into sentence-sized chunks for synthesis.
///
/// Kokoro handles one sentence at a time; newlines also split so each line of
/// a transaction listing is rendered on its own.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if c == '.' || c == '!' || c == '?' || c == '\n' {
            let trimmed = current.trim().to_string();
            if !trimmed.is_empty() {
                sentences.push(trimmed);
            }
            current.clear();
        }
    }

    let trimmed = current.trim().to_string();
    if !trimmed.is_empty() {
        sentences.push(trimmed);
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_sentence_punctuation() {
        let sentences = split_sentences("Hello there. How are you?");
        assert_eq!(sentences, vec!["Hello there.", "How are you?"]);
    }

    #[test]
    fn splits_transaction_lines() {
        let reply = "Your recent transactions are: \n2024-01-02: $42 - Coffee\n2024-01-03: $7 - Tea";
        let sentences = split_sentences(reply);
        assert_eq!(sentences, vec!["Your recent transactions are:", "2024-01-02: $42 - Coffee", "2024-01-03: $7 - Tea"]);
    }

    #[test]
    fn unterminated_text_is_kept() {
        assert_eq!(split_sentences("Your bank balance is $42"), vec!["Your bank balance is $42"]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("  \n ").is_empty());
    }
}
