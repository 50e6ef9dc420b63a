//! Kokoro speech synthesis.

use anyhow::Result;
use sherpa_rs::OnnxConfig;
use sherpa_rs::tts::{CommonTtsConfig, KokoroTts, KokoroTtsConfig};
use tracing::{debug, info};

use crate::config::AppConfig;

/// Kokoro output sample rate.
const KOKORO_SAMPLE_RATE: u32 = 24000;

/// Text-to-speech synthesizer using the Kokoro model.
pub struct Synthesizer {
    tts: KokoroTts,
    speaker_id: i32,
    speed: f32,
}

impl Synthesizer {
    /// Create a new synthesizer for the configured voice.
    ///
    /// # Errors
    /// Returns an error if the voice name is unknown (model load failures
    /// surface on first synthesis).
    pub fn new(config: &AppConfig) -> Result<Self> {
        let provider = config.effective_provider();
        let voice = config.tts_speaker()?;

        info!("Initializing Kokoro TTS with {} provider, voice {}", provider, config.tts_voice);

        let tts_config = KokoroTtsConfig {
            model: config.tts_model_path().to_string_lossy().to_string(),
            voices: config.tts_voices_path().to_string_lossy().to_string(),
            tokens: config.tts_tokens_path().to_string_lossy().to_string(),
            data_dir: config.tts_data_dir().to_string_lossy().to_string(),
            dict_dir: String::new(),
            lexicon: config.tts_lexicon(),
            lang: String::new(), // English voices resolve through the lexicon
            length_scale: 1.0 / config.tts_speed, // length_scale is inverse of speed
            onnx_config: OnnxConfig {
                provider: provider.as_sherpa_provider().to_string(),
                num_threads: config.effective_num_threads().try_into().unwrap_or(2),
                debug: config.verbose,
            },
            common_config: CommonTtsConfig { max_num_sentences: 1, ..Default::default() }, // Kokoro only supports 1
        };

        let tts = KokoroTts::new(tts_config);

        Ok(Self { tts, speaker_id: voice.speaker_id, speed: config.tts_speed })
    }

    /// Render one sentence to mono samples.
    ///
    /// # Errors
    /// Returns an error if TTS generation fails.
    pub fn synthesize(&mut self, sentence: &str) -> Result<Vec<f32>> {
        if sentence.trim().is_empty() {
            return Ok(Vec::new());
        }

        debug!("Synthesizing: \"{}\"", sentence);

        let audio = self
            .tts
            .create(sentence, self.speaker_id, self.speed)
            .map_err(|e| anyhow::anyhow!("TTS generation failed: {}", e))?;

        Ok(audio.samples)
    }

    /// Sample rate of the synthesized audio.
    pub fn sample_rate(&self) -> u32 {
        KOKORO_SAMPLE_RATE
    }
}
