//! Application configuration and CLI argument parsing.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::voices;

/// Hardware acceleration provider for the ONNX speech models.
/// Auto-detected based on platform if not specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// CPU inference (default fallback, always available)
    #[default]
    Cpu,
    /// NVIDIA CUDA acceleration (Linux only, requires CUDA toolkit)
    Cuda,
    /// Apple CoreML acceleration (macOS only, uses Neural Engine)
    #[value(name = "coreml")]
    CoreMl,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Cpu => write!(f, "cpu"),
            Provider::Cuda => write!(f, "cuda"),
            Provider::CoreMl => write!(f, "coreml"),
        }
    }
}

impl Provider {
    /// Convert to sherpa-rs provider string.
    pub fn as_sherpa_provider(&self) -> &'static str {
        match self {
            Provider::Cpu => "cpu",
            Provider::Cuda => "cuda",
            Provider::CoreMl => "coreml",
        }
    }
}

/// Voice teller application configuration.
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "voice-teller")]
#[command(author, version, about = "A hands-free voice banking assistant", long_about = None)]
pub struct AppConfig {
    /// List all available TTS voices and exit
    #[arg(long)]
    pub list_voices: bool,

    /// Directory containing model files (Whisper, VAD, TTS)
    #[arg(long, short = 'd', env = "MODEL_DIR", default_value_os_t = default_model_dir())]
    pub model_dir: PathBuf,

    /// Base URL of the bank data feed
    #[arg(long, env = "BANK_API_URL", default_value = "http://localhost:8000/rest/v1")]
    pub bank_url: String,

    /// Request timeout for the bank data feed, in seconds
    #[arg(long, default_value = "10")]
    pub http_timeout_secs: u64,

    /// Audio sample rate for speech recognition
    #[arg(long, default_value = "16000")]
    pub sample_rate: u32,

    /// Voice activity detection threshold (0.0 - 1.0)
    #[arg(long, default_value = "0.5")]
    pub vad_threshold: f32,

    /// VAD silence duration in seconds (how long to wait before considering speech ended)
    #[arg(long, default_value = "0.8")]
    pub vad_silence_duration: f32,

    /// Presses required to start voice capture
    #[arg(long, default_value = "3")]
    pub tap_count: u8,

    /// Window in milliseconds within which presses are counted
    #[arg(long, default_value = "500")]
    pub tap_window_ms: u64,

    /// Seconds to wait for an utterance before giving up on a session
    #[arg(long, default_value = "8")]
    pub listen_timeout_secs: u64,

    /// TTS voice name (English voices only, see --list-voices)
    #[arg(long, default_value = "af_bella")]
    pub tts_voice: String,

    /// Text-to-speech speed multiplier (0.9-0.95 for more natural speech)
    #[arg(long, default_value = "0.93")]
    pub tts_speed: f32,

    /// Hardware acceleration provider (auto-detected if not specified)
    #[arg(long, value_enum)]
    pub provider: Option<Provider>,

    /// Number of threads for the speech models (0 = auto-detect based on CPU cores)
    #[arg(long, default_value = "0")]
    pub num_threads: usize,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl AppConfig {
    /// Parse configuration from command line arguments.
    pub fn from_args() -> Self {
        let config = Self::parse();

        if config.list_voices {
            voices::print_voices();
            std::process::exit(0);
        }

        config
    }

    /// Get the effective acceleration provider.
    pub fn effective_provider(&self) -> Provider {
        self.provider.unwrap_or_else(detect_provider)
    }

    /// Thread count for the speech models.
    ///
    /// With CUDA the GPU handles parallelism, so one CPU thread avoids
    /// contention; on CPU, cores/3 leaves headroom for the other models.
    pub fn effective_num_threads(&self) -> usize {
        if self.num_threads > 0 {
            return self.num_threads;
        }
        if self.effective_provider() == Provider::Cuda { 1 } else { (num_cpus::get() / 3).max(1) }
    }

    /// The press-counting window.
    pub fn tap_window(&self) -> Duration {
        Duration::from_millis(self.tap_window_ms)
    }

    /// How long a session waits for an utterance.
    pub fn listen_timeout(&self) -> Duration {
        Duration::from_secs(self.listen_timeout_secs)
    }

    /// Request timeout for the bank data feed.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Resolve the configured TTS voice name.
    pub fn tts_speaker(&self) -> Result<voices::Voice> {
        voices::find(&self.tts_voice)
            .ok_or_else(|| anyhow::anyhow!("Unknown TTS voice: {} (see --list-voices)", self.tts_voice))
    }

    /// Get the path to the Whisper encoder model.
    pub fn whisper_encoder_path(&self) -> PathBuf {
        self.model_dir.join("whisper").join("whisper-small-encoder.int8.onnx")
    }

    /// Get the path to the Whisper decoder model.
    pub fn whisper_decoder_path(&self) -> PathBuf {
        self.model_dir.join("whisper").join("whisper-small-decoder.int8.onnx")
    }

    /// Get the path to the Whisper tokens file.
    pub fn whisper_tokens_path(&self) -> PathBuf {
        self.model_dir.join("whisper").join("whisper-small-tokens.txt")
    }

    /// Get the path to the VAD model.
    pub fn vad_model_path(&self) -> PathBuf {
        self.model_dir.join("silero_vad.onnx")
    }

    /// Get the path to the Kokoro TTS model.
    pub fn tts_model_path(&self) -> PathBuf {
        self.model_dir.join("tts").join("kokoro-multi-lang-v1_0").join("model.onnx")
    }

    /// Get the path to the Kokoro TTS voices.bin file.
    pub fn tts_voices_path(&self) -> PathBuf {
        self.model_dir.join("tts").join("kokoro-multi-lang-v1_0").join("voices.bin")
    }

    /// Get the path to the TTS tokens file.
    pub fn tts_tokens_path(&self) -> PathBuf {
        self.model_dir.join("tts").join("kokoro-multi-lang-v1_0").join("tokens.txt")
    }

    /// Get the path to the TTS data directory.
    pub fn tts_data_dir(&self) -> PathBuf {
        self.model_dir.join("tts").join("kokoro-multi-lang-v1_0").join("espeak-ng-data")
    }

    /// Lexicon file for the configured voice. American voices ("af"/"am")
    /// use the US lexicon, British ("bf"/"bm") the GB one.
    pub fn tts_lexicon(&self) -> String {
        let tts_dir = self.model_dir.join("tts").join("kokoro-multi-lang-v1_0");
        let file = if self.tts_voice.starts_with("bf") || self.tts_voice.starts_with("bm") {
            "lexicon-gb-en.txt"
        } else {
            "lexicon-us-en.txt"
        };
        tts_dir.join(file).to_string_lossy().to_string()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.model_dir.exists() {
            anyhow::bail!("Model directory does not exist: {}", self.model_dir.display());
        }

        let required_files = [
            self.whisper_encoder_path(),
            self.whisper_decoder_path(),
            self.whisper_tokens_path(),
            self.vad_model_path(),
            self.tts_model_path(),
            self.tts_voices_path(),
            self.tts_tokens_path(),
        ];

        for path in &required_files {
            if !path.exists() {
                anyhow::bail!("Required model file not found: {}", path.display());
            }
        }

        if !(0.0..=1.0).contains(&self.vad_threshold) {
            anyhow::bail!("VAD threshold must be between 0.0 and 1.0");
        }

        if self.tts_speed <= 0.0 {
            anyhow::bail!("TTS speed must be positive");
        }

        if self.tap_count == 0 {
            anyhow::bail!("Tap count must be at least 1");
        }

        if self.tap_window_ms == 0 {
            anyhow::bail!("Tap window must be positive");
        }

        self.tts_speaker()?;

        self.bank_url
            .parse::<reqwest::Url>()
            .map_err(|e| anyhow::anyhow!("Invalid bank URL '{}': {}", self.bank_url, e))?;

        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        info!("Configuration:");
        info!("  Model directory: {}", self.model_dir.display());
        info!("  Bank feed: {}", self.bank_url);
        info!("  HTTP timeout: {}s", self.http_timeout_secs);
        info!("  Sample rate: {} Hz", self.sample_rate);
        info!("  VAD threshold: {}", self.vad_threshold);
        info!("  Trigger: {} presses within {}ms", self.tap_count, self.tap_window_ms);
        info!("  Listen timeout: {}s", self.listen_timeout_secs);
        info!("  TTS voice: {}", self.tts_voice);
        info!("  TTS speed: {}", self.tts_speed);
        info!("  Provider: {}", self.effective_provider());
    }
}

/// Get the default model directory (~/.voice-teller/models).
fn default_model_dir() -> PathBuf {
    if let Some(home_dir) = dirs::home_dir() {
        home_dir.join(".voice-teller").join("models")
    } else {
        PathBuf::from("models")
    }
}

/// Auto-detect the best hardware acceleration provider.
fn detect_provider() -> Provider {
    #[cfg(target_os = "macos")]
    {
        Provider::CoreMl
    }

    #[cfg(target_os = "linux")]
    {
        if has_nvidia_gpu() { Provider::Cuda } else { Provider::Cpu }
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        Provider::Cpu
    }
}

/// Check if an NVIDIA GPU is available (Linux only).
#[cfg(target_os = "linux")]
fn has_nvidia_gpu() -> bool {
    use std::path::Path;

    ["/dev/nvidia0", "/dev/nvidiactl", "/dev/nvidia-uvm"].iter().any(|p| Path::new(p).exists())
}
