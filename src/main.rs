//! Voice Teller - a hands-free voice banking assistant.
//!
//! Three rapid presses open the microphone, one spoken phrase is classified
//! into a fixed set of banking commands (Whisper STT + Silero VAD), the
//! matching REST resource is fetched, and the answer is spoken back (Kokoro
//! TTS).

mod audio;
mod bank;
mod command;
mod config;
mod gesture;
mod session;
mod stt;
mod tts;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

use audio::Capturer;
use bank::BankClient;
use config::AppConfig;
use session::{Controller, Press};
use stt::{Recognizer, SessionEvent};
use tts::Speaker;

/// Spawn the task that turns stdin lines into press events.
///
/// Every Enter keypress is one press on the trigger surface.
fn spawn_press_task(press_tx: mpsc::Sender<Press>) -> JoinHandle<()> {
    tokio::spawn(async move {
        use tokio::io::AsyncBufReadExt;

        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            let press = Press { at: tokio::time::Instant::now() };
            if press_tx.try_send(press).is_err() {
                debug!("Press dropped, controller backlog full");
            }
        }
        debug!("Press task exiting");
    })
}

/// Spawn the transcription task.
///
/// Receives completed utterances from the VAD and posts the transcript to
/// the controller, keeping Whisper off the controller's loop.
fn spawn_transcription_task(
    recognizer: Arc<Recognizer>,
    mut segment_rx: mpsc::Receiver<Vec<f32>>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    let events = recognizer.event_sender();

    tokio::spawn(async move {
        while !shutdown.load(Ordering::Relaxed) {
            // Timeout so the shutdown flag is re-checked
            match tokio::time::timeout(tokio::time::Duration::from_millis(100), segment_rx.recv()).await {
                Ok(Some(samples)) => {
                    let transcript = recognizer.transcribe(&samples);
                    if events.send(SessionEvent::Transcript(transcript)).await.is_err() {
                        debug!("Event channel closed");
                        break;
                    }
                }
                Ok(None) => {
                    debug!("Segment channel closed");
                    break;
                }
                Err(_) => continue,
            }
        }
    })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn wait_for_shutdown(shutdown: Arc<AtomicBool>) {
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("🛑 Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("🛑 Received SIGTERM, shutting down...");
        }
    }

    shutdown.store(true, Ordering::SeqCst);
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_args();

    // Respect RUST_LOG, fall back to the verbose flag, default to info
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| if config.verbose { EnvFilter::try_new("debug") } else { EnvFilter::try_new("info") })
        .unwrap();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(LocalTime::new(time::macros::format_description!("[hour]:[minute]:[second]")))
        .init();

    info!("🏦 Voice Teller v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!("❌ Configuration error: {}", e);
        error!("Download the Whisper, Silero VAD and Kokoro models into the model directory first.");
        std::process::exit(1);
    }

    let (recognizer, segment_rx, event_rx) = Recognizer::new(&config)?;
    let recognizer = Arc::new(recognizer);

    let speaker = Speaker::new(&config);
    let bank = BankClient::new(&config)?;

    let recognizer_for_audio = recognizer.clone();
    let mut capturer = Capturer::new(config.sample_rate, move |samples: &[f32]| {
        recognizer_for_audio.accept_waveform(samples);
    })?;
    let microphone = capturer.listening_flag();

    config.log_config();

    capturer.start()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let (press_tx, press_rx) = mpsc::channel::<Press>(16);

    let press_handle = spawn_press_task(press_tx);
    let transcription_handle = spawn_transcription_task(recognizer.clone(), segment_rx, shutdown.clone());

    let controller = Controller::new(&config, recognizer, microphone, bank, speaker);
    let controller_handle = tokio::spawn(controller.run(press_rx, event_rx, shutdown.clone()));

    info!(
        "Ready. Press Enter {} times quickly, then ask about your bank balance or transaction history.",
        config.tap_count
    );

    wait_for_shutdown(shutdown).await;

    capturer.shutdown();
    press_handle.abort();

    // Give tasks a moment to notice the shutdown flag before moving on
    let graceful_timeout = tokio::time::Duration::from_millis(500);

    tokio::select! {
        _ = transcription_handle => {
            debug!("Transcription task finished gracefully");
        }
        _ = tokio::time::sleep(graceful_timeout) => {
            debug!("Transcription task didn't finish in time");
        }
    }

    tokio::select! {
        _ = controller_handle => {
            debug!("Controller finished gracefully");
        }
        _ = tokio::time::sleep(graceful_timeout) => {
            debug!("Controller didn't finish in time");
        }
    }

    info!("✅ Voice teller stopped");
    Ok(())
}
