//! The interaction state machine and its event loop.
//!
//! One controller task owns the whole cycle: presses arm the trigger, the
//! recognizer produces an utterance, the utterance resolves to a spoken
//! reply, and the cycle ends back at idle. Trigger events outside idle are
//! rejected, so at most one recognition session and one fetch are ever in
//! flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, sleep, sleep_until};
use tracing::{debug, info, warn};

use crate::bank::{BankClient, BankError, reply};
use crate::command::{Intent, classify};
use crate::config::AppConfig;
use crate::gesture::{TapOutcome, TapTracker};
use crate::stt::{Recognizer, SessionEvent};
use crate::tts::Speaker;

/// Upper bound on one utterance plus its transcription, used to backstop a
/// session once speech has started. The VAD caps utterances at 30 seconds.
const MAX_UTTERANCE: Duration = Duration::from_secs(35);

/// A press on the trigger surface, stamped when it was read.
#[derive(Debug, Clone, Copy)]
pub struct Press {
    pub at: Instant,
}

/// Where the current interaction cycle stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    /// Microphone open, waiting for an utterance.
    Listening,
    /// Utterance captured, transcription running.
    Processing,
    /// Remote fetch in flight.
    Fetching,
    /// Reply being spoken.
    Speaking,
}

impl Phase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Phase::Idle)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Listening => write!(f, "listening"),
            Phase::Processing => write!(f, "processing"),
            Phase::Fetching => write!(f, "fetching"),
            Phase::Speaking => write!(f, "speaking"),
        }
    }
}

/// Drives interaction cycles; the single owner of the phase, the tap state
/// and the microphone gate.
pub struct Controller {
    phase: Phase,
    taps: TapTracker,
    listen_timeout: Duration,
    listen_deadline: Option<Instant>,
    recognizer: Arc<Recognizer>,
    microphone: Arc<AtomicBool>,
    bank: BankClient,
    speaker: Speaker,
}

impl Controller {
    pub fn new(
        config: &AppConfig,
        recognizer: Arc<Recognizer>,
        microphone: Arc<AtomicBool>,
        bank: BankClient,
        speaker: Speaker,
    ) -> Self {
        Self {
            phase: Phase::Idle,
            taps: TapTracker::new(config.tap_count, config.tap_window()),
            listen_timeout: config.listen_timeout(),
            listen_deadline: None,
            recognizer,
            microphone,
            bank,
            speaker,
        }
    }

    /// Drive interactions until shutdown.
    pub async fn run(
        mut self,
        mut press_rx: mpsc::Receiver<Press>,
        mut event_rx: mpsc::Receiver<SessionEvent>,
        shutdown: Arc<AtomicBool>,
    ) {
        while !shutdown.load(Ordering::Relaxed) {
            let tap_deadline = self.taps.deadline();
            let listen_deadline = self.listen_deadline;

            tokio::select! {
                maybe_press = press_rx.recv() => {
                    match maybe_press {
                        Some(press) => self.on_press(press).await,
                        None => break,
                    }
                }
                maybe_event = event_rx.recv() => {
                    match maybe_event {
                        Some(event) => self.on_session_event(event).await,
                        None => break,
                    }
                }
                _ = deadline(tap_deadline) => {
                    debug!("Tap window expired");
                    self.taps.reset();
                }
                _ = deadline(listen_deadline) => {
                    warn!("No speech heard, giving up on this session");
                    self.abort_session();
                }
                _ = sleep(Duration::from_millis(100)) => {
                    // Re-check the shutdown flag
                }
            }
        }

        if !self.phase.is_idle() {
            self.abort_session();
        }
        debug!("Controller stopped");
    }

    async fn on_press(&mut self, press: Press) {
        if !self.phase.is_idle() {
            debug!("Press ignored while {}", self.phase);
            return;
        }

        match self.taps.press(press.at) {
            TapOutcome::Counted(n) => debug!("Press counted ({})", n),
            TapOutcome::Fired => self.start_session(),
        }
    }

    fn start_session(&mut self) {
        match self.recognizer.begin_session() {
            Ok(()) => {
                self.phase = Phase::Listening;
                self.listen_deadline = Some(Instant::now() + self.listen_timeout);
                self.microphone.store(true, Ordering::SeqCst);
            }
            Err(e) => warn!("Could not start voice capture: {}", e),
        }
    }

    async fn on_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Ready => {
                if self.phase == Phase::Listening {
                    info!("Listening...");
                }
            }
            SessionEvent::SpeechBegin => {
                if self.phase == Phase::Listening {
                    // The VAD owns the end of the utterance from here; the
                    // deadline only backstops a segment that never completes
                    self.listen_deadline = Some(Instant::now() + MAX_UTTERANCE);
                }
            }
            SessionEvent::SpeechEnd => {
                if self.phase == Phase::Listening {
                    self.phase = Phase::Processing;
                    self.microphone.store(false, Ordering::SeqCst);
                    info!("Processing...");
                }
            }
            SessionEvent::Transcript(text) => self.on_transcript(text).await,
        }
    }

    async fn on_transcript(&mut self, text: Option<String>) {
        if !matches!(self.phase, Phase::Listening | Phase::Processing) {
            debug!("Stray transcript ignored while {}", self.phase);
            return;
        }

        self.microphone.store(false, Ordering::SeqCst);
        self.recognizer.end_session();
        self.listen_deadline = None;

        let Some(utterance) = text else {
            debug!("Nothing usable was said, back to idle");
            self.phase = Phase::Idle;
            return;
        };

        let intent = classify(&utterance);
        debug!("\"{}\" -> {:?}", utterance, intent);

        let spoken = match intent {
            Intent::Unrecognized => reply::not_recognized(),
            Intent::BankBalance | Intent::TransactionHistory => {
                self.phase = Phase::Fetching;
                resolve(intent, &self.bank).await
            }
        };

        self.phase = Phase::Speaking;
        self.speaker.speak(&spoken);
        self.phase = Phase::Idle;
    }

    /// Tear the session down outside the normal flow (timeout, shutdown).
    fn abort_session(&mut self) {
        self.microphone.store(false, Ordering::SeqCst);
        self.recognizer.end_session();
        self.listen_deadline = None;
        self.taps.reset();
        self.phase = Phase::Idle;
    }
}

/// Fetch the records an intent needs and format the spoken reply; failures
/// become the canned failure phrases.
pub async fn resolve(intent: Intent, bank: &BankClient) -> String {
    match intent {
        Intent::BankBalance => match bank.fetch_account().await {
            Ok(records) => reply::balance_reply(&records),
            Err(e) => fetch_failed(intent, &e),
        },
        Intent::TransactionHistory => match bank.fetch_transactions().await {
            Ok(records) => reply::transactions_reply(&records),
            Err(e) => fetch_failed(intent, &e),
        },
        Intent::Unrecognized => reply::not_recognized(),
    }
}

fn fetch_failed(intent: Intent, error: &BankError) -> String {
    warn!("Fetch failed: {}", error);
    reply::failure_reply(intent, error)
}

/// Await an optional deadline; absent deadlines never fire.
async fn deadline(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn stub_server(status_line: &str, body: &str) -> String {
        let response = format!(
            "{status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 2048];
                let _ = socket.read(&mut request).await;
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        format!("http://{addr}")
    }

    #[test]
    fn phase_starts_idle() {
        assert!(Phase::default().is_idle());
        assert!(!Phase::Listening.is_idle());
    }

    #[tokio::test]
    async fn balance_intent_resolves_to_the_spoken_balance() {
        let base = stub_server("HTTP/1.1 200 OK", r#"[{"value": 523.10}]"#).await;
        let bank = BankClient::with_base_url(base);

        assert_eq!(resolve(Intent::BankBalance, &bank).await, "Your bank balance is $523.10");
    }

    #[tokio::test]
    async fn transaction_intent_resolves_to_the_spoken_history() {
        let base =
            stub_server("HTTP/1.1 200 OK", r#"[{"date":"2024-01-02","amount":42,"description":"Coffee"}]"#).await;
        let bank = BankClient::with_base_url(base);

        assert_eq!(
            resolve(Intent::TransactionHistory, &bank).await,
            "Your recent transactions are: \n2024-01-02: $42 - Coffee"
        );
    }

    #[tokio::test]
    async fn empty_account_feed_resolves_to_the_no_data_reply() {
        let base = stub_server("HTTP/1.1 200 OK", "[]").await;
        let bank = BankClient::with_base_url(base);

        assert_eq!(resolve(Intent::BankBalance, &bank).await, "No account information is available");
    }

    #[tokio::test]
    async fn feed_error_resolves_to_the_fetch_failed_phrase() {
        let base = stub_server("HTTP/1.1 503 Service Unavailable", "").await;
        let bank = BankClient::with_base_url(base);

        assert_eq!(resolve(Intent::TransactionHistory, &bank).await, "Failed to fetch transaction history");
    }

    #[tokio::test]
    async fn unreachable_feed_speaks_the_cause() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let bank = BankClient::with_base_url(base);
        let spoken = resolve(Intent::BankBalance, &bank).await;
        assert!(spoken.starts_with("Error: "), "got {spoken:?}");
        assert!(spoken.len() > "Error: ".len());
    }

    #[tokio::test]
    async fn unrecognized_intent_never_fetches() {
        // No server at all: resolving must not touch the network
        let bank = BankClient::with_base_url("http://127.0.0.1:1");
        assert_eq!(resolve(Intent::Unrecognized, &bank).await, "Command not recognized");
    }
}
