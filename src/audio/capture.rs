//! Microphone capture for recognition sessions.
//!
//! The cpal callback pushes mono samples into a lock-free ring buffer; a
//! drain thread resamples them to the recognizer rate and hands them to the
//! recognizer callback. Audio is only forwarded while the listening flag is
//! set, so the microphone is effectively closed between sessions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use tracing::{debug, info, warn};

use super::resampler::StreamResampler;
use super::util::{device_name, mono_mix, select_config};

/// Ring capacity in samples (~4 seconds at 16kHz).
const CAPTURE_RING_SIZE: usize = 65536;

/// Audio capturer that streams microphone samples to the recognizer.
pub struct Capturer {
    stream: Stream,
    listening: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    drain: Option<std::thread::JoinHandle<()>>,
}

impl Capturer {
    /// Build the capture pipeline.
    ///
    /// # Errors
    /// Returns an error if no input device is available or the stream cannot
    /// be built.
    pub fn new<F>(target_rate: u32, callback: F) -> Result<Self>
    where
        F: Fn(&[f32]) + Send + 'static,
    {
        let host = cpal::default_host();
        let device = host.default_input_device().context("No input device available")?;

        info!("Using input device: {}", device_name(&device));

        let supported = device.supported_input_configs().context("Failed to get supported input configs")?;
        let config = select_config(supported, target_rate)?;
        let device_rate = config.sample_rate();
        let channels = config.channels() as usize;
        let stream_config: StreamConfig = config.config();

        debug!("Capture config: {} Hz, {} channels, {:?}", device_rate, channels, config.sample_format());

        let ring = HeapRb::<f32>::new(CAPTURE_RING_SIZE);
        let (mut producer, mut consumer) = ring.split();

        let listening = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));

        let listening_cb = listening.clone();
        let stream = device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if !listening_cb.load(Ordering::Relaxed) {
                    return;
                }
                let mono = mono_mix(data, channels);
                let written = producer.push_slice(&mono);
                if written < mono.len() {
                    use std::sync::atomic::AtomicU64;
                    static DROPS: AtomicU64 = AtomicU64::new(0);
                    let count = DROPS.fetch_add(1, Ordering::Relaxed);
                    if count.is_multiple_of(100) {
                        warn!("Capture ring full, dropped {} bursts", count + 1);
                    }
                }
            },
            |err| tracing::error!("Audio capture error: {}", err),
            None,
        )?;

        let mut resampler = if device_rate != target_rate {
            info!("Capture device at {} Hz, resampling to {} Hz", device_rate, target_rate);
            Some(StreamResampler::new(device_rate, target_rate)?)
        } else {
            None
        };

        let drain_listening = listening.clone();
        let drain_shutdown = shutdown.clone();
        let drain = std::thread::spawn(move || {
            let mut buf = vec![0.0f32; 2048];
            loop {
                if drain_shutdown.load(Ordering::Relaxed) {
                    debug!("Capture drain thread exiting");
                    return;
                }

                if !drain_listening.load(Ordering::Relaxed) {
                    // Closed: throw away whatever raced into the ring so the
                    // next session starts clean
                    let stale = consumer.occupied_len();
                    if stale > 0 {
                        let _ = consumer.pop_slice(&mut buf[..stale.min(buf.len())]);
                    }
                    std::thread::sleep(std::time::Duration::from_millis(10));
                    continue;
                }

                let available = consumer.occupied_len();
                if available == 0 {
                    std::thread::sleep(std::time::Duration::from_micros(100));
                    continue;
                }

                let read = consumer.pop_slice(&mut buf[..available.min(2048)]);
                if read == 0 {
                    continue;
                }

                match resampler.as_mut() {
                    Some(r) => {
                        if let Some(samples) = r.push(&buf[..read]) {
                            callback(&samples);
                        }
                    }
                    None => callback(&buf[..read]),
                }
            }
        });

        info!("Audio capture configured: device {} Hz -> recognizer {} Hz", device_rate, target_rate);

        Ok(Self { stream, listening, shutdown, drain: Some(drain) })
    }

    /// Start the stream. The microphone stays gated by the listening flag.
    pub fn start(&self) -> Result<()> {
        self.stream.play().context("Failed to start audio stream")?;
        debug!("Audio capture started");
        Ok(())
    }

    /// The per-session microphone gate: set to open, clear to close.
    pub fn listening_flag(&self) -> Arc<AtomicBool> {
        self.listening.clone()
    }

    /// Permanently stop and join the drain thread.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.listening.store(false, Ordering::SeqCst);
        let _ = self.stream.pause();

        if let Some(handle) = self.drain.take()
            && handle.join().is_err()
        {
            warn!("Capture drain thread panicked");
        }

        info!("Audio capture stopped");
    }
}

impl Drop for Capturer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
