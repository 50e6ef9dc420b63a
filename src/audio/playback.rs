//! Speaker-side audio output.
//!
//! Synthesized samples are queued into a lock-free ring buffer the output
//! callback drains; `flush` discards whatever is queued so a new utterance
//! cuts off the previous one.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex as StdMutex};
use std::time::Duration;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use tracing::{debug, info, warn};

use super::resampler::resample;
use super::util::{device_name, select_config};

/// Ring capacity in samples (~11 seconds at 48kHz).
const PLAYBACK_RING_SIZE: usize = 524288;

/// Audio player that outputs mono samples to the default device.
/// The output callback is lock-free; producers queue through a mutex.
pub struct Player {
    _stream: Stream,
    device_rate: u32,
    input_rate: u32,
    producer: Mutex<ringbuf::HeapProd<f32>>,
    discard: Arc<AtomicBool>,
    playing: Arc<AtomicBool>,
    done_mutex: Arc<StdMutex<()>>,
    done: Arc<Condvar>,
}

impl Player {
    /// Create a player for mono audio at `input_rate` (the TTS output rate).
    ///
    /// # Errors
    /// Returns an error if no output device is available or the stream cannot
    /// be built.
    pub fn new(input_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().context("No output device available")?;

        info!("Using output device: {}", device_name(&device));

        // Prefer the device's default rate for compatibility
        let device_rate = match device.default_output_config() {
            Ok(default_config) => default_config.sample_rate(),
            Err(_) => {
                let supported = device.supported_output_configs().context("Failed to get supported output configs")?;
                select_config(supported, 48000)?.sample_rate()
            }
        };

        let supported = device.supported_output_configs().context("Failed to get supported output configs")?;
        let config = select_config(supported, device_rate)?;
        let channels = config.channels() as usize;
        let stream_config: StreamConfig = config.config();

        if device_rate != input_rate {
            info!("Output device at {} Hz, speech synthesized at {} Hz - resampling", device_rate, input_rate);
        }

        let ring = HeapRb::<f32>::new(PLAYBACK_RING_SIZE);
        let (producer, mut consumer) = ring.split();

        let discard = Arc::new(AtomicBool::new(false));
        let playing = Arc::new(AtomicBool::new(false));
        let done_mutex = Arc::new(StdMutex::new(()));
        let done = Arc::new(Condvar::new());

        let discard_cb = discard.clone();
        let playing_cb = playing.clone();
        let done_mutex_cb = done_mutex.clone();
        let done_cb = done.clone();

        let stream = device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if discard_cb.load(Ordering::Relaxed) {
                    while consumer.try_pop().is_some() {}
                }

                for frame in data.chunks_mut(channels) {
                    let sample = consumer.try_pop().unwrap_or(0.0);
                    for slot in frame.iter_mut() {
                        *slot = sample;
                    }
                }

                if consumer.is_empty() && playing_cb.load(Ordering::Relaxed) {
                    playing_cb.store(false, Ordering::SeqCst);
                    let _guard = done_mutex_cb.lock().unwrap();
                    done_cb.notify_all();
                }
            },
            |err| tracing::error!("Audio playback error: {}", err),
            None,
        )?;

        stream.play().context("Failed to start playback stream")?;

        debug!("Audio playback configured: input {} Hz -> device {} Hz", input_rate, device_rate);

        Ok(Self {
            _stream: stream,
            device_rate,
            input_rate,
            producer: Mutex::new(producer),
            discard,
            playing,
            done_mutex,
            done,
        })
    }

    /// Play mono samples, blocking until the queue drains.
    ///
    /// Returns `true` on completion, `false` if playback was flushed away or
    /// timed out.
    pub fn play(&self, samples: &[f32]) -> bool {
        if samples.is_empty() {
            return true;
        }

        let to_play = if self.device_rate != self.input_rate {
            match resample(samples, self.input_rate, self.device_rate) {
                Ok(resampled) => resampled,
                Err(e) => {
                    tracing::error!("Resampling failed: {}, playing at the wrong rate", e);
                    samples.to_vec()
                }
            }
        } else {
            samples.to_vec()
        };

        {
            let mut producer = self.producer.lock();
            let written = producer.push_slice(&to_play);
            if written < to_play.len() {
                warn!("Playback buffer overflow, dropped {} samples", to_play.len() - written);
            }
        }
        self.playing.store(true, Ordering::SeqCst);

        debug!("Playing {} samples at {} Hz", to_play.len(), self.device_rate);

        // The deadline bounds the wait if the device stalls
        let duration_secs = to_play.len() as f64 / self.device_rate as f64;
        let deadline = std::time::Instant::now() + Duration::from_secs_f64(duration_secs + 1.0);

        while self.playing.load(Ordering::Relaxed) {
            if self.discard.load(Ordering::Relaxed) {
                debug!("Playback flushed");
                return false;
            }
            if std::time::Instant::now() > deadline {
                warn!("Playback timeout exceeded");
                return false;
            }

            let guard = self.done_mutex.lock().unwrap();
            let _ = self.done.wait_timeout(guard, Duration::from_millis(50)).unwrap();
        }

        debug!("Playback completed");
        true
    }

    /// Discard queued and in-progress audio so a new utterance starts clean.
    pub fn flush(&self) {
        let _producer = self.producer.lock();
        self.discard.store(true, Ordering::SeqCst);

        // One callback period is enough for the consumer side to empty
        std::thread::sleep(Duration::from_millis(30));

        self.discard.store(false, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
        let _guard = self.done_mutex.lock().unwrap();
        self.done.notify_all();
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.discard.store(true, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
    }
}
