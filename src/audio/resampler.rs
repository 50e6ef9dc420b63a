//! Audio resampling built on rubato's FFT resampler.
//!
//! The capture path resamples a live stream in callback-sized bursts; the
//! playback path converts whole synthesized utterances at once.

use anyhow::{Context, Result};
use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{Fft, FixedSync, Resampler};

/// Frames fed to the FFT resampler per call.
const CHUNK_SIZE: usize = 1024;

/// FFT sub-chunk count; quality/CPU trade-off.
const SUB_CHUNKS: usize = 2;

/// Streaming mono resampler for the capture path.
///
/// Accumulates bursts of samples until a full chunk is available, then emits
/// the resampled frames.
pub struct StreamResampler {
    fft: Fft<f32>,
    pending: Vec<f32>,
    out_buf: Vec<f32>,
    out_max: usize,
}

impl StreamResampler {
    pub fn new(from_rate: u32, to_rate: u32) -> Result<Self> {
        let fft = Fft::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, SUB_CHUNKS, 1, FixedSync::Input)
            .context("Failed to create resampler")?;
        let out_max = fft.output_frames_max();
        Ok(Self { fft, pending: Vec::with_capacity(CHUNK_SIZE * 2), out_buf: vec![0.0; out_max], out_max })
    }

    /// Feed a burst of samples; returns resampled frames once a chunk fills,
    /// `None` while more input is needed.
    pub fn push(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        self.pending.extend_from_slice(samples);
        if self.pending.len() < CHUNK_SIZE {
            return None;
        }

        let chunk: Vec<f32> = self.pending.drain(..CHUNK_SIZE).collect();
        let input = InterleavedSlice::new(&chunk, 1, CHUNK_SIZE).ok()?;
        let mut output = InterleavedSlice::new_mut(&mut self.out_buf, 1, self.out_max).ok()?;
        let (_, written) = self.fft.process_into_buffer(&input, &mut output, None).ok()?;

        (written > 0).then(|| self.out_buf[..written].to_vec())
    }
}

/// Resample a whole buffer at once (playback path).
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let mut fft = Fft::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, SUB_CHUNKS, 1, FixedSync::Input)
        .context("Failed to create resampler")?;

    let out_max = fft.output_frames_max();
    let mut out_buf = vec![0.0f32; out_max];

    let expected = (samples.len() as f64 * to_rate as f64 / from_rate as f64) as usize;
    let mut out = Vec::with_capacity(expected + CHUNK_SIZE);

    for chunk in samples.chunks(CHUNK_SIZE) {
        // Zero-pad the tail chunk up to the FFT size
        let padded;
        let chunk = if chunk.len() < CHUNK_SIZE {
            padded = {
                let mut p = chunk.to_vec();
                p.resize(CHUNK_SIZE, 0.0);
                p
            };
            &padded[..]
        } else {
            chunk
        };

        let input = InterleavedSlice::new(chunk, 1, CHUNK_SIZE).context("Failed to create input adapter")?;
        let mut output = InterleavedSlice::new_mut(&mut out_buf, 1, out_max).context("Failed to create output adapter")?;

        let (_, written) =
            fft.process_into_buffer(&input, &mut output, None).map_err(|e| anyhow::anyhow!("Resampling error: {}", e))?;
        out.extend_from_slice(&out_buf[..written]);
    }

    // Trim excess padding, keeping a small safety margin
    out.truncate(expected + 100);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsampling_triples_the_length() {
        let samples = vec![0.0; 16000]; // 1 second at 16kHz
        let result = resample(&samples, 16000, 48000).unwrap();
        assert!(result.len() >= 48000 && result.len() <= 48100);
    }

    #[test]
    fn downsampling_thirds_the_length() {
        let samples = vec![0.0; 48000]; // 1 second at 48kHz
        let result = resample(&samples, 48000, 16000).unwrap();
        assert!(result.len() >= 15900 && result.len() <= 16100, "got {}", result.len());
    }

    #[test]
    fn matching_rates_pass_through() {
        let samples = vec![0.25f32; 1000];
        assert_eq!(resample(&samples, 16000, 16000).unwrap(), samples);
    }

    #[test]
    fn stream_resampler_emits_once_a_chunk_fills() {
        let mut resampler = StreamResampler::new(48000, 16000).unwrap();
        // 512-sample bursts: the first leaves the chunk half full
        assert!(resampler.push(&vec![0.0; 512]).is_none());
        assert!(resampler.push(&vec![0.0; 512]).is_some());
    }
}
