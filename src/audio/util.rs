//! Shared audio device helpers for capture and playback.

use anyhow::Result;
use cpal::traits::DeviceTrait;
use cpal::{Device, SampleFormat, SupportedStreamConfig, SupportedStreamConfigRange};

/// Human-readable device name, or "Unknown".
pub fn device_name(device: &Device) -> String {
    device.description().ok().map(|desc| desc.name().to_string()).unwrap_or_else(|| "Unknown".to_string())
}

/// Pick a stream configuration: F32 samples, mono or stereo, the target rate
/// when the device supports it, the nearest edge of the range otherwise.
pub fn select_config(configs: impl Iterator<Item = SupportedStreamConfigRange>, target_rate: u32) -> Result<SupportedStreamConfig> {
    let mut candidates: Vec<SupportedStreamConfigRange> =
        configs.filter(|c| c.channels() <= 2 && c.sample_format() == SampleFormat::F32).collect();

    if candidates.is_empty() {
        anyhow::bail!("No F32 mono/stereo configuration offered by the audio device");
    }

    if let Some(c) = candidates.iter().find(|c| (c.min_sample_rate()..=c.max_sample_rate()).contains(&target_rate)) {
        return Ok((*c).with_sample_rate(target_rate));
    }

    let c = candidates.remove(0);
    let rate = if target_rate < c.min_sample_rate() { c.min_sample_rate() } else { c.max_sample_rate() };
    Ok(c.with_sample_rate(rate))
}

/// Mix interleaved samples down to mono by averaging the channels.
pub fn mono_mix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels).map(|frame| frame.iter().sum::<f32>() / channels as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_mixes_to_mono_by_averaging() {
        let data = vec![0.5f32, 1.0, -0.5, -1.0];
        let result = mono_mix(&data, 2);
        assert_eq!(result, vec![0.75, -0.75]);
    }

    #[test]
    fn mono_passes_through() {
        let data = vec![0.1f32, 0.2, 0.3];
        assert_eq!(mono_mix(&data, 1), data);
    }
}
