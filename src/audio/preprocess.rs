// Waveform conditioning helpers
//
// Pure functions over sample buffers. None of them change the sample rate.

use super::Waveform;
use crate::config::PreprocessConfig;

/// Frame length used for silence detection
const TRIM_FRAME_LENGTH: usize = 2048;
/// Hop between silence-detection frames
const TRIM_HOP_LENGTH: usize = 512;
/// Smallest RMS considered when converting to decibels
const AMIN: f32 = 1e-10;

/// Average interleaved multi-channel samples down to mono
///
/// A trailing partial frame is averaged over the channels it holds.
pub fn stereo_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Scale samples so the largest magnitude becomes 1.0
///
/// Silent input is returned unchanged.
pub fn peak_normalize(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak <= f32::EPSILON {
        return;
    }

    for sample in samples.iter_mut() {
        *sample /= peak;
    }
}

/// Strip leading and trailing audio quieter than `top_db` below the loudest frame
///
/// Frame RMS is measured over 2048-sample frames with a 512-sample hop. A
/// final frame always ends on the last sample, so the tail is measured too.
/// A recording that is silent throughout trims to an empty buffer.
pub fn trim_silence(samples: &[f32], top_db: f32) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let starts = frame_starts(samples.len());
    let frame_rms: Vec<f32> = starts
        .iter()
        .map(|&start| {
            let end = (start + TRIM_FRAME_LENGTH).min(samples.len());
            let frame = &samples[start..end];
            (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt()
        })
        .collect();

    let peak_rms = frame_rms.iter().copied().fold(0.0f32, f32::max);
    if peak_rms <= AMIN {
        return Vec::new();
    }

    let ref_db = 20.0 * peak_rms.log10();
    let is_loud = |rms: f32| 20.0 * rms.max(AMIN).log10() - ref_db > -top_db;

    let first = frame_rms.iter().position(|&rms| is_loud(rms));
    let last = frame_rms.iter().rposition(|&rms| is_loud(rms));

    match (first, last) {
        (Some(first), Some(last)) => {
            let start = starts[first];
            let end = (starts[last] + TRIM_FRAME_LENGTH).min(samples.len());
            samples[start..end].to_vec()
        }
        _ => Vec::new(),
    }
}

/// Truncate or zero-pad samples to exactly `seconds` of audio
pub fn fix_duration(samples: &[f32], sample_rate: u32, seconds: f64) -> Vec<f32> {
    let target_len = (seconds.max(0.0) * sample_rate as f64).round() as usize;
    let mut fixed = samples[..samples.len().min(target_len)].to_vec();
    fixed.resize(target_len, 0.0);
    fixed
}

/// Apply the configured conditioning steps to a decoded waveform
///
/// Order: silence trim, duration fix, peak normalization. With the default
/// configuration the waveform is returned untouched.
pub fn condition(waveform: Waveform, config: &PreprocessConfig) -> Waveform {
    let Waveform {
        mut samples,
        sample_rate,
    } = waveform;

    if let Some(top_db) = config.trim_silence_db {
        let before = samples.len();
        samples = trim_silence(&samples, top_db);
        tracing::debug!(
            "[Preprocess] Trimmed silence: {} -> {} samples",
            before,
            samples.len()
        );
    }
    if let Some(seconds) = config.max_duration_seconds {
        samples = fix_duration(&samples, sample_rate, seconds);
    }
    if config.peak_normalize {
        peak_normalize(&mut samples);
    }

    Waveform::new(samples, sample_rate)
}

fn frame_starts(len: usize) -> Vec<usize> {
    let last_start = len.saturating_sub(TRIM_FRAME_LENGTH);
    let mut starts: Vec<usize> = (0..=last_start).step_by(TRIM_HOP_LENGTH).collect();
    if starts.last() != Some(&last_start) {
        starts.push(last_start);
    }
    starts
}
