// FeatureExtractor - log-mel features for instrument classification
//
// This module converts a fixed-length audio segment into the fixed-shape
// feature tensor the classifier was trained on.
//
// Module organization:
// - types: Data structures (FeatureTensor)
// - fft: Centered STFT power spectrogram
// - mel: Slaney mel filterbank
// - mod.rs: Coordinator (MelFeatureExtractor)
//
// Extraction steps per segment:
// 1. Power spectrogram (n_fft = 2048, hop = 512, periodic Hann)
// 2. Mel projection (128 bands, 0 Hz to Nyquist)
// 3. Power to dB, referenced to the tensor's own peak, floored 80 dB below it
// 4. Standardization: (x - mean) / (std + eps)
// 5. Frame axis fixed to target_frames (truncate, or zero-pad at the end)

mod fft;
mod mel;
mod types;

pub use mel::{hz_to_mel, mel_to_hz, MelFilterbank};
pub use types::FeatureTensor;

use fft::StftProcessor;
use ndarray::{s, Array2};
use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::error::PipelineError;

/// Smallest power considered when converting to decibels
const AMIN: f32 = 1e-10;
/// Dynamic range kept below the peak, in dB
const TOP_DB: f32 = 80.0;

/// MelFeatureExtractor coordinates the feature extraction pipeline
///
/// Immutable after construction, so one instance can serve many segments
/// concurrently.
pub struct MelFeatureExtractor {
    stft: StftProcessor,
    filterbank: MelFilterbank,
    target_frames: usize,
    eps: f32,
}

impl MelFeatureExtractor {
    /// Create an extractor for the given pipeline configuration
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            stft: StftProcessor::new(config.n_fft, config.hop_length),
            filterbank: MelFilterbank::new(config.sample_rate, config.n_fft, config.n_mels),
            target_frames: config.target_frames(),
            eps: config.eps,
        }
    }

    /// Shape of every tensor this extractor produces
    pub fn output_shape(&self) -> (usize, usize) {
        (self.filterbank.n_mels(), self.target_frames)
    }

    /// Extract the feature tensor of one segment
    ///
    /// # Arguments
    /// * `segment` - Raw samples of one window
    ///
    /// # Returns
    /// Tensor of shape `(n_mels, target_frames)` whatever the segment holds
    /// (silence, noise or clipped signal)
    pub fn extract(&self, segment: &[f32]) -> Result<FeatureTensor, PipelineError> {
        let power = self.stft.power_spectrogram(segment);
        let mel = self.filterbank.apply(&power);

        let mut log_mel = power_to_db(&mel);
        standardize(&mut log_mel, self.eps);

        let fixed = fix_frames(log_mel, self.target_frames);
        FeatureTensor::new(fixed, self.output_shape())
    }

    /// Extract features for many segments in parallel, preserving order
    pub fn extract_all<S>(&self, segments: &[S]) -> Result<Vec<FeatureTensor>, PipelineError>
    where
        S: AsRef<[f32]> + Sync,
    {
        segments
            .par_iter()
            .map(|segment| self.extract(segment.as_ref()))
            .collect()
    }
}

/// Convert power to decibels relative to the largest value in `power`
///
/// Values are clipped to `TOP_DB` below the peak. An all-zero input maps to
/// an all-zero output.
pub fn power_to_db(power: &Array2<f32>) -> Array2<f32> {
    let peak = power.iter().copied().fold(0.0f32, f32::max);
    let ref_db = 10.0 * peak.max(AMIN).log10();

    let db = power.mapv(|p| 10.0 * p.max(AMIN).log10() - ref_db);
    let max_db = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    db.mapv(|v| v.max(max_db - TOP_DB))
}

/// Standardize in place to zero mean and unit variance
///
/// The standard deviation is floored by `eps`, so a constant tensor
/// becomes all zeros rather than NaN.
pub fn standardize(values: &mut Array2<f32>, eps: f32) {
    let n = values.len();
    if n == 0 {
        return;
    }

    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n as f64;
    let denom = variance.sqrt() + eps as f64;

    values.mapv_inplace(|v| ((v as f64 - mean) / denom) as f32);
}

/// Truncate or zero-pad the frame axis (axis 1) to exactly `target_frames`
pub fn fix_frames(features: Array2<f32>, target_frames: usize) -> Array2<f32> {
    let (rows, frames) = features.dim();
    if frames == target_frames {
        return features;
    }

    if frames > target_frames {
        return features.slice(s![.., ..target_frames]).to_owned();
    }

    let mut padded = Array2::<f32>::zeros((rows, target_frames));
    padded.slice_mut(s![.., ..frames]).assign(&features);
    padded
}
