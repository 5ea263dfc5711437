// Mel filterbank
//
// Triangular filters on the Slaney mel scale (linear below 1 kHz,
// logarithmic above), area-normalized so each filter has roughly constant
// energy per channel. This matches the filterbank the classifier's training
// features were computed with.

use ndarray::Array2;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert a frequency in Hz to the Slaney mel scale
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert a Slaney mel value back to Hz
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        mel * F_SP
    }
}

/// Mel filterbank matrix of shape `(n_mels, n_fft / 2 + 1)`
pub struct MelFilterbank {
    weights: Array2<f32>,
}

impl MelFilterbank {
    /// Build a filterbank spanning 0 Hz to Nyquist
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize) -> Self {
        Self::with_range(sample_rate, n_fft, n_mels, 0.0, sample_rate as f64 / 2.0)
    }

    pub fn with_range(sample_rate: u32, n_fft: usize, n_mels: usize, fmin: f64, fmax: f64) -> Self {
        let n_bins = n_fft / 2 + 1;
        let fft_freqs: Vec<f64> = (0..n_bins)
            .map(|bin| bin as f64 * sample_rate as f64 / n_fft as f64)
            .collect();

        // n_mels + 2 band edges evenly spaced in mel
        let mel_min = hz_to_mel(fmin);
        let mel_max = hz_to_mel(fmax);
        let mel_edges: Vec<f64> = (0..n_mels + 2)
            .map(|i| {
                let mel = mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64;
                mel_to_hz(mel)
            })
            .collect();

        let mut weights = Array2::<f32>::zeros((n_mels, n_bins));
        for band in 0..n_mels {
            let left = mel_edges[band];
            let center = mel_edges[band + 1];
            let right = mel_edges[band + 2];
            let enorm = 2.0 / (right - left);

            for (bin, &freq) in fft_freqs.iter().enumerate() {
                let lower = (freq - left) / (center - left);
                let upper = (right - freq) / (right - center);
                let weight = lower.min(upper).max(0.0);
                weights[[band, bin]] = (weight * enorm) as f32;
            }
        }

        Self { weights }
    }

    pub fn n_mels(&self) -> usize {
        self.weights.nrows()
    }

    /// Project a power spectrogram `(n_bins, frames)` onto mel bands
    pub fn apply(&self, power: &Array2<f32>) -> Array2<f32> {
        self.weights.dot(power)
    }
}
