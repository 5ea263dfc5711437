// FFT module - short-time Fourier transform
//
// This module turns a segment of samples into a power spectrogram. Frames are
// centered (the signal is zero-padded by n_fft / 2 on both sides) and
// windowed with a periodic Hann window, so a segment of `len` samples yields
// `1 + len / hop_length` frames.

use ndarray::Array2;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// STFT processor producing power spectra `|X|^2`
pub struct StftProcessor {
    fft: Arc<dyn Fft<f32>>,
    n_fft: usize,
    hop_length: usize,
    /// Periodic Hann window (pre-computed)
    window: Vec<f32>,
}

impl StftProcessor {
    /// Create a new STFT processor
    ///
    /// # Arguments
    /// * `n_fft` - FFT window size (2048 for the instrument classifier)
    /// * `hop_length` - Samples between successive frames
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        let window = (0..n_fft)
            .map(|i| {
                0.5 * (1.0 - ((2.0 * std::f32::consts::PI * i as f32) / n_fft as f32).cos())
            })
            .collect();

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n_fft);

        Self {
            fft,
            n_fft,
            hop_length,
            window,
        }
    }

    /// Number of non-negative frequency bins
    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of frames produced for a signal of `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        1 + len / self.hop_length
    }

    /// Compute the power spectrogram of `signal`
    ///
    /// # Returns
    /// Array of shape `(n_fft / 2 + 1, frame_count(signal.len()))`
    pub fn power_spectrogram(&self, signal: &[f32]) -> Array2<f32> {
        let n_bins = self.n_bins();
        let n_frames = self.frame_count(signal.len());
        let pad = self.n_fft / 2;

        let mut spectrogram = Array2::<f32>::zeros((n_bins, n_frames));
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];

        for frame in 0..n_frames {
            // Frame start in padded coordinates; padded index p maps to signal[p - pad]
            let start = frame * self.hop_length;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let sample = (start + i)
                    .checked_sub(pad)
                    .and_then(|idx| signal.get(idx))
                    .copied()
                    .unwrap_or(0.0);
                *slot = Complex::new(sample * self.window[i], 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            for (bin, value) in buffer[..n_bins].iter().enumerate() {
                spectrogram[[bin, frame]] = value.norm_sqr();
            }
        }

        spectrogram
    }
}
