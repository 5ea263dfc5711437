// Audio module - decoding and conditioning of input recordings
//
// Every recording entering the inference pipeline is reduced to a mono
// float waveform at the pipeline's configured sample rate. Decoding is the
// only place where channel layout and source sample rate are visible.
//
// Module organization:
// - loader: WAV (hound) and compressed formats (symphonia), resampling (rubato)
// - preprocess: downmix, peak normalization, silence trimming, duration fix

pub mod loader;
pub mod preprocess;

pub use loader::load_audio;

/// Mono waveform at a fixed sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}
