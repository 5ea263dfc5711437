//! Configuration for the inference pipeline
//!
//! The pipeline reads every tunable from an explicit configuration record
//! constructed once per process and passed into each component. Values can
//! be loaded from a JSON file; fields missing from the file keep their
//! defaults, which match the parameters the shipped classifier was trained
//! with.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::analysis::aggregation::AggregationStrategy;
use crate::classes::default_class_names;
use crate::error::PipelineError;

/// Target sample rate of the classifier
pub const DEFAULT_SAMPLE_RATE: u32 = 22_050;

/// Numerical-stability floor used by per-tensor standardization
pub const DEFAULT_EPS: f32 = 1e-8;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub inference: InferenceSettings,
    pub preprocess: PreprocessConfig,
}

/// Signal and model parameters shared by every pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sample rate of every waveform entering the pipeline (Hz)
    pub sample_rate: u32,
    /// Segment length in seconds
    pub window_seconds: f64,
    /// Stride between segment start times in seconds
    pub hop_seconds: f64,
    /// FFT window size in samples
    pub n_fft: usize,
    /// STFT hop length in samples
    pub hop_length: usize,
    /// Number of mel bands
    pub n_mels: usize,
    /// Fixed frame count of every feature tensor. Derived from the window
    /// and hop length when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_frames: Option<usize>,
    /// Floor added to the standard deviation during standardization
    pub eps: f32,
    /// Number of feature tensors per classifier forward pass
    pub batch_size: usize,
    /// Ordered class codes matching the classifier output layer
    pub class_names: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            window_seconds: 3.0,
            hop_seconds: 1.5,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            target_frames: None,
            eps: DEFAULT_EPS,
            batch_size: 16,
            class_names: default_class_names(),
        }
    }
}

impl PipelineConfig {
    /// Segment length in samples, truncated toward zero
    pub fn window_samples(&self) -> usize {
        (self.window_seconds * self.sample_rate as f64) as usize
    }

    /// Segment stride in samples, truncated toward zero
    pub fn hop_samples(&self) -> usize {
        (self.hop_seconds * self.sample_rate as f64) as usize
    }

    /// Fixed frame count of every feature tensor:
    /// `ceil(window_seconds * sample_rate / hop_length)` unless overridden.
    pub fn target_frames(&self) -> usize {
        self.target_frames
            .unwrap_or_else(|| self.window_samples().div_ceil(self.hop_length.max(1)))
    }

    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Shape of a single feature tensor: `(n_mels, target_frames)`
    pub fn feature_shape(&self) -> (usize, usize) {
        (self.n_mels, self.target_frames())
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |reason: &str| {
            Err(PipelineError::InvalidConfig {
                reason: reason.to_string(),
            })
        };

        if self.sample_rate == 0 {
            return invalid("sample_rate must be > 0");
        }
        if !(self.window_seconds > 0.0) {
            return invalid("window_seconds must be > 0");
        }
        if !(self.hop_seconds > 0.0) || self.hop_samples() == 0 {
            return invalid("hop_seconds must cover at least one sample");
        }
        if self.window_samples() == 0 {
            return invalid("window_seconds must cover at least one sample");
        }
        if self.n_fft == 0 {
            return invalid("n_fft must be > 0");
        }
        if self.hop_length == 0 {
            return invalid("hop_length must be > 0");
        }
        if self.n_mels == 0 {
            return invalid("n_mels must be > 0");
        }
        if self.target_frames() == 0 {
            return invalid("target_frames must be > 0");
        }
        if !(self.eps > 0.0) {
            return invalid("eps must be > 0");
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be > 0");
        }
        if self.class_names.is_empty() {
            return invalid("class_names must not be empty");
        }
        Ok(())
    }
}

/// Per-run user choices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceSettings {
    /// How per-segment predictions are reduced to one vector
    pub aggregation: AggregationStrategy,
    /// Display threshold above which a class is reported as present.
    /// Independent of the voting cutoff.
    pub threshold: f32,
    /// Moving-average window across segments (1 disables smoothing)
    pub smoothing: usize,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            aggregation: AggregationStrategy::Mean,
            threshold: 0.25,
            smoothing: 3,
        }
    }
}

impl InferenceSettings {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.smoothing == 0 {
            return Err(PipelineError::InvalidConfig {
                reason: "smoothing window must be >= 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(PipelineError::InvalidConfig {
                reason: format!("threshold must be within [0, 1] (got {})", self.threshold),
            });
        }
        Ok(())
    }
}

/// Optional waveform conditioning applied after decoding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Scale the waveform so its peak magnitude is 1.0
    pub peak_normalize: bool,
    /// Strip leading/trailing audio quieter than this many dB below peak
    pub trim_silence_db: Option<f32>,
    /// Truncate (or zero-pad) the waveform to this duration
    pub max_duration_seconds: Option<f64>,
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// * `Ok(AppConfig)` - Loaded and validated configuration, or the
    ///   defaults if the file does not exist
    /// * `Err` - If the file exists but is not valid JSON or holds values
    ///   out of range
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let config: AppConfig = match fs::read_to_string(path) {
            Ok(contents) => {
                let config =
                    serde_json::from_str(&contents).map_err(|err| PipelineError::InvalidConfig {
                        reason: format!("failed to parse {}: {}", path.display(), err),
                    })?;
                log::info!("[Config] Loaded configuration from {:?}", path);
                config
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::warn!(
                    "[Config] Config file {:?} not found. Using defaults.",
                    path
                );
                Self::default()
            }
            Err(err) => {
                return Err(PipelineError::InvalidConfig {
                    reason: format!("failed to read {}: {}", path.display(), err),
                })
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.pipeline.validate()?;
        self.inference.validate()
    }
}
