// Analysis module - instrument recognition pipeline
//
// This module orchestrates one inference run over a recording, turning a
// mono waveform into a ResultRecord.
//
// Architecture:
// - InferencePipeline: owns the stage objects, built once per configuration
// - Pipeline: Segmenter → MelFeatureExtractor → ClassifierAdapter
//             → smooth_predictions → AggregationStrategy → ResultRecord
// - Output: ResultRecord (and its InferenceReport JSON form)
//
// Runs are independent: no state survives between calls, and the model is
// only ever read.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::audio::{self, preprocess, Waveform};
use crate::config::{AppConfig, InferenceSettings, PipelineConfig, PreprocessConfig};
use crate::error::PipelineError;

pub mod aggregation;
pub mod classifier;
pub mod features;
pub mod result;
pub mod segmenter;
pub mod smoothing;

use classifier::{ClassifierAdapter, InstrumentModel};
use features::MelFeatureExtractor;
use result::ResultRecord;
use segmenter::Segmenter;
use smoothing::smooth_predictions;

/// End-to-end inference over one recording at a time
pub struct InferencePipeline {
    config: PipelineConfig,
    preprocess: PreprocessConfig,
    segmenter: Segmenter,
    extractor: MelFeatureExtractor,
    classifier: ClassifierAdapter,
}

impl InferencePipeline {
    /// Build a pipeline around a loaded model
    ///
    /// # Errors
    /// `InvalidConfig` if `config` fails validation
    pub fn new(
        config: PipelineConfig,
        model: Arc<dyn InstrumentModel>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let segmenter = Segmenter::from_config(&config);
        let extractor = MelFeatureExtractor::new(&config);
        let classifier = ClassifierAdapter::new(model, &config);

        tracing::info!(
            "[Pipeline] Ready: {} Hz, window {} s / hop {} s, features {:?}, {} classes",
            config.sample_rate,
            config.window_seconds,
            config.hop_seconds,
            extractor.output_shape(),
            config.num_classes()
        );

        Ok(Self {
            config,
            preprocess: PreprocessConfig::default(),
            segmenter,
            extractor,
            classifier,
        })
    }

    /// Build a pipeline from a full application configuration
    pub fn from_app_config(
        app_config: &AppConfig,
        model: Arc<dyn InstrumentModel>,
    ) -> Result<Self, PipelineError> {
        Ok(Self::new(app_config.pipeline.clone(), model)?
            .with_preprocess(app_config.preprocess.clone()))
    }

    /// Conditioning applied by [`InferencePipeline::load`]
    pub fn with_preprocess(mut self, preprocess: PreprocessConfig) -> Self {
        self.preprocess = preprocess;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Decode a recording at the pipeline rate and apply preprocessing
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Waveform, PipelineError> {
        let waveform = audio::load_audio(path, self.config.sample_rate)?;
        Ok(preprocess::condition(waveform, &self.preprocess))
    }

    /// Load and analyse a recording, identified by its file name
    pub fn analyze_file<P: AsRef<Path>>(
        &self,
        path: P,
        settings: &InferenceSettings,
    ) -> Result<ResultRecord, PipelineError> {
        let path = path.as_ref();
        let audio_file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let waveform = self.load(path)?;
        self.analyze(&waveform, settings, &audio_file)
    }

    /// Run every stage on a mono waveform
    ///
    /// # Arguments
    /// * `waveform` - Mono samples at the pipeline sample rate
    /// * `settings` - Aggregation strategy, display threshold, smoothing window
    /// * `audio_file` - Identifier stored in the result
    ///
    /// # Errors
    /// `InvalidConfig` for invalid settings or a waveform at another sample
    /// rate. Any stage error aborts the run; no partial result is returned.
    pub fn analyze(
        &self,
        waveform: &Waveform,
        settings: &InferenceSettings,
        audio_file: &str,
    ) -> Result<ResultRecord, PipelineError> {
        settings.validate()?;
        if waveform.sample_rate != self.config.sample_rate {
            return Err(PipelineError::InvalidConfig {
                reason: format!(
                    "waveform sample rate {} Hz does not match pipeline rate {} Hz",
                    waveform.sample_rate, self.config.sample_rate
                ),
            });
        }

        let started = Instant::now();

        let segments = self.segmenter.segment(&waveform.samples);
        let features = self.extractor.extract_all(&segments)?;
        let raw_predictions = self.classifier.predict(&features)?;
        let predictions = smooth_predictions(&raw_predictions, settings.smoothing);
        let aggregated = settings.aggregation.aggregate(&predictions)?;

        let times: Vec<f64> = segments.iter().map(|segment| segment.start_time).collect();
        let record = ResultRecord::assemble(
            audio_file,
            &self.config,
            settings,
            times,
            predictions,
            aggregated,
        )?;

        tracing::info!(
            "[Pipeline] {}: {:.2} s of audio, {} segments, aggregation={}, smoothing={} ({} ms)",
            audio_file,
            waveform.duration_seconds(),
            record.num_segments(),
            settings.aggregation,
            settings.smoothing,
            started.elapsed().as_millis()
        );

        Ok(record)
    }
}
