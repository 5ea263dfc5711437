// InstruNet Core - musical instrument recognition
// Segmented log-mel inference over a pre-trained multi-label classifier

// Module declarations
pub mod analysis;
pub mod audio;
pub mod classes;
pub mod config;
pub mod error;

// Re-exports for convenience
pub use analysis::aggregation::{aggregate_predictions, AggregationStrategy, VOTING_CUTOFF};
pub use analysis::classifier::{ClassifierAdapter, InstrumentModel, OnnxModel};
pub use analysis::features::{FeatureTensor, MelFeatureExtractor};
pub use analysis::result::{Detection, InferenceReport, Presence, ResultRecord, TimelineEntry};
pub use analysis::segmenter::{Segment, Segmenter};
pub use analysis::smoothing::smooth_predictions;
pub use analysis::InferencePipeline;
pub use audio::{load_audio, Waveform};
pub use classes::{InstrumentClass, CLASS_CODES, NUM_CLASSES};
pub use config::{AppConfig, InferenceSettings, PipelineConfig, PreprocessConfig};
pub use error::{ErrorCode, PipelineError};

/// Install the stderr `tracing` subscriber
///
/// `log` records (configuration loading) are forwarded to the same
/// subscriber. Calling this more than once is harmless.
pub fn init_logging(max_level: tracing::Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
