// Pipeline error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Pipeline error code constants
///
/// Error code range: 2001-2009
pub struct PipelineErrorCodes {}

impl PipelineErrorCodes {
    /// Audio file could not be opened or decoded
    pub const DECODE_FAILED: i32 = 2001;

    /// Model artifact missing or incompatible
    pub const MODEL_LOAD_FAILED: i32 = 2002;

    /// A tensor or matrix did not have the fixed expected shape
    pub const SHAPE_MISMATCH: i32 = 2003;

    /// Aggregation strategy name not recognised
    pub const UNKNOWN_AGGREGATION: i32 = 2004;

    /// Configuration or run settings out of range
    pub const INVALID_CONFIG: i32 = 2005;

    /// Model forward pass failed at runtime
    pub const INFERENCE_FAILED: i32 = 2006;

    /// Aggregation requested over zero segments
    pub const EMPTY_PREDICTIONS: i32 = 2007;

    /// Report could not be serialized, parsed or written
    pub const REPORT_FAILED: i32 = 2008;

    /// Resampler could not be built or failed while processing
    pub const RESAMPLE_FAILED: i32 = 2009;
}

/// Log a pipeline error with structured context
///
/// Emits the numeric code, the component and the human-readable message
/// at error level.
pub fn log_pipeline_error(err: &PipelineError, context: &str) {
    error!(
        "Pipeline error in {}: code={}, component=InferencePipeline, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by the inference pipeline
///
/// Every variant is fatal for the run that produced it: the pipeline
/// never returns a partial result alongside an error.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Audio file unreadable, corrupt or without a decodable track
    DecodeFailed { path: String, reason: String },

    /// Model artifact missing, unloadable or with an incompatible signature
    ModelLoadFailed { path: String, reason: String },

    /// Internal invariant violation: shape differs from the fixed contract
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Aggregation strategy name not one of `mean`, `max`, `voting`
    UnknownAggregation { name: String },

    /// Configuration value out of range
    InvalidConfig { reason: String },

    /// Model forward pass failed
    InferenceFailed { reason: String },

    /// Aggregation over a matrix with no rows
    EmptyPredictions,

    /// Report serialization or file output failed
    ReportFailed { reason: String },

    /// Sample-rate conversion failed
    ResampleFailed { reason: String },
}

impl ErrorCode for PipelineError {
    fn code(&self) -> i32 {
        match self {
            PipelineError::DecodeFailed { .. } => PipelineErrorCodes::DECODE_FAILED,
            PipelineError::ModelLoadFailed { .. } => PipelineErrorCodes::MODEL_LOAD_FAILED,
            PipelineError::ShapeMismatch { .. } => PipelineErrorCodes::SHAPE_MISMATCH,
            PipelineError::UnknownAggregation { .. } => PipelineErrorCodes::UNKNOWN_AGGREGATION,
            PipelineError::InvalidConfig { .. } => PipelineErrorCodes::INVALID_CONFIG,
            PipelineError::InferenceFailed { .. } => PipelineErrorCodes::INFERENCE_FAILED,
            PipelineError::EmptyPredictions => PipelineErrorCodes::EMPTY_PREDICTIONS,
            PipelineError::ReportFailed { .. } => PipelineErrorCodes::REPORT_FAILED,
            PipelineError::ResampleFailed { .. } => PipelineErrorCodes::RESAMPLE_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            PipelineError::DecodeFailed { path, reason } => {
                format!("Failed to decode audio {}: {}", path, reason)
            }
            PipelineError::ModelLoadFailed { path, reason } => {
                format!("Failed to load model {}: {}", path, reason)
            }
            PipelineError::ShapeMismatch {
                context,
                expected,
                actual,
            } => {
                format!(
                    "Shape mismatch in {}: expected {:?}, got {:?}",
                    context, expected, actual
                )
            }
            PipelineError::UnknownAggregation { name } => {
                format!(
                    "Unknown aggregation method: {} (expected mean, max or voting)",
                    name
                )
            }
            PipelineError::InvalidConfig { reason } => {
                format!("Invalid configuration: {}", reason)
            }
            PipelineError::InferenceFailed { reason } => {
                format!("Model inference failed: {}", reason)
            }
            PipelineError::EmptyPredictions => {
                "Cannot aggregate an empty prediction matrix".to_string()
            }
            PipelineError::ReportFailed { reason } => {
                format!("Report export failed: {}", reason)
            }
            PipelineError::ResampleFailed { reason } => {
                format!("Resampling failed: {}", reason)
            }
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PipelineError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for PipelineError {}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::ReportFailed {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::ReportFailed {
            reason: err.to_string(),
        }
    }
}
