// Classifier - boundary around the pre-trained instrument model
//
// The network itself is opaque: anything that maps a batch of feature
// tensors shaped (batch, n_mels, target_frames, 1) to a (batch, num_classes)
// probability matrix can serve as the model. `OnnxModel` wraps an ONNX
// Runtime session loaded from disk; closures implement the trait too, which
// is how tests substitute deterministic stubs.
//
// ClassifierAdapter owns batching: features are split into chunks of
// `batch_size`, stacked, sent through the model and reassembled in order.
// Output is identical for any batch size.

use ndarray::{s, Array2, Array4, Axis};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::analysis::features::FeatureTensor;
use crate::config::PipelineConfig;
use crate::error::PipelineError;

/// A pre-trained model mapping feature batches to class probabilities
///
/// Implementations must be read-only during inference: one instance is
/// shared across every run of a pipeline.
pub trait InstrumentModel: Send + Sync {
    /// Run a forward pass
    ///
    /// # Arguments
    /// * `batch` - Tensor of shape `(batch, n_mels, target_frames, 1)`
    ///
    /// # Returns
    /// Matrix of shape `(batch, num_classes)` with values in `[0, 1]`
    fn predict(&self, batch: Array4<f32>) -> Result<Array2<f32>, PipelineError>;
}

impl<F> InstrumentModel for F
where
    F: Fn(Array4<f32>) -> Result<Array2<f32>, PipelineError> + Send + Sync,
{
    fn predict(&self, batch: Array4<f32>) -> Result<Array2<f32>, PipelineError> {
        self(batch)
    }
}

/// Instrument model backed by an ONNX Runtime session
///
/// The graph is driven positionally: the feature batch feeds its first
/// input and probabilities are read from its first output.
pub struct OnnxModel {
    session: Mutex<Session>,
}

impl OnnxModel {
    /// Load a model artifact and check it accepts the configured input shape
    ///
    /// A zero batch of one tensor is pushed through the graph; the output
    /// must be `(1, num_classes)`.
    ///
    /// # Errors
    /// `ModelLoadFailed` if the file is missing, cannot be parsed, or has an
    /// incompatible signature. Inference cannot proceed without a model.
    pub fn load<P: AsRef<Path>>(path: P, config: &PipelineConfig) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let load_error = |reason: String| PipelineError::ModelLoadFailed {
            path: path.display().to_string(),
            reason,
        };

        if !path.exists() {
            return Err(load_error("model file not found".to_string()));
        }

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(1))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| load_error(e.to_string()))?;

        let model = Self {
            session: Mutex::new(session),
        };

        let (n_mels, frames) = config.feature_shape();
        let probe = model
            .predict(Array4::zeros((1, n_mels, frames, 1)))
            .map_err(|e| load_error(e.to_string()))?;
        if probe.dim() != (1, config.num_classes()) {
            return Err(load_error(format!(
                "expected output shape [1, {}], got {:?}",
                config.num_classes(),
                probe.shape()
            )));
        }

        tracing::info!(
            "[Classifier] Loaded {} (input [N, {}, {}, 1], output [N, {}])",
            path.display(),
            n_mels,
            frames,
            config.num_classes()
        );

        Ok(model)
    }
}

impl InstrumentModel for OnnxModel {
    fn predict(&self, batch: Array4<f32>) -> Result<Array2<f32>, PipelineError> {
        let inference_error = |reason: String| PipelineError::InferenceFailed { reason };

        let input_tensor = Tensor::from_array(batch).map_err(|e| inference_error(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| inference_error("model session lock poisoned".to_string()))?;
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| inference_error(e.to_string()))?;

        let (_, probs_value) = outputs
            .iter()
            .next()
            .ok_or_else(|| inference_error("model produced no output".to_string()))?;
        let (shape, data) = probs_value
            .try_extract_tensor::<f32>()
            .map_err(|e| inference_error(e.to_string()))?;
        let dims: Vec<usize> = shape.iter().map(|&x| x as usize).collect();

        match dims.as_slice() {
            &[rows, cols] => Array2::from_shape_vec((rows, cols), data.to_vec())
                .map_err(|e| inference_error(e.to_string())),
            other => Err(inference_error(format!(
                "expected a rank-2 output, got shape {:?}",
                other
            ))),
        }
    }
}

/// Batches feature tensors through an [`InstrumentModel`]
#[derive(Clone)]
pub struct ClassifierAdapter {
    model: Arc<dyn InstrumentModel>,
    batch_size: usize,
    feature_shape: (usize, usize),
    num_classes: usize,
}

impl ClassifierAdapter {
    pub fn new(model: Arc<dyn InstrumentModel>, config: &PipelineConfig) -> Self {
        Self {
            model,
            batch_size: config.batch_size.max(1),
            feature_shape: config.feature_shape(),
            num_classes: config.num_classes(),
        }
    }

    /// Override the number of tensors per forward pass
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Predict one probability vector per feature tensor, in input order
    ///
    /// # Returns
    /// Prediction matrix of shape `(features.len(), num_classes)`
    pub fn predict(&self, features: &[FeatureTensor]) -> Result<Array2<f32>, PipelineError> {
        let mut predictions = Array2::<f32>::zeros((features.len(), self.num_classes));

        for (chunk_index, chunk) in features.chunks(self.batch_size).enumerate() {
            let batch = self.stack(chunk)?;
            let output = self.model.predict(batch)?;

            if output.dim() != (chunk.len(), self.num_classes) {
                return Err(PipelineError::ShapeMismatch {
                    context: "classifier output".to_string(),
                    expected: vec![chunk.len(), self.num_classes],
                    actual: output.shape().to_vec(),
                });
            }
            if output.iter().any(|v| !v.is_finite()) {
                return Err(PipelineError::InferenceFailed {
                    reason: "model produced non-finite probabilities".to_string(),
                });
            }

            let start = chunk_index * self.batch_size;
            predictions
                .slice_mut(s![start..start + chunk.len(), ..])
                .assign(&output);
        }

        tracing::debug!(
            "[Classifier] Predicted {} segments in batches of {}",
            features.len(),
            self.batch_size
        );

        Ok(predictions)
    }

    /// Stack tensors into `(batch, n_mels, frames, 1)`
    fn stack(&self, chunk: &[FeatureTensor]) -> Result<Array4<f32>, PipelineError> {
        let (n_mels, frames) = self.feature_shape;
        let mut batch = Array4::<f32>::zeros((chunk.len(), n_mels, frames, 1));

        for (mut slot, tensor) in batch.axis_iter_mut(Axis(0)).zip(chunk) {
            if tensor.shape() != self.feature_shape {
                return Err(PipelineError::ShapeMismatch {
                    context: "classifier input".to_string(),
                    expected: vec![n_mels, frames],
                    actual: vec![tensor.shape().0, tensor.shape().1],
                });
            }
            slot.index_axis_mut(Axis(2), 0).assign(&tensor.view());
        }

        Ok(batch)
    }
}
