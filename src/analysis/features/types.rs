// Types module - feature tensor passed from extraction to the classifier

use ndarray::{Array2, ArrayView2};

use crate::error::PipelineError;

/// Normalized log-mel spectrogram of one segment
///
/// Shape is always `(n_mels, target_frames)` for a given configuration;
/// the classifier relies on it being constant.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTensor {
    data: Array2<f32>,
}

impl FeatureTensor {
    /// Wrap `data`, checking it has exactly `expected` shape
    pub fn new(data: Array2<f32>, expected: (usize, usize)) -> Result<Self, PipelineError> {
        if data.dim() != expected {
            return Err(PipelineError::ShapeMismatch {
                context: "feature tensor".to_string(),
                expected: vec![expected.0, expected.1],
                actual: data.shape().to_vec(),
            });
        }
        Ok(Self { data })
    }

    /// `(n_mels, frames)`
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    pub fn into_inner(self) -> Array2<f32> {
        self.data
    }
}
