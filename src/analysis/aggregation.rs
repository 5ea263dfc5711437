// Aggregation of per-segment predictions into one track-level vector
//
// Strategies:
// - mean: column-wise arithmetic mean
// - max: column-wise maximum (peak confidence)
// - voting: fraction of segments whose probability exceeds VOTING_CUTOFF
//
// The voting cutoff is a fixed hard-decision boundary. It is unrelated to
// the user-facing detection threshold applied to the aggregated vector.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// Hard-decision cutoff for the voting strategy
pub const VOTING_CUTOFF: f32 = 0.5;

/// How per-segment predictions are reduced to one vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationStrategy {
    Mean,
    Max,
    Voting,
}

impl AggregationStrategy {
    pub const ALL: [AggregationStrategy; 3] = [
        AggregationStrategy::Mean,
        AggregationStrategy::Max,
        AggregationStrategy::Voting,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AggregationStrategy::Mean => "mean",
            AggregationStrategy::Max => "max",
            AggregationStrategy::Voting => "voting",
        }
    }

    /// Reduce a `(segments, classes)` matrix to one value per class
    ///
    /// # Errors
    /// `EmptyPredictions` if the matrix has no rows.
    pub fn aggregate(self, predictions: &Array2<f32>) -> Result<Array1<f32>, PipelineError> {
        let n_segments = predictions.nrows();
        if n_segments == 0 {
            return Err(PipelineError::EmptyPredictions);
        }

        let aggregated = match self {
            AggregationStrategy::Mean => predictions
                .mean_axis(Axis(0))
                .ok_or(PipelineError::EmptyPredictions)?,
            AggregationStrategy::Max => {
                predictions.fold_axis(Axis(0), f32::NEG_INFINITY, |acc, &v| acc.max(v))
            }
            AggregationStrategy::Voting => {
                let votes = predictions.fold_axis(Axis(0), 0usize, |count, &v| {
                    if v > VOTING_CUTOFF {
                        count + 1
                    } else {
                        *count
                    }
                });
                votes.mapv(|count| count as f32 / n_segments as f32)
            }
        };

        Ok(aggregated)
    }
}

impl fmt::Display for AggregationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationStrategy {
    type Err = PipelineError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "mean" => Ok(AggregationStrategy::Mean),
            "max" => Ok(AggregationStrategy::Max),
            "voting" => Ok(AggregationStrategy::Voting),
            other => Err(PipelineError::UnknownAggregation {
                name: other.to_string(),
            }),
        }
    }
}

/// Aggregate by strategy name
///
/// # Errors
/// `UnknownAggregation` for any name other than `mean`, `max` or `voting`;
/// no vector is produced in that case.
pub fn aggregate_predictions(
    predictions: &Array2<f32>,
    method: &str,
) -> Result<Array1<f32>, PipelineError> {
    method.parse::<AggregationStrategy>()?.aggregate(predictions)
}
