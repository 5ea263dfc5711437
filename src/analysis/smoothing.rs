// Temporal smoothing of per-segment predictions
//
// Each row is replaced by the mean of the rows within `window_size / 2` of
// it. Near the edges the window is clipped to the rows that exist, so
// boundary rows are averaged over fewer neighbours instead of being damped
// by zero padding.

use ndarray::{s, Array2, Axis};

/// Centered moving average across rows (segments), independently per column
///
/// `window_size <= 1` returns the input unchanged. Even sizes use the same
/// half-width as the next odd size down plus one, i.e. rows
/// `[i - window_size / 2, i + window_size / 2]`.
pub fn smooth_predictions(predictions: &Array2<f32>, window_size: usize) -> Array2<f32> {
    if window_size <= 1 {
        return predictions.clone();
    }

    let n_segments = predictions.nrows();
    let half = window_size / 2;
    let mut smoothed = predictions.clone();

    for i in 0..n_segments {
        let start = i.saturating_sub(half);
        let end = (i + half + 1).min(n_segments);
        if let Some(mean) = predictions.slice(s![start..end, ..]).mean_axis(Axis(0)) {
            smoothed.row_mut(i).assign(&mean);
        }
    }

    smoothed
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn assert_close(a: &Array2<f32>, b: &Array2<f32>) {
        assert_eq!(a.dim(), b.dim());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-6, "{} != {}", x, y);
        }
    }

    #[test]
    fn test_window_one_is_identity() {
        let predictions = array![[0.1f32, 0.9], [0.7, 0.3], [0.2, 0.2]];
        assert_eq!(smooth_predictions(&predictions, 1), predictions);
    }

    #[test]
    fn test_window_three_uses_clipped_edges() {
        let predictions = array![[0.0f32], [0.3], [0.6], [0.9]];
        let smoothed = smooth_predictions(&predictions, 3);
        // Row 0 averages rows 0..=1, row 3 averages rows 2..=3
        assert_close(&smoothed, &array![[0.15], [0.3], [0.6], [0.75]]);
    }

    #[test]
    fn test_even_window_is_centered() {
        let predictions = array![[0.0f32], [1.0], [0.0], [1.0], [0.0]];
        let smoothed = smooth_predictions(&predictions, 4);
        // half = 2: row 2 averages rows 0..=4
        assert!((smoothed[[2, 0]] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_columns_are_independent() {
        let predictions = array![[1.0f32, 0.0], [0.0, 0.0], [1.0, 0.0]];
        let smoothed = smooth_predictions(&predictions, 3);
        assert!(smoothed.column(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_output_within_window_hull() {
        let predictions = array![
            [0.9f32, 0.1, 0.5],
            [0.2, 0.8, 0.5],
            [0.4, 0.3, 0.0],
            [1.0, 0.0, 0.7],
            [0.0, 0.6, 0.2],
        ];
        for window in 1..=7 {
            let smoothed = smooth_predictions(&predictions, window);
            let half = window / 2;
            for i in 0..predictions.nrows() {
                let start = i.saturating_sub(half);
                let end = (i + half + 1).min(predictions.nrows());
                for c in 0..predictions.ncols() {
                    let column = predictions.slice(s![start..end, c]);
                    let lo = column.iter().copied().fold(f32::INFINITY, f32::min);
                    let hi = column.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                    let v = smoothed[[i, c]];
                    assert!(v >= lo - 1e-6 && v <= hi + 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_single_row_unchanged() {
        let predictions = array![[0.25f32, 0.75]];
        assert_eq!(smooth_predictions(&predictions, 5), predictions);
    }
}
