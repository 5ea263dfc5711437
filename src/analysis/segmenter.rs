// Segmenter - overlapping fixed-length windows over a waveform
//
// Windows start at offset 0 and advance by a fixed hop. The last window is
// the first one that reaches the end of the waveform; it is zero-padded on
// the right. Even an empty waveform yields one (silent) window at time 0.

use crate::config::PipelineConfig;

/// Fixed-length slice of a waveform and the time it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Exactly `window_samples` samples
    pub samples: Vec<f32>,
    /// Index of the first sample in the source waveform
    pub start_sample: usize,
    /// `start_sample / sample_rate`, in seconds
    pub start_time: f64,
}

impl AsRef<[f32]> for Segment {
    fn as_ref(&self) -> &[f32] {
        &self.samples
    }
}

/// Splits waveforms into overlapping windows
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    window_samples: usize,
    hop_samples: usize,
    sample_rate: u32,
}

impl Segmenter {
    /// Create a segmenter from explicit sample counts
    ///
    /// # Arguments
    /// * `window_samples` - Samples per segment (must be > 0)
    /// * `hop_samples` - Samples between segment starts (must be > 0)
    /// * `sample_rate` - Used only to convert start offsets to seconds
    pub fn new(window_samples: usize, hop_samples: usize, sample_rate: u32) -> Self {
        Self {
            window_samples: window_samples.max(1),
            hop_samples: hop_samples.max(1),
            sample_rate,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.window_samples(),
            config.hop_samples(),
            config.sample_rate,
        )
    }

    /// Number of segments produced for a waveform of `len` samples:
    /// `ceil(max(len - window, 0) / hop) + 1`
    pub fn segment_count(&self, len: usize) -> usize {
        len.saturating_sub(self.window_samples)
            .div_ceil(self.hop_samples)
            + 1
    }

    /// Split `waveform` into segments in increasing start-time order
    pub fn segment(&self, waveform: &[f32]) -> Vec<Segment> {
        let count = self.segment_count(waveform.len());
        let mut segments = Vec::with_capacity(count);

        for index in 0..count {
            let start = index * self.hop_samples;
            let end = (start + self.window_samples).min(waveform.len());

            let mut samples = Vec::with_capacity(self.window_samples);
            if start < end {
                samples.extend_from_slice(&waveform[start..end]);
            }
            samples.resize(self.window_samples, 0.0);

            segments.push(Segment {
                samples,
                start_sample: start,
                start_time: start as f64 / self.sample_rate as f64,
            });
        }

        tracing::debug!(
            "[Segmenter] {} samples -> {} segments (window={}, hop={})",
            waveform.len(),
            segments.len(),
            self.window_samples,
            self.hop_samples
        );

        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter_16k() -> Segmenter {
        // 3.0 s window, 1.5 s hop at 16 kHz
        Segmenter::new(48_000, 24_000, 16_000)
    }

    #[test]
    fn test_six_seconds_yields_three_segments() {
        let waveform = vec![0.5f32; 96_000];
        let segments = segmenter_16k().segment(&waveform);

        let times: Vec<f64> = segments.iter().map(|s| s.start_time).collect();
        assert_eq!(times, vec![0.0, 1.5, 3.0]);
        assert!(segments.iter().all(|s| s.samples.len() == 48_000));
    }

    #[test]
    fn test_empty_waveform_yields_single_silent_segment() {
        let segments = segmenter_16k().segment(&[]);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_time, 0.0);
        assert_eq!(segments[0].samples.len(), 48_000);
        assert!(segments[0].samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_shorter_than_hop_yields_single_padded_segment() {
        let waveform = vec![1.0f32; 1000];
        let segments = segmenter_16k().segment(&waveform);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].samples[999], 1.0);
        assert_eq!(segments[0].samples[1000], 0.0);
    }

    #[test]
    fn test_tail_is_zero_padded() {
        // 4 s of audio: segments at 0.0 and 1.5 s; the second runs past the end
        let waveform = vec![1.0f32; 64_000];
        let segments = segmenter_16k().segment(&waveform);
        assert_eq!(segments.len(), 2);

        let tail = &segments[1];
        assert_eq!(tail.start_sample, 24_000);
        assert_eq!(tail.samples[39_999], 1.0);
        assert_eq!(tail.samples[40_000], 0.0);
        assert_eq!(tail.samples.len(), 48_000);
    }

    #[test]
    fn test_segment_count_formula() {
        let segmenter = Segmenter::new(100, 30, 1000);
        for len in 0..500usize {
            let expected = (len.saturating_sub(100) as f64 / 30.0).ceil() as usize + 1;
            let segments = segmenter.segment(&vec![0.1; len]);
            assert_eq!(segments.len(), expected, "len = {}", len);
            assert!(segments.iter().all(|s| s.samples.len() == 100));
            assert!(segments
                .windows(2)
                .all(|pair| pair[0].start_time < pair[1].start_time));
            // Last segment covers the tail, the one before it does not
            let last = segments.last().unwrap();
            assert!(last.start_sample + 100 >= len);
            if segments.len() > 1 {
                assert!(segments[segments.len() - 2].start_sample + 100 < len);
            }
        }
    }

    #[test]
    fn test_segments_overlap_by_window_minus_hop() {
        let waveform: Vec<f32> = (0..200).map(|i| i as f32).collect();
        let segments = Segmenter::new(100, 40, 1000).segment(&waveform);
        assert_eq!(segments[1].samples[0], segments[0].samples[40]);
        assert_eq!(segments[1].samples[59], segments[0].samples[99]);
    }
}
