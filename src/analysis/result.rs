// Result Assembler - canonical output of one inference run
//
// ResultRecord is built once at the end of a run and only read afterwards.
// InferenceReport is its plain-data JSON form:
//
// {
//   "audio_file": "...",
//   "segment_duration_sec": 3.0,
//   "hop_duration_sec": 1.5,
//   "aggregation": "mean",
//   "smoothing": 3,
//   "threshold": 0.25,
//   "classes": ["cel", ...],
//   "timeline": [{ "time_sec": 0.0, "intensity": { "cel": 0.1, ... } }, ...]
// }
//
// Assembly is repackaging only: no value is recomputed.

use ndarray::{Array1, Array2};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::analysis::aggregation::AggregationStrategy;
use crate::classes::display_name_for;
use crate::config::{InferenceSettings, PipelineConfig};
use crate::error::PipelineError;

/// Fraction of the threshold at which a class counts as borderline
const BORDERLINE_RATIO: f32 = 0.5;

/// Immutable record of one inference run
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    audio_file: String,
    segment_duration_sec: f64,
    hop_duration_sec: f64,
    aggregation: AggregationStrategy,
    threshold: f32,
    smoothing: usize,
    class_names: Vec<String>,
    times: Vec<f64>,
    predictions: Array2<f32>,
    aggregated: Array1<f32>,
}

impl ResultRecord {
    /// Package the outputs of a run
    ///
    /// # Arguments
    /// * `audio_file` - Identifier of the analysed recording
    /// * `times` - Segment start times, one per prediction row
    /// * `predictions` - Smoothed prediction matrix `(segments, classes)`
    /// * `aggregated` - Track-level vector, one value per class
    ///
    /// # Errors
    /// `ShapeMismatch` if the times, matrix, vector and class list disagree
    pub fn assemble(
        audio_file: impl Into<String>,
        config: &PipelineConfig,
        settings: &InferenceSettings,
        times: Vec<f64>,
        predictions: Array2<f32>,
        aggregated: Array1<f32>,
    ) -> Result<Self, PipelineError> {
        let num_classes = config.num_classes();
        let expected = vec![times.len(), num_classes];
        if predictions.shape() != expected.as_slice() {
            return Err(PipelineError::ShapeMismatch {
                context: "prediction matrix".to_string(),
                expected,
                actual: predictions.shape().to_vec(),
            });
        }
        if aggregated.len() != num_classes {
            return Err(PipelineError::ShapeMismatch {
                context: "aggregated vector".to_string(),
                expected: vec![num_classes],
                actual: vec![aggregated.len()],
            });
        }

        Ok(Self {
            audio_file: audio_file.into(),
            segment_duration_sec: config.window_seconds,
            hop_duration_sec: config.hop_seconds,
            aggregation: settings.aggregation,
            threshold: settings.threshold,
            smoothing: settings.smoothing,
            class_names: config.class_names.clone(),
            times,
            predictions,
            aggregated,
        })
    }

    pub fn audio_file(&self) -> &str {
        &self.audio_file
    }

    pub fn segment_duration_sec(&self) -> f64 {
        self.segment_duration_sec
    }

    pub fn hop_duration_sec(&self) -> f64 {
        self.hop_duration_sec
    }

    pub fn aggregation(&self) -> AggregationStrategy {
        self.aggregation
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn smoothing(&self) -> usize {
        self.smoothing
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Segment start times in seconds
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Smoothed prediction matrix `(segments, classes)`
    pub fn predictions(&self) -> &Array2<f32> {
        &self.predictions
    }

    pub fn aggregated(&self) -> &Array1<f32> {
        &self.aggregated
    }

    pub fn num_segments(&self) -> usize {
        self.times.len()
    }

    /// Aggregated score of a class by code
    pub fn score(&self, code: &str) -> Option<f32> {
        self.class_names
            .iter()
            .position(|name| name == code)
            .map(|index| self.aggregated[index])
    }

    /// One entry per segment, in segment order
    pub fn timeline(&self) -> Vec<TimelineEntry> {
        self.times
            .iter()
            .zip(self.predictions.rows())
            .map(|(&time_sec, row)| TimelineEntry {
                time_sec,
                intensity: Intensity(
                    self.class_names
                        .iter()
                        .cloned()
                        .zip(row.iter().copied())
                        .collect(),
                ),
            })
            .collect()
    }

    /// Every class with its aggregated score and presence tier, in class order
    pub fn detections(&self) -> Vec<Detection> {
        self.class_names
            .iter()
            .zip(self.aggregated.iter())
            .map(|(code, &score)| Detection {
                code: code.clone(),
                display_name: display_name_for(code).to_string(),
                score,
                presence: Presence::classify(score, self.threshold),
            })
            .collect()
    }

    /// Classes at or above the threshold, highest score first
    pub fn detected(&self) -> Vec<Detection> {
        let mut detected: Vec<Detection> = self
            .detections()
            .into_iter()
            .filter(|d| d.presence == Presence::Detected)
            .collect();
        detected.sort_by(|a, b| b.score.total_cmp(&a.score));
        detected
    }

    /// Plain-data form for serialization
    pub fn to_report(&self) -> InferenceReport {
        InferenceReport {
            audio_file: self.audio_file.clone(),
            segment_duration_sec: self.segment_duration_sec,
            hop_duration_sec: self.hop_duration_sec,
            aggregation: self.aggregation,
            smoothing: self.smoothing,
            threshold: self.threshold,
            classes: self.class_names.clone(),
            timeline: self.timeline(),
        }
    }
}

/// How confidently a class is reported as present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// Score at or above the threshold
    Detected,
    /// Score at or above half the threshold
    Borderline,
    Absent,
}

impl Presence {
    pub fn classify(score: f32, threshold: f32) -> Self {
        if score >= threshold {
            Presence::Detected
        } else if score >= threshold * BORDERLINE_RATIO {
            Presence::Borderline
        } else {
            Presence::Absent
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Presence::Detected => "detected",
            Presence::Borderline => "borderline",
            Presence::Absent => "absent",
        }
    }
}

/// Aggregated score of one class with its presence tier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub code: String,
    pub display_name: String,
    pub score: f32,
    pub presence: Presence,
}

/// Serializable form of a [`ResultRecord`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceReport {
    pub audio_file: String,
    pub segment_duration_sec: f64,
    pub hop_duration_sec: f64,
    pub aggregation: AggregationStrategy,
    pub smoothing: usize,
    pub threshold: f32,
    pub classes: Vec<String>,
    pub timeline: Vec<TimelineEntry>,
}

impl InferenceReport {
    pub fn to_json_pretty(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the pretty-printed report to `path`
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), PipelineError> {
        let json = self.to_json_pretty()?;
        fs::write(path.as_ref(), json)?;
        tracing::info!("[Report] Wrote {}", path.as_ref().display());
        Ok(())
    }
}

/// Class probabilities of one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub time_sec: f64,
    pub intensity: Intensity,
}

/// Ordered `class_code -> probability` map
///
/// Serialized as a JSON object whose keys keep class order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Intensity(pub Vec<(String, f32)>);

impl Intensity {
    pub fn get(&self, code: &str) -> Option<f32> {
        self.0
            .iter()
            .find(|(name, _)| name == code)
            .map(|&(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Intensity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Intensity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IntensityVisitor;

        impl<'de> Visitor<'de> for IntensityVisitor {
            type Value = Intensity;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of class codes to probabilities")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Intensity, M::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, f32>()? {
                    entries.push((name, value));
                }
                Ok(Intensity(entries))
            }
        }

        deserializer.deserialize_map(IntensityVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn three_class_config() -> PipelineConfig {
        PipelineConfig {
            class_names: vec!["pia".into(), "gel".into(), "voi".into()],
            ..PipelineConfig::default()
        }
    }

    fn sample_record() -> ResultRecord {
        let predictions = array![[0.9f32, 0.1, 0.123_456_79], [0.7, 0.2, 0.3], [0.8, 0.05, 0.6]];
        let aggregated = array![0.8f32, 0.116_666_67, 0.341_152_26];
        ResultRecord::assemble(
            "song.wav",
            &three_class_config(),
            &InferenceSettings::default(),
            vec![0.0, 1.5, 3.0],
            predictions,
            aggregated,
        )
        .unwrap()
    }

    #[test]
    fn test_timeline_matches_rows() {
        let record = sample_record();
        let timeline = record.timeline();

        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline[1].time_sec, 1.5);
        assert_eq!(timeline[1].intensity.get("pia"), Some(0.7));
        assert_eq!(timeline[2].intensity.get("voi"), Some(0.6));
        let order: Vec<&str> = timeline[0].intensity.iter().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["pia", "gel", "voi"]);
    }

    #[test]
    fn test_assemble_rejects_misaligned_times() {
        let result = ResultRecord::assemble(
            "song.wav",
            &three_class_config(),
            &InferenceSettings::default(),
            vec![0.0, 1.5],
            Array2::zeros((3, 3)),
            Array1::zeros(3),
        );
        assert!(matches!(result, Err(PipelineError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_assemble_rejects_wrong_class_count() {
        let result = ResultRecord::assemble(
            "song.wav",
            &three_class_config(),
            &InferenceSettings::default(),
            vec![0.0],
            Array2::zeros((1, 3)),
            Array1::zeros(4),
        );
        assert!(matches!(result, Err(PipelineError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_report_shape() {
        let json = sample_record().to_report().to_json_pretty().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["audio_file"], "song.wav");
        assert_eq!(value["segment_duration_sec"], 3.0);
        assert_eq!(value["hop_duration_sec"], 1.5);
        assert_eq!(value["aggregation"], "mean");
        assert_eq!(value["smoothing"], 3);
        assert_eq!(value["classes"], serde_json::json!(["pia", "gel", "voi"]));
        assert_eq!(value["timeline"].as_array().unwrap().len(), 3);
        assert_eq!(value["timeline"][2]["time_sec"], 3.0);
        assert!(value["timeline"][0]["intensity"]["gel"].is_number());
    }

    #[test]
    fn test_intensity_keys_keep_class_order() {
        let json = sample_record().to_report().to_json_pretty().unwrap();
        let pia = json.find("\"pia\": 0.9").unwrap();
        let gel = json.find("\"gel\": 0.1").unwrap();
        let voi = json.find("\"voi\": 0.12345679").unwrap();
        assert!(pia < gel && gel < voi);
    }

    #[test]
    fn test_report_json_round_trip() {
        let report = sample_record().to_report();
        let parsed = InferenceReport::from_json(&report.to_json_pretty().unwrap()).unwrap();

        assert_eq!(parsed, report);
        assert_eq!(parsed.classes, vec!["pia", "gel", "voi"]);
        assert_eq!(parsed.timeline[0].intensity.get("voi"), Some(0.123_456_79));
    }

    #[test]
    fn test_malformed_report_is_error() {
        assert!(matches!(
            InferenceReport::from_json("{\"audio_file\": 3}"),
            Err(PipelineError::ReportFailed { .. })
        ));
    }

    #[test]
    fn test_write_to_file() {
        let path = std::env::temp_dir().join("instrunet_report_test.json");
        let report = sample_record().to_report();
        report.write_to(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(InferenceReport::from_json(&contents).unwrap(), report);
    }

    #[test]
    fn test_presence_tiers() {
        assert_eq!(Presence::classify(0.25, 0.25), Presence::Detected);
        assert_eq!(Presence::classify(0.125, 0.25), Presence::Borderline);
        assert_eq!(Presence::classify(0.124, 0.25), Presence::Absent);
    }

    #[test]
    fn test_detected_sorted_by_score() {
        let record = sample_record();
        let detected = record.detected();

        let codes: Vec<&str> = detected.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["pia", "voi"]);
        assert_eq!(detected[0].display_name, "Piano");

        let detections = record.detections();
        assert_eq!(detections.len(), 3);
        assert_eq!(detections[1].presence, Presence::Absent);
    }

    #[test]
    fn test_score_lookup() {
        let record = sample_record();
        assert_eq!(record.score("pia"), Some(0.8));
        assert_eq!(record.score("cel"), None);
    }
}
