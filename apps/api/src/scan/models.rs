use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Inclusive bounds every persisted metric (and the average) must respect.
pub const METRIC_MIN: i32 = 40;
pub const METRIC_MAX: i32 = 85;

pub const DEFAULT_FACE_SHAPE_LABEL: &str = "oval";
pub const DEFAULT_HAIR_TYPE_LABEL: &str = "straight";

/// The six compatibility scores produced by a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HairMetrics {
    pub face_shape: i32,
    pub facial_ratio: i32,
    pub hair_type: i32,
    pub jawline: i32,
    pub hairline: i32,
    pub ear_shape: i32,
}

impl HairMetrics {
    /// Metric values keyed by their wire names, in a fixed order.
    pub fn named(&self) -> [(&'static str, i32); 6] {
        [
            ("faceShape", self.face_shape),
            ("facialRatio", self.facial_ratio),
            ("hairType", self.hair_type),
            ("jawline", self.jawline),
            ("hairline", self.hairline),
            ("earShape", self.ear_shape),
        ]
    }

    pub fn clamped(self) -> Self {
        Self {
            face_shape: clamp_metric(self.face_shape),
            facial_ratio: clamp_metric(self.facial_ratio),
            hair_type: clamp_metric(self.hair_type),
            jawline: clamp_metric(self.jawline),
            hairline: clamp_metric(self.hairline),
            ear_shape: clamp_metric(self.ear_shape),
        }
    }

    /// Rounded arithmetic mean, clamped to the metric range.
    pub fn average(&self) -> i32 {
        let sum: i32 = self.named().iter().map(|(_, v)| v).sum();
        let mean = f64::from(sum) / 6.0;
        clamp_metric(mean.round() as i32)
    }

    /// Returns the first metric outside `[METRIC_MIN, METRIC_MAX]`.
    pub fn out_of_range(&self) -> Option<(&'static str, i32)> {
        self.named()
            .into_iter()
            .find(|(_, v)| !(METRIC_MIN..=METRIC_MAX).contains(v))
    }
}

fn clamp_metric(value: i32) -> i32 {
    value.clamp(METRIC_MIN, METRIC_MAX)
}

/// The last completed scan. Stored in a single slot and overwritten wholesale.
///
/// Field names match the JSON the mobile client already writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSession {
    #[serde(rename = "uri")]
    pub image_uri: String,
    pub metrics: HairMetrics,
    pub average: i32,
    /// Creation time, epoch milliseconds.
    pub timestamp: i64,
    #[serde(default = "default_face_shape_label")]
    pub face_shape_label: String,
    #[serde(default = "default_hair_type_label")]
    pub hair_type_label: String,
}

fn default_face_shape_label() -> String {
    DEFAULT_FACE_SHAPE_LABEL.to_string()
}

fn default_hair_type_label() -> String {
    DEFAULT_HAIR_TYPE_LABEL.to_string()
}

impl ScanSession {
    /// Builds a session from metrics that must already lie in range.
    /// The average and timestamp are derived here, never taken from callers.
    pub fn new(
        image_uri: impl Into<String>,
        metrics: HairMetrics,
        face_shape_label: impl Into<String>,
        hair_type_label: impl Into<String>,
    ) -> Result<Self, String> {
        let session = Self {
            image_uri: image_uri.into(),
            average: metrics.average(),
            metrics,
            timestamp: Utc::now().timestamp_millis(),
            face_shape_label: face_shape_label.into(),
            hair_type_label: hair_type_label.into(),
        };
        session.validate()?;
        Ok(session)
    }

    /// Checks a record that did not come through `new`, e.g. one read back
    /// from disk: every metric in range and `average` equal to the rounded mean.
    pub fn validate(&self) -> Result<(), String> {
        if let Some((name, value)) = self.metrics.out_of_range() {
            return Err(format!(
                "metric '{name}' = {value} is outside {METRIC_MIN}..={METRIC_MAX}"
            ));
        }
        let expected = self.metrics.average();
        if self.average != expected {
            return Err(format!(
                "average {} does not match metrics (expected {expected})",
                self.average
            ));
        }
        Ok(())
    }
}
