//! Vision Scorer — asks the vision model to rate hairstyle/face compatibility.
//!
//! The model's raw scores are only gated and clamped here; the scoring itself
//! lives upstream.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::llm_client::prompts::HAIR_ANALYSIS_PROMPT;
use crate::llm_client::{GeminiClient, GenerationConfig, LlmError, Part, VISION_MODEL};
use crate::scan::models::{
    HairMetrics, ScanSession, DEFAULT_FACE_SHAPE_LABEL, DEFAULT_HAIR_TYPE_LABEL,
};

/// Score assumed for any metric the model leaves out.
const FALLBACK_SCORE: f64 = 62.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VisionError {
    #[error("No clear face/hair detected")]
    NoFace,

    #[error("{0}")]
    Api(String),
}

/// A successful analysis, metrics already clamped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HairAnalysis {
    pub metrics: HairMetrics,
    pub average: i32,
    pub face_shape_label: String,
    pub hair_type_label: String,
}

impl HairAnalysis {
    pub fn into_session(self, image_uri: impl Into<String>) -> Result<ScanSession, String> {
        ScanSession::new(
            image_uri,
            self.metrics,
            self.face_shape_label,
            self.hair_type_label,
        )
    }
}

/// The vision-scoring collaborator.
///
/// Carried in `AppState` as `Arc<dyn VisionScorer>`.
#[async_trait]
pub trait VisionScorer: Send + Sync {
    async fn analyze(&self, image_uri: &str) -> Result<HairAnalysis, VisionError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Model output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawAnalysis {
    face_detected: bool,
    validation: RawValidation,
    scores: RawScores,
    face_shape_label: Option<String>,
    hair_type_label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawValidation {
    head_fully_visible: Option<bool>,
    /// Older prompt revisions used this name.
    face_fully_visible: Option<bool>,
    hair_clearly_visible: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawScores {
    face_shape: Option<f64>,
    facial_ratio: Option<f64>,
    hair_type: Option<f64>,
    jawline: Option<f64>,
    hairline: Option<f64>,
    ear_shape: Option<f64>,
}

fn score(raw: Option<f64>) -> i32 {
    raw.unwrap_or(FALLBACK_SCORE).round() as i32
}

/// Applies the visibility gate and clamps scores into the metric range.
fn interpret(raw: RawAnalysis) -> Result<HairAnalysis, VisionError> {
    let head_visible = raw
        .validation
        .head_fully_visible
        .or(raw.validation.face_fully_visible)
        .unwrap_or(false);
    let hair_visible = raw.validation.hair_clearly_visible.unwrap_or(false);
    if !raw.face_detected || !head_visible || !hair_visible {
        return Err(VisionError::NoFace);
    }

    let s = &raw.scores;
    let metrics = HairMetrics {
        face_shape: score(s.face_shape),
        facial_ratio: score(s.facial_ratio),
        hair_type: score(s.hair_type),
        jawline: score(s.jawline),
        hairline: score(s.hairline),
        ear_shape: score(s.ear_shape),
    }
    .clamped();

    Ok(HairAnalysis {
        average: metrics.average(),
        metrics,
        face_shape_label: raw
            .face_shape_label
            .unwrap_or_else(|| DEFAULT_FACE_SHAPE_LABEL.to_string()),
        hair_type_label: raw
            .hair_type_label
            .unwrap_or_else(|| DEFAULT_HAIR_TYPE_LABEL.to_string()),
    })
}

/// Maps client failures to the one-line messages shown to users.
fn describe_llm_error(err: &LlmError) -> String {
    match err {
        LlmError::Unconfigured => "Missing API key".to_string(),
        LlmError::Api { status: 403, .. } => "API key invalid or lacks vision model access".to_string(),
        LlmError::Api { status: 400, .. } => "Invalid request format".to_string(),
        LlmError::Api { status, message } => format!("API error ({status}): {message}"),
        LlmError::EmptyContent => "No response from model".to_string(),
        LlmError::Parse(_) => "Invalid JSON from model".to_string(),
        LlmError::Http(e) => e.to_string(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini implementation
// ────────────────────────────────────────────────────────────────────────────

pub struct GeminiVisionScorer {
    llm: GeminiClient,
}

impl GeminiVisionScorer {
    pub fn new(llm: GeminiClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl VisionScorer for GeminiVisionScorer {
    async fn analyze(&self, image_uri: &str) -> Result<HairAnalysis, VisionError> {
        if !self.llm.is_configured() {
            return Err(VisionError::Api(describe_llm_error(&LlmError::Unconfigured)));
        }

        let path = image_uri.strip_prefix("file://").unwrap_or(image_uri);
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| VisionError::Api(format!("Could not read image: {e}")))?;

        let parts = [Part::text(HAIR_ANALYSIS_PROMPT), Part::jpeg(STANDARD.encode(bytes))];
        let raw: RawAnalysis = self
            .llm
            .call_json(VISION_MODEL, &parts, &GenerationConfig::structured_json())
            .await
            .map_err(|e| {
                error!("Vision analysis failed: {e}");
                VisionError::Api(describe_llm_error(&e))
            })?;

        let analysis = interpret(raw)?;
        info!(
            "Vision analysis complete: average={}, face_shape={}, hair_type={}",
            analysis.average, analysis.face_shape_label, analysis.hair_type_label
        );
        Ok(analysis)
    }
}
