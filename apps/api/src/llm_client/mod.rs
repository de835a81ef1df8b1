/// LLM Client — the single point of entry for all Gemini API calls in Hairiva.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// Chat completion goes through the `TextCompleter` trait, photo analysis
/// through `GeminiClient::call_json`.
///
/// No retries happen here. A failed call is reported once and the caller
/// decides what the user sees.
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Model used for coach chat completions.
pub const CHAT_MODEL: &str = "gemini-2.0-flash";
/// Model used for photo analysis.
pub const VISION_MODEL: &str = "gemini-1.5-pro";
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Gemini API key not configured")]
    Unconfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned no text content")]
    EmptyContent,
}

impl LlmError {
    /// True when the upstream answered but the payload was unusable.
    pub fn is_malformed(&self) -> bool {
        matches!(self, LlmError::Parse(_) | LlmError::EmptyContent)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request / response wire types
// ────────────────────────────────────────────────────────────────────────────

/// Sampling settings sent as `generationConfig`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

impl Default for GenerationConfig {
    /// Chat defaults.
    fn default() -> Self {
        Self {
            max_output_tokens: 400,
            temperature: 0.4,
            top_p: Some(0.8),
            top_k: Some(20),
            response_mime_type: None,
        }
    }
}

impl GenerationConfig {
    /// Low-temperature JSON output for structured photo analysis.
    pub fn structured_json() -> Self {
        Self {
            max_output_tokens: 1024,
            temperature: 0.2,
            top_p: None,
            top_k: None,
            response_mime_type: Some("application/json".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn jpeg(base64_data: String) -> Self {
        Part::InlineData {
            inline_data: InlineData {
                mime_type: "image/jpeg".to_string(),
                data: base64_data,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: &'a GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: &'a [Part],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl GenerateResponse {
    /// Text of the first text part of the first candidate.
    pub fn text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|p| p.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Completion seam
// ────────────────────────────────────────────────────────────────────────────

/// The text-completion collaborator used by the coach.
///
/// Carried in `CoachSession` as `Arc<dyn TextCompleter>` so tests can swap in
/// a scripted completer.
#[async_trait]
pub trait TextCompleter: Send + Sync {
    /// Whether credentials are present. Unconfigured completers are never called.
    fn is_configured(&self) -> bool {
        true
    }

    /// Returns the raw completion text for `prompt`.
    async fn complete(&self, prompt: &str, config: &GenerationConfig) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Makes one `generateContent` call and returns the full response object.
    pub async fn generate(
        &self,
        model: &str,
        parts: &[Part],
        config: &GenerationConfig,
    ) -> Result<GenerateResponse, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::Unconfigured)?;
        let url = format!("{}/v1beta/models/{model}:generateContent", self.base_url);
        let request_body = GenerateRequest {
            contents: vec![Content { role: "user", parts }],
            generation_config: config,
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                "Gemini call succeeded: model={model}, prompt_tokens={}, output_tokens={}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        Ok(parsed)
    }

    /// Calls the model and deserializes its text answer as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        model: &str,
        parts: &[Part],
        config: &GenerationConfig,
    ) -> Result<T, LlmError> {
        let response = self.generate(model, parts, config).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        serde_json::from_str(strip_json_fences(text)).map_err(LlmError::Parse)
    }
}

#[async_trait]
impl TextCompleter for GeminiClient {
    fn is_configured(&self) -> bool {
        GeminiClient::is_configured(self)
    }

    async fn complete(&self, prompt: &str, config: &GenerationConfig) -> Result<String, LlmError> {
        let response = self.generate(CHAT_MODEL, &[Part::text(prompt)], config).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

/// Strips ```json ... ``` or ``` ... ``` fences some models wrap JSON in.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };
    let inner = inner.trim_start();
    inner.strip_suffix("```").map(str::trim).unwrap_or(inner)
}
