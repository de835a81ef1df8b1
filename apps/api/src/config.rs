use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::coach::session::CoachConfig;
use crate::llm_client::{GenerationConfig, DEFAULT_BASE_URL};

/// Application configuration loaded from environment variables.
///
/// Every variable is optional. A missing `GEMINI_API_KEY` is not an error at
/// startup: the coach and scanner report `Unconfigured` per request instead.
/// Malformed numeric values are startup errors.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_history: usize,
    pub context_window: usize,
    pub bubble_delay_ms: u64,
    pub session_file: PathBuf,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Config {
            gemini_api_key: lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()),
            gemini_base_url: lookup("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_tokens: parse_or(&lookup, "MAX_TOKENS", 400)?,
            temperature: parse_or(&lookup, "TEMPERATURE", 0.4)?,
            top_p: parse_or(&lookup, "TOP_P", 0.8)?,
            top_k: parse_or(&lookup, "TOP_K", 20)?,
            max_history: parse_or(&lookup, "MAX_HISTORY", 10)?,
            context_window: parse_or(&lookup, "CONTEXT_WINDOW", 6)?,
            bubble_delay_ms: parse_or(&lookup, "BUBBLE_DELAY_MS", 1000)?,
            session_file: lookup("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/current-session.json")),
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn is_gemini_configured(&self) -> bool {
        self.gemini_api_key.is_some()
    }

    pub fn coach_config(&self) -> CoachConfig {
        CoachConfig {
            generation: GenerationConfig {
                max_output_tokens: self.max_tokens,
                temperature: self.temperature,
                top_p: Some(self.top_p),
                top_k: Some(self.top_k),
                response_mime_type: None,
            },
            max_history: self.max_history,
            context_window: self.context_window,
            bubble_delay: Duration::from_millis(self.bubble_delay_ms),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
