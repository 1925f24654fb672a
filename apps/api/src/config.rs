use std::time::Duration;

use anyhow::{bail, Context, Result};

const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_SESSION_TTL_SECS: u64 = 2 * 60 * 60;

/// Application configuration loaded from environment variables.
/// Fixed at process start; startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    /// Pause inserted between question-generation batches.
    pub question_batch_pause: Duration,
    pub max_upload_bytes: usize,
    /// Idle time after which a session is discarded.
    pub session_ttl: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let llm_api_key = require_env("LLM_API_KEY")
            .or_else(|_| require_env("GROQ_API_KEY"))
            .context("Set LLM_API_KEY (or GROQ_API_KEY) to the model provider's API key")?;

        let llm_temperature = optional_env("LLM_TEMPERATURE")
            .map(|v| v.parse::<f32>())
            .transpose()
            .context("LLM_TEMPERATURE must be a number")?
            .unwrap_or(1.0);
        if !(0.0..=2.0).contains(&llm_temperature) {
            bail!("LLM_TEMPERATURE must be between 0.0 and 2.0, got {llm_temperature}");
        }

        let pause_ms = optional_env("QUESTION_BATCH_PAUSE_MS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("QUESTION_BATCH_PAUSE_MS must be a whole number of milliseconds")?
            .unwrap_or(1000);

        let session_ttl_secs = optional_env("SESSION_TTL_SECS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("SESSION_TTL_SECS must be a whole number of seconds")?
            .unwrap_or(DEFAULT_SESSION_TTL_SECS);
        if session_ttl_secs == 0 {
            bail!("SESSION_TTL_SECS must be greater than zero");
        }

        Ok(Config {
            llm_api_key,
            llm_base_url: optional_env("LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            llm_model: optional_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_temperature,
            question_batch_pause: Duration::from_millis(pause_ms),
            max_upload_bytes: optional_env("MAX_UPLOAD_BYTES")
                .map(|v| v.parse::<usize>())
                .transpose()
                .context("MAX_UPLOAD_BYTES must be a byte count")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            session_ttl: Duration::from_secs(session_ttl_secs),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
