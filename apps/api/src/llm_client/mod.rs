/// LLM Client: the model invocation boundary.
///
/// Every model call in the service goes through a `ModelInvoker`. The production
/// implementation is `LlmClient`, which talks to an OpenAI-compatible
/// chat-completions endpoint (Groq by default). Tests substitute canned outputs.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

pub mod normalize;
pub mod prompts;

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// One agent-style request: who the model should be, and what it should do.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptSpec {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub description: String,
    pub expected_output: String,
}

impl PromptSpec {
    /// Persona framing sent as the system message.
    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}. {}\nYour personal goal is: {}\n{}",
            self.role,
            self.backstory,
            self.goal,
            prompts::JSON_ONLY_SYSTEM
        )
    }

    /// Task framing sent as the user message.
    pub fn user_prompt(&self) -> String {
        format!(
            "Current Task: {}\n\nThis is the expected criteria for your final answer: {}",
            self.description, self.expected_output
        )
    }
}

/// Whatever the model layer handed back. The shape is not stable across
/// providers, so the normalizer accepts all of these.
#[derive(Debug, Clone, PartialEq)]
pub enum RawModelOutput {
    /// Plain text.
    #[allow(dead_code)] // produced by invokers other than `LlmClient`, and by tests
    Text(String),
    /// A list, mapping or other JSON value.
    #[allow(dead_code)]
    Json(Value),
    /// A wrapped result exposing `result` / `output` accessors and a generic
    /// string representation.
    Envelope {
        result: Option<Value>,
        output: Option<Value>,
        raw: String,
    },
}

/// The single operation the interview workflow needs from a model provider.
///
/// Carried in `AppState` as `Arc<dyn ModelInvoker>`.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(&self, prompt: &PromptSpec) -> Result<RawModelOutput, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types (OpenAI-compatible chat completions)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    /// Usually a string; some providers return content parts as a list.
    #[serde(default)]
    content: Option<Value>,
    /// Structured output, when the provider parsed it for us.
    #[serde(default)]
    parsed: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl ChatResponse {
    fn into_raw_output(self) -> Result<RawModelOutput, LlmError> {
        let message = self
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or(LlmError::EmptyContent)?;

        let content = message
            .content
            .filter(|c| !c.is_null())
            .map(join_content_parts);
        let parsed = message.parsed.filter(|p| !p.is_null());
        if content.is_none() && parsed.is_none() {
            return Err(LlmError::EmptyContent);
        }

        let raw = match content.as_ref().or(parsed.as_ref()) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };

        Ok(RawModelOutput::Envelope {
            result: content,
            output: parsed,
            raw,
        })
    }
}

/// Joins `[{"type": "text", "text": ".."}, ..]` content parts into one string.
/// Any other shape is returned unchanged.
fn join_content_parts(content: Value) -> Value {
    let Value::Array(parts) = &content else {
        return content;
    };
    let texts: Option<Vec<&str>> = parts
        .iter()
        .map(|part| match part {
            Value::String(s) => Some(s.as_str()),
            Value::Object(fields) => fields.get("text").and_then(Value::as_str),
            _ => None,
        })
        .collect();
    match texts {
        Some(texts) => Value::String(texts.concat()),
        None => content,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Production client
// ────────────────────────────────────────────────────────────────────────────

/// HTTP model client. Model identifier and temperature are fixed from config.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl LlmClient {
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            api_key: config.llm_api_key.clone(),
            endpoint: format!(
                "{}/chat/completions",
                config.llm_base_url.trim_end_matches('/')
            ),
            model: config.llm_model.clone(),
            temperature: config.llm_temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Makes a raw chat-completions call.
    /// Retries on 429 (rate limit), 5xx and transport errors with exponential backoff.
    async fn call(&self, system: &str, user: &str) -> Result<ChatResponse, LlmError> {
        let request_body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let chat: ChatResponse = response.json().await?;

            if let Some(usage) = &chat.usage {
                debug!(
                    "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            return Ok(chat);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl ModelInvoker for LlmClient {
    async fn invoke(&self, prompt: &PromptSpec) -> Result<RawModelOutput, LlmError> {
        let response = self
            .call(&prompt.system_prompt(), &prompt.user_prompt())
            .await?;
        response.into_raw_output()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Test double
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays canned outputs in order and records every prompt it receives.
    #[derive(Default)]
    pub struct ScriptedInvoker {
        replies: Mutex<VecDeque<Result<RawModelOutput, LlmError>>>,
        pub seen: Mutex<Vec<PromptSpec>>,
    }

    impl ScriptedInvoker {
        pub fn new(replies: Vec<Result<RawModelOutput, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn texts<I, S>(texts: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self::new(
                texts
                    .into_iter()
                    .map(|t| Ok(RawModelOutput::Text(t.into())))
                    .collect(),
            )
        }

        pub fn prompts(&self) -> Vec<PromptSpec> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelInvoker for ScriptedInvoker {
        async fn invoke(&self, prompt: &PromptSpec) -> Result<RawModelOutput, LlmError> {
            self.seen.lock().unwrap().push(prompt.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyContent))
        }
    }
}
