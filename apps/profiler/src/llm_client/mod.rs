//! LLM Client — the single point of entry for all completion API calls.
//!
//! No other module may call the Groq API directly. The pipeline talks to
//! `ModelClient`, which owns the retry policy and delegates single attempts
//! to a `CompletionApi` backend.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;
pub mod retry;
#[cfg(test)]
pub mod testing;

pub use retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("authentication failed (status {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("could not decode completion response: {0}")]
    Decode(String),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("gave up after {attempts} attempts, last error: {last}")]
    Exhausted { attempts: u32, last: Box<LlmError> },
}

impl LlmError {
    /// Transient failures are worth another attempt: network errors, rate
    /// limits, server errors and malformed or empty replies.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Network(_) | LlmError::Decode(_) | LlmError::EmptyContent => true,
            LlmError::Api { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            LlmError::Timeout(_) | LlmError::Unauthorized { .. } | LlmError::Exhausted { .. } => {
                false
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// One completion call as seen by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// Raw reply text plus how many attempts it took to obtain it.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub attempts: u32,
}

/// A completion backend that performs exactly one attempt per call.
/// Carried as `Arc<dyn CompletionApi>` so tests can script replies.
#[async_trait]
pub trait CompletionApi: Send + Sync {
    async fn complete_once(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Model client (retry loop)
// ────────────────────────────────────────────────────────────────────────────

/// Wraps a `CompletionApi` with the bounded retry policy.
#[derive(Clone)]
pub struct ModelClient {
    api: Arc<dyn CompletionApi>,
    policy: RetryPolicy,
}

impl ModelClient {
    pub fn new(api: Arc<dyn CompletionApi>, policy: RetryPolicy) -> Self {
        Self { api, policy }
    }

    /// Issues the request, retrying transient failures up to `retries` times.
    /// Non-transient failures are returned immediately; when the budget runs
    /// out the last transient failure is wrapped in `LlmError::Exhausted`.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
        retries: u32,
    ) -> Result<Completion, LlmError> {
        let max_attempts = retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                model = %request.model,
                "Sending completion attempt {attempt}/{max_attempts}"
            );

            match self.api.complete_once(request).await {
                Ok(text) => {
                    return Ok(Completion {
                        text,
                        attempts: attempt,
                    })
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.policy.backoff_for_retry(attempt);
                    warn!(
                        "Completion attempt {attempt}/{max_attempts} failed: {e}; retrying after {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_transient() => {
                    warn!("Completion attempt {attempt}/{max_attempts} failed: {e}; giving up");
                    return Err(LlmError::Exhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Groq backend (OpenAI-compatible chat completions)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if it carries any non-blank content.
    fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
    }
}

/// Groq Cloud chat-completions backend. Cheap to clone; clones share the
/// underlying connection pool.
#[derive(Clone)]
pub struct GroqClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl GroqClient {
    pub fn new(api_key: String, api_url: String, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            api_url,
        })
    }

    async fn send(&self, request: &CompletionRequest, json_mode: bool) -> Result<String, LlmError> {
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: json_mode.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, request.timeout))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = api_error_message(&body);
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(LlmError::Unauthorized {
                    status: status.as_u16(),
                    message,
                });
            }
            warn!("Groq API returned {status}: {message}");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(request.timeout)
            } else {
                LlmError::Decode(e.to_string())
            }
        })?;

        if let Some(usage) = &completion.usage {
            debug!(
                "Groq call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        completion.into_text().ok_or(LlmError::EmptyContent)
    }
}

#[async_trait]
impl CompletionApi for GroqClient {
    async fn complete_once(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        match self.send(request, true).await {
            // Some models reject JSON mode; reissue the same attempt without it.
            Err(LlmError::Api { status: 400, message }) if message.contains("response_format") => {
                warn!(
                    model = %request.model,
                    "Model rejected JSON mode, retrying without response_format"
                );
                self.send(request, false).await
            }
            other => other,
        }
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout(timeout)
    } else {
        LlmError::Network(e.to_string())
    }
}

/// Pulls `error.message` out of an OpenAI-style error body, falling back to the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
