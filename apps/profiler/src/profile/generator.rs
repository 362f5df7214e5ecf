//! Profile Generation — orchestrates the prompt-to-structured-JSON pipeline.
//!
//! Flow: validate request → resolve schema template → build instruction →
//!       model client (transient retries) → extract JSON → conform to template.
//!
//! A reply that cannot be parsed triggers at most one re-prompt with a JSON
//! reminder, and only when the request allows retries.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::config::{Config, DEFAULT_MAX_TOKENS, DEFAULT_RETRIES, DEFAULT_TEMPERATURE};
use crate::errors::AppError;
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, JSON_REMINDER};
use crate::llm_client::{
    ChatMessage, CompletionRequest, GroqClient, LlmError, ModelClient, RetryPolicy,
};
use crate::profile::extractor::{conform_to_template, extract_json_object, strip_wrappers};
use crate::profile::prompts::build_instruction;
use crate::profile::schema::{SchemaSource, SchemaTemplate};

const MAX_REPROMPTS: u32 = 1;
pub const MAX_TOKENS_LIMIT: u32 = 8192;
pub const MAX_RETRIES: u32 = 5;
const MIN_TIMEOUT_SECS: f64 = 5.0;
const MAX_TIMEOUT_SECS: f64 = 60.0;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Request body for profile generation. Every field except `prompt` is optional
/// and falls back to `GenerationDefaults`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default, alias = "timeout")]
    pub timeout_secs: Option<f64>,
}

/// Fallback values for optional request fields.
#[derive(Debug, Clone)]
pub struct GenerationDefaults {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub retries: u32,
    pub timeout: Duration,
}

impl GenerationDefaults {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.default_model.clone(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            retries: DEFAULT_RETRIES,
            timeout: config.request_timeout,
        }
    }
}

/// A validated request with every default applied.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub retries: u32,
    pub timeout: Duration,
}

/// Result of a successful generation.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub request_id: Uuid,
    /// Key set equals the template's.
    pub profile: Map<String, Value>,
    /// Model reply with wrappers stripped.
    pub raw: String,
    pub model: String,
    /// Completion attempts across transient retries and re-prompts.
    pub attempts: u32,
    pub filled_keys: Vec<String>,
    pub dropped_keys: Vec<String>,
}

impl GenerationRequest {
    /// Validates the request and applies defaults.
    pub fn resolve(&self, defaults: &GenerationDefaults) -> Result<GenerationParams, AppError> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::Validation("prompt cannot be empty".to_string()));
        }

        let model = match self.model.as_deref().map(str::trim) {
            Some("") => return Err(AppError::Validation("model cannot be empty".to_string())),
            Some(model) => model.to_string(),
            None => defaults.model.clone(),
        };

        let temperature = self.temperature.unwrap_or(defaults.temperature);
        if !(0.0..=1.0).contains(&temperature) {
            return Err(AppError::Validation(format!(
                "temperature must be between 0 and 1, got {temperature}"
            )));
        }

        let max_tokens = self.max_tokens.unwrap_or(defaults.max_tokens);
        if max_tokens == 0 || max_tokens > MAX_TOKENS_LIMIT {
            return Err(AppError::Validation(format!(
                "max_tokens must be between 1 and {MAX_TOKENS_LIMIT}, got {max_tokens}"
            )));
        }

        let retries = self.retries.unwrap_or(defaults.retries);
        if retries > MAX_RETRIES {
            return Err(AppError::Validation(format!(
                "retries must be at most {MAX_RETRIES}, got {retries}"
            )));
        }

        let timeout = match self.timeout_secs {
            Some(secs) if (MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&secs) => {
                Duration::from_secs_f64(secs)
            }
            Some(secs) => {
                return Err(AppError::Validation(format!(
                    "timeout_secs must be between {MIN_TIMEOUT_SECS} and {MAX_TIMEOUT_SECS}, got {secs}"
                )))
            }
            None => defaults.timeout,
        };

        Ok(GenerationParams {
            prompt: prompt.to_string(),
            model,
            temperature,
            max_tokens,
            retries,
            timeout,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Generation pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs the generation pipeline. Holds no per-request state; shared across
/// requests behind an `Arc`.
pub struct ProfileGenerator {
    model_client: ModelClient,
    defaults: GenerationDefaults,
    default_schema: SchemaTemplate,
}

impl ProfileGenerator {
    pub fn new(
        model_client: ModelClient,
        defaults: GenerationDefaults,
        default_schema: SchemaTemplate,
    ) -> Self {
        Self {
            model_client,
            defaults,
            default_schema,
        }
    }

    /// Wires the Groq backend from configuration.
    pub fn from_config(config: &Config, default_schema: SchemaTemplate) -> Result<Self, AppError> {
        let groq = GroqClient::new(
            config.groq_api_key.clone(),
            config.groq_api_url.clone(),
            config.request_timeout,
        )
        .map_err(|e| AppError::Config(anyhow::anyhow!(e)))?;
        let model_client = ModelClient::new(Arc::new(groq), RetryPolicy::new(config.retry_base_delay));

        Ok(Self::new(
            model_client,
            GenerationDefaults::from_config(config),
            default_schema,
        ))
    }

    /// Resolves the server-wide default template: `PROFILE_SCHEMA_PATH` if set,
    /// the built-in template otherwise.
    pub fn default_schema_source(config: &Config) -> SchemaSource {
        match &config.schema_path {
            Some(path) => SchemaSource::Path(path.clone()),
            None => SchemaSource::Default,
        }
    }

    pub fn defaults(&self) -> &GenerationDefaults {
        &self.defaults
    }

    /// Generates one profile. An inline `schema` in the request replaces the
    /// default template for this request only.
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationOutcome, AppError> {
        let request_id = Uuid::new_v4();
        let params = request.resolve(&self.defaults)?;
        let template = match request.schema {
            Some(schema) => SchemaSource::Inline(schema).load()?,
            None => self.default_schema.clone(),
        };

        let span = tracing::info_span!("generate_profile", %request_id, model = %params.model);
        self.run(request_id, params, &template).instrument(span).await
    }

    async fn run(
        &self,
        request_id: Uuid,
        params: GenerationParams,
        template: &SchemaTemplate,
    ) -> Result<GenerationOutcome, AppError> {
        info!(
            "Generating profile with {} template keys, retries={}",
            template.field_count(),
            params.retries
        );

        let mut request = CompletionRequest {
            model: params.model.clone(),
            messages: vec![
                ChatMessage::system(JSON_ONLY_SYSTEM),
                ChatMessage::user(build_instruction(&params.prompt, template)),
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            timeout: params.timeout,
        };

        let reprompt_budget = if params.retries > 0 { MAX_REPROMPTS } else { 0 };
        let mut reprompts = 0;
        let mut attempts = 0;

        loop {
            let completion = self
                .model_client
                .complete(&request, params.retries)
                .await
                .map_err(|e| model_error(e, &params))?;
            attempts += completion.attempts;

            match extract_json_object(&completion.text) {
                Ok(parsed) => {
                    let conformed = conform_to_template(parsed, template);
                    if !conformed.filled_keys.is_empty() {
                        warn!("Model omitted keys, filled with defaults: {:?}", conformed.filled_keys);
                    }
                    if !conformed.dropped_keys.is_empty() {
                        warn!("Model added unknown keys, dropped: {:?}", conformed.dropped_keys);
                    }
                    info!("Profile generated after {attempts} attempt(s)");

                    return Ok(GenerationOutcome {
                        request_id,
                        profile: conformed.profile,
                        raw: strip_wrappers(&completion.text).to_string(),
                        model: params.model,
                        attempts,
                        filled_keys: conformed.filled_keys,
                        dropped_keys: conformed.dropped_keys,
                    });
                }
                Err(failure) if reprompts < reprompt_budget => {
                    reprompts += 1;
                    warn!("Unusable model reply ({failure}); re-prompting with JSON reminder");
                    request.messages.push(ChatMessage::system(JSON_REMINDER));
                }
                Err(failure) => {
                    return Err(AppError::ResponseParse(format!(
                        "Failed to parse JSON from model response after {attempts} attempt(s): {failure}"
                    )));
                }
            }
        }
    }
}

fn model_error(error: LlmError, params: &GenerationParams) -> AppError {
    match error {
        LlmError::Timeout(after) => AppError::ModelTimeout(format!(
            "Request timed out after {} seconds. Try a shorter prompt or lower max_tokens.",
            after.as_secs_f64()
        )),
        LlmError::Unauthorized { .. } => AppError::ModelUnavailable(
            "Groq authentication failed. Confirm that GROQ_API_KEY is present and valid."
                .to_string(),
        ),
        other => AppError::ModelUnavailable(format!("Model '{}': {other}", params.model)),
    }
}
