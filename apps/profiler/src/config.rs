use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "openai/gpt-oss-20b";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_RETRIES: u32 = 2;
/// Stays under the 30s request ceiling of the free Groq tier.
pub const DEFAULT_TIMEOUT_SECS: f64 = 25.0;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;

/// Application configuration loaded from environment variables.
/// Shared by the HTTP server and the CLI; only `GROQ_API_KEY` is mandatory.
#[derive(Debug, Clone)]
pub struct Config {
    pub groq_api_key: String,
    pub groq_api_url: String,
    pub default_model: String,
    pub request_timeout: Duration,
    pub retry_base_delay: Duration,
    /// Overrides the built-in default schema template when set.
    pub schema_path: Option<PathBuf>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let request_timeout = parse_timeout(optional_env("GROQ_TIMEOUT_SECS").as_deref())?;

        let retry_base_delay_ms = optional_env("RETRY_BASE_DELAY_MS")
            .map(|v| {
                v.parse::<u64>()
                    .context("RETRY_BASE_DELAY_MS must be a whole number of milliseconds")
            })
            .transpose()?
            .unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS);

        Ok(Config {
            groq_api_key: require_env("GROQ_API_KEY").context(
                "Create an API key in Groq Cloud and export GROQ_API_KEY before starting",
            )?,
            groq_api_url: optional_env("GROQ_API_URL")
                .unwrap_or_else(|| DEFAULT_GROQ_API_URL.to_string()),
            default_model: optional_env("GROQ_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            request_timeout,
            retry_base_delay: Duration::from_millis(retry_base_delay_ms),
            schema_path: optional_env("PROFILE_SCHEMA_PATH").map(PathBuf::from),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Seconds as written in `GROQ_TIMEOUT_SECS`; unset falls back to the default.
fn parse_timeout(raw: Option<&str>) -> Result<Duration> {
    let secs = match raw {
        Some(v) => v
            .parse::<f64>()
            .context("GROQ_TIMEOUT_SECS must be a number of seconds")?,
        None => DEFAULT_TIMEOUT_SECS,
    };
    if !secs.is_finite() || secs <= 0.0 {
        anyhow::bail!("GROQ_TIMEOUT_SECS must be positive, got {secs}");
    }
    Duration::try_from_secs_f64(secs)
        .with_context(|| format!("GROQ_TIMEOUT_SECS is out of range, got {secs}"))
}

fn require_env(key: &str) -> Result<String> {
    optional_env(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Treats empty values the same as unset ones.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_defaults_when_unset() {
        assert_eq!(
            parse_timeout(None).unwrap(),
            Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_timeout_accepts_fractional_seconds() {
        assert_eq!(parse_timeout(Some("2.5")).unwrap(), Duration::from_millis(2500));
    }

    #[test]
    fn test_timeout_rejects_non_positive_and_garbage() {
        assert!(parse_timeout(Some("0")).is_err());
        assert!(parse_timeout(Some("-3")).is_err());
        assert!(parse_timeout(Some("inf")).is_err());
        assert!(parse_timeout(Some("soon")).is_err());
    }

    #[test]
    fn test_huge_timeout_is_an_error_not_a_panic() {
        let err = parse_timeout(Some("1e20")).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}
