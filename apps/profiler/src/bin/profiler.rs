//! Command-line front end: generates one HR profile and prints it as JSON.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use serde_json::{Map, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

use profiler::config::Config;
use profiler::errors::AppError;
use profiler::profile::generator::{GenerationRequest, ProfileGenerator};
use profiler::profile::schema::SchemaSource;

#[derive(Debug, Parser)]
#[command(
    name = "profiler",
    version,
    about = "Generate HR profile JSON structures using Groq Cloud models."
)]
#[command(group(ArgGroup::new("input").required(true).args(["prompt", "prompt_file"])))]
struct Cli {
    /// Natural-language instructions describing the desired HR profile.
    #[arg(short, long)]
    prompt: Option<String>,
    /// Path to a file containing the prompt.
    #[arg(long, value_name = "PATH")]
    prompt_file: Option<PathBuf>,
    /// JSON template describing the desired output structure.
    #[arg(long, value_name = "PATH")]
    schema: Option<PathBuf>,
    /// Groq model to use (default: GROQ_MODEL or openai/gpt-oss-20b).
    #[arg(long)]
    model: Option<String>,
    /// Sampling temperature between 0 and 1 (default: 0.3).
    #[arg(long)]
    temperature: Option<f32>,
    /// Maximum tokens to generate (default: 2048).
    #[arg(long)]
    max_tokens: Option<u32>,
    /// Retry budget for transient API failures (default: 2).
    #[arg(long)]
    retries: Option<u32>,
    /// Per-call timeout in seconds (default: 25).
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<f64>,
    /// Also write the generated JSON to this file.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Emit compact JSON instead of pretty-printed JSON.
    #[arg(long)]
    no_pretty: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout carries only the profile; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{}=warn", env!("CARGO_PKG_NAME")))),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let prompt = load_prompt(cli.prompt.as_deref(), cli.prompt_file.as_deref())?;

    let schema = match cli.schema {
        Some(path) => SchemaSource::Path(path),
        None => SchemaSource::Default,
    }
    .load()?;

    let config = Config::from_env().map_err(AppError::Config)?;
    let generator = ProfileGenerator::from_config(&config, schema)?;

    let outcome = generator
        .generate(GenerationRequest {
            prompt,
            schema: None,
            model: cli.model,
            temperature: cli.temperature,
            max_tokens: cli.max_tokens,
            retries: cli.retries,
            timeout_secs: cli.timeout,
        })
        .await?;
    info!(
        request_id = %outcome.request_id,
        "Generated profile in {} attempt(s)",
        outcome.attempts
    );

    let rendered = render_profile(&outcome.profile, !cli.no_pretty)?;

    if let Some(path) = &cli.output {
        std::fs::write(path, &rendered)
            .with_context(|| format!("Failed to write output file {}", path.display()))?;
    }
    println!("{rendered}");

    Ok(())
}

/// Resolves the prompt text from `--prompt` or `--prompt-file` (exactly one).
fn load_prompt(prompt: Option<&str>, prompt_file: Option<&Path>) -> Result<String, AppError> {
    let text = match (prompt, prompt_file) {
        (Some(_), Some(_)) => {
            return Err(AppError::Validation(
                "Please provide either --prompt or --prompt-file, not both.".to_string(),
            ))
        }
        (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
            AppError::Validation(format!("Prompt file {} could not be read: {e}", path.display()))
        })?,
        (Some(text), None) => text.to_string(),
        (None, None) => {
            return Err(AppError::Validation(
                "A prompt is required. Supply --prompt or --prompt-file.".to_string(),
            ))
        }
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("prompt cannot be empty".to_string()));
    }
    Ok(text.to_string())
}

fn render_profile(profile: &Map<String, Value>, pretty: bool) -> Result<String, AppError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(profile)
    } else {
        serde_json::to_string(profile)
    };
    rendered
        .context("Failed to serialize profile")
        .map_err(AppError::Internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_prompt_and_prompt_file_are_mutually_exclusive() {
        let result = Cli::try_parse_from(["profiler", "--prompt", "x", "--prompt-file", "p.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_a_prompt_source_is_required() {
        assert!(Cli::try_parse_from(["profiler", "--model", "m"]).is_err());
    }

    #[test]
    fn test_flags_parse() {
        let cli = Cli::try_parse_from([
            "profiler",
            "-p",
            "Java Backend Developer",
            "--schema",
            "schema.json",
            "--temperature",
            "0.5",
            "--max-tokens",
            "1024",
            "--output",
            "out.json",
            "--no-pretty",
        ])
        .unwrap();
        assert_eq!(cli.prompt.as_deref(), Some("Java Backend Developer"));
        assert_eq!(cli.schema, Some(PathBuf::from("schema.json")));
        assert_eq!(cli.temperature, Some(0.5));
        assert_eq!(cli.max_tokens, Some(1024));
        assert_eq!(cli.output, Some(PathBuf::from("out.json")));
        assert!(cli.no_pretty);
        assert!(cli.retries.is_none());
    }

    #[test]
    fn test_load_prompt_from_file_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\n  HR manager in Chennai  \n").unwrap();

        let prompt = load_prompt(None, Some(file.path())).unwrap();
        assert_eq!(prompt, "HR manager in Chennai");
    }

    #[test]
    fn test_load_prompt_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_prompt(None, Some(&dir.path().join("missing.txt"))).unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_load_prompt_rejects_blank_text() {
        assert!(load_prompt(Some("   "), None).is_err());
    }

    #[test]
    fn test_render_profile_pretty_and_compact() {
        let profile = json!({"jobTitle": "Analyst", "skills": ["Excel"]})
            .as_object()
            .unwrap()
            .clone();

        assert_eq!(
            render_profile(&profile, false).unwrap(),
            r#"{"jobTitle":"Analyst","skills":["Excel"]}"#
        );
        let pretty = render_profile(&profile, true).unwrap();
        assert!(pretty.contains("\n  \"jobTitle\": \"Analyst\""));
    }
}
