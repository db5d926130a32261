use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use crate::processing::{FailurePolicy, SplitUnit};

const DEFAULT_CHUNK_SIZE: usize = 10_000;
const DEFAULT_OVERLAP_SIZE: usize = 500;
const DEFAULT_MAX_CONCURRENCY: usize = 8;
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_TIMEOUT_SECS: u64 = 180;
const DEFAULT_MAX_RETRIES: u32 = 1;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Rusty Summaries binary.
///
/// Library types never read this directly; the binary converts it into the explicit option
/// structs the orchestrators take at construction time.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Units per chunk.
    pub chunk_size: usize,
    /// Units shared by adjacent chunks.
    pub overlap_size: usize,
    /// Granularity chunk sizes are counted in.
    pub split_unit: SplitUnit,
    /// Upper bound on in-flight map-reduce chunk tasks.
    pub max_concurrency: usize,
    /// How map-reduce reacts to failed chunks.
    pub failure_policy: FailurePolicy,
    /// Provider backing the summarization capability.
    pub summarization_provider: SummarizationProvider,
    /// Base URL of the OpenAI-compatible endpoint.
    pub llm_endpoint: Option<String>,
    /// Bearer token sent to the OpenAI-compatible endpoint.
    pub openai_api_key: Option<String>,
    /// Model identifier passed to the provider.
    pub llm_model: String,
    /// Optional override for the Ollama base URL.
    pub ollama_url: Option<String>,
    /// Completion token budget per request.
    pub max_tokens: u32,
    /// Sampling temperature per request.
    pub temperature: f32,
    /// HTTP timeout applied by the provider client.
    pub request_timeout: Duration,
    /// Retries performed by the capability on transient provider errors.
    pub max_retries: u32,
    /// Optional timeout applied to each individual summarization call.
    pub call_timeout: Option<Duration>,
}

/// Supported summarization backends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummarizationProvider {
    /// Any endpoint speaking the OpenAI chat completions API.
    OpenAI,
    /// Local Ollama runtime.
    Ollama,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let summarization_provider = match load_env_optional("SUMMARIZATION_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("SUMMARIZATION_PROVIDER".into()))?,
            None => SummarizationProvider::OpenAI,
        };
        let llm_endpoint = load_env_optional("LLM_ENDPOINT");
        if summarization_provider == SummarizationProvider::OpenAI && llm_endpoint.is_none() {
            return Err(ConfigError::MissingVariable("LLM_ENDPOINT".into()));
        }

        Ok(Self {
            chunk_size: parse_or("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            overlap_size: parse_or("OVERLAP_SIZE", DEFAULT_OVERLAP_SIZE)?,
            split_unit: match load_env_optional("SPLIT_UNIT") {
                Some(value) => value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("SPLIT_UNIT".into()))?,
                None => SplitUnit::Word,
            },
            max_concurrency: parse_or("MAP_REDUCE_MAX_CONCURRENCY", DEFAULT_MAX_CONCURRENCY)?,
            failure_policy: match load_env_optional("MAP_REDUCE_FAILURE_POLICY") {
                Some(value) => value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("MAP_REDUCE_FAILURE_POLICY".into()))?,
                None => FailurePolicy::FailFast,
            },
            summarization_provider,
            llm_endpoint,
            openai_api_key: load_env_optional("OPENAI_API_KEY"),
            llm_model: load_env("LLM_MODEL")?,
            ollama_url: load_env_optional("OLLAMA_URL"),
            max_tokens: parse_or("MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
            temperature: parse_or("LLM_TEMPERATURE", DEFAULT_TEMPERATURE)?,
            request_timeout: Duration::from_secs(parse_or(
                "LLM_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
            max_retries: parse_or("LLM_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            call_timeout: load_env_optional("SUMMARIZE_CALL_TIMEOUT_SECS")
                .map(|value| {
                    value.parse().map(Duration::from_secs).map_err(|_| {
                        ConfigError::InvalidValue("SUMMARIZE_CALL_TIMEOUT_SECS".into())
                    })
                })
                .transpose()?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}

impl std::str::FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        provider = ?config.summarization_provider,
        model = %config.llm_model,
        chunk_size = config.chunk_size,
        overlap_size = config.overlap_size,
        unit = ?config.split_unit,
        max_concurrency = config.max_concurrency,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}
