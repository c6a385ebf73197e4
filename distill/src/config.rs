use std::str::FromStr;
use std::time::Duration;

use distill_text::ChunkParams;
use thiserror::Error;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_LOG_FILTER: &str = "info,distill=debug";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {key} has invalid value '{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid log filter: {0}")]
    InvalidLogFilter(String),
    #[error("a global tracing subscriber is already installed")]
    TracingAlreadyInitialized,
}

/// Runtime settings read from `DISTILL_*` environment variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub openai_base_url: String,
    pub request_timeout: Duration,
    pub max_retries: usize,
    pub max_concurrency: usize,
    pub chunk_params: ChunkParams,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(60),
            max_retries: 3,
            max_concurrency: 10,
            chunk_params: ChunkParams::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Settings {
    /// Loads `.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup; unset keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let timeout_secs = parse_or(&lookup, "DISTILL_REQUEST_TIMEOUT_SECS", defaults.request_timeout.as_secs())?;
        let settings = Self {
            openai_base_url: lookup("DISTILL_OPENAI_BASE_URL")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.openai_base_url),
            request_timeout: Duration::from_secs(timeout_secs),
            max_retries: parse_or(&lookup, "DISTILL_MAX_RETRIES", defaults.max_retries)?,
            max_concurrency: parse_or(&lookup, "DISTILL_MAX_CONCURRENCY", defaults.max_concurrency)?,
            chunk_params: ChunkParams::new(
                parse_or(&lookup, "DISTILL_CHUNK_SIZE", defaults.chunk_params.chunk_size)?,
                parse_or(&lookup, "DISTILL_CHUNK_OVERLAP", defaults.chunk_params.overlap)?,
            ),
            log_filter: lookup("DISTILL_LOG")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.log_filter),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DISTILL_MAX_CONCURRENCY",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.chunk_params.chunk_size <= self.chunk_params.overlap {
            return Err(ConfigError::InvalidValue {
                key: "DISTILL_CHUNK_OVERLAP",
                value: self.chunk_params.overlap.to_string(),
                reason: format!(
                    "must be smaller than the chunk size {}",
                    self.chunk_params.chunk_size
                ),
            });
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map_err(|err: T::Err| ConfigError::InvalidValue {
                    key,
                    reason: err.to_string(),
                    value,
                })
        }
        _ => Ok(default),
    }
}
