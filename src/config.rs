//! Configuration loaded from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::budget::BudgetPolicy;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Settings for the LLM-backed classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// API key sent as a bearer token
    pub api_key: String,
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    /// Model used for categorization
    pub model: String,
    /// Deadline for a single attempt
    pub timeout: Duration,
    /// Retries after the first attempt (transient failures only)
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry
    pub backoff: Duration,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub password_hash_rounds: u32,
    pub budget_policy: BudgetPolicy,
    pub classifier: ClassifierConfig,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let budget_policy = match get("BUDGET_POLICY") {
            Some(value) => value.parse().map_err(|reason| ConfigError::Invalid {
                name: "BUDGET_POLICY",
                reason,
            })?,
            None => BudgetPolicy::default(),
        };

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or("PORT", get("PORT"), 5000)?,
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("expense_tracker.db")),
            jwt_secret,
            token_ttl: Duration::from_secs(parse_or(
                "TOKEN_TTL_SECS",
                get("TOKEN_TTL_SECS"),
                86_400,
            )?),
            password_hash_rounds: parse_or(
                "PASSWORD_HASH_ROUNDS",
                get("PASSWORD_HASH_ROUNDS"),
                100_000,
            )?,
            budget_policy,
            classifier: ClassifierConfig {
                api_key,
                base_url: get("LLM_BASE_URL")
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                model: get("LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
                timeout: Duration::from_secs(parse_or(
                    "CLASSIFIER_TIMEOUT_SECS",
                    get("CLASSIFIER_TIMEOUT_SECS"),
                    15,
                )?),
                max_retries: parse_or(
                    "CLASSIFIER_MAX_RETRIES",
                    get("CLASSIFIER_MAX_RETRIES"),
                    1,
                )?,
                backoff: Duration::from_millis(parse_or(
                    "CLASSIFIER_BACKOFF_MS",
                    get("CLASSIFIER_BACKOFF_MS"),
                    500,
                )?),
            },
        })
    }

    /// Socket address the HTTP server binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid {
                name: "HOST",
                reason: format!("{}", e),
            })
    }
}

fn parse_or<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
