use std::time::Duration;

use thiserror::Error;

/// Broad classes of provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Connection refused, reset, DNS failure and similar.
    Network,
    /// The request did not finish in time.
    Timeout,
    /// HTTP 429.
    RateLimited,
    /// HTTP 5xx.
    ServerError,
    /// HTTP 401/403.
    Unauthorized,
    /// Any other 4xx.
    InvalidRequest,
    /// A 2xx response whose body could not be understood.
    InvalidResponse,
}

impl LlmErrorKind {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimited | Self::ServerError
        )
    }
}

/// Error produced by an [`super::LlmClient`] implementation.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}{}: {message}", http_suffix(.status))]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            kind: classify_http_status(status),
            status: Some(status),
            message: body.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            LlmErrorKind::Timeout
        } else if err.is_decode() {
            LlmErrorKind::InvalidResponse
        } else if let Some(status) = err.status() {
            classify_http_status(status.as_u16())
        } else {
            LlmErrorKind::Network
        };
        Self {
            kind,
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Map an HTTP status code to an error kind.
pub fn classify_http_status(status: u16) -> LlmErrorKind {
    match status {
        401 | 403 => LlmErrorKind::Unauthorized,
        408 => LlmErrorKind::Timeout,
        429 => LlmErrorKind::RateLimited,
        500..=599 => LlmErrorKind::ServerError,
        _ => LlmErrorKind::InvalidRequest,
    }
}

/// Deadline and retry policy for provider calls.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Deadline for a single attempt.
    pub timeout: Duration,
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
}

impl RetryConfig {
    /// Backoff before retry number `retry` (1-based), doubling each time.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(factor)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_retries: 1,
            initial_backoff: Duration::from_millis(500),
        }
    }
}
