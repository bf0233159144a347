use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unified error type for the schedule engine.
/// Structural problems in generated schedules are never errors; the normalizer repairs them.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Credential missing or still the placeholder value.
    #[error("generative service is not configured (missing API key)")]
    Misconfigured,

    #[error("generative service rate limited the request: {message}")]
    RateLimited {
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("generative service returned an empty response")]
    EmptyResponse,

    #[error("could not parse generative output: {0}")]
    Parse(String),

    #[error("generative service error: {0}")]
    Upstream(String),
}

impl EngineError {
    /// Transport-independent code for the handler layer
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::RateLimited { .. } => ErrorCode::GeminiRateLimit,
            EngineError::Parse(_) => ErrorCode::GeminiParseError,
            EngineError::Misconfigured
            | EngineError::EmptyResponse
            | EngineError::Upstream(_) => ErrorCode::GeminiError,
        }
    }

    /// Whether another attempt may succeed after backing off
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::RateLimited { .. } | EngineError::EmptyResponse)
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            EngineError::RateLimited { retry_after_secs, .. } => *retry_after_secs,
            _ => None,
        }
    }
}

/// Error codes surfaced to the handler layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    GeminiRateLimit,
    GeminiParseError,
    GeminiError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::GeminiRateLimit => "GEMINI_RATE_LIMIT",
            ErrorCode::GeminiParseError => "GEMINI_PARSE_ERROR",
            ErrorCode::GeminiError => "GEMINI_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw failure reported by a text generator, before classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamError {
    pub message: String,
    pub status: Option<u16>,
    pub retry_after_secs: Option<u64>,
}

impl UpstreamError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        UpstreamError {
            message: message.into(),
            status: None,
            retry_after_secs: None,
        }
    }

    /// Attach the HTTP status returned by the service
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach a retry-after hint in seconds
    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(status) = self.status {
            write!(f, "[{}] ", status)?;
        }
        write!(f, "{}", self.message)?;
        if let Some(secs) = self.retry_after_secs {
            write!(f, " (retry after {}s)", secs)?;
        }
        Ok(())
    }
}

impl std::error::Error for UpstreamError {}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        let upstream = UpstreamError::new(format!("HTTP error: {}", err));
        match err.status() {
            Some(status) => upstream.with_status(status.as_u16()),
            None => upstream,
        }
    }
}

impl From<tokio::time::error::Elapsed> for UpstreamError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        UpstreamError::new("Request to generative service timed out")
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Parse(format!("JSON error: {}", err))
    }
}
