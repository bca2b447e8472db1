//! Error types for completion and scoring providers.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when calling a completion provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider answered with a non-success status.
    #[error("{provider} returned HTTP {status}: {message}")]
    Status {
        provider: String,
        status: u16,
        message: String,
    },

    /// Request timed out on the client side.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// HTTP/network error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered but the body was unusable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error (missing API key, etc.).
    #[error("configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    pub fn status(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// HTTP-like status code, when the failure carried one
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Timeout(_) => Some(408),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Http(e) => e.is_timeout(),
            Self::Status { status, .. } => *status == 408 || *status == 504,
            _ => false,
        }
    }

    /// Short error code for logging.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Status { status: 429, .. } => "rate_limited",
            Self::Status { .. } => "provider_error",
            Self::Timeout(_) => "timeout",
            Self::Http(_) => "http_error",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Config(_) => "config_error",
        }
    }
}

/// Errors that can occur while scoring an output.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("scorer provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("scorer unavailable: {0}")]
    Unavailable(String),
}

impl EvaluationError {
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_timeout(),
            Self::Unavailable(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = ProviderError::status("openai", 503, "overloaded");
        assert_eq!(err.to_string(), "openai returned HTTP 503: overloaded");
        assert_eq!(err.http_status(), Some(503));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_timeout_detection() {
        assert!(ProviderError::Timeout(Duration::from_secs(1)).is_timeout());
        assert!(ProviderError::status("openai", 504, "gateway timeout").is_timeout());

        let eval = EvaluationError::from(ProviderError::Timeout(Duration::from_secs(1)));
        assert!(eval.is_timeout());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ProviderError::status("x", 429, "slow down").code(), "rate_limited");
        assert_eq!(ProviderError::config("no key").code(), "config_error");
    }
}
