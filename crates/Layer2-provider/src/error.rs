//! Provider-specific error types
//!
//! ProviderError는 모델 백엔드 관련 세부 에러를 관리합니다.
//! loom_foundation::Error와의 변환을 지원합니다.

use crate::retry::{RetryClassification, RetryableError};
use loom_foundation::Error as FoundationError;
use thiserror::Error;

/// Errors that can occur during provider operations
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// API key is missing or invalid
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded{}", .retry_after_ms.map(|ms| format!(", retry after {}ms", ms)).unwrap_or_default())]
    RateLimited { retry_after_ms: Option<u64> },

    /// Context length exceeded
    #[error("Context length exceeded: {0}")]
    ContextLengthExceeded(String),

    /// Server error (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Request failed mid-flight
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Network error (connection failed, DNS, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid request (bad parameters)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid response from API
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Provider not configured
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// Unknown error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl RetryableError for ProviderError {
    fn classify(&self) -> RetryClassification {
        match self {
            ProviderError::RateLimited { retry_after_ms } => RetryClassification::RateLimited {
                retry_after_ms: *retry_after_ms,
            },

            // Transient upstream failures
            ProviderError::ServerError(_)
            | ProviderError::RequestFailed(_)
            | ProviderError::Network(_)
            | ProviderError::Timeout(_) => RetryClassification::Retry,

            ProviderError::Authentication(_)
            | ProviderError::ContextLengthExceeded(_)
            | ProviderError::InvalidRequest(_)
            | ProviderError::InvalidResponse(_)
            | ProviderError::ModelNotFound(_)
            | ProviderError::NotConfigured(_)
            | ProviderError::Unknown(_) => RetryClassification::NoRetry,
        }
    }
}

impl ProviderError {
    /// Whether a retry could succeed
    pub fn is_transient(&self) -> bool {
        !matches!(self.classify(), RetryClassification::NoRetry)
    }

    /// Create from HTTP status code and body
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => ProviderError::Authentication(body.to_string()),
            408 => ProviderError::Timeout(body.to_string()),
            429 => ProviderError::RateLimited {
                retry_after_ms: extract_retry_after(body),
            },
            400 => {
                if body.contains("context") || body.contains("too long") || body.contains("token") {
                    ProviderError::ContextLengthExceeded(body.to_string())
                } else {
                    ProviderError::InvalidRequest(body.to_string())
                }
            }
            404 => ProviderError::ModelNotFound(body.to_string()),
            500..=599 => ProviderError::ServerError(body.to_string()),
            _ => ProviderError::Unknown(format!("HTTP {}: {}", status, body)),
        }
    }

    /// Classify a transport-level reqwest error
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(err.to_string())
        } else if err.is_connect() {
            ProviderError::Network(err.to_string())
        } else if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::RequestFailed(err.to_string())
        }
    }
}

/// Try to extract retry-after value from error body (in milliseconds)
fn extract_retry_after(body: &str) -> Option<u64> {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(secs) = json
            .get("error")
            .and_then(|e| e.get("retry_after"))
            .and_then(|v| v.as_f64())
        {
            return Some((secs * 1000.0) as u64);
        }
    }

    if let Some(idx) = body.find("retry") {
        let num_str: String = body[idx..]
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        if let Ok(secs) = num_str.parse::<f64>() {
            return Some((secs * 1000.0) as u64);
        }
    }

    None
}

// ============================================================================
// loom_foundation::Error 변환
// ============================================================================

impl From<ProviderError> for FoundationError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited { retry_after_ms } => FoundationError::RateLimited(
                retry_after_ms
                    .map(|ms| format!("Retry after {}ms", ms))
                    .unwrap_or_else(|| "Rate limited".to_string()),
            ),
            ProviderError::Timeout(msg) => FoundationError::Timeout(msg),
            ProviderError::RequestFailed(msg) => FoundationError::Http(msg),
            ProviderError::Network(msg) => FoundationError::Http(format!("Network: {}", msg)),
            ProviderError::InvalidRequest(msg) => FoundationError::InvalidInput(msg),
            ProviderError::NotConfigured(msg) => FoundationError::Config(msg),
            other => FoundationError::Provider(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert!(matches!(
            ProviderError::from_http_status(401, "bad key"),
            ProviderError::Authentication(_)
        ));
        assert!(matches!(
            ProviderError::from_http_status(503, "overloaded"),
            ProviderError::ServerError(_)
        ));
        assert!(matches!(
            ProviderError::from_http_status(400, "maximum context length"),
            ProviderError::ContextLengthExceeded(_)
        ));
    }

    #[test]
    fn test_retry_after_extraction() {
        let err = ProviderError::from_http_status(429, r#"{"error":{"retry_after":1.5}}"#);
        match err {
            ProviderError::RateLimited { retry_after_ms } => assert_eq!(retry_after_ms, Some(1500)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::Network("refused".into()).is_transient());
        assert!(ProviderError::Timeout("60s".into()).is_transient());
        assert!(!ProviderError::Authentication("no".into()).is_transient());
    }

    #[test]
    fn test_into_foundation_error() {
        let err: FoundationError = ProviderError::Timeout("slow".into()).into();
        assert!(err.is_retryable());
    }
}
