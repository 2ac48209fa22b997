//! Error types for Loom
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Loom 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 권한 관련
    // ========================================================================
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    // ========================================================================
    // Provider 관련
    // ========================================================================
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("API error: {provider} - {message}")]
    Api { provider: String, message: String },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    // ========================================================================
    // Tool 관련
    // ========================================================================
    #[error("Tool name conflict: '{name}' {reason}")]
    NameConflict { name: String, reason: String },

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution failed: {tool} - {message}")]
    ToolExecution { tool: String, message: String },

    #[error("Extension error: {0}")]
    Extension(String),

    // ========================================================================
    // Task/Agent 관련
    // ========================================================================
    #[error("Task error: {0}")]
    Task(String),

    #[error("Agent error: {0}")]
    Agent(String),

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 재시도 가능한 에러인지 확인 (일시적 upstream 장애)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::RateLimited(_) | Error::Http(_)
        )
    }

    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::NameConflict { .. }
                | Error::PermissionDenied(_)
                | Error::NotFound(_)
                | Error::InvalidInput(_)
                | Error::Validation(_)
                | Error::Cancelled
        )
    }

    /// 취소 여부
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// API 에러 생성 헬퍼
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Tool 실행 에러 생성 헬퍼
    pub fn tool_execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ToolExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// 이름 충돌 에러 생성 헬퍼
    pub fn name_conflict(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::NameConflict {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Timeout("model".into()).is_retryable());
        assert!(Error::Http("connection reset".into()).is_retryable());
        assert!(!Error::InvalidInput("bad".into()).is_retryable());
        assert!(!Error::Cancelled.is_retryable());
    }

    #[test]
    fn test_name_conflict_message() {
        let err = Error::name_conflict("run_command", "is reserved");
        assert_eq!(err.to_string(), "Tool name conflict: 'run_command' is reserved");
        assert!(err.is_user_facing());
    }
}
