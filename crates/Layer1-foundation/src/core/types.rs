//! Core Types - 공용 타입 정의
//!
//! 모든 레이어에서 공통으로 사용하는 타입들

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Security Level - 도구 보안 등급
// ============================================================================

/// 도구 보안 등급
///
/// 등록 이후 변경할 수 없습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    /// 확인 없이 실행
    #[default]
    Safe,
    /// 세션 승인이 없으면 확인 필요
    Approval,
    /// 매번 확인, 기본값은 거부
    Unsafe,
}

impl SecurityLevel {
    pub fn requires_confirmation(&self) -> bool {
        !matches!(self, SecurityLevel::Safe)
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityLevel::Safe => write!(f, "safe"),
            SecurityLevel::Approval => write!(f, "approval"),
            SecurityLevel::Unsafe => write!(f, "unsafe"),
        }
    }
}

// ============================================================================
// Tool Category - 프롬프트 섹션 그룹
// ============================================================================

/// 도구 카테고리 (프롬프트 섹션 순서대로)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Exploration,
    Execution,
    FileOperations,
    Knowledge,
    TaskManagement,
    Extension,
}

impl ToolCategory {
    /// 고정 섹션 순서
    pub const ORDER: [ToolCategory; 6] = [
        ToolCategory::Exploration,
        ToolCategory::Execution,
        ToolCategory::FileOperations,
        ToolCategory::Knowledge,
        ToolCategory::TaskManagement,
        ToolCategory::Extension,
    ];

    /// 섹션 제목
    pub fn title(&self) -> &'static str {
        match self {
            ToolCategory::Exploration => "Exploration & Research",
            ToolCategory::Execution => "Execution",
            ToolCategory::FileOperations => "File Operations",
            ToolCategory::Knowledge => "Agent Notebook",
            ToolCategory::TaskManagement => "Task Management",
            ToolCategory::Extension => "Installed Tool Packs",
        }
    }
}

// ============================================================================
// Tool Source - 도구 출처
// ============================================================================

/// 도구 출처 (어디서 왔는지)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolSource {
    /// 내장 도구
    Builtin,
    /// 확장 도구 (네임스페이스 = manifest tag)
    Extension { namespace: String },
}

impl ToolSource {
    pub fn extension(namespace: impl Into<String>) -> Self {
        Self::Extension {
            namespace: namespace.into(),
        }
    }

    /// 표시용 이름
    pub fn display_name(&self) -> String {
        match self {
            Self::Builtin => "builtin".to_string(),
            Self::Extension { namespace } => format!("extension:{}", namespace),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_level_serde() {
        let level: SecurityLevel = serde_json::from_str("\"approval\"").unwrap();
        assert_eq!(level, SecurityLevel::Approval);
        assert_eq!(level.to_string(), "approval");
        assert!(level.requires_confirmation());
        assert!(!SecurityLevel::Safe.requires_confirmation());
    }

    #[test]
    fn test_category_order_is_fixed() {
        let mut sorted = ToolCategory::ORDER.to_vec();
        sorted.sort();
        assert_eq!(sorted, ToolCategory::ORDER.to_vec());
        assert_eq!(ToolCategory::Extension.title(), "Installed Tool Packs");
    }
}
