//! Core Traits - 핵심 인터페이스 정의
//!
//! Layer2 이상에서 구현해야 하는 핵심 trait들을 정의합니다.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Layer4-CLI                                                 │
//! │  └── Interaction 구현 (터미널 프롬프트)                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Layer3-Agent                                               │
//! │  └── Agent 루프, ToolContext 구현                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Layer2-Core/Provider                                       │
//! │  ├── Tool 구현 (run_command, read_file ...)                 │
//! │  └── ToolExtension 구현 (manifest 기반 확장)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Layer1-Foundation (이 레이어)                              │
//! │  └── Trait 정의 (Tool, ToolContext, Interaction)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use super::action::ActionKind;
use super::task_channel::TaskChannel;
use super::types::{SecurityLevel, ToolCategory};
use crate::config::AgentConfig;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// Tool Trait - 도구 인터페이스
// ============================================================================

/// 도구 메타데이터
#[derive(Debug, Clone)]
pub struct ToolMeta {
    /// 도구 이름 (고유 식별자, `^[a-z][a-z0-9_]*$`)
    pub name: String,
    /// 표시 이름
    pub label: String,
    /// 설명
    pub description: String,
    /// 프롬프트 섹션 카테고리
    pub category: ToolCategory,
    /// 보안 등급
    pub security_level: SecurityLevel,
    /// 확인 프롬프트에 보여줄 대표 파라미터
    pub primary_param: Option<String>,
}

impl ToolMeta {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            description: String::new(),
            category: ToolCategory::Extension,
            security_level: SecurityLevel::Safe,
            primary_param: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn category(mut self, cat: ToolCategory) -> Self {
        self.category = cat;
        self
    }

    pub fn security_level(mut self, level: SecurityLevel) -> Self {
        self.security_level = level;
        self
    }

    pub fn primary_param(mut self, param: impl Into<String>) -> Self {
        self.primary_param = Some(param.into());
        self
    }
}

/// 도구 인터페이스
///
/// 실행 결과는 모델에게 그대로 전달되는 텍스트입니다.
/// 실패는 `Err`로 반환하며, 에이전트 루프가 경계에서 에러 텍스트로 변환합니다.
#[async_trait]
pub trait Tool: Send + Sync {
    /// 도구 이름 (고유 식별자)
    fn name(&self) -> &str;

    /// 도구 메타데이터 반환
    fn meta(&self) -> ToolMeta;

    /// 프롬프트에 들어갈 사용 예시 (`{"action": name, ...}`)
    fn example(&self) -> Value;

    /// 도구 실행
    ///
    /// # Arguments
    /// * `action` - 레지스트리에서 검증된 타입 액션
    /// * `context` - 실행 컨텍스트 (설정, 작업 디렉토리, 사용자 상호작용)
    async fn execute(&self, action: &ActionKind, context: &dyn ToolContext) -> Result<String>;
}

/// 도구 실행 컨텍스트
pub trait ToolContext: Send + Sync {
    /// 작업 디렉토리 (workspace root)
    fn working_dir(&self) -> &Path;

    /// 세션 설정
    fn config(&self) -> &AgentConfig;

    /// 사용자 상호작용
    fn interaction(&self) -> &dyn Interaction;

    /// 멀티 태스크 실행 중일 때의 태스크 채널
    fn task_channel(&self) -> Option<&TaskChannel>;
}

// ============================================================================
// Tool Extension - 정적 등록 진입점
// ============================================================================

/// 외부 도구 묶음
///
/// 각 확장은 자신의 네임스페이스 아래 도구 목록을 반환합니다.
pub trait ToolExtension: Send + Sync {
    /// 네임스페이스 (manifest tag)
    fn namespace(&self) -> &str;

    /// 설명
    fn description(&self) -> &str {
        ""
    }

    /// 등록할 도구들
    fn register(&self) -> Result<Vec<Arc<dyn Tool>>>;
}

// ============================================================================
// Interaction - 사용자 상호작용
// ============================================================================

/// 확인 요청 (모달 메타데이터 포함)
#[derive(Debug, Clone)]
pub struct ConfirmRequest {
    pub message: String,
    pub choices: Vec<String>,
    pub default: Option<String>,
    pub tool_name: String,
    pub security_level: SecurityLevel,
    /// 대표 파라미터 값 등 추가 표시 정보
    pub detail: Option<String>,
}

impl ConfirmRequest {
    pub fn new(message: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            choices: Vec::new(),
            default: None,
            tool_name: tool_name.into(),
            security_level: SecurityLevel::Approval,
            detail: None,
        }
    }

    pub fn choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn default_choice(mut self, choice: impl Into<String>) -> Self {
        self.default = Some(choice.into());
        self
    }

    pub fn security_level(mut self, level: SecurityLevel) -> Self {
        self.security_level = level;
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// 사용자 상호작용 인터페이스
///
/// Layer4에서 구현합니다. 취소 시 `Error::Cancelled`를 반환해야 합니다.
#[async_trait]
pub trait Interaction: Send + Sync {
    /// 질문 후 응답 반환 (choices가 있으면 그 중 하나)
    async fn prompt(&self, message: &str, choices: &[&str], default: Option<&str>)
        -> Result<String>;

    /// 확인 프롬프트
    async fn confirm(&self, request: &ConfirmRequest) -> Result<String> {
        let choices: Vec<&str> = request.choices.iter().map(String::as_str).collect();
        self.prompt(&request.message, &choices, request.default.as_deref())
            .await
    }

    /// 알림 표시 (정보성)
    fn notify(&self, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Interaction for Recorder {
        async fn prompt(
            &self,
            message: &str,
            choices: &[&str],
            default: Option<&str>,
        ) -> Result<String> {
            self.seen
                .lock()
                .push(format!("{}|{}|{:?}", message, choices.join(","), default));
            Ok(default.unwrap_or_default().to_string())
        }

        fn notify(&self, _message: &str) {}
    }

    #[tokio::test]
    async fn test_confirm_delegates_to_prompt() {
        let recorder = Recorder {
            seen: Mutex::new(Vec::new()),
        };
        let request = ConfirmRequest::new("Run it?", "run_command")
            .choices(&["y", "n"])
            .default_choice("n")
            .detail("ls");

        let answer = recorder.confirm(&request).await.unwrap();
        assert_eq!(answer, "n");
        assert_eq!(recorder.seen.lock()[0], "Run it?|y,n|Some(\"n\")");
    }

    #[test]
    fn test_meta_builder() {
        let meta = ToolMeta::new("run_command")
            .label("Run Command")
            .security_level(SecurityLevel::Approval)
            .category(ToolCategory::Execution)
            .primary_param("command");
        assert_eq!(meta.label, "Run Command");
        assert_eq!(meta.primary_param.as_deref(), Some("command"));
        assert_eq!(meta.security_level, SecurityLevel::Approval);
    }
}
