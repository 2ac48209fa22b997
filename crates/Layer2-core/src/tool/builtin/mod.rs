//! Builtin Tools - 내장 도구들
//!
//! ## 도구 목록
//!
//! ### 탐색 (Exploration)
//! - `ask_user` - 사용자에게 질문
//!
//! ### 실행 (Execution)
//! - `run_command` - Shell 명령 실행
//!
//! ### 파일 (File Operations)
//! - `read_file` - 파일 읽기 (줄 번호 포함)
//! - `write_file` - 파일 쓰기 (생성 또는 덮어쓰기)
//!
//! ### 태스크 (Task Management)
//! - `mark_task_done` - 이후 태스크를 미리 완료로 기록

pub mod ask_user;
pub mod mark_task_done;
pub mod read_file;
pub mod run_command;
pub mod write_file;

pub use ask_user::AskUserTool;
pub use mark_task_done::MarkTaskDoneTool;
pub use read_file::ReadFileTool;
pub use run_command::RunCommandTool;
pub use write_file::WriteFileTool;

use loom_foundation::Tool;
use std::sync::Arc;

/// 모든 builtin 도구 인스턴스 생성
pub fn all_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(AskUserTool::new()) as Arc<dyn Tool>,
        Arc::new(RunCommandTool::new()),
        Arc::new(ReadFileTool::new()),
        Arc::new(WriteFileTool::new()),
        Arc::new(MarkTaskDoneTool::new()),
    ]
}

/// 타입 액션이 도구와 맞지 않을 때의 에러
pub(crate) fn mismatched(tool: &str, kind: &loom_foundation::ActionKind) -> loom_foundation::Error {
    loom_foundation::Error::tool_execution(
        tool,
        format!("received mismatched action '{}'", kind.name()),
    )
}
