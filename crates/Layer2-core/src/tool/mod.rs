//! Tool System - 도구 레지스트리와 내장 도구
//!
//! - `registry`: 이름 검증, 네임스페이스, 프롬프트 섹션 생성
//! - `builtin`: run_command, read_file, write_file, ask_user, mark_task_done
//! - `security`: 워크스페이스 경로 검증
//! - `process`: 외부 프로세스 실행 (타임아웃, stdin)

pub mod builtin;
pub mod context;
pub mod process;
pub mod registry;
pub mod security;

#[cfg(test)]
pub(crate) mod testing;

pub use context::ExecutionContext;
pub use process::{run_process, ProcessOutput, COMMAND_FAILED_PREFIX};
pub use registry::{is_reserved, ExtensionReport, ResolvedAction, ToolRegistry, RESERVED_NAMES};
pub use security::{PathValidation, PathValidator};
