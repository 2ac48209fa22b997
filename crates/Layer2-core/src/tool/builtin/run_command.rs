//! Run Command Tool - Shell 명령 실행
//!
//! `sh -c`로 명령을 실행합니다.
//! - 타임아웃 지원 (기본: 설정의 command_timeout_secs)
//! - stdout/stderr 결합 출력
//! - 실패 시 `COMMAND FAILED (exit code: N)` 접두사

use async_trait::async_trait;
use loom_foundation::{
    ActionKind, Error, Result, RunCommandParams, SecurityLevel, Tool, ToolCategory, ToolContext,
    ToolMeta,
};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::mismatched;
use crate::tool::process::run_process;

/// 차단되는 플래그 (시스템 패키지 손상 방지)
const BLOCKED_FLAGS: &[&str] = &["--break-system-packages"];

/// Run Command 도구
pub struct RunCommandTool;

impl RunCommandTool {
    pub const NAME: &'static str = "run_command";

    pub fn new() -> Self {
        Self
    }

    /// 차단된 플래그 검사
    fn check_blocked(command: &str) -> Result<()> {
        for flag in BLOCKED_FLAGS {
            if command.contains(flag) {
                return Err(Error::PermissionDenied(format!(
                    "Commands using '{}' are not allowed. Use a virtual environment instead.",
                    flag
                )));
            }
        }
        Ok(())
    }
}

impl Default for RunCommandTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn meta(&self) -> ToolMeta {
        ToolMeta::new(Self::NAME)
            .label("Run Command")
            .description(
                "Execute a shell command in the workspace root. Output combines stdout and \
                 stderr. Failed commands start with 'COMMAND FAILED (exit code: N)'.",
            )
            .category(ToolCategory::Execution)
            .security_level(SecurityLevel::Approval)
            .primary_param("command")
    }

    fn example(&self) -> Value {
        json!({
            "action": Self::NAME,
            "command": "ls -la src/"
        })
    }

    async fn execute(&self, action: &ActionKind, context: &dyn ToolContext) -> Result<String> {
        let ActionKind::RunCommand(RunCommandParams {
            command,
            timeout_secs,
        }) = action
        else {
            return Err(mismatched(Self::NAME, action));
        };

        if command.trim().is_empty() {
            return Err(Error::InvalidInput("command must not be empty".into()));
        }
        Self::check_blocked(command)?;

        let limit = timeout_secs.unwrap_or(context.config().command_timeout_secs);
        debug!("run_command: {} (timeout {}s)", command, limit);

        let output = run_process(
            "sh",
            &["-c".to_string(), command.clone()],
            context.working_dir(),
            None,
            Duration::from_secs(limit),
        )
        .await?;

        if !output.success() {
            warn!("Command exited with {}: {}", output.exit_code, command);
        }
        Ok(output.to_result_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::context::ExecutionContext;
    use crate::tool::testing::SilentInteraction;
    use loom_foundation::AgentConfig;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn run(cmd: &str) -> ActionKind {
        ActionKind::RunCommand(RunCommandParams {
            command: cmd.to_string(),
            timeout_secs: None,
        })
    }

    #[test]
    fn test_blocked_flag() {
        assert!(RunCommandTool::check_blocked("pip install x --break-system-packages").is_err());
        assert!(RunCommandTool::check_blocked("pip install x").is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_in_workspace_root() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let ctx = ExecutionContext::new(
            Arc::new(AgentConfig::default().workspace_root(dir.path())),
            Arc::new(SilentInteraction),
        );

        let out = RunCommandTool::new().execute(&run("ls"), &ctx).await.unwrap();
        assert!(out.contains("marker.txt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_prefix() {
        let dir = tempdir().unwrap();
        let ctx = ExecutionContext::new(
            Arc::new(AgentConfig::default().workspace_root(dir.path())),
            Arc::new(SilentInteraction),
        );

        let out = RunCommandTool::new()
            .execute(&run("echo oops >&2; exit 3"), &ctx)
            .await
            .unwrap();
        assert!(out.starts_with("COMMAND FAILED (exit code: 3)"));
        assert!(out.contains("oops"));
    }
}
