//! Command Tool - 외부 명령으로 구현된 확장 도구
//!
//! 액션 파라미터를 JSON으로 stdin에 전달하고 stdout을 결과로 반환합니다.

use async_trait::async_trait;
use loom_foundation::{ActionKind, Error, Result, Tool, ToolContext, ToolMeta};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::manifest::ToolDescriptor;
use crate::tool::process::run_process;

/// 명령 기반 도구
pub struct CommandTool {
    descriptor: ToolDescriptor,
    argv: Vec<String>,
    /// 확장 디렉토리 (상대 실행 파일 해석 기준)
    base_dir: PathBuf,
}

impl CommandTool {
    pub fn new(descriptor: ToolDescriptor, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        let mut argv = descriptor.command.argv()?;
        argv[0] = resolve_program(&argv[0], &base_dir);
        Ok(Self {
            descriptor,
            argv,
            base_dir,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

/// `./` 또는 `../`로 시작하는 실행 파일은 확장 디렉토리 기준
fn resolve_program(program: &str, base_dir: &Path) -> String {
    if program.starts_with("./") || program.starts_with("../") {
        base_dir.join(program).to_string_lossy().into_owned()
    } else {
        program.to_string()
    }
}

#[async_trait]
impl Tool for CommandTool {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn meta(&self) -> ToolMeta {
        let d = &self.descriptor;
        let mut meta = ToolMeta::new(&d.name)
            .description(&d.description)
            .security_level(d.security_level);
        if let Some(label) = &d.label {
            meta = meta.label(label);
        }
        if let Some(param) = &d.primary_param {
            meta = meta.primary_param(param);
        }
        meta
    }

    fn example(&self) -> Value {
        let mut example = json!({ "action": self.descriptor.name });
        match (&self.descriptor.example, &self.descriptor.primary_param) {
            (Some(Value::Object(params)), _) => {
                for (k, v) in params {
                    if k != "action" {
                        example[k] = v.clone();
                    }
                }
            }
            (_, Some(param)) => example[param] = json!("..."),
            _ => {}
        }
        example
    }

    async fn execute(&self, action: &ActionKind, context: &dyn ToolContext) -> Result<String> {
        let ActionKind::Extension(action) = action else {
            return Err(Error::tool_execution(
                &self.descriptor.name,
                format!("received mismatched action '{}'", action.name()),
            ));
        };

        let input = serde_json::to_string(&action.parameters)?;
        let timeout = self
            .descriptor
            .timeout_secs
            .unwrap_or(context.config().command_timeout_secs);
        debug!("Extension tool {} -> {:?}", self.descriptor.name, self.argv);

        let output = run_process(
            &self.argv[0],
            &self.argv[1..],
            context.working_dir(),
            Some(&input),
            Duration::from_secs(timeout),
        )
        .await?;

        Ok(output.to_result_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::context::ExecutionContext;
    use crate::tool::testing::SilentInteraction;
    use loom_foundation::{Action, AgentConfig, SecurityLevel};
    use std::sync::Arc;

    fn descriptor(json: &str) -> ToolDescriptor {
        ToolDescriptor::parse(json).unwrap()
    }

    #[test]
    fn test_relative_program_resolved() {
        let tool = CommandTool::new(
            descriptor(r#"{"name":"x","command":["./run.sh","--fast"]}"#),
            "/opt/ext",
        )
        .unwrap();
        assert_eq!(tool.argv[0], "/opt/ext/./run.sh");
        assert_eq!(tool.argv[1], "--fast");
    }

    #[test]
    fn test_meta_and_example() {
        let tool = CommandTool::new(
            descriptor(
                r#"{"name":"lint","label":"Lint","description":"Run linter","security_level":"approval",
                    "primary_param":"path","command":["true"]}"#,
            ),
            "/tmp",
        )
        .unwrap();
        let meta = tool.meta();
        assert_eq!(meta.label, "Lint");
        assert_eq!(meta.security_level, SecurityLevel::Approval);
        assert_eq!(tool.example(), json!({"action": "lint", "path": "..."}));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_params_passed_on_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let tool = CommandTool::new(
            descriptor(r#"{"name":"echo_params","command":["cat"]}"#),
            dir.path(),
        )
        .unwrap();
        let ctx = ExecutionContext::new(
            Arc::new(AgentConfig::default().workspace_root(dir.path())),
            Arc::new(SilentInteraction),
        );

        let action = ActionKind::Extension(Action::new("echo_params").with_param("query", "abc"));
        let out = tool.execute(&action, &ctx).await.unwrap();
        assert_eq!(out, r#"{"query":"abc"}"#);
    }
}
