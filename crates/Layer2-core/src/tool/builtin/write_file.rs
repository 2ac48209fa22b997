//! Write File Tool - 파일 쓰기 도구
//!
//! 파일을 생성하거나 덮어씁니다. 부모 디렉토리는 자동 생성됩니다.

use async_trait::async_trait;
use loom_foundation::{
    ActionKind, Result, SecurityLevel, Tool, ToolCategory, ToolContext, ToolMeta, WriteFileParams,
};
use serde_json::{json, Value};
use tracing::info;

use super::mismatched;
use crate::tool::security::PathValidator;

/// Write File 도구
pub struct WriteFileTool;

impl WriteFileTool {
    pub const NAME: &'static str = "write_file";

    pub fn new() -> Self {
        Self
    }
}

impl Default for WriteFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn meta(&self) -> ToolMeta {
        ToolMeta::new(Self::NAME)
            .label("Write File")
            .description(
                "Create or overwrite a file relative to the workspace root. \
                 Parent directories are created as needed.",
            )
            .category(ToolCategory::FileOperations)
            .security_level(SecurityLevel::Approval)
            .primary_param("path")
    }

    fn example(&self) -> Value {
        json!({
            "action": Self::NAME,
            "path": "notes/todo.md",
            "content": "# TODO\n- first item\n"
        })
    }

    async fn execute(&self, action: &ActionKind, context: &dyn ToolContext) -> Result<String> {
        let ActionKind::WriteFile(WriteFileParams { path, content }) = action else {
            return Err(mismatched(Self::NAME, action));
        };

        let resolved = PathValidator::new(context.working_dir()).resolve(path)?;
        let existed = resolved.exists();

        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&resolved, content).await?;

        let lines = content.lines().count();
        info!("write_file: {} ({} lines)", resolved.display(), lines);

        Ok(format!(
            "{} {} ({} lines, {} bytes)",
            if existed { "Overwrote" } else { "Created" },
            path,
            lines,
            content.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::context::ExecutionContext;
    use crate::tool::testing::SilentInteraction;
    use loom_foundation::{AgentConfig, Error};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn write(path: &str, content: &str) -> ActionKind {
        ActionKind::WriteFile(WriteFileParams {
            path: path.to_string(),
            content: content.to_string(),
        })
    }

    #[tokio::test]
    async fn test_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let ctx = ExecutionContext::new(
            Arc::new(AgentConfig::default().workspace_root(dir.path())),
            Arc::new(SilentInteraction),
        );

        let out = WriteFileTool::new()
            .execute(&write("deep/nested/file.txt", "hi\n"), &ctx)
            .await
            .unwrap();
        assert!(out.starts_with("Created deep/nested/file.txt"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("deep/nested/file.txt")).unwrap(),
            "hi\n"
        );

        let again = WriteFileTool::new()
            .execute(&write("deep/nested/file.txt", "bye\n"), &ctx)
            .await
            .unwrap();
        assert!(again.starts_with("Overwrote"));
    }

    #[tokio::test]
    async fn test_rejects_outside_workspace() {
        let dir = tempdir().unwrap();
        let ctx = ExecutionContext::new(
            Arc::new(AgentConfig::default().workspace_root(dir.path())),
            Arc::new(SilentInteraction),
        );
        let result = WriteFileTool::new()
            .execute(&write("../escape.txt", "x"), &ctx)
            .await;
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
    }
}
