//! Read File Tool - 파일 읽기 도구
//!
//! 워크스페이스 내 파일을 줄 번호와 함께 읽습니다.
//! - start_line/end_line 지원 (1-based, 포함)
//! - 바이너리 파일 감지
//! - 경로 보안 검증 (path traversal 방지)

use async_trait::async_trait;
use loom_foundation::{
    strings::truncate_with_suffix, ActionKind, Error, ReadFileParams, Result, SecurityLevel, Tool,
    ToolCategory, ToolContext, ToolMeta,
};
use serde_json::{json, Value};
use std::path::Path;
use tracing::debug;

use super::mismatched;
use crate::tool::security::PathValidator;

/// Read File 도구
pub struct ReadFileTool;

impl ReadFileTool {
    pub const NAME: &'static str = "read_file";

    /// 최대 줄 길이 (이 이상은 잘림)
    const MAX_LINE_LENGTH: usize = 2000;

    pub fn new() -> Self {
        Self
    }

    fn is_binary_file(path: &Path) -> bool {
        let binary_extensions = [
            "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "pdf", "zip", "tar", "gz", "7z",
            "exe", "dll", "so", "dylib", "mp3", "mp4", "woff", "woff2", "ttf",
        ];

        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| binary_extensions.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// 줄 번호 포맷: "   123→내용"
    fn number_lines(content: &str, start: Option<usize>, end: Option<usize>) -> Result<String> {
        let start = start.unwrap_or(1).max(1);
        if let Some(end) = end {
            if end < start {
                return Err(Error::InvalidInput(format!(
                    "end_line ({}) is before start_line ({})",
                    end, start
                )));
            }
        }

        let mut output = String::new();
        for (idx, line) in content.lines().enumerate() {
            let line_num = idx + 1;
            if line_num < start {
                continue;
            }
            if end.is_some_and(|end| line_num > end) {
                break;
            }
            let line = truncate_with_suffix(line, Self::MAX_LINE_LENGTH, "... [truncated]");
            output.push_str(&format!("{:>6}→{}\n", line_num, line));
        }
        Ok(output)
    }
}

impl Default for ReadFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn meta(&self) -> ToolMeta {
        ToolMeta::new(Self::NAME)
            .label("Read File")
            .description(
                "Read a file relative to the workspace root with line numbers. \
                 Optional start_line/end_line (1-based, inclusive) select a range.",
            )
            .category(ToolCategory::FileOperations)
            .security_level(SecurityLevel::Safe)
            .primary_param("path")
    }

    fn example(&self) -> Value {
        json!({
            "action": Self::NAME,
            "path": "src/main.rs",
            "start_line": 1,
            "end_line": 80
        })
    }

    async fn execute(&self, action: &ActionKind, context: &dyn ToolContext) -> Result<String> {
        let ActionKind::ReadFile(ReadFileParams {
            path,
            start_line,
            end_line,
        }) = action
        else {
            return Err(mismatched(Self::NAME, action));
        };

        let resolved = PathValidator::new(context.working_dir()).resolve(path)?;
        if !resolved.exists() {
            return Err(Error::NotFound(format!("File not found: {}", path)));
        }
        if resolved.is_dir() {
            return Err(Error::InvalidInput(format!(
                "'{}' is a directory. Use run_command with ls to list it.",
                path
            )));
        }
        if Self::is_binary_file(&resolved) {
            return Ok(format!("[Binary file: {}]", path));
        }

        debug!("read_file: {}", resolved.display());
        let bytes = tokio::fs::read(&resolved).await?;
        let content = String::from_utf8_lossy(&bytes);
        if content.is_empty() {
            return Ok(format!("[Empty file: {}]", path));
        }

        Self::number_lines(&content, *start_line, *end_line)
    }
}
