//! Process Runner - 외부 프로세스 실행
//!
//! run_command와 확장 CommandTool이 공유합니다.
//! - 타임아웃 시 프로세스 종료 (kill_on_drop)
//! - stdin 입력 지원
//! - ANSI 이스케이프 제거

use loom_foundation::{strings::truncate_with_suffix, Error, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// 실패 결과 접두사 (에이전트 루프가 경고를 덧붙이는 기준)
pub const COMMAND_FAILED_PREFIX: &str = "COMMAND FAILED";

/// 최대 출력 크기 (문자)
const MAX_OUTPUT_CHARS: usize = 200_000;

/// 프로세스 실행 결과
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// 모델에게 전달할 텍스트
    ///
    /// 실패 시 `COMMAND FAILED (exit code: N)`으로 시작합니다.
    pub fn to_result_text(&self) -> String {
        let mut output = String::new();
        if !self.stdout.is_empty() {
            output.push_str(&self.stdout);
        }
        if !self.stderr.is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str("[stderr]\n");
            output.push_str(&self.stderr);
        }
        let output = truncate_with_suffix(&output, MAX_OUTPUT_CHARS, "\n... [output truncated]");

        if self.success() {
            if output.is_empty() {
                "[Command completed successfully with no output]".to_string()
            } else {
                output
            }
        } else if output.is_empty() {
            format!("{} (exit code: {})", COMMAND_FAILED_PREFIX, self.exit_code)
        } else {
            format!(
                "{} (exit code: {})\n{}",
                COMMAND_FAILED_PREFIX, self.exit_code, output
            )
        }
    }
}

/// 프로세스 실행
pub async fn run_process(
    program: &str,
    args: &[String],
    cwd: &Path,
    stdin: Option<&str>,
    limit: Duration,
) -> Result<ProcessOutput> {
    debug!("Spawning {} {:?} in {}", program, args, cwd.display());

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| Error::tool_execution(program, format!("Failed to spawn process: {}", e)))?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input.as_bytes()).await?;
        // EOF
        drop(pipe);
    }

    let output = match timeout(limit, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(Error::Timeout(format!(
                "'{}' timed out after {}s",
                program,
                limit.as_secs()
            )))
        }
    };

    Ok(ProcessOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: clean_output(&output.stdout),
        stderr: clean_output(&output.stderr),
    })
}

fn clean_output(raw: &[u8]) -> String {
    let stripped = strip_ansi_escapes::strip(raw);
    String::from_utf8_lossy(&stripped).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_text_prefix() {
        let out = ProcessOutput {
            exit_code: 2,
            stdout: String::new(),
            stderr: "no such file".into(),
        };
        let text = out.to_result_text();
        assert!(text.starts_with("COMMAND FAILED (exit code: 2)"));
        assert!(text.contains("[stderr]\nno such file"));
    }

    #[test]
    fn test_success_without_output() {
        let out = ProcessOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(
            out.to_result_text(),
            "[Command completed successfully with no output]"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_with_stdin() {
        let dir = std::env::temp_dir();
        let out = run_process(
            "sh",
            &["-c".to_string(), "cat".to_string()],
            &dir,
            Some("hello"),
            Duration::from_secs(10),
        )
        .await
        .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout() {
        let dir = std::env::temp_dir();
        let result = run_process(
            "sh",
            &["-c".to_string(), "sleep 5".to_string()],
            &dir,
            None,
            Duration::from_millis(100),
        )
        .await;
        assert!(matches!(result, Err(Error::Timeout(_))));
    }
}
