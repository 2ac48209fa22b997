//! Terminal Interaction - stdin/stdout 기반 확인 프롬프트
//!
//! REPL 입력과 확인 프롬프트가 같은 stdin을 공유하므로 줄 단위 리더를 하나만 둡니다.

use async_trait::async_trait;
use loom_foundation::{ConfirmRequest, Error, Interaction, Result, SecurityLevel};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// 터미널 상호작용
pub struct TerminalInteraction {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl TerminalInteraction {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    /// 한 줄 읽기 (EOF면 None)
    pub async fn read_line(&self) -> Result<Option<String>> {
        let mut lines = self.lines.lock().await;
        Ok(lines.next_line().await?)
    }
}

impl Default for TerminalInteraction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Interaction for TerminalInteraction {
    async fn prompt(
        &self,
        message: &str,
        choices: &[&str],
        default: Option<&str>,
    ) -> Result<String> {
        println!("\n{}", message);
        loop {
            print!("{}", input_hint(choices, default));
            std::io::stdout().flush()?;

            let Some(line) = self.read_line().await? else {
                return Err(Error::Cancelled);
            };
            let answer = line.trim();
            if answer.is_empty() {
                return Ok(default.unwrap_or_default().to_string());
            }
            if choices.is_empty() || choices.iter().any(|c| c.eq_ignore_ascii_case(answer)) {
                return Ok(answer.to_string());
            }
            println!("Please answer one of: {}", choices.join(", "));
        }
    }

    async fn confirm(&self, request: &ConfirmRequest) -> Result<String> {
        let marker = match request.security_level {
            SecurityLevel::Unsafe => "⚠ UNSAFE",
            _ => "?",
        };
        let mut message = format!("{} {}", marker, request.message);
        if let Some(detail) = request.detail.as_deref().filter(|d| !d.is_empty()) {
            message.push_str(&format!("\n    {}", detail));
        }
        if request.choices.iter().any(|c| c == "a") {
            message.push_str("\n    (y = yes, n = no, a = approve all for this session, /exit = stop)");
        }

        let choices: Vec<&str> = request.choices.iter().map(String::as_str).collect();
        self.prompt(&message, &choices, request.default.as_deref())
            .await
    }

    fn notify(&self, message: &str) {
        println!("• {}", message);
    }
}

/// `[y/n] (default: y) > `
fn input_hint(choices: &[&str], default: Option<&str>) -> String {
    match (choices.is_empty(), default) {
        (true, _) => "> ".to_string(),
        (false, Some(d)) => format!("[{}] (default: {}) > ", choices.join("/"), d),
        (false, None) => format!("[{}] > ", choices.join("/")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_hint() {
        assert_eq!(input_hint(&[], None), "> ");
        assert_eq!(input_hint(&["y", "n"], Some("n")), "[y/n] (default: n) > ");
        assert_eq!(input_hint(&["1", "2", "3"], None), "[1/2/3] > ");
    }
}
