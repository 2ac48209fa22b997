//! Request runner - 요청 하나 실행 + 이벤트 출력

use loom_agent::{cancellation, run_agent, AgentDeps, AgentEvent, RunOutcome};
use loom_foundation::strings::truncate_with_suffix;
use loom_foundation::AgentConfig;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// 요청 하나 실행 (Ctrl-C로 중단)
pub async fn run_request(request: &str, config: Arc<AgentConfig>, deps: AgentDeps) -> RunOutcome {
    let (handle, checker) = cancellation();
    let deps = deps.with_cancellation(checker);

    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel("Interrupted by user");
        }
    });

    let (tx, mut rx) = mpsc::channel(100);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Some(line) = render_event(&event) {
                if matches!(event, AgentEvent::Error(_)) {
                    eprintln!("{}", line);
                } else {
                    println!("{}", line);
                }
            }
        }
    });

    let outcome = run_agent(request, config, deps, tx).await;
    let _ = printer.await;
    ctrl_c.abort();
    debug!("Request finished: {:?}", outcome);
    outcome
}

/// 이벤트 → 출력 문자열 (출력하지 않는 이벤트는 None)
pub fn render_event(event: &AgentEvent) -> Option<String> {
    let line = match event {
        AgentEvent::Thinking => return None,
        AgentEvent::Reasoning(text) => format!("\n{}", text.trim()),
        AgentEvent::ToolStart { label, detail, .. } => {
            if detail.is_empty() {
                format!("\n[{}]", label)
            } else {
                format!("\n[{}] {}", label, detail)
            }
        }
        AgentEvent::ToolComplete {
            tool,
            summary,
            success,
        } => {
            let status = if *success { "✓" } else { "✗" };
            format!("[{}] {} {}", tool, status, summary)
        }
        AgentEvent::Notice(text) => format!("• {}", text),
        AgentEvent::LoopDetected {
            loop_type,
            severity,
            description,
            suggested_actions,
        } => {
            let mut text = format!("\n⚠ Loop detected ({}, {}): {}", loop_type, severity, description);
            for action in suggested_actions {
                text.push_str(&format!("\n  - {}", action));
            }
            text
        }
        AgentEvent::TaskStarted {
            index,
            total,
            description,
            pre_completed,
        } => {
            let suffix = if *pre_completed {
                " (completed ahead of schedule)"
            } else {
                ""
            };
            format!("\n━━ Task {}/{}: {}{}", index + 1, total, description, suffix)
        }
        AgentEvent::TaskCompleted {
            task_id,
            resolution,
            ..
        } => format!(
            "✓ {}: {}",
            task_id,
            truncate_with_suffix(&resolution.replace('\n', " "), 100, "...")
        ),
        AgentEvent::Answer(answer) => format!("\n{}", answer),
        AgentEvent::Error(message) => format!("\nError: {}", message),
        AgentEvent::Cancelled => "\nCancelled.".to_string(),
    };
    Some(line)
}
