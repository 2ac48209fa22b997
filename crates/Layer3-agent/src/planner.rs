//! Planner - 요청을 태스크 목록으로 분해
//!
//! 1. 분석: 플래닝이 필요한지 한 번 질문 (`false`면 즉시 종료)
//! 2. 파일 컨텍스트: 관련 파일을 읽어 공유 라인 풀 안에서 비례 배분
//! 3. 생성: 계획 설명 + 체크리스트 → 순서 있는 태스크 목록

use crate::cancel::CancellationChecker;
use crate::prompts::{
    render, PLANNING_ANALYSIS_PROMPT, PLANNING_CONTEXT_PROMPT, PLANNING_GENERATION_PROMPT,
};
use crate::summarizer::complete_prompt;
use loom_core::PathValidator;
use loom_foundation::{AgentConfig, Error, Interaction, Result};
use loom_provider::Provider;
use regex::Regex;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// 플래너 결과
#[derive(Debug, Clone, PartialEq)]
pub struct TaskQueue {
    /// 표시용 계획 설명
    pub plan: String,
    /// 순서 있는 태스크 설명
    pub tasks: Vec<String>,
    /// 태스크별 컨텍스트 재구성에 쓰는 시스템 프롬프트
    pub system_prompt: String,
}

/// 읽어온 파일
#[derive(Debug, Clone)]
struct FileSnippet {
    path: String,
    lines: Vec<String>,
}

/// 플래너
pub struct Planner {
    provider: Arc<dyn Provider>,
    interaction: Arc<dyn Interaction>,
    validator: PathValidator,
    enabled: bool,
    file_context_lines: usize,
}

impl Planner {
    pub fn new(
        config: &AgentConfig,
        provider: Arc<dyn Provider>,
        interaction: Arc<dyn Interaction>,
    ) -> Self {
        Self {
            provider,
            interaction,
            validator: PathValidator::new(&config.workspace_root),
            enabled: config.planning_enabled,
            file_context_lines: config.planning_file_context_lines,
        }
    }

    /// 필요하면 계획 생성
    ///
    /// 모델 오류는 "계획 없음"으로 처리하고, 취소만 호출자에게 전달합니다.
    pub async fn maybe_plan(
        &self,
        task: &str,
        system_prompt: &str,
        cancel: &CancellationChecker,
    ) -> Result<Option<TaskQueue>> {
        if !self.enabled {
            return Ok(None);
        }

        // Step 1: 분석
        let analysis = match self
            .ask(&render(PLANNING_ANALYSIS_PROMPT, &[("task", task)]), cancel)
            .await?
        {
            Some(text) => text,
            None => return Ok(None),
        };
        let needs_planning = parse_json_object(&analysis)
            .and_then(|obj| obj.get("needs_planning").and_then(Value::as_bool))
            .unwrap_or(false);
        if !needs_planning {
            info!("Planner: skipping planning for this task");
            return Ok(None);
        }

        // Step 2: 파일 컨텍스트
        let file_context = self.gather_file_context(task, cancel).await?;

        // Step 3: 생성
        let prompt = render(
            PLANNING_GENERATION_PROMPT,
            &[("task", task), ("file_context", &file_context)],
        );
        let Some(generation) = self.ask(&prompt, cancel).await? else {
            return Ok(None);
        };
        let Some(parsed) = parse_json_object(&generation) else {
            warn!("Planner: failed to parse generation response");
            return Ok(None);
        };

        let plan = parsed
            .get("plan")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        let checklist = checklist_text(parsed.get("tasks"));
        if plan.is_empty() && checklist.trim().is_empty() {
            return Ok(None);
        }

        let mut tasks = parse_task_list(&checklist);
        if tasks.is_empty() {
            tasks = if checklist.trim().is_empty() {
                vec![task.to_string()]
            } else {
                vec![checklist.trim().to_string()]
            };
        }

        info!("Planner: generated {} tasks", tasks.len());
        Ok(Some(TaskQueue {
            plan,
            tasks,
            system_prompt: system_prompt.to_string(),
        }))
    }

    /// 모델 호출 (취소 외 오류는 None)
    async fn ask(&self, prompt: &str, cancel: &CancellationChecker) -> Result<Option<String>> {
        match cancel
            .run(complete_prompt(self.provider.as_ref(), prompt))
            .await
        {
            Ok(text) => Ok(Some(text)),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                warn!("Planner: model call failed: {}", e);
                Ok(None)
            }
        }
    }

    async fn gather_file_context(
        &self,
        task: &str,
        cancel: &CancellationChecker,
    ) -> Result<String> {
        let Some(reply) = self
            .ask(&render(PLANNING_CONTEXT_PROMPT, &[("task", task)]), cancel)
            .await?
        else {
            return Ok(String::new());
        };
        let Some(parsed) = parse_json_object(&reply) else {
            return Ok(String::new());
        };
        if !parsed
            .get("needs_file_context")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            return Ok(String::new());
        }

        let requested: Vec<String> = parsed
            .get("files")
            .and_then(Value::as_array)
            .map(|files| {
                files
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let mut snippets = Vec::new();
        for path in requested {
            if let Some(snippet) = self.read_snippet(&path).await {
                snippets.push(snippet);
            }
        }
        if snippets.is_empty() {
            return Ok(String::new());
        }

        let total: usize = snippets.iter().map(|s| s.lines.len()).sum();
        if total > self.file_context_lines {
            let question = format!(
                "Planning context files total {} lines, over the {}-line budget. \
                 Truncate each file proportionally and continue?",
                total, self.file_context_lines
            );
            let answer = cancel
                .run(self.interaction.prompt(&question, &["y", "n"], Some("y")))
                .await?;
            if !answer.trim().eq_ignore_ascii_case("y") {
                info!("Planner: file context declined, planning without it");
                return Ok(String::new());
            }

            let counts: Vec<usize> = snippets.iter().map(|s| s.lines.len()).collect();
            for (snippet, share) in snippets.iter_mut().zip(allocate_lines(&counts, self.file_context_lines)) {
                snippet.lines.truncate(share);
            }
        }

        Ok(render_file_context(&snippets))
    }

    async fn read_snippet(&self, path: &str) -> Option<FileSnippet> {
        let resolved = match self.validator.resolve(Path::new(path)) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("Planner: rejected context file {}: {}", path, e);
                return None;
            }
        };
        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => Some(FileSnippet {
                path: path.to_string(),
                lines: content.lines().map(str::to_string).collect(),
            }),
            Err(e) => {
                debug!("Planner: cannot read {}: {}", path, e);
                None
            }
        }
    }
}

// ============================================================================
// 파싱 유틸
// ============================================================================

fn json_fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json\s*\n(.*?)\n\s*```").expect("valid regex"))
}

fn flat_object_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[^{}]*\}").expect("valid regex"))
}

fn task_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:[-*]|\d+\.)\s*(?:\[.\]\s*)?(.*)").expect("valid regex"))
}

/// ```json 블록, 없으면 첫 번째 평평한 JSON 객체
pub fn parse_json_object(text: &str) -> Option<Map<String, Value>> {
    if let Some(caps) = json_fence_regex().captures(text) {
        if let Ok(Value::Object(map)) = serde_json::from_str(&caps[1]) {
            return Some(map);
        }
    }
    flat_object_regex()
        .find_iter(text)
        .find_map(|m| match serde_json::from_str(m.as_str()) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
}

/// 체크리스트 → 태스크 설명 (`- `, `* `, `1. `, `[ ]` 허용)
pub fn parse_task_list(text: &str) -> Vec<String> {
    text.trim()
        .lines()
        .filter_map(|line| {
            let caps = task_line_regex().captures(line.trim())?;
            let desc = caps.get(1)?.as_str().trim();
            (!desc.is_empty()).then(|| desc.to_string())
        })
        .collect()
}

/// 문자열 또는 문자열 배열
fn checklist_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|item| format!("- {}", item))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// 파일별 라인 배분: `max(1, floor(lines / total × pool))`
pub fn allocate_lines(counts: &[usize], pool: usize) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return counts.to_vec();
    }
    counts
        .iter()
        .map(|&lines| ((lines as f64 / total as f64 * pool as f64).floor() as usize).max(1))
        .collect()
}

fn render_file_context(snippets: &[FileSnippet]) -> String {
    let mut out = String::from("\n# File Context\n");
    for snippet in snippets {
        out.push_str(&format!(
            "\n## {}\n```\n{}\n```\n",
            snippet.path,
            snippet.lines.join("\n")
        ));
    }
    out
}
