//! Task List / Task Executor
//!
//! 여러 태스크로 나뉜 요청의 진행 상태와 결과를 관리합니다.
//!
//! - `TaskList`: 태스크 목록 + 결과 기록 (태스크당 결과는 한 번만)
//! - `TaskExecutor`: 결과 컨텍스트 생성, 발견 사항 추출, 최종 합성, 스냅샷 저장

use crate::cancel::CancellationChecker;
use crate::planner::TaskQueue;
use crate::prompts::{render, SYNTHESIS_PROMPT, TASK_CREATION_PROMPT, TASK_DETECTION_PROMPT};
use crate::summarizer::complete_prompt;
use chrono::{DateTime, Utc};
use loom_core::parse_action;
use loom_foundation::{AgentConfig, Error, Result};
use loom_provider::{Message, MessageRole, Provider};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::{error, info, warn};

/// 결과가 없을 때의 고정 문구
pub const NO_RESOLUTIONS_YET: &str = "No previous task resolutions yet.";

/// 스냅샷 파일명
pub const SNAPSHOT_FILE: &str = "task_resolutions.json";

const MAX_KEY_FILES: usize = 12;
const MAX_WORKING_COMMANDS: usize = 5;

/// 실패한 명령 결과로 볼 표식 (소문자 비교)
const FAILURE_MARKERS: &[&str] = &[
    "error:",
    "traceback",
    "command not found",
    "exit code: 1",
    "exit code: 2",
    "no such file",
    "command failed",
];

// ============================================================================
// Types
// ============================================================================

/// 태스크 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

/// 태스크 항목
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskItem {
    pub id: String,
    pub description: String,
    pub status: TaskStatus,
}

/// 태스크 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResolution {
    pub task_id: String,
    pub task_description: String,
    pub resolution: String,
    pub notes: String,
    pub timestamp: DateTime<Utc>,
}

/// 요청 하나의 태스크 목록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: String,
    pub original_prompt: String,
    pub tasks: Vec<TaskItem>,
    pub resolutions: Vec<TaskResolution>,
    pub created_at: DateTime<Utc>,
}

impl TaskList {
    pub fn new(original_prompt: impl Into<String>) -> Self {
        let created_at = Utc::now();
        Self {
            id: format!("tasklist_{}", created_at.timestamp()),
            original_prompt: original_prompt.into(),
            tasks: Vec::new(),
            resolutions: Vec::new(),
            created_at,
        }
    }

    /// 설명 목록으로 생성 (`task_1`, `task_2`, ...)
    pub fn from_descriptions<S: Into<String>>(
        original_prompt: impl Into<String>,
        descriptions: impl IntoIterator<Item = S>,
    ) -> Self {
        let mut list = Self::new(original_prompt);
        for (i, description) in descriptions.into_iter().enumerate() {
            list.add_task(format!("task_{}", i + 1), description);
        }
        list
    }

    pub fn add_task(&mut self, id: impl Into<String>, description: impl Into<String>) {
        self.tasks.push(TaskItem {
            id: id.into(),
            description: description.into(),
            status: TaskStatus::Pending,
        });
    }

    pub fn task(&self, id: &str) -> Option<&TaskItem> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn is_resolved(&self, id: &str) -> bool {
        self.resolutions.iter().any(|r| r.task_id == id)
    }

    /// 결과 기록 + 상태 완료 (같은 id 두 번째 기록은 거부)
    pub fn add_resolution(
        &mut self,
        task_id: &str,
        task_description: &str,
        resolution: &str,
        notes: &str,
    ) -> Result<()> {
        if self.is_resolved(task_id) {
            return Err(Error::Task(format!(
                "Task '{}' already has a recorded resolution",
                task_id
            )));
        }

        self.resolutions.push(TaskResolution {
            task_id: task_id.to_string(),
            task_description: task_description.to_string(),
            resolution: resolution.to_string(),
            notes: notes.to_string(),
            timestamp: Utc::now(),
        });
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == task_id) {
            task.status = TaskStatus::Completed;
        }
        info!("Resolution recorded for task {}", task_id);
        Ok(())
    }

    pub fn all_completed(&self) -> bool {
        self.tasks.iter().all(|t| t.status == TaskStatus::Completed)
    }

    pub fn pending_tasks(&self) -> Vec<&TaskItem> {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .collect()
    }

    /// 전체 결과 요약 (합성 입력 / 합성 실패 시 응답)
    pub fn summary(&self) -> String {
        let mut parts = vec![format!(
            "# Summary of Resolutions\n\n**Original Request:**\n{}\n",
            self.original_prompt
        )];
        for res in &self.resolutions {
            parts.push(format!("## Task: {}\n", res.task_id));
            parts.push(format!("**Description:** {}\n\n", res.task_description));
            parts.push(format!("**Resolution:**\n{}\n", res.resolution));
            if !res.notes.is_empty() {
                parts.push(format!("\n**Notes:** {}\n", res.notes));
            }
            parts.push("\n---\n\n".to_string());
        }
        parts.join("\n")
    }
}

// ============================================================================
// TaskExecutor
// ============================================================================

/// 태스크 결과 추적기
pub struct TaskExecutor {
    provider: Arc<dyn Provider>,
    state_dir: PathBuf,
    task_list: Option<TaskList>,
}

impl TaskExecutor {
    pub fn new(config: &AgentConfig, provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            state_dir: config.state_path(),
            task_list: None,
        }
    }

    pub fn task_list(&self) -> Option<&TaskList> {
        self.task_list.as_ref()
    }

    // ------------------------------------------------------------------------
    // 초기화
    // ------------------------------------------------------------------------

    /// 플래너 결과로 초기화 (추가 모델 호출 없음)
    pub fn initialize_from_task_queue(&mut self, prompt: &str, queue: &TaskQueue) -> &TaskList {
        let list = TaskList::from_descriptions(prompt, queue.tasks.iter().cloned());
        info!("Task list initialized from plan with {} tasks", list.tasks.len());
        self.task_list.insert(list)
    }

    /// 단일 호출 감지: 태스크 목록이 필요한지 (yes/no)
    pub async fn should_use_task_list(
        &self,
        prompt: &str,
        cancel: &CancellationChecker,
    ) -> Result<bool> {
        let question = render(TASK_DETECTION_PROMPT, &[("task", prompt)]);
        match cancel.run(complete_prompt(self.provider.as_ref(), &question)).await {
            Ok(answer) => {
                let answer = answer.trim().to_lowercase();
                info!("Task list detection result: {}", answer);
                Ok(answer.contains("yes"))
            }
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                warn!("Task detection failed: {}", e);
                Ok(false)
            }
        }
    }

    /// 분해 호출로 초기화 (`{"tasks": [...]}`), 비었거나 파싱 실패 시 None
    pub async fn initialize_task_list(
        &mut self,
        prompt: &str,
        cancel: &CancellationChecker,
    ) -> Result<Option<&TaskList>> {
        let request = render(TASK_CREATION_PROMPT, &[("task", prompt)]);
        let reply = match cancel.run(complete_prompt(self.provider.as_ref(), &request)).await {
            Ok(reply) => reply,
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                warn!("Task list creation failed: {}", e);
                return Ok(None);
            }
        };

        let descriptions = parse_task_descriptions(&reply);
        if descriptions.is_empty() {
            warn!("Task list creation returned no tasks");
            return Ok(None);
        }
        let list = TaskList::from_descriptions(prompt, descriptions);
        info!("Created task list with {} tasks", list.tasks.len());
        Ok(Some(&*self.task_list.insert(list)))
    }

    // ------------------------------------------------------------------------
    // 결과
    // ------------------------------------------------------------------------

    pub fn record_task_resolution(
        &mut self,
        task_id: &str,
        task_description: &str,
        resolution: &str,
        notes: &str,
    ) -> Result<()> {
        self.task_list
            .as_mut()
            .ok_or_else(|| Error::Task("No active task list".into()))?
            .add_resolution(task_id, task_description, resolution, notes)
    }

    /// 다음 태스크 프롬프트에 붙일 이전 결과
    pub fn previous_resolutions_context(&self) -> String {
        let Some(list) = self.task_list.as_ref().filter(|l| !l.resolutions.is_empty()) else {
            return NO_RESOLUTIONS_YET.to_string();
        };
        list.resolutions
            .iter()
            .map(|res| {
                let mut block = format!(
                    "**{}: {}**\nResult: {}",
                    res.task_id, res.task_description, res.resolution
                );
                if !res.notes.is_empty() {
                    block.push_str(&format!("\nContext: {}", res.notes));
                }
                block
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn all_tasks_completed(&self) -> bool {
        self.task_list.as_ref().map_or(true, TaskList::all_completed)
    }

    /// 전체 결과를 하나의 답으로 합성 (실패 시 요약 원문)
    pub async fn final_synthesis(&self, cancel: &CancellationChecker) -> Result<String> {
        let Some(list) = self.task_list.as_ref().filter(|l| !l.resolutions.is_empty()) else {
            return Ok("No task resolutions to synthesize".to_string());
        };
        let summary = list.summary();
        let prompt = render(SYNTHESIS_PROMPT, &[("summary", &summary)]);

        match cancel.run(complete_prompt(self.provider.as_ref(), &prompt)).await {
            Ok(answer) if !answer.trim().is_empty() => {
                info!("Generated final synthesis");
                Ok(answer)
            }
            Ok(_) => Ok(summary),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                error!("Synthesis failed: {}", e);
                Ok(summary)
            }
        }
    }

    /// `<state_dir>/task_resolutions.json` 저장 (실패는 로그만)
    pub async fn save_snapshot(&self) -> Option<PathBuf> {
        let list = self.task_list.as_ref()?;
        let path = self.state_dir.join(SNAPSHOT_FILE);

        let json = match serde_json::to_string_pretty(list) {
            Ok(json) => json,
            Err(e) => {
                warn!("Could not serialize task list: {}", e);
                return None;
            }
        };
        if let Err(e) = tokio::fs::create_dir_all(&self.state_dir).await {
            warn!("Could not create {}: {}", self.state_dir.display(), e);
            return None;
        }
        match tokio::fs::write(&path, json).await {
            Ok(()) => {
                info!("Task list saved to {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Could not save task list: {}", e);
                None
            }
        }
    }

    // ------------------------------------------------------------------------
    // 발견 사항
    // ------------------------------------------------------------------------

    /// 완료된 태스크 대화에서 주요 파일과 성공한 명령 추출
    pub fn extract_discoveries(messages: &[Message]) -> String {
        let mut files = BTreeSet::new();
        let mut commands: Vec<String> = Vec::new();
        let mut last_command: Option<String> = None;

        for message in messages {
            match message.role {
                MessageRole::Assistant => {
                    for caps in file_path_regex().captures_iter(&message.content) {
                        let path = &caps[1];
                        if path.contains('/') && path.len() > 4 {
                            files.insert(path.to_string());
                        }
                    }
                    if let Some(action) = parse_action(&message.content) {
                        if action.name == "run_command" {
                            last_command = action.param_str("command").map(str::to_string);
                        }
                    }
                }
                MessageRole::User if message.source_action() == Some("run_command") => {
                    if let Some(command) = last_command.take() {
                        let lower = message.content.to_lowercase();
                        if !FAILURE_MARKERS.iter().any(|m| lower.contains(m)) {
                            commands.push(command);
                        }
                    }
                }
                _ => {}
            }
        }

        let mut parts = Vec::new();
        if !files.is_empty() {
            let listed: Vec<String> = files.into_iter().take(MAX_KEY_FILES).collect();
            parts.push(format!("Key files: {}", listed.join(", ")));
        }

        let mut seen = HashSet::new();
        let unique: Vec<String> = commands
            .into_iter()
            .filter(|c| seen.insert(c.clone()))
            .take(MAX_WORKING_COMMANDS)
            .map(|c| format!("  - `{}`", c))
            .collect();
        if !unique.is_empty() {
            parts.push(format!("Working commands:\n{}", unique.join("\n")));
        }

        parts.join("\n")
    }
}

fn file_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"[`'"]([a-zA-Z0-9_./\-]+\.(?:py|js|ts|jsx|tsx|json|yaml|yml|md|txt|sh|go|rs|rb|java|cpp|c|h|toml))[`'"]"#,
        )
        .expect("valid regex")
    })
}

/// `{"tasks": [{"description": ..} | ".."]}` 에서 설명 추출
fn parse_task_descriptions(reply: &str) -> Vec<String> {
    let (Some(start), Some(end)) = (reply.find('{'), reply.rfind('}')) else {
        return Vec::new();
    };
    if end < start {
        return Vec::new();
    }
    let Ok(value) = serde_json::from_str::<Value>(&reply[start..=end]) else {
        return Vec::new();
    };

    value
        .get("tasks")
        .and_then(Value::as_array)
        .map(|tasks| {
            tasks
                .iter()
                .filter_map(|task| match task {
                    Value::String(desc) => Some(desc.trim().to_string()),
                    other => other
                        .get("description")
                        .and_then(Value::as_str)
                        .map(|d| d.trim().to_string()),
                })
                .filter(|d| !d.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;
    use loom_provider::ProviderError;
    use tempfile::TempDir;

    fn executor(dir: &TempDir, provider: ScriptedProvider) -> TaskExecutor {
        let config = AgentConfig::default().workspace_root(dir.path());
        TaskExecutor::new(&config, Arc::new(provider))
    }

    fn queue(tasks: &[&str]) -> TaskQueue {
        TaskQueue {
            plan: "plan".into(),
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
            system_prompt: "sys".into(),
        }
    }

    #[test]
    fn test_resolution_context_sentinel_then_blocks() {
        let dir = TempDir::new().unwrap();
        let mut exec = executor(&dir, ScriptedProvider::new(Vec::<String>::new()));
        exec.initialize_from_task_queue("req", &queue(&["Read config", "Write code"]));
        assert_eq!(exec.previous_resolutions_context(), NO_RESOLUTIONS_YET);

        exec.record_task_resolution("task_1", "Read config", "Found 3 keys", "Key files: src/a.rs")
            .unwrap();
        let context = exec.previous_resolutions_context();
        assert_eq!(
            context,
            "**task_1: Read config**\nResult: Found 3 keys\nContext: Key files: src/a.rs"
        );

        let list = exec.task_list().unwrap();
        assert_eq!(list.tasks[0].status, TaskStatus::Completed);
        assert_eq!(list.pending_tasks().len(), 1);
        assert!(!exec.all_tasks_completed());
    }

    #[test]
    fn test_duplicate_resolution_rejected() {
        let mut list = TaskList::from_descriptions("req", ["a"]);
        list.add_resolution("task_1", "a", "first", "").unwrap();
        let err = list.add_resolution("task_1", "a", "second", "").unwrap_err();
        assert!(matches!(err, Error::Task(_)));
        assert_eq!(list.resolutions.len(), 1);
        assert_eq!(list.resolutions[0].resolution, "first");
    }

    #[test]
    fn test_summary_format() {
        let mut list = TaskList::from_descriptions("Do things", ["a"]);
        list.add_resolution("task_1", "a", "done a", "n1").unwrap();
        let summary = list.summary();
        assert!(summary.starts_with("# Summary of Resolutions\n\n**Original Request:**\nDo things\n"));
        assert!(summary.contains("## Task: task_1\n"));
        assert!(summary.contains("**Resolution:**\ndone a\n"));
        assert!(summary.contains("**Notes:** n1"));
    }

    #[tokio::test]
    async fn test_synthesis_falls_back_to_summary() {
        let dir = TempDir::new().unwrap();
        let mut exec = executor(
            &dir,
            ScriptedProvider::with_results([Err(ProviderError::Authentication("revoked".into()))]),
        );
        exec.initialize_from_task_queue("req", &queue(&["a"]));
        exec.record_task_resolution("task_1", "a", "ok", "").unwrap();

        let answer = exec.final_synthesis(&CancellationChecker::never()).await.unwrap();
        assert_eq!(answer, exec.task_list().unwrap().summary());
    }

    #[tokio::test]
    async fn test_single_shot_detection_and_creation() {
        let dir = TempDir::new().unwrap();
        let mut exec = executor(
            &dir,
            ScriptedProvider::new([
                "Yes.",
                "Here you go: {\"tasks\": [{\"id\": \"x\", \"description\": \"Lint\"}, {\"id\": \"y\", \"description\": \"Test\"}]}",
            ]),
        );
        let cancel = CancellationChecker::never();
        assert!(exec.should_use_task_list("lint and test", &cancel).await.unwrap());

        let list = exec.initialize_task_list("lint and test", &cancel).await.unwrap().unwrap();
        let ids: Vec<&str> = list.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["task_1", "task_2"]);
        assert_eq!(list.tasks[1].description, "Test");
        assert!(list.id.starts_with("tasklist_"));
    }

    #[tokio::test]
    async fn test_creation_without_tasks_is_none() {
        let dir = TempDir::new().unwrap();
        let mut exec = executor(&dir, ScriptedProvider::new(["{\"tasks\": []}"]));
        let list = exec
            .initialize_task_list("x", &CancellationChecker::never())
            .await
            .unwrap();
        assert!(list.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_written() {
        let dir = TempDir::new().unwrap();
        let mut exec = executor(&dir, ScriptedProvider::new(Vec::<String>::new()));
        exec.initialize_from_task_queue("req", &queue(&["a"]));
        exec.record_task_resolution("task_1", "a", "ok", "").unwrap();

        let path = exec.save_snapshot().await.unwrap();
        assert_eq!(path, dir.path().join(".loom").join(SNAPSHOT_FILE));

        let json: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["original_prompt"], "req");
        assert_eq!(json["tasks"][0]["status"], "completed");
        assert_eq!(json["resolutions"][0]["task_id"], "task_1");
        assert!(json["created_at"].is_string());
    }

    #[test]
    fn test_extract_discoveries() {
        let messages = vec![
            Message::system("sys"),
            Message::assistant(
                "Look at `src/main.rs` and 'config/app.yaml'.\n```json\n{\"action\": \"run_command\", \"command\": \"cargo build\"}\n```",
            ),
            Message::action_result("run_command", "Action result:\nFinished"),
            Message::assistant("```json\n{\"action\": \"run_command\", \"command\": \"make\"}\n```"),
            Message::action_result("run_command", "COMMAND FAILED (exit code: 2)\nmake: *** No rule"),
            Message::assistant("```json\n{\"action\": \"run_command\", \"command\": \"cargo build\"}\n```"),
            Message::action_result("run_command", "ok"),
            Message::assistant("mentions `main.rs` without a directory"),
        ];

        let notes = TaskExecutor::extract_discoveries(&messages);
        assert_eq!(
            notes,
            "Key files: config/app.yaml, src/main.rs\nWorking commands:\n  - `cargo build`"
        );
        assert_eq!(TaskExecutor::extract_discoveries(&[Message::user("hi")]), "");
    }
}
