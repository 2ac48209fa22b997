//! Agent Loop - 요청 하나를 처리하는 제어 루프
//!
//! 한 번의 반복(step)은 다음 순서로 진행됩니다:
//!
//! ```text
//! THINKING ──▶ PARSING ──┬──▶ REPROMPT ───────────────┐
//!                        ├──▶ REJECTED ───────────────┤
//!                        ├──▶ done ──▶ Completed       │
//!                        └──▶ security gate            │
//!                               ├── declined ──────────┤
//!                               ├── exit ──▶ Cancelled │
//!                               └──▶ EXECUTING ──▶ RECORDED ──▶ Continue
//! ```
//!
//! 플래너가 태스크 목록을 만들면 태스크마다 새 트랜스크립트/최적화기/루프 감지기로
//! 내부 루프를 실행하고, 마지막에 결과를 합성합니다.

use crate::approval::{RequestApproval, SessionApproval};
use crate::cancel::CancellationChecker;
use crate::loop_detector::{
    ErrorClassifier, LoopDetectionResult, LoopDetector, LoopType, Severity,
    SubstringErrorClassifier,
};
use crate::optimizer::{strip_metadata, ContextOptimizer, OptimizerConfig};
use crate::planner::{Planner, TaskQueue};
use crate::project::{
    compose_system_prompt, list_domains, load_domains, load_project_sections, DomainMentions,
};
use crate::prompts::{
    agent_system_prompt, declined_message, loop_guidance_message, single_task_message,
    COMMAND_FAILED_WARNING, FORMAT_CORRECTION, REASONING_NUDGE,
};
use crate::summarizer::{ProviderSummarizer, Summarizer};
use crate::task::{TaskExecutor, NO_RESOLUTIONS_YET};
use loom_core::{
    parse_action, strip_json_blocks, ExecutionContext, ResolvedAction, ToolRegistry,
    COMMAND_FAILED_PREFIX,
};
use loom_foundation::strings::{truncate_chars, truncate_with_suffix};
use loom_foundation::{
    Action, AgentConfig, ConfirmRequest, Error, Interaction, Result, SecurityLevel, TaskChannel,
    ToolMeta,
};
use loom_provider::{Message, Provider, RetryClassification, RetryConfig, RetryableError};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// `done`에 summary가 없을 때
const DEFAULT_DONE_SUMMARY: &str = "Task completed.";

/// 이 길이를 넘는 비-액션 응답은 추론으로 간주
const REASONING_MIN_CHARS: usize = 50;

// ============================================================================
// Events / Outcomes
// ============================================================================

/// UI로 보내는 진행 이벤트
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// 모델 응답 대기 시작
    Thinking,

    /// 모델 추론 (JSON 블록 제외)
    Reasoning(String),

    /// 도구 실행 시작
    ToolStart {
        tool: String,
        label: String,
        detail: String,
    },

    /// 도구 실행 완료
    ToolComplete {
        tool: String,
        summary: String,
        success: bool,
    },

    /// 상태 안내
    Notice(String),

    /// 루프 감지
    LoopDetected {
        loop_type: LoopType,
        severity: Severity,
        description: String,
        suggested_actions: Vec<String>,
    },

    /// 태스크 시작 (멀티 태스크 모드)
    TaskStarted {
        index: usize,
        total: usize,
        description: String,
        pre_completed: bool,
    },

    /// 태스크 완료 (멀티 태스크 모드)
    TaskCompleted {
        index: usize,
        task_id: String,
        resolution: String,
    },

    /// 최종 답변
    Answer(String),

    /// 실행 실패
    Error(String),

    /// 실행 취소
    Cancelled,
}

/// 한 번의 반복 결과
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// 다음 반복 진행
    Continue,
    /// `done` 액션 (summary)
    Completed(String),
    /// 사용자가 종료를 선택
    Cancelled,
}

/// 요청 처리 결과
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Answered(String),
    Cancelled,
    Failed(String),
}

// ============================================================================
// Dependencies
// ============================================================================

/// 에이전트 실행 협력자
#[derive(Clone)]
pub struct AgentDeps {
    pub provider: Arc<dyn Provider>,
    pub registry: Arc<ToolRegistry>,
    pub interaction: Arc<dyn Interaction>,
    pub approval: SessionApproval,
    pub cancel: CancellationChecker,
    pub classifier: Arc<dyn ErrorClassifier>,
    pub summarizer: Arc<dyn Summarizer>,
    pub retry: RetryConfig,
}

impl AgentDeps {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<ToolRegistry>,
        interaction: Arc<dyn Interaction>,
    ) -> Self {
        Self {
            summarizer: Arc::new(ProviderSummarizer::new(Arc::clone(&provider))),
            provider,
            registry,
            interaction,
            approval: SessionApproval::new(),
            cancel: CancellationChecker::never(),
            classifier: Arc::new(SubstringErrorClassifier::default()),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_approval(mut self, approval: SessionApproval) -> Self {
        self.approval = approval;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationChecker) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// 요청 하나를 끝까지 처리 (오류는 이벤트와 결과로만 전달)
pub async fn run_agent(
    request: &str,
    config: Arc<AgentConfig>,
    deps: AgentDeps,
    events: mpsc::Sender<AgentEvent>,
) -> RunOutcome {
    let agent = Agent {
        config,
        deps,
        events,
    };

    match agent.run(request).await {
        Ok(RunOutcome::Answered(answer)) => {
            agent.emit(AgentEvent::Answer(answer.clone())).await;
            RunOutcome::Answered(answer)
        }
        Ok(RunOutcome::Cancelled) | Err(Error::Cancelled) => {
            info!("Agent run cancelled");
            agent.emit(AgentEvent::Cancelled).await;
            RunOutcome::Cancelled
        }
        Ok(RunOutcome::Failed(message)) => {
            agent.emit(AgentEvent::Error(message.clone())).await;
            RunOutcome::Failed(message)
        }
        Err(e) => {
            warn!("Agent run failed: {}", e);
            let message = e.to_string();
            agent.emit(AgentEvent::Error(message.clone())).await;
            RunOutcome::Failed(message)
        }
    }
}

// ============================================================================
// Agent
// ============================================================================

/// 트랜스크립트 + 전용 최적화기/감지기
struct Transcript {
    messages: Vec<Message>,
    optimizer: ContextOptimizer,
    detector: Option<LoopDetector>,
}

struct Agent {
    config: Arc<AgentConfig>,
    deps: AgentDeps,
    events: mpsc::Sender<AgentEvent>,
}

impl Agent {
    async fn emit(&self, event: AgentEvent) {
        let _ = self.events.send(event).await;
    }

    async fn run(&self, request: &str) -> Result<RunOutcome> {
        let (system_prompt, request) = self.build_system_prompt(request).await;
        let request = request.as_str();
        let mut approval = self.deps.approval.begin_request();
        let mut executor = TaskExecutor::new(&self.config, Arc::clone(&self.deps.provider));

        let planner = Planner::new(
            &self.config,
            Arc::clone(&self.deps.provider),
            Arc::clone(&self.deps.interaction),
        );
        let mut queue = planner
            .maybe_plan(request, &system_prompt, &self.deps.cancel)
            .await?;

        if queue.is_none() && self.config.task_detection {
            queue = self.detect_tasks(request, &system_prompt, &mut executor).await?;
        }

        match queue {
            Some(queue) => {
                self.emit(AgentEvent::Notice(format_plan(&queue))).await;
                self.run_tasks(request, &queue, &mut executor, &mut approval)
                    .await
            }
            None => self.run_single(request, &system_prompt, &mut approval).await,
        }
    }

    /// 시스템 프롬프트 조립 + @domain 언급 제거한 요청 반환
    async fn build_system_prompt(&self, request: &str) -> (String, String) {
        let base = agent_system_prompt(&self.deps.registry);
        let project_sections = load_project_sections(&self.config.state_path()).await;

        let domain_dirs = self.config.domain_dirs();
        let mentions = DomainMentions::parse(request, &list_domains(&domain_dirs));
        let domain_content = if mentions.is_empty() {
            String::new()
        } else {
            info!("Active domains: {}", mentions.names.join(", "));
            self.emit(AgentEvent::Notice(format!(
                "Active domains: {}",
                mentions.names.join(", ")
            )))
            .await;
            load_domains(&domain_dirs, &mentions.names).await
        };

        // 언급만 있는 요청은 원문 유지
        let request = if mentions.cleaned.is_empty() {
            request.to_string()
        } else {
            mentions.cleaned
        };
        (
            compose_system_prompt(&base, &project_sections, &domain_content),
            request,
        )
    }

    /// 단일 호출 태스크 감지 (플래너 미사용/거절 시)
    async fn detect_tasks(
        &self,
        request: &str,
        system_prompt: &str,
        executor: &mut TaskExecutor,
    ) -> Result<Option<TaskQueue>> {
        if !executor.should_use_task_list(request, &self.deps.cancel).await? {
            return Ok(None);
        }
        let Some(list) = executor
            .initialize_task_list(request, &self.deps.cancel)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some(TaskQueue {
            plan: String::new(),
            tasks: list.tasks.iter().map(|t| t.description.clone()).collect(),
            system_prompt: system_prompt.to_string(),
        }))
    }

    fn new_transcript(&self, system_prompt: &str, user_message: String) -> Transcript {
        let detector = self.config.loop_detection_enabled.then(|| {
            LoopDetector::new(self.config.as_ref().into())
                .with_classifier(Arc::clone(&self.deps.classifier))
        });
        Transcript {
            messages: vec![Message::system(system_prompt), Message::user(user_message)],
            optimizer: ContextOptimizer::new(
                OptimizerConfig::from(self.config.as_ref()),
                Arc::clone(&self.deps.summarizer),
            ),
            detector,
        }
    }

    fn base_context(&self) -> ExecutionContext {
        ExecutionContext::new(
            Arc::clone(&self.config),
            Arc::clone(&self.deps.interaction),
        )
    }

    // ========================================================================
    // 실행 모드
    // ========================================================================

    async fn run_single(
        &self,
        request: &str,
        system_prompt: &str,
        approval: &mut RequestApproval,
    ) -> Result<RunOutcome> {
        let working_dir = self.config.workspace_root.display().to_string();
        let mut transcript =
            self.new_transcript(system_prompt, single_task_message(request, &working_dir));
        let context = self.base_context();

        match self.run_inner(&mut transcript, approval, &context).await? {
            StepOutcome::Completed(summary) => Ok(RunOutcome::Answered(summary)),
            _ => Ok(RunOutcome::Cancelled),
        }
    }

    async fn run_tasks(
        &self,
        request: &str,
        queue: &TaskQueue,
        executor: &mut TaskExecutor,
        approval: &mut RequestApproval,
    ) -> Result<RunOutcome> {
        if executor.task_list().is_none() {
            executor.initialize_from_task_queue(request, queue);
        }

        let ids: Vec<String> = (1..=queue.tasks.len()).map(|n| format!("task_{}", n)).collect();
        let channel = TaskChannel::new(
            ids.iter()
                .cloned()
                .zip(queue.tasks.iter().cloned())
                .collect(),
        );
        let context = self.base_context().with_task_channel(channel.clone());
        let total = queue.tasks.len();
        let mut early_ids = HashSet::new();
        let mut shared_discoveries = String::new();

        for (index, description) in queue.tasks.iter().enumerate() {
            let task_id = &ids[index];

            // 앞선 태스크가 미리 완료한 경우: 실행 없이 결과만 기록
            if let Some(early) = channel.take(task_id) {
                self.emit(AgentEvent::TaskStarted {
                    index,
                    total,
                    description: description.clone(),
                    pre_completed: true,
                })
                .await;
                let mut notes = "Completed ahead of schedule by a previous task.".to_string();
                if !early.notes.trim().is_empty() {
                    notes.push(' ');
                    notes.push_str(early.notes.trim());
                }
                executor.record_task_resolution(task_id, description, &early.resolution, &notes)?;
                channel.mark_completed(task_id);
                early_ids.insert(task_id.clone());
                self.emit(AgentEvent::TaskCompleted {
                    index,
                    task_id: task_id.clone(),
                    resolution: early.resolution,
                })
                .await;
                continue;
            }

            self.emit(AgentEvent::TaskStarted {
                index,
                total,
                description: description.clone(),
                pre_completed: false,
            })
            .await;
            info!("Starting {} ({}/{}): {}", task_id, index + 1, total, description);
            channel.set_current(task_id.as_str());

            let user_message = self.task_message(
                queue,
                index,
                &early_ids,
                &shared_discoveries,
                &executor.previous_resolutions_context(),
            );
            let mut transcript = self.new_transcript(&queue.system_prompt, user_message);

            let summary = match self.run_inner(&mut transcript, approval, &context).await? {
                StepOutcome::Completed(summary) => summary,
                _ => return Ok(RunOutcome::Cancelled),
            };

            let discoveries = TaskExecutor::extract_discoveries(&transcript.messages);
            executor.record_task_resolution(task_id, description, &summary, &discoveries)?;
            channel.mark_completed(task_id);
            if !discoveries.is_empty() {
                shared_discoveries.push_str(&format!(
                    "\n### Task {}: {}\n{}\n",
                    index + 1,
                    truncate_chars(description, 60),
                    discoveries
                ));
            }
            self.emit(AgentEvent::TaskCompleted {
                index,
                task_id: task_id.clone(),
                resolution: summary,
            })
            .await;
        }

        self.emit(AgentEvent::Notice(
            "Synthesizing final answer from all task resolutions...".into(),
        ))
        .await;
        let answer = executor.final_synthesis(&self.deps.cancel).await?;
        executor.save_snapshot().await;
        Ok(RunOutcome::Answered(answer))
    }

    /// 태스크별 첫 사용자 메시지
    fn task_message(
        &self,
        queue: &TaskQueue,
        index: usize,
        early_ids: &HashSet<String>,
        discoveries: &str,
        previous: &str,
    ) -> String {
        let total = queue.tasks.len();
        let completed = if index == 0 {
            "  (none yet)".to_string()
        } else {
            queue.tasks[..index]
                .iter()
                .enumerate()
                .map(|(j, t)| {
                    let id = format!("task_{}", j + 1);
                    let marker = if early_ids.contains(&id) {
                        " *(completed ahead of schedule)*"
                    } else {
                        ""
                    };
                    format!("  ✓ [{}] Task {}: {}{}", id, j + 1, t, marker)
                })
                .collect::<Vec<_>>()
                .join("\n")
        };
        let remaining = if index + 1 >= total {
            "  (none)".to_string()
        } else {
            queue.tasks[index + 1..]
                .iter()
                .enumerate()
                .map(|(j, t)| {
                    let n = index + j + 2;
                    format!("  • [task_{}] Task {}: {}", n, n, t)
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let mut message = format!(
            "## Overall Plan\n{}\n\n## Task Progress ({}/{})\nCompleted:\n{}\n\n\
             **→ Your Current Task (Task {}):** {}\n\nRemaining after this:\n{}",
            queue.plan,
            index + 1,
            total,
            completed,
            index + 1,
            queue.tasks[index],
            remaining
        );
        if !discoveries.is_empty() {
            message.push_str(
                "\n\n## Cross-Task Discoveries\nThe following was learned in previous tasks. \
                 Use this context to avoid repeating work already done:\n",
            );
            message.push_str(discoveries);
        }
        if previous != NO_RESOLUTIONS_YET {
            message.push_str(&format!("\n\n## Previous Task Resolutions\n{}", previous));
        }
        message.push_str(&format!(
            "\n\nWorking directory: {}",
            self.config.workspace_root.display()
        ));
        message
    }

    async fn run_inner(
        &self,
        transcript: &mut Transcript,
        approval: &mut RequestApproval,
        context: &ExecutionContext,
    ) -> Result<StepOutcome> {
        loop {
            self.deps.cancel.check()?;
            match self.step(transcript, approval, context).await? {
                StepOutcome::Continue => continue,
                terminal => return Ok(terminal),
            }
        }
    }

    // ========================================================================
    // Step
    // ========================================================================

    /// 한 번의 반복
    async fn step(
        &self,
        transcript: &mut Transcript,
        approval: &mut RequestApproval,
        context: &ExecutionContext,
    ) -> Result<StepOutcome> {
        // THINKING
        self.emit(AgentEvent::Thinking).await;
        let outbound = strip_metadata(&transcript.messages);
        let reply = self.complete_with_retry(&outbound).await?;
        self.append(transcript, Message::assistant(reply.clone())).await?;

        let display_text = strip_json_blocks(&reply);
        if !display_text.is_empty() && !display_text.starts_with('{') {
            self.emit(AgentEvent::Reasoning(display_text.clone())).await;
        }

        // PARSING
        let Some(action) = parse_action(&reply) else {
            let correction = if display_text.chars().count() > REASONING_MIN_CHARS {
                REASONING_NUDGE
            } else {
                info!("Could not parse an action from the response, asking to retry");
                debug!("Unparsed reply: {}", reply);
                self.emit(AgentEvent::Notice(
                    "Could not parse an action from the response.".into(),
                ))
                .await;
                FORMAT_CORRECTION
            };
            self.append(transcript, Message::user(correction)).await?;
            return Ok(StepOutcome::Continue);
        };

        // Validation
        let (tool, meta, kind) = match self.deps.registry.resolve(&action) {
            Ok(ResolvedAction::Done { summary }) => {
                let summary = summary
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_DONE_SUMMARY.to_string());
                info!("Agent signalled done");
                return Ok(StepOutcome::Completed(summary));
            }
            Ok(ResolvedAction::Tool { tool, meta, kind }) => (tool, meta, kind),
            Err(Error::ToolNotFound(name)) => {
                warn!("Rejected unknown action '{}'", name);
                let message = self.deps.registry.unknown_action_message(&name);
                self.append(transcript, Message::user(message)).await?;
                return Ok(StepOutcome::Continue);
            }
            Err(e) => {
                let message = format!(
                    "{}. Please fix the parameters and respond with a corrected action.",
                    e
                );
                self.append(transcript, Message::user(message)).await?;
                return Ok(StepOutcome::Continue);
            }
        };

        let detail = primary_detail(&action, &meta);
        self.emit(AgentEvent::ToolStart {
            tool: meta.name.clone(),
            label: meta.label.clone(),
            detail: detail.clone(),
        })
        .await;

        // Security gate
        match self.security_gate(&meta, &detail, approval).await? {
            Gate::Proceed => {}
            Gate::Declined(feedback) => {
                let unsafe_action = meta.security_level == SecurityLevel::Unsafe;
                let message = declined_message(&meta.name, unsafe_action, &feedback);
                self.append(transcript, Message::user(message)).await?;
                return Ok(StepOutcome::Continue);
            }
            Gate::Exit => return Ok(StepOutcome::Cancelled),
        }

        // EXECUTING
        let result = match self.deps.cancel.run(tool.execute(&kind, context)).await {
            Ok(output) => output,
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                warn!("Tool '{}' failed: {}", meta.name, e);
                format!("Error: {}", e)
            }
        };

        // RECORDED
        let was_error = self.deps.classifier.is_error(&meta.name, &result);
        if let Some(detector) = transcript.detector.as_mut() {
            detector.record_action(&meta.name, &action.parameters, &result, was_error);
        }
        self.emit(AgentEvent::ToolComplete {
            tool: meta.name.clone(),
            summary: result_summary(&result),
            success: !was_error,
        })
        .await;

        if let Some(outcome) = self.check_loops(transcript).await? {
            return Ok(outcome);
        }

        let mut content = format!("Action result:\n{}", result);
        if result.starts_with(COMMAND_FAILED_PREFIX) {
            content.push_str(COMMAND_FAILED_WARNING);
        }
        self.append(transcript, Message::action_result(&meta.name, content))
            .await?;
        Ok(StepOutcome::Continue)
    }

    /// 메시지 추가 후 주기적 최적화 (요약 호출 중 취소 가능)
    async fn append(&self, transcript: &mut Transcript, message: Message) -> Result<()> {
        let Transcript {
            messages,
            optimizer,
            ..
        } = transcript;
        self.deps
            .cancel
            .run(async move {
                optimizer.add_message(messages, message).await;
                optimizer.optimize(messages).await;
                Ok(())
            })
            .await
    }

    // ========================================================================
    // Model call
    // ========================================================================

    /// 일시적 오류마다 연결 확인 후 사용자에게 재시도 여부 확인
    async fn complete_with_retry(&self, messages: &[Message]) -> Result<String> {
        let provider = &self.deps.provider;
        let cancel = &self.deps.cancel;
        let mut attempt = 0;

        loop {
            let response = cancel
                .run(async { Ok(provider.complete(messages).await) })
                .await?;
            let err = match response {
                Ok(response) => return Ok(response.content),
                Err(err) => err,
            };

            let classification = err.classify();
            if classification == RetryClassification::NoRetry || attempt >= self.deps.retry.max_retries {
                warn!("Model request failed after {} attempt(s): {}", attempt + 1, err);
                return Err(err.into());
            }

            let reachable = cancel.run(async { Ok(provider.is_available().await) }).await?;
            let question = format!(
                "Model request failed: {}\nBackend is {}. Retry? (attempt {}/{})",
                err,
                if reachable { "reachable" } else { "unreachable" },
                attempt + 1,
                self.deps.retry.max_retries
            );
            let answer = cancel
                .run(self.deps.interaction.prompt(&question, &["y", "n"], Some("y")))
                .await?;
            if !is_yes(&answer) {
                return Err(Error::Agent(format!("Model request aborted by user: {}", err)));
            }

            let delay = classification.delay(&self.deps.retry, attempt);
            cancel
                .run(async {
                    tokio::time::sleep(delay).await;
                    Ok(())
                })
                .await?;
            attempt += 1;
        }
    }

    // ========================================================================
    // Security gate
    // ========================================================================

    async fn security_gate(
        &self,
        meta: &ToolMeta,
        detail: &str,
        approval: &mut RequestApproval,
    ) -> Result<Gate> {
        match meta.security_level {
            SecurityLevel::Safe => Ok(Gate::Proceed),
            SecurityLevel::Approval => {
                if self.config.unsafe_mode || approval.is_approved() {
                    return Ok(Gate::Proceed);
                }
                let request = ConfirmRequest::new(format!("Allow {}?", meta.label), &meta.name)
                    .choices(&["y", "n", "a", "/exit"])
                    .default_choice("y")
                    .security_level(SecurityLevel::Approval)
                    .detail(detail);
                let answer = self.confirm(&request).await?;
                match answer.as_str() {
                    "/exit" | "exit" => Ok(Gate::Exit),
                    "n" | "no" => Ok(Gate::Declined(self.ask_feedback().await?)),
                    "a" | "always" => {
                        approval.approve_session();
                        self.emit(AgentEvent::Notice(
                            "Auto-approval enabled for this session.".into(),
                        ))
                        .await;
                        Ok(Gate::Proceed)
                    }
                    _ => {
                        approval.approve_once();
                        Ok(Gate::Proceed)
                    }
                }
            }
            SecurityLevel::Unsafe => {
                let request =
                    ConfirmRequest::new(format!("Allow this UNSAFE action: {}?", meta.label), &meta.name)
                        .choices(&["y", "n", "/exit"])
                        .default_choice("n")
                        .security_level(SecurityLevel::Unsafe)
                        .detail(detail);
                let answer = self.confirm(&request).await?;
                match answer.as_str() {
                    "/exit" | "exit" => Ok(Gate::Exit),
                    "y" | "yes" => Ok(Gate::Proceed),
                    _ => Ok(Gate::Declined(self.ask_feedback().await?)),
                }
            }
        }
    }

    async fn confirm(&self, request: &ConfirmRequest) -> Result<String> {
        let answer = self
            .deps
            .cancel
            .run(self.deps.interaction.confirm(request))
            .await?;
        Ok(answer.trim().to_lowercase())
    }

    async fn ask_feedback(&self) -> Result<String> {
        self.deps
            .cancel
            .run(
                self.deps
                    .interaction
                    .prompt("Optional feedback (or Enter to skip)", &[], None),
            )
            .await
    }

    // ========================================================================
    // Loop intervention
    // ========================================================================

    /// 루프 감지 시 사용자 개입 (Some이면 반복 종료)
    async fn check_loops(&self, transcript: &mut Transcript) -> Result<Option<StepOutcome>> {
        let Some(detector) = transcript.detector.as_ref() else {
            return Ok(None);
        };
        let result = detector.check_for_loops();
        if !result.is_loop_detected {
            return Ok(None);
        }

        if result.loop_type == Some(LoopType::IterationLimit) {
            self.emit(loop_event(&result)).await;
            return Err(Error::Agent(result.description));
        }
        if !detector.should_ask_for_intervention() {
            return Ok(None);
        }

        self.emit(loop_event(&result)).await;
        let loop_name = result
            .loop_type
            .map(|t| t.to_string())
            .unwrap_or_default();
        let question = format!(
            "Loop detected ({}): {}\n\n1) Provide guidance to the agent\n\
             2) Continue anyway (ignore warning)\n3) Abort agent execution",
            loop_name, result.description
        );
        let choice = self
            .deps
            .cancel
            .run(self.deps.interaction.prompt(&question, &["1", "2", "3"], Some("1")))
            .await?;

        match choice.trim() {
            "1" => {
                let guidance = self
                    .deps
                    .cancel
                    .run(
                        self.deps
                            .interaction
                            .prompt("Your guidance (or /exit to abort)", &[], None),
                    )
                    .await?;
                let guidance = guidance.trim();
                if guidance == "/exit" {
                    return Ok(Some(StepOutcome::Cancelled));
                }
                if !guidance.is_empty() {
                    let message = loop_guidance_message(&loop_name, guidance);
                    self.append(transcript, Message::user(message)).await?;
                }
            }
            "3" => return Ok(Some(StepOutcome::Cancelled)),
            _ => {}
        }

        if let Some(detector) = transcript.detector.as_mut() {
            detector.mark_intervention();
        }
        Ok(None)
    }
}

/// 보안 게이트 결과
enum Gate {
    Proceed,
    Declined(String),
    Exit,
}

// ============================================================================
// Helpers
// ============================================================================

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn loop_event(result: &LoopDetectionResult) -> AgentEvent {
    AgentEvent::LoopDetected {
        loop_type: result.loop_type.unwrap_or(LoopType::Pattern),
        severity: result.severity,
        description: result.description.clone(),
        suggested_actions: result.suggested_actions.clone(),
    }
}

/// 도구의 주요 파라미터 값 (표시용)
fn primary_detail(action: &Action, meta: &ToolMeta) -> String {
    let Some(value) = meta
        .primary_param
        .as_deref()
        .and_then(|key| action.parameters.get(key))
    else {
        return String::new();
    };
    let text = match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    };
    truncate_with_suffix(&text, 80, "...")
}

/// 결과 첫 줄 + 줄 수
fn result_summary(result: &str) -> String {
    let lines: Vec<&str> = result.lines().collect();
    let first = lines.first().copied().unwrap_or("(no output)");
    let first = truncate_with_suffix(first, 80, "...");
    if lines.len() > 1 {
        format!("{} ({} lines)", first, lines.len())
    } else {
        first
    }
}

/// 계획 표시 (설명 3줄 + 태스크 목록)
fn format_plan(queue: &TaskQueue) -> String {
    let mut parts = Vec::new();
    let plan_lines: Vec<&str> = queue.plan.trim().lines().collect();
    if plan_lines.len() > 3 {
        parts.push(format!(
            "{}\n... (+{} lines)",
            plan_lines[..3].join("\n"),
            plan_lines.len() - 3
        ));
    } else if !plan_lines.is_empty() {
        parts.push(plan_lines.join("\n"));
    }
    parts.push("Tasks:".to_string());
    for (i, task) in queue.tasks.iter().enumerate() {
        parts.push(format!("{}. {}", i + 1, task));
    }
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_summary() {
        assert_eq!(result_summary(""), "(no output)");
        assert_eq!(result_summary("one"), "one");
        assert_eq!(result_summary("a\nb\nc"), "a (3 lines)");
    }

    #[test]
    fn test_primary_detail() {
        let meta = ToolMeta::new("run_command").primary_param("command");
        let action = Action::new("run_command").with_param("command", "ls -la");
        assert_eq!(primary_detail(&action, &meta), "ls -la");

        let numeric = Action::new("run_command").with_param("command", json!(5));
        assert_eq!(primary_detail(&numeric, &meta), "5");
        assert_eq!(primary_detail(&action, &ToolMeta::new("x")), "");
    }

    #[test]
    fn test_format_plan_truncates_long_plans() {
        let queue = TaskQueue {
            plan: "l1\nl2\nl3\nl4\nl5".into(),
            tasks: vec!["a".into(), "b".into()],
            system_prompt: String::new(),
        };
        assert_eq!(format_plan(&queue), "l1\nl2\nl3\n... (+2 lines)\nTasks:\n1. a\n2. b");
    }
}
