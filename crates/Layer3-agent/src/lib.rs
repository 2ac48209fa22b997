//! # loom-agent
//!
//! Agent system for Loom - 요청 하나를 끝까지 처리하는 단일 루프 에이전트입니다.
//!
//! ## 핵심 컴포넌트
//!
//! - **Agent Loop**: think → parse → resolve → security gate → execute → record
//! - **Planner**: 3단계 계획 (분석 / 파일 컨텍스트 / 태스크 생성)
//! - **Task Executor**: 태스크별 결과 기록, 발견 사항 전달, 최종 합성
//! - **Context Optimizer**: 사전 압축 + 요약으로 토큰 예산 유지
//! - **Loop Detector**: 반복/오류/패턴 루프 감지와 사용자 개입
//! - **Cancellation**: 외부 중단 신호 (Ctrl-C)
//! - **Project Prompt**: `.loom/` 지침 파일과 `@domain` 오버라이드
//!
//! ## 사용 예
//!
//! ```ignore
//! use loom_agent::{cancellation, run_agent, AgentDeps, AgentEvent, RunOutcome};
//!
//! let (handle, checker) = cancellation();
//! let deps = AgentDeps::new(provider, registry, interaction).with_cancellation(checker);
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(100);
//! tokio::spawn(async move {
//!     while let Some(event) = rx.recv().await {
//!         println!("{:?}", event);
//!     }
//! });
//!
//! match run_agent("List the files in src", config, deps, tx).await {
//!     RunOutcome::Answered(answer) => println!("{}", answer),
//!     RunOutcome::Cancelled => {}
//!     RunOutcome::Failed(err) => eprintln!("{}", err),
//! }
//!
//! // 외부에서 중단
//! handle.cancel("User pressed Ctrl-C");
//! ```

pub mod agent;
pub mod approval;
pub mod cancel;
pub mod compression;
pub mod loop_detector;
pub mod optimizer;
pub mod planner;
pub mod project;
pub mod prompts;
pub mod summarizer;
pub mod task;

#[cfg(test)]
mod testing;

// ============================================================================
// Agent Loop
// ============================================================================

pub use agent::{run_agent, AgentDeps, AgentEvent, RunOutcome, StepOutcome};
pub use approval::{RequestApproval, SessionApproval};
pub use cancel::{cancellation, CancellationChecker, CancellationHandle};

// ============================================================================
// Context budget
// ============================================================================

pub use compression::{CompressionConfig, CompressionResult, DictionaryCompressor};
pub use optimizer::{ContextOptimizer, OptimizerConfig, OptimizerStats};
pub use summarizer::{ProviderSummarizer, Summarizer};

// ============================================================================
// Loop detection
// ============================================================================

pub use loop_detector::{
    ErrorClassifier, LoopDetectionResult, LoopDetector, LoopDetectorConfig, LoopType, Severity,
    SubstringErrorClassifier,
};

// ============================================================================
// Planning / Tasks
// ============================================================================

pub use planner::{Planner, TaskQueue};
pub use project::DomainMentions;
pub use task::{TaskExecutor, TaskItem, TaskList, TaskResolution, TaskStatus};
