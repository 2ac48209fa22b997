//! Core Module - 핵심 인터페이스 및 타입
//!
//! ## 타입 계층
//!
//! - `types.rs`: 데이터 타입 (SecurityLevel, ToolCategory, ToolSource)
//! - `action.rs`: 모델이 요청하는 액션 (Action, ActionKind)
//! - `traits.rs`: 인터페이스 (Tool, ToolContext, Interaction, ToolExtension)
//! - `task_channel.rs`: 앞선 태스크 완료 기록 채널
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                Tool Registry                 │
//! │  ┌────────────────┐  ┌────────────────────┐  │
//! │  │ Built-in Tools │  │ Extension Tools    │  │
//! │  │  run_command   │  │  <tag>/<tool>      │  │
//! │  │  read_file ... │  │  (manifest.json)   │  │
//! │  └───────┬────────┘  └─────────┬──────────┘  │
//! │          └──────────┬──────────┘             │
//! │                     ▼                        │
//! │        Security gate (safe/approval/unsafe)  │
//! └──────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod task_channel;
pub mod traits;
pub mod types;

pub use action::{
    Action, ActionKind, AskUserParams, MarkTaskDoneParams, ReadFileParams, RunCommandParams,
    WriteFileParams, DONE_ACTION,
};
pub use task_channel::{EarlyCompletion, TaskChannel};
pub use traits::{ConfirmRequest, Interaction, Tool, ToolContext, ToolExtension, ToolMeta};
pub use types::{SecurityLevel, ToolCategory, ToolSource};
