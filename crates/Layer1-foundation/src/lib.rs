//! # loom-foundation
//!
//! Foundation layer for Loom:
//! - Core: 핵심 Trait 및 타입 (Tool, ToolContext, Interaction, Action)
//! - Config: 통합 설정 (AgentConfig, ProviderSettings)
//! - Storage: JsonStore (설정/스냅샷)
//! - Tokenizer: 토큰 수 추정
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Agent Loop                                             │
//! │     │  parse → resolve(ActionKind) → security gate      │
//! │     ▼                                                   │
//! │  Tool Registry                                          │
//! │  ├── Builtin Tools (run_command, read_file ...)         │
//! │  └── Extension Tools (namespaced, manifest.json)        │
//! │                     │                                   │
//! │                     ▼                                   │
//! │          Interaction (confirm / prompt)                 │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod strings;
pub mod tokenizer;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Core (핵심 Trait 및 타입)
// ============================================================================
pub use core::{
    // Action (action.rs)
    Action,
    ActionKind,
    AskUserParams,
    MarkTaskDoneParams,
    ReadFileParams,
    RunCommandParams,
    WriteFileParams,
    DONE_ACTION,
    // Task channel (task_channel.rs)
    EarlyCompletion,
    TaskChannel,
    // Traits (traits.rs)
    ConfirmRequest,
    Interaction,
    Tool,
    ToolContext,
    ToolExtension,
    ToolMeta,
    // Types (types.rs)
    SecurityLevel,
    ToolCategory,
    ToolSource,
};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{AgentConfig, ProviderSettings, CONFIG_FILE, DOMAINS_DIR};

// ============================================================================
// Storage
// ============================================================================
pub use storage::{JsonStore, STATE_DIR};

// ============================================================================
// Tokenizer
// ============================================================================
pub use tokenizer::estimate_tokens;
