//! loom-core: Core Runtime for Loom
//!
//! Layer2 - 도구 레지스트리와 액션 해석 레이어
//!
//! # 주요 모듈
//!
//! - `tool`: Tool 레지스트리 및 Builtin 도구들
//! - `parser`: 모델 응답에서 액션 추출
//! - `extension`: manifest 기반 외부 도구 (네임스페이스 등록)
//!
//! # 사용 예시
//!
//! ```ignore
//! use loom_core::{parse_action, ExtensionDiscovery, ResolvedAction, ToolRegistry};
//!
//! let mut registry = ToolRegistry::with_builtins();
//! ExtensionDiscovery::from_config(&config)
//!     .load_into(&mut registry, config.unsafe_mode)
//!     .await;
//!
//! if let Some(action) = parse_action(&reply) {
//!     match registry.resolve(&action)? {
//!         ResolvedAction::Done { summary } => { /* 종료 */ }
//!         ResolvedAction::Tool { tool, kind, .. } => {
//!             let output = tool.execute(&kind, &ctx).await?;
//!         }
//!     }
//! }
//! ```

pub mod extension;
pub mod parser;
pub mod tool;

// Re-exports: Tool
pub use tool::{
    builtin, is_reserved, run_process, ExecutionContext, ExtensionReport, PathValidation,
    PathValidator, ProcessOutput, ResolvedAction, ToolRegistry, COMMAND_FAILED_PREFIX,
    RESERVED_NAMES,
};

// Re-exports: Parser
pub use parser::{extract_json_objects, parse_action, strip_json_blocks};

// Re-exports: Extension
pub use extension::{
    CommandSpec, CommandTool, DirectoryExtension, ExtensionDiscovery, ExtensionManifest,
    ExtensionMetadata, ToolDescriptor, EXTENSIONS_DIR, MANIFEST_FILE,
};
