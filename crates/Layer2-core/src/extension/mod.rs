//! Extension System - manifest 기반 외부 도구
//!
//! - `manifest`: manifest.json / 도구 기술 파일 형식
//! - `command_tool`: 외부 명령으로 실행되는 도구
//! - `discovery`: 디렉토리 탐색과 레지스트리 등록

pub mod command_tool;
pub mod discovery;
pub mod manifest;

pub use command_tool::CommandTool;
pub use discovery::{DirectoryExtension, ExtensionDiscovery, EXTENSIONS_DIR};
pub use manifest::{CommandSpec, ExtensionManifest, ExtensionMetadata, ToolDescriptor, MANIFEST_FILE};
