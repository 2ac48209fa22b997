//! Tool Registry - 도구 등록 및 관리
//!
//! Agent가 사용하는 모든 도구를 관리합니다.
//!
//! ## 기능
//! - 도구 등록/조회 (이름 패턴 검증, 예약 이름 보호)
//! - Builtin 도구 자동 등록
//! - 확장 도구 네임스페이스 등록 (unsafe 도구는 unsafe 모드에서만)
//! - 원시 `Action`을 타입 `ActionKind`로 한 번에 검증
//! - 카테고리별 프롬프트 섹션 생성 (결정적 순서)
//!
//! ```ignore
//! let mut registry = ToolRegistry::with_builtins();
//! registry.load_extension(&extension, config.unsafe_mode);
//!
//! match registry.resolve(&action)? {
//!     ResolvedAction::Done { summary } => { /* 루프 종료 */ }
//!     ResolvedAction::Tool { tool, kind, .. } => {
//!         let output = tool.execute(&kind, &context).await?;
//!     }
//! }
//! ```

use super::builtin;
use loom_foundation::{
    Action, ActionKind, Error, Result, SecurityLevel, Tool, ToolCategory, ToolExtension, ToolMeta,
    ToolSource, DONE_ACTION,
};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// 내장 도구와 예약 액션 이름 (외부 등록 불가)
pub const RESERVED_NAMES: &[&str] = &[
    "run_command",
    "write_file",
    "read_file",
    "edit_file",
    "delete_file",
    "search_code",
    "search_documentation",
    "search_tickets",
    "ask_chat",
    "ask_user",
    "notebook_search",
    "notebook_add",
    "notebook_remove",
    "mark_task_done",
    DONE_ACTION,
];

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid tool name regex"))
}

/// 예약된 이름인지 확인
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// 등록된 도구
#[derive(Clone)]
struct RegisteredTool {
    tool: Arc<dyn Tool>,
    meta: ToolMeta,
    source: ToolSource,
}

/// 레지스트리 경계에서 검증된 액션
pub enum ResolvedAction {
    /// 현재 루프 종료
    Done { summary: Option<String> },
    /// 도구 실행
    Tool {
        tool: Arc<dyn Tool>,
        meta: ToolMeta,
        kind: ActionKind,
    },
}

/// 확장 로드 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionReport {
    pub namespace: String,
    pub registered: Vec<String>,
    pub skipped_unsafe: Vec<String>,
    pub failed: Vec<String>,
}

/// 도구 레지스트리
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
    /// namespace -> 등록 순서대로의 도구 이름
    namespaces: BTreeMap<String, Vec<String>>,
}

impl ToolRegistry {
    /// 빈 레지스트리 생성
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            namespaces: BTreeMap::new(),
        }
    }

    /// Builtin 도구들을 포함한 레지스트리 생성
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for tool in builtin::all_tools() {
            let meta = tool.meta();
            let name = meta.name.clone();
            registry.tools.insert(
                name,
                RegisteredTool {
                    tool,
                    meta,
                    source: ToolSource::Builtin,
                },
            );
        }
        debug!("Registered {} builtin tools", registry.tools.len());
        registry
    }

    // ========================================================================
    // 등록
    // ========================================================================

    /// 이름 검증 (패턴 + 예약 이름)
    pub fn validate_name(name: &str) -> Result<()> {
        if !name_pattern().is_match(name) {
            return Err(Error::name_conflict(
                name,
                "does not match ^[a-z][a-z0-9_]*$",
            ));
        }
        if is_reserved(name) {
            return Err(Error::name_conflict(name, "is a reserved built-in name"));
        }
        Ok(())
    }

    /// 외부 도구 등록
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        self.insert(tool, ToolSource::Builtin, None)
    }

    /// 네임스페이스 아래 확장 도구 등록
    pub fn register_in_namespace(&mut self, namespace: &str, tool: Arc<dyn Tool>) -> Result<()> {
        self.insert(tool, ToolSource::extension(namespace), Some(namespace))
    }

    fn insert(
        &mut self,
        tool: Arc<dyn Tool>,
        source: ToolSource,
        namespace: Option<&str>,
    ) -> Result<()> {
        let mut meta = tool.meta();
        let name = tool.name().to_string();
        if meta.name != name {
            return Err(Error::name_conflict(
                &name,
                format!("declares mismatching meta name '{}'", meta.name),
            ));
        }
        Self::validate_name(&name)?;
        if let Some(existing) = self.tools.get(&name) {
            return Err(Error::name_conflict(
                &name,
                format!("is already registered by {}", existing.source.display_name()),
            ));
        }

        if let Some(ns) = namespace {
            meta.category = ToolCategory::Extension;
            self.namespaces
                .entry(ns.to_string())
                .or_default()
                .push(name.clone());
        }

        info!(
            "Registered tool '{}' ({}, {})",
            name,
            meta.security_level,
            source.display_name()
        );
        self.tools.insert(name, RegisteredTool { tool, meta, source });
        Ok(())
    }

    /// 확장 로드 (실패한 도구는 건너뜀)
    pub fn load_extension(
        &mut self,
        extension: &dyn ToolExtension,
        unsafe_mode: bool,
    ) -> ExtensionReport {
        let namespace = extension.namespace().to_string();
        let mut report = ExtensionReport {
            namespace: namespace.clone(),
            ..Default::default()
        };

        let tools = match extension.register() {
            Ok(tools) => tools,
            Err(e) => {
                warn!("Extension '{}' failed to provide tools: {}", namespace, e);
                report.failed.push(namespace);
                return report;
            }
        };

        for tool in tools {
            let name = tool.name().to_string();
            if tool.meta().security_level == SecurityLevel::Unsafe && !unsafe_mode {
                info!(
                    "Skipping unsafe tool '{}' from '{}' (unsafe mode disabled)",
                    name, namespace
                );
                report.skipped_unsafe.push(name);
                continue;
            }
            match self.register_in_namespace(&namespace, tool) {
                Ok(()) => report.registered.push(name),
                Err(e) => {
                    warn!("Failed to register '{}' from '{}': {}", name, namespace, e);
                    report.failed.push(name);
                }
            }
        }

        report
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 도구 조회
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|t| Arc::clone(&t.tool))
    }

    /// 등록 시점 메타데이터
    pub fn meta(&self, name: &str) -> Option<&ToolMeta> {
        self.tools.get(name).map(|t| &t.meta)
    }

    /// 도구 출처
    pub fn source(&self, name: &str) -> Option<&ToolSource> {
        self.tools.get(name).map(|t| &t.source)
    }

    /// 도구 존재 여부
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// 모든 도구 이름 (정렬, `done` 제외)
    pub fn all_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// 네임스페이스 목록
    pub fn namespaces(&self) -> Vec<&str> {
        self.namespaces.keys().map(String::as_str).collect()
    }

    /// 네임스페이스의 도구 이름들
    pub fn namespace_tools(&self, namespace: &str) -> &[String] {
        self.namespaces
            .get(namespace)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 도구 개수
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// 비어있는지 확인
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    // ========================================================================
    // 검증
    // ========================================================================

    /// 원시 액션을 도구 + 타입 액션으로 변환
    pub fn resolve(&self, action: &Action) -> Result<ResolvedAction> {
        if action.is_done() {
            if let ActionKind::Done { summary } = ActionKind::from_action(action)? {
                return Ok(ResolvedAction::Done { summary });
            }
        }

        let registered = self
            .tools
            .get(&action.name)
            .ok_or_else(|| Error::ToolNotFound(action.name.clone()))?;

        let kind = match &registered.source {
            ToolSource::Builtin => ActionKind::from_action(action)?,
            ToolSource::Extension { .. } => ActionKind::Extension(action.clone()),
        };

        Ok(ResolvedAction::Tool {
            tool: Arc::clone(&registered.tool),
            meta: registered.meta.clone(),
            kind,
        })
    }

    /// 알 수 없는 액션에 대한 안내 메시지
    pub fn unknown_action_message(&self, name: &str) -> String {
        format!(
            "Action '{}' is not available. Available actions: {}, {}. \
             Please choose one of these actions.",
            name,
            self.all_names().join(", "),
            DONE_ACTION
        )
    }

    // ========================================================================
    // 프롬프트
    // ========================================================================

    /// 모델용 도구 문서 (고정 카테고리 순서 + 마지막 done 섹션)
    pub fn generate_prompt_section(&self) -> String {
        let mut sections = Vec::new();

        for category in ToolCategory::ORDER {
            if category == ToolCategory::Extension {
                if let Some(section) = self.extension_section() {
                    sections.push(section);
                }
                continue;
            }

            let mut entries: Vec<&RegisteredTool> = self
                .tools
                .values()
                .filter(|t| t.meta.category == category && t.source == ToolSource::Builtin)
                .collect();
            if entries.is_empty() {
                continue;
            }
            entries.sort_by(|a, b| a.meta.name.cmp(&b.meta.name));

            let body: Vec<String> = entries.iter().map(|t| describe_tool(t)).collect();
            sections.push(format!("## {}\n\n{}", category.title(), body.join("\n\n")));
        }

        sections.push(done_section());
        sections.join("\n\n")
    }

    fn extension_section(&self) -> Option<String> {
        let mut packs = Vec::new();
        for (namespace, names) in &self.namespaces {
            let mut names = names.clone();
            names.sort();
            let body: Vec<String> = names
                .iter()
                .filter_map(|n| self.tools.get(n))
                .map(describe_tool)
                .collect();
            if !body.is_empty() {
                packs.push(format!("### Pack: {}\n\n{}", namespace, body.join("\n\n")));
            }
        }
        if packs.is_empty() {
            return None;
        }
        Some(format!(
            "## {}\n\n{}",
            ToolCategory::Extension.title(),
            packs.join("\n\n")
        ))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn describe_tool(registered: &RegisteredTool) -> String {
    let meta = &registered.meta;
    let example = serde_json::to_string(&registered.tool.example())
        .unwrap_or_else(|_| format!("{{\"action\": \"{}\"}}", meta.name));
    let mut text = format!("### {}\n{}\n```json\n{}\n```", meta.name, meta.description, example);
    if meta.security_level != SecurityLevel::Safe {
        text.push_str(&format!(
            "\n**Requires confirmation** ({})",
            meta.security_level
        ));
    }
    text
}

fn done_section() -> String {
    format!(
        "## Completion\n\n### {}\nSignal that the current task is complete. \
         Include a comprehensive summary of what was done and the final answer.\n\
         ```json\n{{\"action\": \"{}\", \"summary\": \"What was accomplished\"}}\n```",
        DONE_ACTION, DONE_ACTION
    )
}
