//! Project Prompt - 워크스페이스 지침 파일과 @domain 오버라이드
//!
//! ```text
//! project/
//! └── .loom/
//!     ├── agent_system_prompt.md   # 프로젝트 시스템 프롬프트
//!     ├── rules.md                 # 프로젝트 규칙
//!     ├── guidelines.md            # 프로젝트 가이드라인
//!     └── domains/
//!         └── <name>.md            # `@name`으로 활성화
//! ```
//!
//! 시스템 프롬프트 조립 순서: 기본 프롬프트 → 프로젝트 파일 → 도메인 오버라이드 (항상 마지막)

use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// 프로젝트 지침 파일과 섹션 제목
pub const PROJECT_PROMPT_FILES: [(&str, &str); 3] = [
    ("agent_system_prompt.md", "Project System Prompt"),
    ("rules.md", "Project Rules"),
    ("guidelines.md", "Project Guidelines"),
];

pub const DOMAIN_OVERRIDE_HEADER: &str =
    "## ACTIVE DOMAIN OVERRIDE (highest priority, supersedes all instructions above)";

fn mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"@(\w+)").expect("valid mention regex"))
}

fn whitespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

// ============================================================================
// Project files
// ============================================================================

/// `.loom/` 지침 파일을 `# 제목` 섹션으로 읽기 (없거나 빈 파일은 건너뜀)
pub async fn load_project_sections(state_dir: &Path) -> Vec<String> {
    let mut sections = Vec::new();
    for (file, label) in PROJECT_PROMPT_FILES {
        if let Some(content) = read_prompt_file(&state_dir.join(file)).await {
            debug!("Loaded project prompt file {}", file);
            sections.push(format!("# {}\n\n{}", label, content));
        }
    }
    sections
}

/// 파일 내용 (한 줄짜리 HTML 주석 제거, 비어 있으면 None)
async fn read_prompt_file(path: &Path) -> Option<String> {
    let content = tokio::fs::read_to_string(path).await.ok()?;
    let kept: Vec<&str> = content
        .trim()
        .lines()
        .filter(|line| {
            let line = line.trim();
            !(line.starts_with("<!--") && line.ends_with("-->"))
        })
        .collect();
    let text = kept.join("\n").trim().to_string();
    (!text.is_empty()).then_some(text)
}

// ============================================================================
// Domains
// ============================================================================

/// 요청에서 추출한 @domain 언급
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainMentions {
    /// 인식된 도메인 (등장 순서, 중복 제거)
    pub names: Vec<String>,
    /// 인식된 언급을 뺀 요청
    pub cleaned: String,
}

impl DomainMentions {
    /// 알려진 도메인만 제거하고, 모르는 `@word`는 그대로 둠
    pub fn parse(text: &str, available: &HashSet<String>) -> Self {
        let mut names: Vec<String> = Vec::new();
        let stripped = mention_pattern().replace_all(text, |caps: &regex::Captures| {
            let name = &caps[1];
            if available.contains(name) {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
                String::new()
            } else {
                caps[0].to_string()
            }
        });
        let cleaned = whitespace_pattern()
            .replace_all(&stripped, " ")
            .trim()
            .to_string();
        Self { names, cleaned }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// 사용 가능한 도메인 이름 (`*.md` 파일명)
pub fn list_domains(dirs: &[PathBuf]) -> HashSet<String> {
    let mut names = HashSet::new();
    for dir in dirs {
        let Ok(entries) = std::fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|e| e == "md") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.insert(stem.to_string());
                }
            }
        }
    }
    names
}

/// 도메인 파일 내용 연결 (앞선 디렉토리가 우선)
pub async fn load_domains(dirs: &[PathBuf], names: &[String]) -> String {
    let mut parts = Vec::new();
    for name in names {
        for dir in dirs {
            if let Ok(content) = tokio::fs::read_to_string(dir.join(format!("{}.md", name))).await {
                parts.push(content.trim().to_string());
                break;
            }
        }
    }
    parts.join("\n\n")
}

// ============================================================================
// Assembly
// ============================================================================

/// 기본 프롬프트 + 프로젝트 섹션 + 도메인 오버라이드
pub fn compose_system_prompt(base: &str, project_sections: &[String], domain_content: &str) -> String {
    let mut prompt = base.to_string();
    if !project_sections.is_empty() {
        prompt.push('\n');
        prompt.push_str(&project_sections.join("\n\n"));
        prompt.push('\n');
    }
    if !domain_content.trim().is_empty() {
        prompt.push_str(&format!("\n\n{}\n\n{}\n", DOMAIN_OVERRIDE_HEADER, domain_content));
    }
    prompt
}
