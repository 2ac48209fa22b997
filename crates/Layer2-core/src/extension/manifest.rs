//! Extension Manifest - 확장 메타데이터 정의
//!
//! ```text
//! <ext>/manifest.json
//! {
//!   "metadata": { "tag": "docker", "description": "Container helpers" },
//!   "tools": ["ps.json", "logs.json"]
//! }
//!
//! <ext>/ps.json
//! {
//!   "name": "docker_ps",
//!   "label": "List Containers",
//!   "description": "List running containers",
//!   "security_level": "safe",
//!   "command": ["docker", "ps", "--format", "json"]
//! }
//! ```

use loom_foundation::{Error, Result, SecurityLevel};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 매니페스트 파일 이름
pub const MANIFEST_FILE: &str = "manifest.json";

/// 확장 메타데이터
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionMetadata {
    /// 네임스페이스
    pub tag: String,
    #[serde(default)]
    pub description: String,
}

/// manifest.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionManifest {
    pub metadata: ExtensionMetadata,
    /// 도구 기술 파일 목록 (확장 디렉토리 기준 상대 경로)
    #[serde(default)]
    pub tools: Vec<String>,
}

impl ExtensionManifest {
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(content)?;
        if manifest.metadata.tag.trim().is_empty() {
            return Err(Error::Extension("manifest metadata.tag is empty".into()));
        }
        Ok(manifest)
    }
}

/// 명령 지정: argv 배열 또는 shell 스타일 문자열
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Argv(Vec<String>),
    Line(String),
}

impl CommandSpec {
    /// argv로 변환 (문자열은 shlex 규칙으로 분리)
    pub fn argv(&self) -> Result<Vec<String>> {
        let argv = match self {
            CommandSpec::Argv(argv) => argv.clone(),
            CommandSpec::Line(line) => shlex::split(line)
                .ok_or_else(|| Error::Extension(format!("unbalanced quotes in command: {}", line)))?,
        };
        if argv.is_empty() || argv[0].is_empty() {
            return Err(Error::Extension("command is empty".into()));
        }
        Ok(argv)
    }
}

/// 도구 기술 파일
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub security_level: SecurityLevel,
    #[serde(default)]
    pub primary_param: Option<String>,
    pub command: CommandSpec,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// 프롬프트 예시 파라미터 (`action` 키 제외)
    #[serde(default)]
    pub example: Option<Value>,
}

impl ToolDescriptor {
    pub fn parse(content: &str) -> Result<Self> {
        let descriptor: Self = serde_json::from_str(content)?;
        descriptor.command.argv()?;
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let manifest = ExtensionManifest::parse(
            r#"{"metadata":{"tag":"docker","description":"Containers"},"tools":["ps.json"]}"#,
        )
        .unwrap();
        assert_eq!(manifest.metadata.tag, "docker");
        assert_eq!(manifest.tools, vec!["ps.json"]);
    }

    #[test]
    fn test_manifest_requires_tag() {
        assert!(ExtensionManifest::parse(r#"{"metadata":{"tag":" "}}"#).is_err());
        assert!(ExtensionManifest::parse(r#"{"tools":[]}"#).is_err());
    }

    #[test]
    fn test_descriptor_command_forms() {
        let argv = ToolDescriptor::parse(
            r#"{"name":"a","command":["python3","tool.py"],"security_level":"approval"}"#,
        )
        .unwrap();
        assert_eq!(argv.command.argv().unwrap(), vec!["python3", "tool.py"]);
        assert_eq!(argv.security_level, SecurityLevel::Approval);

        let line = ToolDescriptor::parse(r#"{"name":"b","command":"sh -c 'echo hi'"}"#).unwrap();
        assert_eq!(line.command.argv().unwrap(), vec!["sh", "-c", "echo hi"]);
        assert_eq!(line.security_level, SecurityLevel::Safe);

        assert!(ToolDescriptor::parse(r#"{"name":"c","command":[]}"#).is_err());
    }
}
