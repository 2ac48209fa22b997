//! Action - 모델이 요청하는 구조화된 액션
//!
//! 모델 응답에서 파싱된 원시 형태(`Action`)와
//! 레지스트리 경계에서 한 번 검증된 타입 형태(`ActionKind`)를 정의합니다.
//!
//! ```ignore
//! let action = Action::from_value(json!({"action": "read_file", "path": "src/lib.rs"})).unwrap();
//! match ActionKind::from_action(&action)? {
//!     ActionKind::ReadFile(params) => println!("{}", params.path),
//!     _ => {}
//! }
//! ```

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 현재 루프를 종료하는 예약 액션
pub const DONE_ACTION: &str = "done";

// ============================================================================
// Action (raw)
// ============================================================================

/// 파싱된 원시 액션: `{"action": name, ...parameters}`
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: String,
    pub parameters: Map<String, Value>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// JSON 객체에서 생성 (`action` 키 필수, 비어있으면 안 됨)
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut map) = value else {
            return None;
        };
        let name = match map.remove("action") {
            Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
            _ => return None,
        };
        Some(Self {
            name,
            parameters: map,
        })
    }

    /// 원래 JSON 객체 형태로 복원
    pub fn to_value(&self) -> Value {
        let mut map = Map::with_capacity(self.parameters.len() + 1);
        map.insert("action".to_string(), Value::String(self.name.clone()));
        for (k, v) in &self.parameters {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }

    pub fn is_done(&self) -> bool {
        self.name == DONE_ACTION
    }

    /// 문자열 파라미터 조회
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_str())
    }

    /// 파라미터를 타입 구조체로 변환
    pub fn params<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.parameters.clone())).map_err(|e| {
            Error::InvalidInput(format!("Invalid parameters for '{}': {}", self.name, e))
        })
    }
}

// ============================================================================
// Typed parameters
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunCommandParams {
    pub command: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadFileParams {
    pub path: String,
    #[serde(default)]
    pub start_line: Option<usize>,
    #[serde(default)]
    pub end_line: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteFileParams {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskUserParams {
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkTaskDoneParams {
    pub task_id: String,
    pub resolution: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DoneParams {
    #[serde(default)]
    summary: Option<String>,
}

// ============================================================================
// ActionKind (typed)
// ============================================================================

/// 액션 이름으로 구분된 타입 액션
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    Done { summary: Option<String> },
    RunCommand(RunCommandParams),
    ReadFile(ReadFileParams),
    WriteFile(WriteFileParams),
    AskUser(AskUserParams),
    MarkTaskDone(MarkTaskDoneParams),
    /// 확장 도구: 파라미터는 도구가 직접 해석
    Extension(Action),
}

impl ActionKind {
    /// 원시 액션을 검증하여 변환
    pub fn from_action(action: &Action) -> Result<Self> {
        let kind = match action.name.as_str() {
            DONE_ACTION => {
                let params: DoneParams = action.params().unwrap_or_default();
                ActionKind::Done {
                    summary: params.summary,
                }
            }
            "run_command" => ActionKind::RunCommand(action.params()?),
            "read_file" => ActionKind::ReadFile(action.params()?),
            "write_file" => ActionKind::WriteFile(action.params()?),
            "ask_user" => ActionKind::AskUser(action.params()?),
            "mark_task_done" => ActionKind::MarkTaskDone(action.params()?),
            _ => ActionKind::Extension(action.clone()),
        };
        Ok(kind)
    }

    /// 액션 이름
    pub fn name(&self) -> &str {
        match self {
            ActionKind::Done { .. } => DONE_ACTION,
            ActionKind::RunCommand(_) => "run_command",
            ActionKind::ReadFile(_) => "read_file",
            ActionKind::WriteFile(_) => "write_file",
            ActionKind::AskUser(_) => "ask_user",
            ActionKind::MarkTaskDone(_) => "mark_task_done",
            ActionKind::Extension(action) => &action.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_requires_action() {
        assert!(Action::from_value(json!({"query": "x"})).is_none());
        assert!(Action::from_value(json!({"action": ""})).is_none());
        assert!(Action::from_value(json!({"action": 3})).is_none());
        assert!(Action::from_value(json!(["action"])).is_none());

        let action = Action::from_value(json!({"action": "search_code", "query": "x"})).unwrap();
        assert_eq!(action.name, "search_code");
        assert_eq!(action.param_str("query"), Some("x"));
        assert_eq!(action.to_value(), json!({"action": "search_code", "query": "x"}));
    }

    #[test]
    fn test_kind_typed_params() {
        let action = Action::new("run_command").with_param("command", "ls -la");
        match ActionKind::from_action(&action).unwrap() {
            ActionKind::RunCommand(params) => {
                assert_eq!(params.command, "ls -la");
                assert_eq!(params.timeout_secs, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_kind_rejects_missing_params() {
        let action = Action::new("write_file").with_param("path", "a.txt");
        let err = ActionKind::from_action(&action).unwrap_err();
        assert!(err.to_string().contains("write_file"));
    }

    #[test]
    fn test_done_summary_optional() {
        let bare = ActionKind::from_action(&Action::new("done")).unwrap();
        assert_eq!(bare, ActionKind::Done { summary: None });

        let with = Action::new("done").with_param("summary", "all good");
        assert_eq!(
            ActionKind::from_action(&with).unwrap(),
            ActionKind::Done {
                summary: Some("all good".into())
            }
        );
    }

    #[test]
    fn test_unknown_name_is_extension() {
        let action = Action::new("jira_lookup").with_param("key", "ABC-1");
        let kind = ActionKind::from_action(&action).unwrap();
        assert_eq!(kind.name(), "jira_lookup");
        assert!(matches!(kind, ActionKind::Extension(_)));
    }
}
