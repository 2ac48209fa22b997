//! Action Parser - 모델 응답에서 액션 추출
//!
//! 순서대로 시도하며 처음 성공한 결과를 반환합니다.
//! - Pass 1: ```` ```json ```` 펜스 블록
//! - Pass 2: 라벨과 무관한 임의의 펜스 블록
//! - Pass 3: 중괄호 균형 스캔 (문자열 내부 중괄호 무시)
//! - Pass 4: 따옴표/후행 쉼표 보정 후 Pass 3 재시도
//!
//! 어떤 입력에도 패닉하지 않으며 실패 시 `None`을 반환합니다.

use loom_foundation::Action;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, trace};

fn json_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json\s*\n(.*?)\n\s*```").expect("valid regex"))
}

fn any_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[a-zA-Z]*\s*\n(.*?)\n\s*```").expect("valid regex"))
}

fn trailing_comma() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("valid regex"))
}

fn try_parse(candidate: &str, source: &str) -> Option<Action> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => {
            let action = Action::from_value(value);
            if action.is_some() {
                debug!("Parsed action from {}", source);
            }
            action
        }
        Err(e) => {
            trace!("Failed to parse JSON from {}: {}", source, e);
            None
        }
    }
}

/// 최상위 JSON 객체 후보들 (중첩/문자열 인식)
///
/// 닫히지 않은 중괄호를 만나면 스캔을 중단합니다.
pub fn extract_json_objects(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut objects = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }

        let start = i;
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escape = false;
        let mut end = None;

        for (j, &ch) in bytes.iter().enumerate().skip(start) {
            if escape {
                escape = false;
                continue;
            }
            match ch {
                b'\\' if in_string => escape = true,
                b'"' => in_string = !in_string,
                _ if in_string => {}
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(j);
                        break;
                    }
                }
                _ => {}
            }
        }

        match end {
            Some(j) => {
                // '{'와 '}'는 ASCII라 문자 경계가 보장됨
                objects.push(&text[start..=j]);
                i = j + 1;
            }
            None => break,
        }
    }

    objects
}

/// 모델 응답에서 액션 하나 추출
pub fn parse_action(text: &str) -> Option<Action> {
    if let Some(caps) = json_fence().captures(text) {
        if let Some(action) = try_parse(&caps[1], "```json fenced block") {
            return Some(action);
        }
    }

    if let Some(caps) = any_fence().captures(text) {
        if let Some(action) = try_parse(&caps[1], "generic code block") {
            return Some(action);
        }
    }

    for candidate in extract_json_objects(text) {
        if let Some(action) = try_parse(candidate, "brace-counted object") {
            return Some(action);
        }
    }

    let fixed = text.replace('\'', "\"");
    let fixed = trailing_comma().replace_all(&fixed, "$1");
    for candidate in extract_json_objects(&fixed) {
        if let Some(action) = try_parse(candidate, "fixed JSON object") {
            return Some(action);
        }
    }

    debug!("Failed to parse any action from response text");
    None
}

/// 표시용: 액션 펜스 블록 제거 (추론 텍스트 유지)
///
/// ```` ```json ```` 블록은 항상 제거하고, 다른 펜스 블록은 액션을 담고 있을 때만 제거합니다.
pub fn strip_json_blocks(text: &str) -> String {
    let without_json = json_fence().replace_all(text, "");
    let stripped = any_fence().replace_all(&without_json, |caps: &regex::Captures<'_>| {
        if try_parse(&caps[1], "strip").is_some() {
            String::new()
        } else {
            caps[0].to_string()
        }
    });
    stripped.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_fence() {
        let text = "Reasoning text\n```json\n{\"action\":\"search_code\",\"query\":\"x\"}\n```";
        let action = parse_action(text).unwrap();
        assert_eq!(
            action.to_value(),
            json!({"action": "search_code", "query": "x"})
        );
    }

    #[test]
    fn test_generic_fence() {
        let text = "```\n{\"action\": \"read_file\", \"path\": \"a.rs\"}\n```";
        let action = parse_action(text).unwrap();
        assert_eq!(action.name, "read_file");
        assert_eq!(action.param_str("path"), Some("a.rs"));
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = r#"I'll write it: {"action": "write_file", "path": "x.rs", "content": "fn main() { } }"} ok"#;
        let action = parse_action(text).unwrap();
        assert_eq!(action.param_str("content"), Some("fn main() { } }"));
    }

    #[test]
    fn test_skips_objects_without_action() {
        let text = r#"config is {"a": 1} and then {"action": "done", "summary": "ok"}"#;
        let action = parse_action(text).unwrap();
        assert!(action.is_done());
    }

    #[test]
    fn test_fixup_pass() {
        let text = "{'action': 'run_command', 'command': 'ls',}";
        let action = parse_action(text).unwrap();
        assert_eq!(action.param_str("command"), Some("ls"));
    }

    #[test]
    fn test_nested_objects() {
        let text = r#"{"action": "custom", "opts": {"deep": {"x": [1, 2]}}}"#;
        let action = parse_action(text).unwrap();
        assert_eq!(action.parameters["opts"]["deep"]["x"], json!([1, 2]));
    }

    #[test]
    fn test_returns_none_on_garbage() {
        assert!(parse_action("").is_none());
        assert!(parse_action("no json here").is_none());
        assert!(parse_action("{ unclosed \"action\": ").is_none());
        assert!(parse_action("{\"name\": \"x\"}").is_none());
        assert!(parse_action("}}}{{{").is_none());
        assert!(parse_action("한글 {\"action\": 5} 텍스트").is_none());
    }

    #[test]
    fn test_strip_json_blocks() {
        let text = "Let me look.\n```json\n{\"action\": \"read_file\", \"path\": \"a\"}\n```\n";
        assert_eq!(strip_json_blocks(text), "Let me look.");

        let code = "Example:\n```rust\nfn main() {}\n```";
        assert_eq!(strip_json_blocks(code), code);
    }
}
