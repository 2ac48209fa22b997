//! Loop Detector
//!
//! 에이전트가 같은 행동을 반복하거나 오류를 연달아 내는 상황을 감지합니다.
//!
//! 검사 순서 (처음 일치한 결과 반환):
//! 1. 반복 횟수 한도 (`iteration_limit`)
//! 2. 연속 오류 (`error_cycle`)
//! 3. 같은 액션/유사 파라미터 반복 (`action_repetition`)
//! 4. 액션 이름 시퀀스 순환 (`pattern`)

use loom_foundation::{strings::truncate_chars, AgentConfig};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 결과 요약 최대 길이 (문자)
const RESULT_SUMMARY_CHARS: usize = 200;

/// 파라미터 유사도 비교에 쓰이는 키
const KEY_PARAMS: &[&str] = &["path", "query", "command", "pattern"];

/// 개입 요청 최소 간격 (반복 횟수)
const INTERVENTION_INTERVAL: usize = 5;

// ============================================================================
// Error Classifier
// ============================================================================

/// 도구 결과가 오류인지 판정
pub trait ErrorClassifier: Send + Sync {
    fn is_error(&self, action_name: &str, result: &str) -> bool;
}

/// 대소문자 무시 부분 문자열 일치 ("error", "failed")
#[derive(Debug, Clone)]
pub struct SubstringErrorClassifier {
    needles: Vec<String>,
}

impl SubstringErrorClassifier {
    pub fn new<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            needles: needles.into_iter().map(|s| s.into().to_lowercase()).collect(),
        }
    }
}

impl Default for SubstringErrorClassifier {
    fn default() -> Self {
        Self::new(["error", "failed"])
    }
}

impl ErrorClassifier for SubstringErrorClassifier {
    fn is_error(&self, _action_name: &str, result: &str) -> bool {
        let lower = result.to_lowercase();
        self.needles.iter().any(|n| lower.contains(n.as_str()))
    }
}

// ============================================================================
// Types
// ============================================================================

/// 실행된 액션 기록
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub action_name: String,
    /// 문자열로 정규화된 파라미터
    pub parameters: BTreeMap<String, String>,
    /// 앞 200자만 보관
    pub result_summary: String,
    pub was_error: bool,
}

/// 루프 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopType {
    IterationLimit,
    ErrorCycle,
    ActionRepetition,
    Pattern,
}

impl fmt::Display for LoopType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoopType::IterationLimit => "iteration_limit",
            LoopType::ErrorCycle => "error_cycle",
            LoopType::ActionRepetition => "action_repetition",
            LoopType::Pattern => "pattern",
        };
        f.write_str(s)
    }
}

/// 심각도
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Critical => f.write_str("critical"),
        }
    }
}

/// 감지 결과
#[derive(Debug, Clone, PartialEq)]
pub struct LoopDetectionResult {
    pub is_loop_detected: bool,
    pub loop_type: Option<LoopType>,
    pub severity: Severity,
    pub description: String,
    pub suggested_actions: Vec<String>,
}

impl LoopDetectionResult {
    pub fn none() -> Self {
        Self {
            is_loop_detected: false,
            loop_type: None,
            severity: Severity::Warning,
            description: String::new(),
            suggested_actions: Vec::new(),
        }
    }

    fn detected(
        loop_type: LoopType,
        severity: Severity,
        description: String,
        suggested_actions: &[&str],
    ) -> Self {
        Self {
            is_loop_detected: true,
            loop_type: Some(loop_type),
            severity,
            description,
            suggested_actions: suggested_actions.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ============================================================================
// Config
// ============================================================================

/// 감지 설정
#[derive(Debug, Clone)]
pub struct LoopDetectorConfig {
    pub max_iterations: usize,
    pub window_size: usize,
    pub repetition_threshold: usize,
    pub error_threshold: usize,
    pub pattern_length: usize,
}

impl Default for LoopDetectorConfig {
    fn default() -> Self {
        Self::from(&AgentConfig::default())
    }
}

impl From<&AgentConfig> for LoopDetectorConfig {
    fn from(config: &AgentConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            window_size: config.loop_detection_window,
            repetition_threshold: config.repetition_threshold,
            error_threshold: config.error_threshold,
            pattern_length: config.pattern_length,
        }
    }
}

// ============================================================================
// LoopDetector
// ============================================================================

/// 슬라이딩 윈도우 기반 루프 감지기
#[derive(Clone)]
pub struct LoopDetector {
    config: LoopDetectorConfig,
    classifier: Arc<dyn ErrorClassifier>,
    iteration_count: usize,
    history: VecDeque<ActionRecord>,
    consecutive_errors: usize,
    last_intervention: usize,
}

impl LoopDetector {
    pub fn new(config: LoopDetectorConfig) -> Self {
        let capacity = config.window_size.max(1);
        Self {
            config,
            classifier: Arc::new(SubstringErrorClassifier::default()),
            iteration_count: 0,
            history: VecDeque::with_capacity(capacity),
            consecutive_errors: 0,
            last_intervention: 0,
        }
    }

    /// 오류 판정기 교체
    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn iteration_count(&self) -> usize {
        self.iteration_count
    }

    pub fn consecutive_errors(&self) -> usize {
        self.consecutive_errors
    }

    pub fn history(&self) -> impl Iterator<Item = &ActionRecord> {
        self.history.iter()
    }

    /// 상태 초기화
    pub fn reset(&mut self) {
        self.iteration_count = 0;
        self.history.clear();
        self.consecutive_errors = 0;
        self.last_intervention = 0;
    }

    /// 결과를 판정기로 분류한 뒤 기록, 오류 여부 반환
    pub fn record_result(
        &mut self,
        action_name: &str,
        parameters: &Map<String, Value>,
        result: &str,
    ) -> bool {
        let was_error = self.classifier.is_error(action_name, result);
        self.record_action(action_name, parameters, result, was_error);
        was_error
    }

    /// 실행된 액션 기록
    pub fn record_action(
        &mut self,
        action_name: &str,
        parameters: &Map<String, Value>,
        result: &str,
        was_error: bool,
    ) {
        self.iteration_count += 1;
        if was_error {
            self.consecutive_errors += 1;
        } else {
            self.consecutive_errors = 0;
        }

        if self.history.len() >= self.config.window_size.max(1) {
            self.history.pop_front();
        }
        self.history.push_back(ActionRecord {
            action_name: action_name.to_string(),
            parameters: normalize_params(parameters),
            result_summary: truncate_chars(result, RESULT_SUMMARY_CHARS).to_string(),
            was_error,
        });

        debug!(
            "Recorded action #{}: {} (error={}, consecutive_errors={})",
            self.iteration_count, action_name, was_error, self.consecutive_errors
        );
    }

    /// 루프 검사
    pub fn check_for_loops(&self) -> LoopDetectionResult {
        if self.iteration_count >= self.config.max_iterations {
            return LoopDetectionResult::detected(
                LoopType::IterationLimit,
                Severity::Critical,
                format!(
                    "Agent has executed {} iterations (limit: {})",
                    self.iteration_count, self.config.max_iterations
                ),
                &[
                    "Provide more specific instructions",
                    "Break the task into smaller subtasks",
                    "Check if the task requirements are clear",
                    "Abort and try a different approach",
                ],
            );
        }

        if self.consecutive_errors >= self.config.error_threshold {
            return LoopDetectionResult::detected(
                LoopType::ErrorCycle,
                Severity::Critical,
                format!(
                    "Agent encountered {} consecutive errors",
                    self.consecutive_errors
                ),
                &[
                    "Review the error messages and provide guidance",
                    "Check if required files or resources exist",
                    "Verify the environment is properly configured",
                    "Simplify the task or change the approach",
                ],
            );
        }

        if self.history.len() >= self.config.repetition_threshold {
            if let Some(result) = self.detect_repetition() {
                return result;
            }
        }

        if self.history.len() >= self.config.pattern_length * 2 {
            if let Some(result) = self.detect_pattern() {
                return result;
            }
        }

        LoopDetectionResult::none()
    }

    fn detect_repetition(&self) -> Option<LoopDetectionResult> {
        let threshold = self.config.repetition_threshold;
        if threshold == 0 {
            return None;
        }
        let recent: Vec<&ActionRecord> = self.history.iter().rev().take(threshold).collect();
        let first = recent.last()?;

        let same = |a: &ActionRecord| {
            a.action_name == first.action_name && params_similar(&a.parameters, &first.parameters)
        };
        if !recent.iter().all(|a| same(a)) {
            return None;
        }

        let total = self.history.iter().filter(|a| same(a)).count();
        let severity = if total < threshold + 2 {
            Severity::Warning
        } else {
            Severity::Critical
        };
        let name = &first.action_name;

        Some(LoopDetectionResult {
            is_loop_detected: true,
            loop_type: Some(LoopType::ActionRepetition),
            severity,
            description: format!(
                "Agent is repeating the same action: '{}' with similar parameters ({} times)",
                name, total
            ),
            suggested_actions: vec![
                format!(
                    "Explain why '{}' keeps failing or producing inadequate results",
                    name
                ),
                "Suggest alternative actions or approaches".to_string(),
                "Provide the information the agent is looking for directly".to_string(),
                "Clarify the task requirements".to_string(),
            ],
        })
    }

    fn detect_pattern(&self) -> Option<LoopDetectionResult> {
        let pattern_length = self.config.pattern_length.max(1);
        let names: Vec<&str> = self
            .history
            .iter()
            .map(|a| a.action_name.as_str())
            .collect();
        let start = names.len().saturating_sub(pattern_length * 3);
        let recent = &names[start..];

        for len in pattern_length..=recent.len() / 2 {
            let pattern = &recent[..len];
            let repetitions = recent[len..]
                .chunks(len)
                .take_while(|chunk| *chunk == pattern)
                .count();

            if repetitions >= 2 {
                let severity = if repetitions == 2 {
                    Severity::Warning
                } else {
                    Severity::Critical
                };
                return Some(LoopDetectionResult::detected(
                    LoopType::Pattern,
                    severity,
                    format!(
                        "Agent is repeating a pattern of actions {} times: [{}]",
                        repetitions + 1,
                        pattern.join(" → ")
                    ),
                    &[
                        "Identify why this sequence isn't making progress",
                        "Provide missing information or context",
                        "Break the cycle by suggesting a different approach",
                        "Check if the agent has all required resources",
                    ],
                ));
            }
        }
        None
    }

    /// 마지막 개입 이후 충분한 반복이 지났는지
    pub fn should_ask_for_intervention(&self) -> bool {
        self.iteration_count.saturating_sub(self.last_intervention) >= INTERVENTION_INTERVAL
    }

    /// 개입 기록 (연속 오류 초기화)
    pub fn mark_intervention(&mut self) {
        self.last_intervention = self.iteration_count;
        self.consecutive_errors = 0;
    }
}

fn normalize_params(parameters: &Map<String, Value>) -> BTreeMap<String, String> {
    parameters
        .iter()
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect()
}

/// 핵심 키가 완전히 같거나, 공통 키 중 하나라도 값이 같으면 유사
fn params_similar(a: &BTreeMap<String, String>, b: &BTreeMap<String, String>) -> bool {
    let key_a: BTreeMap<&str, &str> = a
        .iter()
        .filter(|(k, _)| KEY_PARAMS.contains(&k.as_str()))
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let key_b: BTreeMap<&str, &str> = b
        .iter()
        .filter(|(k, _)| KEY_PARAMS.contains(&k.as_str()))
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    if key_a == key_b {
        return true;
    }
    if key_a.is_empty() || key_b.is_empty() {
        return false;
    }
    key_a.iter().any(|(k, va)| {
        key_b
            .get(k)
            .is_some_and(|vb| va.to_lowercase() == vb.to_lowercase())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn detector(max_iterations: usize, repetition: usize) -> LoopDetector {
        LoopDetector::new(LoopDetectorConfig {
            max_iterations,
            window_size: 10,
            repetition_threshold: repetition,
            error_threshold: 3,
            pattern_length: 3,
        })
    }

    #[test]
    fn test_repetition_threshold() {
        let mut d = detector(50, 3);
        let p = params(json!({"command": "ls"}));

        d.record_action("run_command", &p, "ok", false);
        d.record_action("run_command", &p, "ok", false);
        assert!(!d.check_for_loops().is_loop_detected);

        d.record_action("run_command", &p, "ok", false);
        let result = d.check_for_loops();
        assert_eq!(result.loop_type, Some(LoopType::ActionRepetition));
        assert_eq!(result.severity, Severity::Warning);
    }

    #[test]
    fn test_repetition_escalates() {
        let mut d = detector(50, 3);
        let p = params(json!({"path": "a.rs"}));
        for _ in 0..5 {
            d.record_action("read_file", &p, "ok", false);
        }
        assert_eq!(d.check_for_loops().severity, Severity::Critical);
    }

    #[test]
    fn test_iteration_limit_exact() {
        let mut d = detector(4, 100);
        for i in 0..3 {
            d.record_action("run_command", &params(json!({"command": i.to_string()})), "", false);
            assert!(!d.check_for_loops().is_loop_detected);
        }
        d.record_action("run_command", &params(json!({"command": "x"})), "", false);
        let result = d.check_for_loops();
        assert_eq!(result.loop_type, Some(LoopType::IterationLimit));
        assert_eq!(result.severity, Severity::Critical);
    }

    #[test]
    fn test_error_cycle_and_intervention_reset() {
        let mut d = detector(50, 100);
        for i in 0..3 {
            d.record_action("run_command", &params(json!({"command": i.to_string()})), "boom", true);
        }
        assert_eq!(d.check_for_loops().loop_type, Some(LoopType::ErrorCycle));

        d.mark_intervention();
        assert_eq!(d.consecutive_errors(), 0);
        assert!(!d.should_ask_for_intervention());
        assert!(!d.check_for_loops().is_loop_detected);
    }

    #[test]
    fn test_pattern_detection() {
        let mut d = detector(50, 100);
        for i in 0..9 {
            let name = ["read_file", "run_command", "write_file"][i % 3];
            d.record_action(name, &params(json!({"n": i})), "", false);
        }
        let result = d.check_for_loops();
        assert_eq!(result.loop_type, Some(LoopType::Pattern));
        assert_eq!(result.severity, Severity::Warning);
        assert!(result
            .description
            .contains("3 times: [read_file → run_command → write_file]"));
    }

    #[test]
    fn test_params_similar() {
        let a = normalize_params(&params(json!({"path": "SRC/a.rs", "start_line": 1})));
        let b = normalize_params(&params(json!({"path": "src/a.rs", "query": "x"})));
        let c = normalize_params(&params(json!({"content": "x"})));
        assert!(params_similar(&a, &b));
        assert!(!params_similar(&a, &c));
        assert!(params_similar(&c, &normalize_params(&params(json!({"content": "y"})))));
    }

    #[test]
    fn test_window_eviction_and_truncation() {
        let mut d = detector(50, 100);
        let long = "x".repeat(500);
        for i in 0..15 {
            d.record_action("a", &params(json!({"i": i})), &long, false);
        }
        assert_eq!(d.history().count(), 10);
        assert_eq!(d.history().next().map(|r| r.result_summary.len()), Some(200));
    }

    #[test]
    fn test_substring_classifier() {
        let classifier = SubstringErrorClassifier::default();
        assert!(classifier.is_error("run_command", "Build FAILED"));
        assert!(classifier.is_error("run_command", "Error: nope"));
        assert!(!classifier.is_error("run_command", "all good"));
    }

    struct ExitCodeClassifier;

    impl ErrorClassifier for ExitCodeClassifier {
        fn is_error(&self, _action_name: &str, result: &str) -> bool {
            result.starts_with("COMMAND FAILED")
        }
    }

    #[test]
    fn test_injected_classifier() {
        let mut d = detector(50, 100).with_classifier(Arc::new(ExitCodeClassifier));
        let p = params(json!({"command": "grep error log.txt"}));

        assert!(!d.record_result("run_command", &p, "3 error lines found"));
        assert_eq!(d.consecutive_errors(), 0);
        assert!(d.record_result("run_command", &p, "COMMAND FAILED (exit code: 1)"));
        assert_eq!(d.consecutive_errors(), 1);
    }
}
