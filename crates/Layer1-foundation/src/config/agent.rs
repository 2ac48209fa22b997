//! Agent Config - 에이전트 실행 설정
//!
//! 컨텍스트 예산, 압축, 루프 감지, 플래닝 관련 값을 한 곳에서 관리합니다.

use super::ProviderSettings;
use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// 설정 파일명
pub const CONFIG_FILE: &str = "config.json";

/// @domain 프롬프트 디렉토리명
pub const DOMAINS_DIR: &str = "domains";

// ============================================================================
// AgentConfig
// ============================================================================

/// 에이전트 통합 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    // ------------------------------------------------------------------------
    // Context budget
    // ------------------------------------------------------------------------
    /// 트랜스크립트 토큰 예산
    pub context_token_threshold: usize,
    /// 단일 메시지 요약 기준 (threshold 대비 비율)
    pub large_message_ratio: f64,

    // ------------------------------------------------------------------------
    // Compression
    // ------------------------------------------------------------------------
    pub compression_enabled: bool,
    pub compression_min_tokens: usize,
    pub compression_min_chars: usize,
    pub compression_min_pattern_length: usize,
    pub compression_min_occurrences: usize,
    pub compression_max_dictionary: usize,
    /// 사전 토큰 마커 문자
    pub compression_marker: char,

    // ------------------------------------------------------------------------
    // Loop detection
    // ------------------------------------------------------------------------
    pub max_iterations: usize,
    pub loop_detection_enabled: bool,
    pub loop_detection_window: usize,
    pub repetition_threshold: usize,
    pub error_threshold: usize,
    pub pattern_length: usize,

    // ------------------------------------------------------------------------
    // Planning
    // ------------------------------------------------------------------------
    pub planning_enabled: bool,
    /// 플래닝 파일 컨텍스트 공유 라인 풀
    pub planning_file_context_lines: usize,
    /// 플래너 미사용 시 단일 호출 태스크 감지
    pub task_detection: bool,

    // ------------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------------
    pub max_retries: u32,
    pub command_timeout_secs: u64,
    /// unsafe 확장 도구 허용
    pub unsafe_mode: bool,
    pub workspace_root: PathBuf,
    pub extension_dirs: Vec<PathBuf>,
    pub state_dir: String,

    pub provider: ProviderSettings,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            context_token_threshold: 29_000,
            large_message_ratio: 0.90,
            compression_enabled: true,
            compression_min_tokens: 1_000,
            compression_min_chars: 5_000,
            compression_min_pattern_length: 10,
            compression_min_occurrences: 3,
            compression_max_dictionary: 100,
            compression_marker: 'Đ',
            max_iterations: 200,
            loop_detection_enabled: true,
            loop_detection_window: 20,
            repetition_threshold: 8,
            error_threshold: 8,
            pattern_length: 10,
            planning_enabled: true,
            planning_file_context_lines: 2_000,
            task_detection: false,
            max_retries: 3,
            command_timeout_secs: 120,
            unsafe_mode: false,
            workspace_root: PathBuf::from("."),
            extension_dirs: Vec::new(),
            state_dir: crate::storage::STATE_DIR.to_string(),
            provider: ProviderSettings::default(),
        }
    }
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// 글로벌 + 프로젝트 + 환경 변수 병합 로드
    pub fn load(workspace_root: &Path) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;

        // 1. 글로벌 설정
        if let Ok(global) = JsonStore::global() {
            if let Some(value) = global.load_optional::<Value>(CONFIG_FILE)? {
                debug!("Loaded global config from {}", global.base_dir().display());
                merge_json(&mut merged, value);
            }
        }

        // 2. 프로젝트 설정
        let project = JsonStore::project(workspace_root);
        if let Some(value) = project.load_optional::<Value>(CONFIG_FILE)? {
            debug!("Loaded project config from {}", project.base_dir().display());
            merge_json(&mut merged, value);
        }

        let mut config: AgentConfig = serde_json::from_value(merged)
            .map_err(|e| Error::Config(format!("Invalid config: {}", e)))?;
        config.workspace_root = workspace_root.to_path_buf();

        // 3. 환경 변수
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// `LOOM_*` 환경 변수 적용 (잘못된 값은 무시)
    pub fn apply_env(&mut self) {
        env_override("LOOM_CONTEXT_TOKEN_THRESHOLD", &mut self.context_token_threshold);
        env_override("LOOM_LARGE_MESSAGE_RATIO", &mut self.large_message_ratio);
        env_override_bool("LOOM_PLANNING_ENABLED", &mut self.planning_enabled);
        env_override("LOOM_MAX_ITERATIONS", &mut self.max_iterations);
        env_override_bool("LOOM_LOOP_DETECTION_ENABLED", &mut self.loop_detection_enabled);
        env_override("LOOM_LOOP_DETECTION_WINDOW", &mut self.loop_detection_window);
        env_override("LOOM_REPETITION_THRESHOLD", &mut self.repetition_threshold);
        env_override("LOOM_ERROR_THRESHOLD", &mut self.error_threshold);
        env_override("LOOM_PATTERN_LENGTH", &mut self.pattern_length);
        env_override_bool("LOOM_COMPRESSION_ENABLED", &mut self.compression_enabled);
        env_override_bool("LOOM_UNSAFE_MODE", &mut self.unsafe_mode);
        self.provider.apply_env();
    }

    /// 설정 값 검증
    pub fn validate(&self) -> Result<()> {
        if self.context_token_threshold == 0 {
            return Err(Error::Config("contextTokenThreshold must be > 0".into()));
        }
        if !(self.large_message_ratio > 0.0 && self.large_message_ratio <= 1.0) {
            return Err(Error::Config(format!(
                "largeMessageRatio must be in (0, 1], got {}",
                self.large_message_ratio
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::Config("maxIterations must be > 0".into()));
        }
        if self.repetition_threshold == 0 || self.error_threshold == 0 || self.pattern_length == 0
        {
            return Err(Error::Config(
                "loop detection thresholds must be > 0".into(),
            ));
        }
        if self.loop_detection_window < self.repetition_threshold {
            return Err(Error::Config(format!(
                "loopDetectionWindow ({}) must be >= repetitionThreshold ({})",
                self.loop_detection_window, self.repetition_threshold
            )));
        }
        if self.compression_min_pattern_length == 0 || self.compression_min_occurrences == 0 {
            return Err(Error::Config("compression minimums must be > 0".into()));
        }
        Ok(())
    }

    /// 상태 디렉토리 (<workspace>/.loom)
    pub fn state_path(&self) -> PathBuf {
        self.workspace_root.join(&self.state_dir)
    }

    /// @domain 프롬프트 검색 경로 (프로젝트 → 전역 순)
    pub fn domain_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.state_path().join(DOMAINS_DIR)];
        if let Ok(global) = JsonStore::global() {
            dirs.push(global.base_dir().join(DOMAINS_DIR));
        }
        dirs
    }

    /// 단일 메시지 요약 기준 토큰 수
    pub fn large_message_tokens(&self) -> usize {
        (self.context_token_threshold as f64 * self.large_message_ratio) as usize
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    pub fn planning(mut self, enabled: bool) -> Self {
        self.planning_enabled = enabled;
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn unsafe_mode(mut self, enabled: bool) -> Self {
        self.unsafe_mode = enabled;
        self
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// JSON 객체 재귀 병합 (overlay 우선)
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn env_override<T: FromStr>(name: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(name) {
        match raw.trim().parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => warn!("Ignoring invalid value for {}: {:?}", name, raw),
        }
    }
}

fn env_override_bool(name: &str, target: &mut bool) {
    if let Ok(raw) = std::env::var(name) {
        match parse_bool(&raw) {
            Some(value) => *target = value,
            None => warn!("Ignoring invalid boolean for {}: {:?}", name, raw),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
