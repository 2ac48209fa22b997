//! Dictionary Compressor
//!
//! 반복되는 부분 문자열을 짧은 토큰으로 치환하는 가역 압축입니다.
//! 큰 명령 출력이 대화 기록에 들어가기 전에 적용되며,
//! 모델에게 보내기 전에 항상 원문으로 복원됩니다.
//!
//! ## 토큰 형식
//!
//! `<marker><id>` (예: `Đ0`, `Đ07`). id는 사전 크기에 맞춘 고정 자릿수라서
//! 토큰 뒤에 숫자가 이어져도 복원이 모호하지 않습니다.
//! 입력에 marker 문자가 이미 있으면 압축하지 않습니다.

use loom_foundation::tokenizer::CHARS_PER_TOKEN;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;
use tracing::debug;

/// 기본 marker 문자
pub const DEFAULT_MARKER: char = 'Đ';

// ============================================================================
// Configuration
// ============================================================================

/// 압축 설정
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    /// 최소 패턴 길이 (문자)
    pub min_pattern_length: usize,
    /// 최소 등장 횟수
    pub min_occurrences: usize,
    /// 최대 사전 크기
    pub max_dictionary_size: usize,
    /// 토큰 접두 문자
    pub marker: char,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            min_pattern_length: 10,
            min_occurrences: 3,
            max_dictionary_size: 100,
            marker: DEFAULT_MARKER,
        }
    }
}

impl CompressionConfig {
    pub fn with_marker(mut self, marker: char) -> Self {
        self.marker = marker;
        self
    }

    pub fn with_min_occurrences(mut self, count: usize) -> Self {
        self.min_occurrences = count;
        self
    }

    pub fn with_max_dictionary_size(mut self, size: usize) -> Self {
        self.max_dictionary_size = size;
        self
    }
}

// ============================================================================
// Result
// ============================================================================

/// 압축 결과
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionResult {
    pub compressed_text: String,
    /// token -> pattern
    pub dictionary: BTreeMap<String, String>,
    /// 압축 전 문자 수
    pub original_size: usize,
    /// 압축 후 문자 수
    pub compressed_size: usize,
    /// compressed_size / original_size
    pub ratio: f64,
}

impl CompressionResult {
    fn unchanged(text: &str) -> Self {
        let size = text.chars().count();
        Self {
            compressed_text: text.to_string(),
            dictionary: BTreeMap::new(),
            original_size: size,
            compressed_size: size,
            ratio: 1.0,
        }
    }

    pub fn is_compressed(&self) -> bool {
        !self.dictionary.is_empty()
    }

    /// 절약 비율 (%)
    pub fn savings_percent(&self) -> f64 {
        (1.0 - self.ratio) * 100.0
    }
}

// ============================================================================
// Compressor
// ============================================================================

fn path_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:[/\w.-]+/){2,}[\w.-]+").expect("valid regex"))
}

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("valid regex"))
}

fn identifier_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w+(?:[._:]\w+){2,}\b").expect("valid regex"))
}

/// 사전 치환 압축기
#[derive(Debug, Clone, Default)]
pub struct DictionaryCompressor {
    config: CompressionConfig,
}

impl DictionaryCompressor {
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// 텍스트 압축
    pub fn compress(&self, text: &str) -> CompressionResult {
        let cfg = &self.config;
        let char_len = text.chars().count();

        if text.is_empty() || char_len < cfg.min_pattern_length * cfg.min_occurrences {
            return CompressionResult::unchanged(text);
        }
        if text.contains(cfg.marker) {
            debug!("Input already contains marker '{}', skipping compression", cfg.marker);
            return CompressionResult::unchanged(text);
        }

        let candidates = self.find_frequent_patterns(text);
        let selected = self.select_best_patterns(&candidates, text);
        if selected.is_empty() {
            return CompressionResult::unchanged(text);
        }

        let width = id_width(selected.len());
        let mut dictionary = BTreeMap::new();
        let mut compressed = text.to_string();
        for (idx, pattern) in selected.iter().enumerate() {
            let token = format!("{}{:0width$}", cfg.marker, idx, width = width);
            compressed = compressed.replace(pattern.as_str(), &token);
            dictionary.insert(token, pattern.clone());
        }

        let compressed_size = compressed.chars().count();
        CompressionResult {
            compressed_text: compressed,
            dictionary,
            original_size: char_len,
            compressed_size,
            ratio: compressed_size as f64 / char_len as f64,
        }
    }

    /// 후보 패턴 수집 (등장 횟수/길이 필터 후, 처음 등장한 순서)
    fn find_frequent_patterns(&self, text: &str) -> Vec<String> {
        let cfg = &self.config;
        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut push = |candidate: String| {
            if candidate.chars().count() < cfg.min_pattern_length {
                return;
            }
            match counts.get_mut(&candidate) {
                Some(count) => *count += 1,
                None => {
                    counts.insert(candidate.clone(), 1);
                    order.push(candidate);
                }
            }
        };

        // 1. 단어 n-gram (긴 것부터)
        let words: Vec<&str> = text.split_whitespace().collect();
        for window in (3..=10).rev() {
            if words.len() < window {
                continue;
            }
            for chunk in words.windows(window) {
                push(chunk.join(" "));
            }
        }

        // 2. 경로, 3. URL, 4. 다중 구분자 식별자
        for re in [path_pattern(), url_pattern(), identifier_pattern()] {
            for m in re.find_iter(text) {
                push(m.as_str().to_string());
            }
        }

        order
            .into_iter()
            .filter(|p| counts.get(p).copied().unwrap_or(0) >= cfg.min_occurrences)
            .collect()
    }

    /// 절약량 순으로 겹치지 않는 패턴 선택 (긴 것부터 정렬하여 반환)
    fn select_best_patterns(&self, patterns: &[String], text: &str) -> Vec<String> {
        if patterns.is_empty() {
            return Vec::new();
        }

        let token_length: i64 = if patterns.len() > 10 { 3 } else { 2 };
        let mut scored: Vec<(&String, i64)> = patterns
            .iter()
            .filter_map(|pattern| {
                let count = text.matches(pattern.as_str()).count() as i64;
                let savings = (pattern.chars().count() as i64 - token_length) * count;
                (savings > 0).then_some((pattern, savings))
            })
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let mut selected: Vec<String> = Vec::new();
        for (pattern, _) in scored {
            if selected.len() >= self.config.max_dictionary_size {
                break;
            }
            let overlapping = selected
                .iter()
                .any(|s| s.contains(pattern.as_str()) || pattern.contains(s.as_str()));
            if !overlapping {
                selected.push(pattern.clone());
            }
        }

        selected.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
        selected
    }

    /// 압축 해제 (id 내림차순 치환)
    pub fn decompress(&self, text: &str, dictionary: &BTreeMap<String, String>) -> String {
        decompress(text, dictionary)
    }
}

fn id_width(count: usize) -> usize {
    count.saturating_sub(1).to_string().len()
}

fn token_id(token: &str) -> u64 {
    token
        .chars()
        .skip(1)
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

/// 압축 해제 (id 내림차순 치환)
pub fn decompress(text: &str, dictionary: &BTreeMap<String, String>) -> String {
    if dictionary.is_empty() {
        return text.to_string();
    }

    let mut tokens: Vec<(&String, &String)> = dictionary.iter().collect();
    tokens.sort_by(|a, b| token_id(b.0).cmp(&token_id(a.0)));

    let mut output = text.to_string();
    for (token, pattern) in tokens {
        output = output.replace(token.as_str(), pattern);
    }
    output
}

/// 압축할 만큼 큰지 확인 (문자 수 + 추정 토큰 수)
pub fn should_compress(text: &str, min_chars: usize, min_tokens: usize) -> bool {
    let chars = text.chars().count();
    if chars < min_chars {
        return false;
    }
    chars / CHARS_PER_TOKEN >= min_tokens
}
