//! Context Optimizer
//!
//! 대화 기록을 토큰 예산 안에 유지합니다.
//!
//! ## 삽입 시 (`add_message`)
//! - `run_command` 결과가 충분히 크면 사전 압축 (사전은 provenance로 보관)
//! - 추정 토큰이 `threshold × large_message_ratio`를 넘으면 요약으로 대체
//!   (요약 실패 시 앞부분만 남기고 자름)
//!
//! ## 주기적 (`optimize`)
//! - 최근 10개를 제외한 assistant 메시지 제거
//! - 총 토큰이 threshold를 넘으면 앞 4개 / 뒤 4개를 제외한 중간 구간을 요약 메시지 하나로 교체
//!
//! 시스템 메시지(index 0)는 제거되거나 요약되지 않습니다.
//! `messages`는 요약 호출이 끝난 뒤에만 변경되므로, 요약 중 취소돼도 부분 갱신이 남지 않습니다.

use crate::compression::{decompress, should_compress, CompressionConfig, DictionaryCompressor};
use crate::summarizer::Summarizer;
use loom_foundation::{estimate_tokens, strings::truncate_chars, AgentConfig};
use loom_provider::{Message, MessageRole, Provenance};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 압축 대상 액션
pub const LARGE_OUTPUT_SOURCE: &str = "run_command";

/// 유지할 최근 assistant 메시지 수
const KEEP_ASSISTANT_MESSAGES: usize = 10;

/// 중간 요약 시 앞/뒤로 유지할 메시지 수
const KEEP_HEAD: usize = 4;
const KEEP_TAIL: usize = 4;

/// 압축 적용 기준 (최소 5% 절약)
const MAX_USEFUL_RATIO: f64 = 0.95;

/// 요약 실패 시 남길 문자 수
const FALLBACK_CHARS: usize = 2000;

/// 최적화 설정
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub token_threshold: usize,
    pub large_message_ratio: f64,
    pub compression_enabled: bool,
    pub compression_min_chars: usize,
    pub compression_min_tokens: usize,
    pub compression: CompressionConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::from(&AgentConfig::default())
    }
}

impl From<&AgentConfig> for OptimizerConfig {
    fn from(config: &AgentConfig) -> Self {
        Self {
            token_threshold: config.context_token_threshold,
            large_message_ratio: config.large_message_ratio,
            compression_enabled: config.compression_enabled,
            compression_min_chars: config.compression_min_chars,
            compression_min_tokens: config.compression_min_tokens,
            compression: CompressionConfig {
                min_pattern_length: config.compression_min_pattern_length,
                min_occurrences: config.compression_min_occurrences,
                max_dictionary_size: config.compression_max_dictionary,
                marker: config.compression_marker,
            },
        }
    }
}

impl OptimizerConfig {
    /// 큰 메시지 기준 토큰 수
    pub fn large_message_limit(&self) -> usize {
        (self.token_threshold as f64 * self.large_message_ratio) as usize
    }
}

/// 최적화 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizerStats {
    pub compressed_messages: usize,
    pub summarized_messages: usize,
    pub pruned_assistant_messages: usize,
    pub middle_summaries: usize,
}

/// 컨텍스트 최적화기
pub struct ContextOptimizer {
    config: OptimizerConfig,
    compressor: DictionaryCompressor,
    summarizer: Arc<dyn Summarizer>,
    stats: OptimizerStats,
}

impl ContextOptimizer {
    pub fn new(config: OptimizerConfig, summarizer: Arc<dyn Summarizer>) -> Self {
        let compressor = DictionaryCompressor::new(config.compression.clone());
        Self {
            config,
            compressor,
            summarizer,
            stats: OptimizerStats::default(),
        }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn stats(&self) -> OptimizerStats {
        self.stats
    }

    // ========================================================================
    // 삽입
    // ========================================================================

    /// 메시지 추가 (압축 → 큰 메시지 요약 순서)
    pub async fn add_message(&mut self, messages: &mut Vec<Message>, mut message: Message) {
        let original = message.content.clone();

        if self.config.compression_enabled
            && message.source_action() == Some(LARGE_OUTPUT_SOURCE)
            && should_compress(
                &message.content,
                self.config.compression_min_chars,
                self.config.compression_min_tokens,
            )
        {
            let result = self.compressor.compress(&message.content);
            if result.is_compressed() && result.ratio < MAX_USEFUL_RATIO {
                info!(
                    "Compression saved {:.1}%: {} -> {} chars",
                    result.savings_percent(),
                    result.original_size,
                    result.compressed_size
                );
                message.content = result.compressed_text;
                message
                    .provenance
                    .get_or_insert_with(Provenance::default)
                    .compression_dictionary = Some(result.dictionary);
                self.stats.compressed_messages += 1;
            }
        }

        if estimate_tokens(&message.content) > self.config.large_message_limit() {
            let summary = self.summarize_or_truncate(&original).await;
            message.content = format!("[Summarized Result]\n{}", summary);
            if let Some(provenance) = message.provenance.as_mut() {
                provenance.compression_dictionary = None;
            }
            self.stats.summarized_messages += 1;
        }

        messages.push(message);
    }

    // ========================================================================
    // 주기적 최적화
    // ========================================================================

    /// 전체 최적화 패스
    pub async fn optimize(&mut self, messages: &mut Vec<Message>) {
        self.prune_assistant_messages(messages);
        self.summarize_middle(messages).await;
    }

    /// 최근 10개를 제외한 assistant 메시지 제거
    fn prune_assistant_messages(&mut self, messages: &mut Vec<Message>) {
        let assistant_count = messages
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .count();
        if assistant_count <= KEEP_ASSISTANT_MESSAGES {
            return;
        }

        let mut to_remove = assistant_count - KEEP_ASSISTANT_MESSAGES;
        self.stats.pruned_assistant_messages += to_remove;
        messages.retain(|m| {
            if to_remove > 0 && m.role == MessageRole::Assistant {
                to_remove -= 1;
                false
            } else {
                true
            }
        });
        debug!("Pruned old assistant messages, {} remain", messages.len());
    }

    /// 토큰 초과 시 중간 구간 요약
    async fn summarize_middle(&mut self, messages: &mut Vec<Message>) {
        let total = total_tokens(messages);
        if total <= self.config.token_threshold {
            return;
        }

        let keep_head = KEEP_HEAD.min(messages.len());
        let keep_tail = KEEP_TAIL.min(messages.len() - keep_head);
        if keep_tail == 0 {
            return;
        }
        let end = messages.len() - keep_tail;
        if end <= keep_head {
            return;
        }

        let combined = messages[keep_head..end]
            .iter()
            .map(|m| format!("[{}]: {}", m.role.as_str(), plain_content(m)))
            .collect::<Vec<_>>()
            .join("\n\n");

        info!(
            "Context over budget ({} > {} tokens), summarizing {} middle messages",
            total,
            self.config.token_threshold,
            end - keep_head
        );
        let summary = self.summarize_or_truncate(&combined).await;
        messages.splice(
            keep_head..end,
            [Message::user(format!("[Context Summary]\n{}", summary))],
        );
        self.stats.middle_summaries += 1;
    }

    async fn summarize_or_truncate(&self, text: &str) -> String {
        match self.summarizer.summarize(text).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Summarization failed, truncating instead: {}", e);
                format!("{}\n... (truncated)", truncate_chars(text, FALLBACK_CHARS))
            }
        }
    }
}

/// 압축 해제된 원문
fn plain_content(message: &Message) -> String {
    match message.compression_dictionary() {
        Some(dictionary) => decompress(&message.content, dictionary),
        None => message.content.clone(),
    }
}

/// 추정 토큰 합계
pub fn total_tokens(messages: &[Message]) -> usize {
    messages.iter().map(|m| estimate_tokens(&m.content)).sum()
}

/// 전송용 사본: 압축 해제 + provenance 제거
pub fn strip_metadata(messages: &[Message]) -> Vec<Message> {
    messages
        .iter()
        .map(|m| Message {
            id: m.id,
            role: m.role,
            content: plain_content(m),
            provenance: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use loom_foundation::{Error, Result};

    struct FixedSummarizer(&'static str);

    #[async_trait]
    impl Summarizer for FixedSummarizer {
        async fn summarize(&self, _text: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingSummarizer;

    #[async_trait]
    impl Summarizer for FailingSummarizer {
        async fn summarize(&self, _text: &str) -> Result<String> {
            Err(Error::Provider("offline".into()))
        }
    }

    struct StalledSummarizer;

    #[async_trait]
    impl Summarizer for StalledSummarizer {
        async fn summarize(&self, _text: &str) -> Result<String> {
            std::future::pending().await
        }
    }

    fn config(threshold: usize) -> OptimizerConfig {
        OptimizerConfig {
            token_threshold: threshold,
            ..OptimizerConfig::default()
        }
    }

    fn repetitive_output() -> String {
        let mut out = String::new();
        for i in 0..400 {
            out.push_str(&format!(
                "compiling /workspace/project/crates/engine/src/module_{}.rs ok\n",
                i % 4
            ));
        }
        out
    }

    #[tokio::test]
    async fn test_compresses_run_command_output() {
        let mut optimizer = ContextOptimizer::new(config(29_000), Arc::new(FixedSummarizer("s")));
        let mut messages = vec![Message::system("sys")];
        let output = repetitive_output();

        optimizer
            .add_message(&mut messages, Message::action_result("run_command", output.clone()))
            .await;

        let stored = &messages[1];
        assert!(stored.is_compressed());
        assert!(stored.content.len() < output.len());

        let outbound = strip_metadata(&messages);
        assert_eq!(outbound[1].content, output);
        assert!(outbound.iter().all(|m| m.provenance.is_none()));
    }

    #[tokio::test]
    async fn test_other_sources_not_compressed() {
        let mut optimizer = ContextOptimizer::new(config(29_000), Arc::new(FixedSummarizer("s")));
        let mut messages = vec![Message::system("sys")];
        optimizer
            .add_message(&mut messages, Message::action_result("read_file", repetitive_output()))
            .await;
        assert!(!messages[1].is_compressed());
    }

    #[tokio::test]
    async fn test_large_message_summarized_with_fallback() {
        let mut optimizer = ContextOptimizer::new(config(100), Arc::new(FailingSummarizer));
        let mut messages = vec![Message::system("sys")];
        let big = "word ".repeat(1000);

        optimizer
            .add_message(&mut messages, Message::action_result("read_file", big))
            .await;

        let content = &messages[1].content;
        assert!(content.starts_with("[Summarized Result]\n"));
        assert!(content.ends_with("\n... (truncated)"));
    }

    #[tokio::test]
    async fn test_interrupted_summary_leaves_transcript_untouched() {
        let mut optimizer = ContextOptimizer::new(config(100), Arc::new(StalledSummarizer));
        let mut messages = vec![Message::system("sys")];

        let pending = optimizer.add_message(&mut messages, Message::assistant("word ".repeat(400)));
        let timed_out = tokio::time::timeout(std::time::Duration::from_millis(20), pending).await;

        assert!(timed_out.is_err());
        assert_eq!(messages.len(), 1);
        assert_eq!(optimizer.stats().summarized_messages, 0);
    }

    #[tokio::test]
    async fn test_prunes_old_assistant_messages() {
        let mut optimizer = ContextOptimizer::new(config(1_000_000), Arc::new(FixedSummarizer("s")));
        let mut messages = vec![Message::system("sys")];
        for i in 0..15 {
            messages.push(Message::assistant(format!("a{}", i)));
            messages.push(Message::user(format!("u{}", i)));
        }

        optimizer.optimize(&mut messages).await;

        let assistants: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(assistants.len(), 10);
        assert_eq!(assistants[0], "a5");
        assert_eq!(messages[0].role, MessageRole::System);
    }

    #[tokio::test]
    async fn test_middle_summary_keeps_head_and_tail() {
        let mut optimizer = ContextOptimizer::new(config(50), Arc::new(FixedSummarizer("short")));
        let mut messages = vec![Message::system("sys")];
        for i in 0..12 {
            messages.push(Message::user(format!("message {} {}", i, "pad ".repeat(10))));
        }
        let tail: Vec<String> = messages[9..].iter().map(|m| m.content.clone()).collect();

        optimizer.optimize(&mut messages).await;

        assert_eq!(messages.len(), 9);
        assert_eq!(messages[0].content, "sys");
        assert_eq!(messages[4].content, "[Context Summary]\nshort");
        let kept: Vec<String> = messages[5..].iter().map(|m| m.content.clone()).collect();
        assert_eq!(kept, tail);
    }

    #[tokio::test]
    async fn test_middle_summary_needs_real_middle() {
        let mut optimizer = ContextOptimizer::new(config(1), Arc::new(FixedSummarizer("short")));
        let mut messages: Vec<Message> = (0..8).map(|i| Message::user(format!("m{}", i))).collect();
        optimizer.optimize(&mut messages).await;
        assert_eq!(messages.len(), 8);
        assert_eq!(optimizer.stats().middle_summaries, 0);
    }
}
