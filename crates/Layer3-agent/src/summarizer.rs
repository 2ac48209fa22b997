//! Summarizer - 모델 호출 기반 텍스트 요약
//!
//! ContextOptimizer가 큰 메시지와 대화 중간 구간을 줄일 때 사용합니다.

use async_trait::async_trait;
use loom_foundation::Result;
use loom_provider::{with_retry, Message, Provider, RetryConfig};
use std::sync::Arc;
use tracing::debug;

/// 요약 요청 프롬프트
pub const SUMMARIZATION_PROMPT: &str = "Summarize the following agent conversation context concisely, \
preserving all key decisions, file paths, action results, and current task state:\n\n";

/// 텍스트 요약 인터페이스
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String>;
}

/// Provider로 요약
pub struct ProviderSummarizer {
    provider: Arc<dyn Provider>,
}

impl ProviderSummarizer {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Summarizer for ProviderSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        debug!("Summarizing {} chars", text.len());
        complete_prompt(self.provider.as_ref(), &format!("{}{}", SUMMARIZATION_PROMPT, text)).await
    }
}

/// 단일 사용자 메시지 호출 (일시적 오류는 backoff 재시도)
pub(crate) async fn complete_prompt(provider: &dyn Provider, prompt: &str) -> Result<String> {
    let request = [Message::user(prompt)];
    let response = with_retry(&RetryConfig::default(), "complete_prompt", || {
        provider.complete(&request)
    })
    .await?;
    Ok(response.content)
}
