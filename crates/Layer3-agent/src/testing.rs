//! 테스트용 Provider / Interaction

use async_trait::async_trait;
use loom_foundation::{Interaction, Result};
use loom_provider::{Message, Provider, ProviderError, ProviderMetadata, ProviderResponse};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// 미리 정한 응답을 순서대로 반환
pub(crate) struct ScriptedProvider {
    metadata: ProviderMetadata,
    replies: Mutex<VecDeque<std::result::Result<String, ProviderError>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub(crate) fn new<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self::with_results(replies.into_iter().map(|r| Ok(r.into())))
    }

    pub(crate) fn with_results(
        replies: impl IntoIterator<Item = std::result::Result<String, ProviderError>>,
    ) -> Self {
        Self {
            metadata: ProviderMetadata {
                id: "scripted".into(),
                display_name: "Scripted".into(),
                model: "scripted".into(),
                base_url: None,
            },
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    async fn complete(
        &self,
        messages: &[Message],
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        self.requests.lock().push(messages.to_vec());
        match self.replies.lock().pop_front() {
            Some(Ok(text)) => Ok(ProviderResponse::text(text)),
            Some(Err(e)) => Err(e),
            None => Err(ProviderError::InvalidResponse("script exhausted".into())),
        }
    }

    async fn is_available(&self) -> bool {
        true
    }
}

/// 미리 정한 답을 순서대로 반환 (없으면 기본값)
pub(crate) struct ScriptedInteraction {
    answers: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedInteraction {
    pub(crate) fn new<S: Into<String>>(answers: impl IntoIterator<Item = S>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl Interaction for ScriptedInteraction {
    async fn prompt(&self, message: &str, _choices: &[&str], default: Option<&str>) -> Result<String> {
        self.prompts.lock().push(message.to_string());
        Ok(self
            .answers
            .lock()
            .pop_front()
            .unwrap_or_else(|| default.unwrap_or_default().to_string()))
    }

    fn notify(&self, _message: &str) {}
}
