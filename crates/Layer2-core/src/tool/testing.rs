//! 테스트용 Interaction 구현

use async_trait::async_trait;
use loom_foundation::{Interaction, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// 항상 기본값(없으면 빈 문자열)으로 응답
pub struct SilentInteraction;

#[async_trait]
impl Interaction for SilentInteraction {
    async fn prompt(&self, _message: &str, _choices: &[&str], default: Option<&str>) -> Result<String> {
        Ok(default.unwrap_or_default().to_string())
    }

    fn notify(&self, _message: &str) {}
}

/// 미리 정한 응답을 순서대로 반환
pub struct ScriptedInteraction {
    answers: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedInteraction {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
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
