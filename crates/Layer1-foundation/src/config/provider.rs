//! Provider Settings - 모델 백엔드 연결 설정

use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI 호환 백엔드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// API base URL (`/chat/completions`가 뒤에 붙음)
    pub base_url: String,
    /// 모델 이름
    pub model: String,
    /// API 키 (파일에 저장하지 않음)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: 300,
        }
    }
}

impl ProviderSettings {
    /// 환경 변수에서 API 키/URL/모델 적용
    pub fn apply_env(&mut self) {
        if let Some(key) = ["LOOM_API_KEY", "OPENAI_API_KEY"]
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
        {
            self.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("LOOM_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(model) = std::env::var("LOOM_MODEL") {
            self.model = model;
        }
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}
