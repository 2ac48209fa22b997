//! OpenAI-compatible chat completion backend

use crate::{
    error::ProviderError,
    r#trait::{Provider, ProviderMetadata, ProviderResponse, TokenUsage},
    Message,
};
use async_trait::async_trait;
use loom_foundation::ProviderSettings;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const PROBE_TIMEOUT_SECS: u64 = 5;

/// OpenAI-compatible provider (OpenAI, vLLM, LM Studio, Ollama `/v1` ...)
pub struct OpenAiCompatProvider {
    client: Client,
    probe_client: Client,
    api_key: Option<String>,
    base_url: String,
    metadata: ProviderMetadata,
}

impl OpenAiCompatProvider {
    /// Create a new provider
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        Self {
            client: build_client(Duration::from_secs(300)),
            probe_client: build_client(Duration::from_secs(PROBE_TIMEOUT_SECS)),
            api_key: None,
            metadata: ProviderMetadata {
                id: "openai-compat".to_string(),
                display_name: "OpenAI Compatible".to_string(),
                model,
                base_url: Some(base_url.clone()),
            },
            base_url,
        }
    }

    /// Create from settings
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        let mut provider = Self::new(&settings.base_url, &settings.model)
            .with_timeout(Duration::from_secs(settings.timeout_secs));
        provider.api_key = settings.api_key.clone();
        provider
    }

    /// Set API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!("Failed to build HTTP client with timeout, using defaults: {}", e);
            Client::new()
        })
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    async fn complete(&self, messages: &[Message]) -> Result<ProviderResponse, ProviderError> {
        let request = ChatRequest {
            model: &self.metadata.model,
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
        };

        debug!(
            "POST {} ({} messages)",
            self.endpoint("chat/completions"),
            messages.len()
        );

        let response = self
            .authorize(self.client.post(self.endpoint("chat/completions")))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(&e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_http_status(status.as_u16(), &body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let content = extract_content(&body).ok_or_else(|| {
            ProviderError::InvalidResponse("No content in response".to_string())
        })?;

        Ok(ProviderResponse {
            content,
            usage: extract_usage(&body),
            model: body
                .get("model")
                .and_then(Value::as_str)
                .unwrap_or(&self.metadata.model)
                .to_string(),
        })
    }

    async fn is_available(&self) -> bool {
        match self
            .authorize(self.probe_client.get(self.endpoint("models")))
            .send()
            .await
        {
            Ok(response) => {
                debug!("Reachability probe: HTTP {}", response.status());
                true
            }
            Err(e) => {
                debug!("Reachability probe failed: {}", e);
                false
            }
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Extract reply text from the tolerated response shapes:
/// `choices[0].message.content`, `choices[0].text`, `message.content`
pub fn extract_content(body: &Value) -> Option<String> {
    let first_choice = body.get("choices").and_then(|c| c.get(0));

    let candidates = [
        first_choice
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content")),
        first_choice.and_then(|c| c.get("text")),
        body.get("message").and_then(|m| m.get("content")),
    ];

    candidates.into_iter().flatten().find_map(content_text)
}

fn content_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        // content parts: [{"type": "text", "text": "..."}]
        Value::Array(parts) => {
            let text: String = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect();
            Some(text)
        }
        _ => None,
    }
}

fn extract_usage(body: &Value) -> Option<TokenUsage> {
    let usage = body.get("usage")?;
    Some(TokenUsage {
        input_tokens: usage.get("prompt_tokens")?.as_u64()? as u32,
        output_tokens: usage
            .get("completion_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_chat_shape() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "hello"}}]});
        assert_eq!(extract_content(&body).as_deref(), Some("hello"));
    }

    #[test]
    fn test_extract_completion_shape() {
        let body = json!({"choices": [{"text": "legacy"}]});
        assert_eq!(extract_content(&body).as_deref(), Some("legacy"));
    }

    #[test]
    fn test_extract_flat_message_shape() {
        let body = json!({"message": {"role": "assistant", "content": "flat"}});
        assert_eq!(extract_content(&body).as_deref(), Some("flat"));
    }

    #[test]
    fn test_extract_content_parts() {
        let body = json!({"choices": [{"message": {"content": [
            {"type": "text", "text": "a"},
            {"type": "text", "text": "b"}
        ]}}]});
        assert_eq!(extract_content(&body).as_deref(), Some("ab"));
    }

    #[test]
    fn test_extract_missing_content() {
        assert!(extract_content(&json!({"choices": []})).is_none());
        assert!(extract_content(&json!({"error": "x"})).is_none());
    }

    #[test]
    fn test_extract_usage() {
        let body = json!({"usage": {"prompt_tokens": 12, "completion_tokens": 3}});
        assert_eq!(
            extract_usage(&body),
            Some(TokenUsage {
                input_tokens: 12,
                output_tokens: 3
            })
        );
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let provider = OpenAiCompatProvider::new("http://localhost:11434/v1/", "llama3");
        assert_eq!(
            provider.endpoint("chat/completions"),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(provider.metadata().model, "llama3");
    }
}
