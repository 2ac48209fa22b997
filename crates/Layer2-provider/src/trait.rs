//! Provider trait and common types

use crate::error::ProviderError;
use crate::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Token usage reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Provider metadata
#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    /// Provider ID (e.g., "openai-compat")
    pub id: String,

    /// Display name
    pub display_name: String,

    /// Model ID in use
    pub model: String,

    /// Base URL
    pub base_url: Option<String>,
}

/// Complete response from provider
#[derive(Debug, Clone, Default)]
pub struct ProviderResponse {
    /// Text content
    pub content: String,

    /// Token usage, when reported
    pub usage: Option<TokenUsage>,

    /// Model used (may differ from requested if fallback occurred)
    pub model: String,
}

impl ProviderResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Model backend trait
///
/// Implement this trait to add support for a new backend.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get provider metadata
    fn metadata(&self) -> &ProviderMetadata;

    /// Send the transcript and get a complete response
    ///
    /// Messages must already be stripped of internal provenance.
    async fn complete(&self, messages: &[Message]) -> Result<ProviderResponse, ProviderError>;

    /// Reachability probe
    async fn is_available(&self) -> bool;
}
