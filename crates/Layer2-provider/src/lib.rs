//! # loom-provider
//!
//! Model backend abstraction layer for Loom.
//!
//! ## Features
//! - Transcript message types with internal provenance
//! - Retry classification with exponential backoff
//! - OpenAI-compatible chat completion backend with tolerant response parsing

pub mod error;
pub mod message;
pub mod providers;
pub mod retry;
pub mod r#trait;

// Core traits and types
pub use message::{Message, MessageRole, Provenance};
pub use r#trait::{Provider, ProviderMetadata, ProviderResponse, TokenUsage};

// Error and retry
pub use error::ProviderError;
pub use retry::{with_retry, RetryClassification, RetryConfig, RetryableError};

// Provider implementations
pub use providers::openai::OpenAiCompatProvider;
