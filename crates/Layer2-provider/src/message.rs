//! Message types for model communication

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Internal bookkeeping attached to a message; never sent upstream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Action whose result produced this message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_action: Option<String>,

    /// Token -> pattern dictionary when the content is compressed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_dictionary: Option<BTreeMap<String, String>>,
}

/// A message in the transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: Uuid,

    /// Role of this message
    pub role: MessageRole,

    /// Text content
    pub content: String,

    /// Internal provenance (stripped before sending)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl Message {
    fn with_role(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            provenance: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content)
    }

    /// Create a user message carrying the result of an action
    pub fn action_result(source_action: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::user(content);
        msg.provenance = Some(Provenance {
            source_action: Some(source_action.into()),
            compression_dictionary: None,
        });
        msg
    }

    /// Action that produced this message, if any
    pub fn source_action(&self) -> Option<&str> {
        self.provenance
            .as_ref()
            .and_then(|p| p.source_action.as_deref())
    }

    /// Compression dictionary, if the content is compressed
    pub fn compression_dictionary(&self) -> Option<&BTreeMap<String, String>> {
        self.provenance
            .as_ref()
            .and_then(|p| p.compression_dictionary.as_ref())
    }

    pub fn is_compressed(&self) -> bool {
        self.compression_dictionary().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&MessageRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn test_action_result_provenance() {
        let msg = Message::action_result("run_command", "ok");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.source_action(), Some("run_command"));
        assert!(!msg.is_compressed());
        assert!(Message::user("hi").source_action().is_none());
    }
}
