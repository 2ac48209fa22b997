//! Ask User Tool - 사용자에게 질문

use async_trait::async_trait;
use loom_foundation::{
    ActionKind, AskUserParams, Result, SecurityLevel, Tool, ToolCategory, ToolContext, ToolMeta,
};
use serde_json::{json, Value};

use super::mismatched;

/// Ask User 도구
pub struct AskUserTool;

impl AskUserTool {
    pub const NAME: &'static str = "ask_user";

    pub fn new() -> Self {
        Self
    }
}

impl Default for AskUserTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for AskUserTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn meta(&self) -> ToolMeta {
        ToolMeta::new(Self::NAME)
            .label("Ask User")
            .description(
                "Ask the user a question when the request is ambiguous or a decision \
                 needs their input. Returns their answer.",
            )
            .category(ToolCategory::Exploration)
            .security_level(SecurityLevel::Safe)
            .primary_param("question")
    }

    fn example(&self) -> Value {
        json!({
            "action": Self::NAME,
            "question": "Which database should the migration target?"
        })
    }

    async fn execute(&self, action: &ActionKind, context: &dyn ToolContext) -> Result<String> {
        let ActionKind::AskUser(AskUserParams { question }) = action else {
            return Err(mismatched(Self::NAME, action));
        };

        let answer = context.interaction().prompt(question, &[], None).await?;
        let answer = answer.trim();
        if answer.is_empty() {
            Ok("User answer: (no answer)".to_string())
        } else {
            Ok(format!("User answer: {}", answer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::context::ExecutionContext;
    use crate::tool::testing::ScriptedInteraction;
    use loom_foundation::AgentConfig;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_returns_answer() {
        let interaction = Arc::new(ScriptedInteraction::new(["postgres"]));
        let ctx = ExecutionContext::new(Arc::new(AgentConfig::default()), interaction.clone());

        let action = ActionKind::AskUser(AskUserParams {
            question: "Which db?".into(),
        });
        let out = AskUserTool::new().execute(&action, &ctx).await.unwrap();
        assert_eq!(out, "User answer: postgres");
        assert_eq!(interaction.prompts(), vec!["Which db?".to_string()]);
    }
}
