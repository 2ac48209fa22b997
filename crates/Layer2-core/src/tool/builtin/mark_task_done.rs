//! Mark Task Done Tool - 이후 태스크를 미리 완료로 기록
//!
//! 현재 태스크 수행 중 다른 태스크까지 해결했을 때 사용합니다.
//! 오케스트레이터가 해당 태스크 차례에 실행을 건너뜁니다.

use async_trait::async_trait;
use loom_foundation::{
    ActionKind, Error, MarkTaskDoneParams, Result, SecurityLevel, Tool, ToolCategory, ToolContext,
    ToolMeta,
};
use serde_json::{json, Value};
use tracing::info;

use super::mismatched;

/// Mark Task Done 도구
pub struct MarkTaskDoneTool;

impl MarkTaskDoneTool {
    pub const NAME: &'static str = "mark_task_done";

    pub fn new() -> Self {
        Self
    }
}

impl Default for MarkTaskDoneTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for MarkTaskDoneTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn meta(&self) -> ToolMeta {
        ToolMeta::new(Self::NAME)
            .label("Mark Task Done")
            .description(
                "Record that a later task in the current plan is already resolved by work \
                 done so far. Only valid during multi-task runs, and never for the current task.",
            )
            .category(ToolCategory::TaskManagement)
            .security_level(SecurityLevel::Safe)
            .primary_param("task_id")
    }

    fn example(&self) -> Value {
        json!({
            "action": Self::NAME,
            "task_id": "task_3",
            "resolution": "Dependencies were installed while setting up task_2",
            "notes": "requirements.txt already pinned"
        })
    }

    async fn execute(&self, action: &ActionKind, context: &dyn ToolContext) -> Result<String> {
        let ActionKind::MarkTaskDone(MarkTaskDoneParams {
            task_id,
            resolution,
            notes,
        }) = action
        else {
            return Err(mismatched(Self::NAME, action));
        };

        let Some(channel) = context.task_channel() else {
            return Err(Error::Task(
                "mark_task_done is only available while executing a multi-task plan".into(),
            ));
        };

        let description =
            channel.mark_done(task_id, resolution.clone(), notes.clone().unwrap_or_default())?;
        info!("Task {} marked done ahead of schedule", task_id);

        Ok(format!(
            "Marked {} ({}) as done. It will be skipped when its turn comes.",
            task_id, description
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::context::ExecutionContext;
    use crate::tool::testing::SilentInteraction;
    use loom_foundation::{AgentConfig, TaskChannel};
    use std::sync::Arc;

    fn mark(id: &str) -> ActionKind {
        ActionKind::MarkTaskDone(MarkTaskDoneParams {
            task_id: id.into(),
            resolution: "done early".into(),
            notes: None,
        })
    }

    #[tokio::test]
    async fn test_requires_channel() {
        let ctx = ExecutionContext::new(Arc::new(AgentConfig::default()), Arc::new(SilentInteraction));
        let result = MarkTaskDoneTool::new().execute(&mark("task_2"), &ctx).await;
        assert!(matches!(result, Err(Error::Task(_))));
    }

    #[tokio::test]
    async fn test_records_early_completion() {
        let channel = TaskChannel::new(vec![
            ("task_1".into(), "setup".into()),
            ("task_2".into(), "install".into()),
        ]);
        channel.set_current("task_1");
        let ctx = ExecutionContext::new(Arc::new(AgentConfig::default()), Arc::new(SilentInteraction))
            .with_task_channel(channel.clone());

        let out = MarkTaskDoneTool::new().execute(&mark("task_2"), &ctx).await.unwrap();
        assert!(out.contains("task_2 (install)"));
        assert_eq!(channel.take("task_2").unwrap().resolution, "done early");

        let current = MarkTaskDoneTool::new().execute(&mark("task_1"), &ctx).await;
        assert!(current.is_err());
    }
}
