//! Tool Context - 도구 실행 컨텍스트
//!
//! Layer1 ToolContext trait 구현
//! - 세션 설정 (AgentConfig)
//! - 사용자 상호작용 (Interaction)
//! - 멀티 태스크 실행 시 TaskChannel

use loom_foundation::{AgentConfig, Interaction, TaskChannel, ToolContext};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 기본 실행 컨텍스트
#[derive(Clone)]
pub struct ExecutionContext {
    working_dir: PathBuf,
    config: Arc<AgentConfig>,
    interaction: Arc<dyn Interaction>,
    task_channel: Option<TaskChannel>,
}

impl ExecutionContext {
    /// 설정의 workspace_root를 작업 디렉토리로 사용
    pub fn new(config: Arc<AgentConfig>, interaction: Arc<dyn Interaction>) -> Self {
        Self {
            working_dir: config.workspace_root.clone(),
            config,
            interaction,
            task_channel: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_task_channel(mut self, channel: TaskChannel) -> Self {
        self.task_channel = Some(channel);
        self
    }

    pub fn shared_config(&self) -> Arc<AgentConfig> {
        Arc::clone(&self.config)
    }
}

impl ToolContext for ExecutionContext {
    fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn interaction(&self) -> &dyn Interaction {
        self.interaction.as_ref()
    }

    fn task_channel(&self) -> Option<&TaskChannel> {
        self.task_channel.as_ref()
    }
}
