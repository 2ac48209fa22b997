//! Task Channel - 예정보다 앞서 완료된 태스크 기록
//!
//! 현재 태스크를 수행하던 중 이후 태스크까지 해결된 경우,
//! `mark_task_done` 도구가 이 채널에 결과를 남깁니다.
//! 오케스트레이터는 해당 태스크 차례에 채널을 확인하여 실행을 건너뜁니다.

use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// 미리 기록된 태스크 결과
#[derive(Debug, Clone, PartialEq)]
pub struct EarlyCompletion {
    pub resolution: String,
    pub notes: String,
}

#[derive(Debug, Default)]
struct ChannelState {
    /// (id, description) 순서대로
    tasks: Vec<(String, String)>,
    current: Option<String>,
    completed: HashSet<String>,
    early: BTreeMap<String, EarlyCompletion>,
}

/// 태스크 사이드 채널 (복제 시 상태 공유)
#[derive(Debug, Clone, Default)]
pub struct TaskChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl TaskChannel {
    pub fn new(tasks: Vec<(String, String)>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChannelState {
                tasks,
                ..Default::default()
            })),
        }
    }

    /// 현재 실행 중인 태스크 설정
    pub fn set_current(&self, task_id: impl Into<String>) {
        self.state.lock().current = Some(task_id.into());
    }

    /// 완료 처리 (이후 mark_done 거부)
    pub fn mark_completed(&self, task_id: &str) {
        let mut state = self.state.lock();
        state.completed.insert(task_id.to_string());
        if state.current.as_deref() == Some(task_id) {
            state.current = None;
        }
    }

    /// 이후 태스크를 미리 완료로 기록
    pub fn mark_done(
        &self,
        task_id: &str,
        resolution: impl Into<String>,
        notes: impl Into<String>,
    ) -> Result<String> {
        let mut state = self.state.lock();
        let Some((_, description)) = state.tasks.iter().find(|(id, _)| id == task_id).cloned()
        else {
            let known: Vec<&str> = state.tasks.iter().map(|(id, _)| id.as_str()).collect();
            return Err(Error::Task(format!(
                "Unknown task id '{}'. Known task ids: {}",
                task_id,
                known.join(", ")
            )));
        };
        if state.current.as_deref() == Some(task_id) {
            return Err(Error::Task(format!(
                "'{}' is the current task; use the done action to finish it",
                task_id
            )));
        }
        if state.completed.contains(task_id) {
            return Err(Error::Task(format!("'{}' is already completed", task_id)));
        }

        state.early.insert(
            task_id.to_string(),
            EarlyCompletion {
                resolution: resolution.into(),
                notes: notes.into(),
            },
        );
        Ok(description)
    }

    /// 미리 기록된 결과를 꺼냄 (한 번만)
    pub fn take(&self, task_id: &str) -> Option<EarlyCompletion> {
        self.state.lock().early.remove(task_id)
    }

    /// 미리 기록된 태스크 id 목록
    pub fn pending_ids(&self) -> Vec<String> {
        self.state.lock().early.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> TaskChannel {
        TaskChannel::new(vec![
            ("task_1".into(), "Read config".into()),
            ("task_2".into(), "Update config".into()),
            ("task_3".into(), "Write tests".into()),
        ])
    }

    #[test]
    fn test_mark_future_task() {
        let ch = channel();
        ch.set_current("task_1");

        let desc = ch.mark_done("task_3", "tests already exist", "").unwrap();
        assert_eq!(desc, "Write tests");
        assert_eq!(ch.pending_ids(), vec!["task_3".to_string()]);

        let early = ch.take("task_3").unwrap();
        assert_eq!(early.resolution, "tests already exist");
        assert!(ch.take("task_3").is_none());
    }

    #[test]
    fn test_rejects_current_unknown_and_completed() {
        let ch = channel();
        ch.set_current("task_2");
        ch.mark_completed("task_1");

        assert!(ch.mark_done("task_2", "x", "").is_err());
        assert!(ch.mark_done("task_9", "x", "").is_err());
        assert!(ch.mark_done("task_1", "x", "").is_err());
    }

    #[test]
    fn test_clones_share_state() {
        let ch = channel();
        let other = ch.clone();
        other.mark_done("task_2", "done early", "n").unwrap();
        assert!(ch.take("task_2").is_some());
    }
}
