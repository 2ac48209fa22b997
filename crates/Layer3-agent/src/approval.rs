//! Session Approval - 승인 필요 도구의 확인 상태
//!
//! 세션 전체 승인(`a`)은 여러 요청에 걸쳐 유지되고,
//! 요청 단위 승인은 한 번 승인된 뒤 같은 요청 안에서만 유지됩니다.
//! unsafe 도구는 이 상태와 무관하게 매번 확인합니다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 세션 범위 승인 상태 (복제 시 공유)
#[derive(Debug, Clone, Default)]
pub struct SessionApproval {
    session: Arc<AtomicBool>,
}

impl SessionApproval {
    pub fn new() -> Self {
        Self::default()
    }

    /// 남은 세션 동안 자동 승인
    pub fn approve_session(&self) {
        self.session.store(true, Ordering::SeqCst);
    }

    pub fn is_session_approved(&self) -> bool {
        self.session.load(Ordering::SeqCst)
    }

    /// 요청 단위 승인 상태 시작
    pub fn begin_request(&self) -> RequestApproval {
        RequestApproval {
            session: self.clone(),
            approved_once: false,
        }
    }
}

/// 요청 범위 승인 상태
#[derive(Debug)]
pub struct RequestApproval {
    session: SessionApproval,
    approved_once: bool,
}

impl RequestApproval {
    /// 확인 없이 실행 가능한지
    pub fn is_approved(&self) -> bool {
        self.approved_once || self.session.is_session_approved()
    }

    pub fn approve_once(&mut self) {
        self.approved_once = true;
    }

    pub fn approve_session(&mut self) {
        self.approved_once = true;
        self.session.approve_session();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_approval_is_scoped() {
        let session = SessionApproval::new();
        let mut first = session.begin_request();
        assert!(!first.is_approved());
        first.approve_once();
        assert!(first.is_approved());

        let second = session.begin_request();
        assert!(!second.is_approved());
    }

    #[test]
    fn test_session_approval_carries_over() {
        let session = SessionApproval::new();
        session.begin_request().approve_session();
        assert!(session.is_session_approved());
        assert!(session.begin_request().is_approved());
    }
}
