//! Cancellation - 실행 중단 신호
//!
//! 호출자는 `CancellationHandle`로 중단을 요청하고,
//! 에이전트 루프는 `CancellationChecker`로 대기 지점마다 신호를 확인합니다.
//!
//! ```ignore
//! let (handle, checker) = cancellation();
//! tokio::spawn(async move {
//!     tokio::signal::ctrl_c().await.ok();
//!     handle.cancel("User pressed Ctrl-C");
//! });
//! let reply = checker.run(provider.complete(&messages)).await?;
//! ```

use loom_foundation::{Error, Result};
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// 핸들/체커 쌍 생성
pub fn cancellation() -> (CancellationHandle, CancellationChecker) {
    let token = CancellationToken::new();
    let reason = Arc::new(RwLock::new(None));
    (
        CancellationHandle {
            token: token.clone(),
            reason: Arc::clone(&reason),
        },
        CancellationChecker { token, reason },
    )
}

// ============================================================================
// Handle (호출자 측)
// ============================================================================

/// 중단 요청 핸들
#[derive(Clone)]
pub struct CancellationHandle {
    token: CancellationToken,
    reason: Arc<RwLock<Option<String>>>,
}

impl CancellationHandle {
    /// 중단 요청 (첫 번째 이유만 유지)
    pub fn cancel(&self, reason: impl Into<String>) {
        if self.token.is_cancelled() {
            return;
        }
        let reason = reason.into();
        info!("Cancellation requested: {}", reason);
        *self.reason.write() = Some(reason);
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

// ============================================================================
// Checker (루프 측)
// ============================================================================

/// 중단 신호 확인기
#[derive(Clone)]
pub struct CancellationChecker {
    token: CancellationToken,
    reason: Arc<RwLock<Option<String>>>,
}

impl CancellationChecker {
    /// 중단되지 않는 체커 (테스트/비대화형 실행)
    pub fn never() -> Self {
        cancellation().1
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// 중단 시 `Error::Cancelled`
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// 중단될 때까지 대기
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// future와 중단 신호 중 먼저 끝나는 쪽으로 결정
    pub async fn run<T, F>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Error::Cancelled),
            result = future => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_completes_without_cancel() {
        let (_handle, checker) = cancellation();
        let value = checker.run(async { Ok::<_, Error>(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert!(checker.check().is_ok());
    }

    #[tokio::test]
    async fn test_cancel_preempts_pending_future() {
        let (handle, checker) = cancellation();
        let waiter = tokio::spawn({
            let checker = checker.clone();
            async move {
                checker
                    .run(async {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        Ok::<_, Error>(())
                    })
                    .await
            }
        });

        handle.cancel("stop");
        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(checker.reason().as_deref(), Some("stop"));
    }

    #[test]
    fn test_first_reason_wins() {
        let (handle, checker) = cancellation();
        handle.cancel("first");
        handle.cancel("second");
        assert!(handle.is_cancelled());
        assert_eq!(checker.reason().as_deref(), Some("first"));
        assert!(checker.check().unwrap_err().is_cancelled());
    }
}
