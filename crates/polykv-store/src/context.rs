//! Per-operation cancellation and deadlines.
//!
//! Every store operation takes an [`OpContext`]. Each backend call is raced
//! against the context's cancellation signal and deadline, so a cancelled
//! scan-then-fetch loop stops at the next round trip and reports
//! [`StoreError::Cancelled`] instead of returning a partial result.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{BackendResult, StoreError, StoreResult};

/// Cancellation signal and optional deadline for one or more operations.
///
/// Clones share the cancellation signal.
#[derive(Clone, Debug, Default)]
pub struct OpContext {
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Handle that cancels every clone of the context it was created with.
#[derive(Debug)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

impl Canceller {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl OpContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A cancellable context and the handle that cancels it.
    pub fn with_cancel() -> (Self, Canceller) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            cancel: Some(rx),
            deadline: None,
        };
        (ctx, Canceller { tx })
    }

    /// Tighten the deadline to `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Tighten the deadline to `at`. An earlier existing deadline wins.
    pub fn with_deadline(mut self, at: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(at),
            None => at,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Fail fast if the context is already cancelled or expired.
    pub fn check(&self) -> StoreResult<()> {
        if self.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        if self.deadline.is_some_and(|at| Instant::now() >= at) {
            return Err(StoreError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Run one backend call under this context.
    pub async fn run<T, F>(&self, call: F) -> StoreResult<T>
    where
        F: Future<Output = BackendResult<T>>,
    {
        self.check()?;

        let cancelled = async {
            match &self.cancel {
                Some(rx) => {
                    let mut rx = rx.clone();
                    // A dropped canceller can never fire.
                    let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
                    if closed {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(StoreError::Cancelled),
            _ = expired => Err(StoreError::DeadlineExceeded),
            result = call => result.map_err(StoreError::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;

    #[tokio::test]
    async fn background_runs_call() {
        let ctx = OpContext::background();
        let value = ctx.run(async { Ok::<_, BackendError>(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert!(ctx.check().is_ok());
    }

    #[tokio::test]
    async fn backend_error_passes_through() {
        let ctx = OpContext::background();
        let err = ctx
            .run(async { Err::<(), _>(BackendError::Unavailable("down".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Backend(BackendError::Unavailable(_))));
    }

    #[tokio::test]
    async fn cancelled_before_call() {
        let (ctx, canceller) = OpContext::with_cancel();
        canceller.cancel();
        assert!(ctx.is_cancelled());
        let err = ctx.run(async { Ok::<_, BackendError>(()) }).await.unwrap_err();
        assert!(matches!(err, StoreError::Cancelled));
    }

    #[tokio::test]
    async fn cancelled_during_call() {
        let (ctx, canceller) = OpContext::with_cancel();
        let call = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, BackendError>(())
        };
        let cancel = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        };
        let (result, ()) = tokio::join!(ctx.run(call), cancel);
        assert!(matches!(result, Err(StoreError::Cancelled)));
    }

    #[tokio::test]
    async fn clones_share_cancellation() {
        let (ctx, canceller) = OpContext::with_cancel();
        let clone = ctx.clone();
        canceller.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn dropped_canceller_never_cancels() {
        let (ctx, canceller) = OpContext::with_cancel();
        drop(canceller);
        let value = ctx.run(async { Ok::<_, BackendError>(1) }).await.unwrap();
        assert_eq!(value, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_interrupts_slow_call() {
        let ctx = OpContext::background().with_timeout(Duration::from_millis(50));
        let call = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, BackendError>(())
        };
        let err = ctx.run(call).await.unwrap_err();
        assert!(matches!(err, StoreError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn expired_deadline_fails_check() {
        let ctx = OpContext::background().with_deadline(Instant::now());
        assert!(matches!(ctx.check(), Err(StoreError::DeadlineExceeded)));
    }

    #[test]
    fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = OpContext::background()
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(10));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }
}
