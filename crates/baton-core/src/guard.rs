//! Cancellation and deadline handling for one workflow run.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::WorkflowError;

/// Cancellation token plus optional deadline, cloned into every node.
///
/// Checked at node boundaries and raced against every backend and tool call.
#[derive(Debug, Clone)]
pub struct RunGuard {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RunGuard {
    pub fn new(token: CancellationToken, timeout: Option<Duration>) -> Self {
        Self {
            token,
            deadline: timeout.map(|d| Instant::now() + d),
        }
    }

    /// A guard that is never cancelled from outside and has no deadline.
    pub fn unbounded() -> Self {
        Self::new(CancellationToken::new(), None)
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Fail fast if the run was cancelled or its deadline has passed.
    pub fn check(&self) -> Result<(), WorkflowError> {
        if self.token.is_cancelled() {
            return Err(WorkflowError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(WorkflowError::DeadlineExceeded);
            }
        }
        Ok(())
    }

    /// Run `fut` unless the run is cancelled or times out first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, WorkflowError>
    where
        F: Future<Output = Result<T, WorkflowError>>,
    {
        self.check()?;
        let bounded = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, fut)
                    .await
                    .map_err(|_| WorkflowError::DeadlineExceeded)?,
                None => fut.await,
            }
        };
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(WorkflowError::Cancelled),
            result = bounded => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_passes_through_result() {
        let guard = RunGuard::unbounded();
        let value = guard.run(async { Ok::<_, WorkflowError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_cancelled_guard_short_circuits() {
        let guard = RunGuard::unbounded();
        guard.cancel();
        assert!(matches!(guard.check(), Err(WorkflowError::Cancelled)));
        let result = guard.run(async { Ok::<_, WorkflowError>(()) }).await;
        assert!(matches!(result, Err(WorkflowError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_future() {
        let guard = RunGuard::unbounded();
        let canceller = guard.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });
        let result = guard
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, WorkflowError>(())
            })
            .await;
        assert!(matches!(result, Err(WorkflowError::Cancelled)));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let guard = RunGuard::new(CancellationToken::new(), Some(Duration::from_millis(20)));
        let result = guard
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, WorkflowError>(())
            })
            .await;
        assert!(matches!(result, Err(WorkflowError::DeadlineExceeded)));
    }
}
