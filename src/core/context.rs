//! Deadline-bounded execution context shared by every action of a plan.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::runtime::{RuntimeError, RuntimeResult};

/// Default deadline for one plan execution or direct tool call.
pub const DEFAULT_PLAN_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline plus cancellation signal handed to tool handlers.
///
/// A single context spans a whole plan; it is never reset between actions.
/// Cancelling the token aborts whichever runtime call is in flight.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    deadline: Instant,
    cancel: CancellationToken,
}

impl ExecutionContext {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_cancellation(timeout, CancellationToken::new())
    }

    /// Bound execution by `timeout` and by an externally owned token.
    pub fn with_cancellation(timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            cancel,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Child context with its own deadline of `timeout` from now.
    ///
    /// The child may outlive the parent's deadline; it still observes the
    /// parent's cancellation.
    pub fn with_deadline_override(&self, timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            cancel: self.cancel.child_token(),
        }
    }

    /// Error describing why this context no longer admits work, if it doesn't.
    pub fn check(&self) -> RuntimeResult<()> {
        if self.is_cancelled() {
            Err(RuntimeError::Cancelled)
        } else if self.is_expired() {
            Err(RuntimeError::DeadlineExceeded)
        } else {
            Ok(())
        }
    }

    /// Run a runtime operation under this context's deadline and cancellation.
    pub async fn run<T, F>(&self, operation: F) -> RuntimeResult<T>
    where
        F: Future<Output = RuntimeResult<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RuntimeError::Cancelled),
            outcome = tokio::time::timeout_at(self.deadline, operation) => match outcome {
                Ok(result) => result,
                Err(_) => Err(RuntimeError::DeadlineExceeded),
            },
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_PLAN_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_run_times_out_at_deadline() {
        let ctx = ExecutionContext::with_timeout(Duration::from_secs(1));
        let result: RuntimeResult<()> = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert_eq!(result, Err(RuntimeError::DeadlineExceeded));
        assert!(ctx.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_override_outlives_parent() {
        let ctx = ExecutionContext::with_timeout(Duration::from_secs(1));
        let child = ctx.with_deadline_override(Duration::from_secs(120));
        let result = child
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(42)
            })
            .await;
        assert_eq!(result, Ok(42));
        assert!(ctx.is_expired());
        assert_eq!(ctx.check(), Err(RuntimeError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_cancellation_propagates_to_child() {
        let ctx = ExecutionContext::with_timeout(Duration::from_secs(30));
        let child = ctx.with_deadline_override(Duration::from_secs(120));
        let token = ctx.cancellation_token().clone();

        let pending = tokio::spawn(async move {
            child
                .run(async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                })
                .await
        });
        token.cancel();

        assert_eq!(pending.await.unwrap(), Err(RuntimeError::Cancelled));
        assert!(ctx.is_cancelled());
    }
}
