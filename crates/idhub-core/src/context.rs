//! Per-request context: trace id, cancellation and deadline.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{IdHubError, IdHubResult};

/// Carried through every orchestrated operation.
///
/// Cloning is cheap; clones share the same cancellation token.
#[derive(Debug, Clone)]
pub struct RequestContext {
    trace_id: String,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Context with a freshly generated trace id.
    pub fn generated() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drive `fut` unless the request is cancelled or its deadline
    /// passes first.
    ///
    /// Infrastructure errors coming out of `fut` are tagged with
    /// `operation` and the trace id.
    pub async fn run<T, F>(&self, operation: &'static str, fut: F) -> IdHubResult<T>
    where
        F: Future<Output = IdHubResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(IdHubError::Cancelled {
                operation: operation.to_string(),
            }),
            _ = wait_for(self.deadline) => Err(IdHubError::DeadlineExceeded {
                operation: operation.to_string(),
            }),
            result = fut => result.map_err(|e| e.with_context(operation, &self.trace_id)),
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let ctx = RequestContext::new("t1");
        let value = ctx.run("noop", async { Ok::<_, IdHubError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let ctx = RequestContext::new("t1");
        ctx.cancellation().cancel();

        let err = ctx
            .run("noop", async { Ok::<_, IdHubError>(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, IdHubError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn cancellation_interrupts_pending_work() {
        let ctx = RequestContext::new("t1");
        let cancel = ctx.cancellation().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        });

        let err = ctx
            .run("slow", std::future::pending::<IdHubResult<()>>())
            .await
            .unwrap_err();
        assert!(matches!(err, IdHubError::Cancelled { operation } if operation == "slow"));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_exceeded() {
        let ctx = RequestContext::new("t1").with_timeout(Duration::from_secs(1));
        let err = ctx
            .run("slow", std::future::pending::<IdHubResult<()>>())
            .await
            .unwrap_err();
        assert!(matches!(err, IdHubError::DeadlineExceeded { .. }));
    }

    #[tokio::test]
    async fn infrastructure_errors_carry_trace_id() {
        let ctx = RequestContext::new("trace-42");
        let err = ctx
            .run("user.get_by_id", async {
                Err::<(), _>(IdHubError::Database("boom".into()))
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("trace-42"));
    }
}
