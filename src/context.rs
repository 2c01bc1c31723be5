//! Cancellation and deadline control shared by every run of a scanner.
use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// A cancellable, optionally time-bounded context.
///
/// Cloning is cheap and clones observe the same cancellation. A context with
/// neither a deadline nor a cancelled token never completes.
#[derive(Debug, Clone, Default)]
pub struct ScanContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl ScanContext {
    /// A context that only completes when [`cancel`](Self::cancel) is called.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that completes `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Wraps a token owned by the caller, e.g. one tied to Ctrl-C handling.
    pub const fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the context has already completed.
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once the token is cancelled or the deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = self.token.cancelled() => {}
                    () = time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ScanContext;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn deadline_completes_context() {
        let ctx = ScanContext::with_timeout(Duration::from_millis(20));
        timeout(Duration::from_secs(2), ctx.done())
            .await
            .expect("deadline should complete the context");
        assert!(ctx.is_done());
    }

    #[tokio::test]
    async fn cancel_reaches_clones() {
        let ctx = ScanContext::background();
        let clone = ctx.clone();
        ctx.cancel();
        timeout(Duration::from_secs(2), clone.done())
            .await
            .expect("cancel should complete every clone");
    }

    #[tokio::test]
    async fn background_never_completes_on_its_own() {
        let ctx = ScanContext::background();
        assert!(timeout(Duration::from_millis(50), ctx.done()).await.is_err());
        assert!(!ctx.is_done());
    }
}
