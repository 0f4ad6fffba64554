//! Cooperative cancellation.
//!
//! One [`CancellationToken`] is created per run and handed down by reference
//! to every walker. A signal handler (or a test) calls `cancel()`; the walkers
//! poll [`CancellationExt::check`] between assets, environments and spaces and
//! unwind with [`Cancelled`]. Work inside a single asset's repair is never
//! interrupted.

pub use tokio_util::sync::CancellationToken;

/// Raised when the run was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// `?`-friendly polling for [`CancellationToken`].
pub trait CancellationExt {
    /// Err([`Cancelled`]) once the token has been cancelled.
    fn check(&self) -> Result<(), Cancelled>;
}

impl CancellationExt for CancellationToken {
    fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// True if the error, or anything it wraps, is [`Cancelled`].
pub fn is_cancelled(error: &anyhow::Error) -> bool {
    error.chain().any(|e| e.is::<Cancelled>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_cancel_is_shared_and_idempotent() {
        let token = CancellationToken::new();
        let handle = token.clone();
        assert!(token.check().is_ok());

        handle.cancel();
        handle.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.check(), Err(Cancelled));
    }

    #[test]
    fn test_child_token_follows_parent() {
        let run = CancellationToken::new();
        let space = run.child_token();
        run.cancel();
        assert_eq!(space.check(), Err(Cancelled));
    }

    #[test]
    fn test_is_cancelled_through_context() {
        let err = Err::<(), _>(Cancelled)
            .context("processing space s1")
            .unwrap_err();
        assert!(is_cancelled(&err));
        assert!(!is_cancelled(&anyhow::anyhow!("boom")));
    }

    #[tokio::test]
    async fn test_cancel_from_another_task() {
        let token = CancellationToken::new();
        let remote = token.clone();
        tokio::spawn(async move { remote.cancel() }).await.unwrap();
        token.cancelled().await;
        assert!(token.check().is_err());
    }
}
