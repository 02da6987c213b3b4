//! Caller cancellation and deadline for outward calls.

use std::time::{Duration, Instant};

use tokio::sync::watch;

/// Deadline and cancellation signal carried by a call.
///
/// Cloning shares the cancellation signal. A context without a
/// [`CancelHandle`] can never be cancelled.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Cancels every clone of the context it was created with.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CallContext {
    /// No deadline, never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// A cancellable copy of this context.
    pub fn cancellable(self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            deadline: self.deadline,
            cancel: Some(rx),
        };
        (ctx, CancelHandle { tx })
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The earlier of the caller deadline and `now + timeout`.
    pub fn effective_deadline(&self, timeout: Duration) -> Instant {
        let local = Instant::now() + timeout;
        match self.deadline {
            Some(deadline) => deadline.min(local),
            None => local,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the context is cancelled; pends forever otherwise.
    ///
    /// A dropped [`CancelHandle`] does not count as cancellation.
    pub async fn cancelled(&self) {
        let Some(rx) = self.cancel.as_ref() else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[test]
    fn test_effective_deadline_takes_minimum() {
        let ctx = CallContext::background().with_timeout(Duration::from_millis(50));
        let effective = ctx.effective_deadline(Duration::from_secs(10));
        assert_eq!(Some(effective), ctx.deadline());

        let ctx = CallContext::background().with_timeout(Duration::from_secs(60));
        let effective = ctx.effective_deadline(Duration::from_millis(50));
        assert!(effective < ctx.deadline().unwrap());
    }

    #[test]
    fn test_background_has_no_deadline() {
        let ctx = CallContext::background();
        assert!(ctx.deadline().is_none());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_nested_deadline_never_extends() {
        let ctx = CallContext::background()
            .with_timeout(Duration::from_millis(10))
            .with_timeout(Duration::from_secs(60));
        assert!(ctx.deadline().unwrap() < Instant::now() + Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_cancel_wakes_clones() {
        let (ctx, handle) = CallContext::background().cancellable();
        let clone = ctx.clone();

        let waiter = tokio::spawn(async move { clone.cancelled().await });
        handle.cancel();

        timeout(Duration::from_millis(200), waiter)
            .await
            .expect("cancel not observed")
            .unwrap();
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_dropped_handle_is_not_cancellation() {
        let (ctx, handle) = CallContext::background().cancellable();
        drop(handle);

        let result = timeout(Duration::from_millis(30), ctx.cancelled()).await;
        assert!(result.is_err());
        assert!(!ctx.is_cancelled());
    }
}
