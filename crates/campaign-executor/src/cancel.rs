//! Cooperative cancellation primitive. A small bespoke `Arc<AtomicBool> +
//! Notify` type rather than pulling in `tokio-util` for a single flag/notify
//! pair, preferring a small hand-rolled primitive over a crate dependency for
//! something this narrow (`dashflow/src/test_support.rs`'s
//! `OnceLock<Mutex<()>>`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel()` has been called. Constructs the `Notified`
    /// future before checking the flag so a `cancel()` racing this call is
    /// never missed (the documented `tokio::sync::Notify` pattern).
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_before_wait_is_still_observed() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancelled().await;
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_wakes_a_concurrently_waiting_task() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        tokio::task::yield_now().await;
        token.cancel();
        handle.await.unwrap();
    }
}
