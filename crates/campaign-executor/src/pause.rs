//! The pause barrier: each worker loop iteration calls `wait_while_paused`,
//! which blocks until `paused` is cleared; `resume()` wakes it. Implemented
//! with an `AtomicBool` + `tokio::sync::Notify` rather than a
//! `parking_lot::Condvar` so a paused worker yields the executor thread
//! instead of blocking it, selecting between a "continue" notification and a
//! control command the way a hand-off channel would.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone, Default)]
pub struct PauseBarrier {
    paused: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl PauseBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// : "setting `paused=true` and then observing the barrier is
    /// atomic under a mutex" — here a single atomic store plays that role;
    /// no waiter needs waking on pause, only on resume.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Blocks (without spinning) until `paused` is false or `stop` becomes
    /// true. This is the worker's per-iteration suspension point.
    pub async fn wait_while_paused(&self, stop: &AtomicBool) {
        loop {
            let notified = self.notify.notified();
            if !self.paused.load(Ordering::SeqCst) || stop.load(Ordering::SeqCst) {
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
    async fn wait_returns_immediately_when_not_paused() {
        let barrier = PauseBarrier::new();
        let stop = AtomicBool::new(false);
        barrier.wait_while_paused(&stop).await;
    }

    #[tokio::test]
    async fn resume_wakes_a_waiting_task() {
        let barrier = PauseBarrier::new();
        barrier.pause();
        let waiter = barrier.clone();
        let handle = tokio::spawn(async move {
            let stop = AtomicBool::new(false);
            waiter.wait_while_paused(&stop).await;
        });
        tokio::task::yield_now().await;
        barrier.resume();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn stop_flag_also_wakes_a_paused_waiter() {
        let barrier = PauseBarrier::new();
        barrier.pause();
        let stop = Arc::new(AtomicBool::new(false));
        let waiter_barrier = barrier.clone();
        let waiter_stop = stop.clone();
        let handle = tokio::spawn(async move {
            waiter_barrier.wait_while_paused(&waiter_stop).await;
        });
        tokio::task::yield_now().await;
        stop.store(true, Ordering::SeqCst);
        // resume() is what actually notifies; a real caller broadcasts on
        // stop via the same resume() path.
        barrier.notify.notify_waiters();
        handle.await.unwrap();
    }
}
