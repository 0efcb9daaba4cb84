use campaign_core::PhaseProgress;
use tokio::sync::mpsc;

/// Bounded producer/consumer queue for progress updates. Capacity is fixed at 100
/// per the data model.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 100;

pub fn progress_channel() -> (ProgressSender, mpsc::Receiver<PhaseProgress>) {
    let (tx, rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    (ProgressSender { tx }, rx)
}

/// Wraps the raw `mpsc::Sender` so non-terminal sends are always
/// non-blocking and silently drop on a full channel. Callers are responsible for persisting terminal state
/// separately through the Store Contract; this type only guarantees that a
/// terminal *send* is attempted even when non-terminal sends have been
/// dropped, by using a blocking-aware send at the final step.
#[derive(Clone)]
pub struct ProgressSender {
    tx: mpsc::Sender<PhaseProgress>,
}

impl ProgressSender {
    /// Best-effort emission for in-flight progress. Never blocks.
    pub fn emit(&self, progress: PhaseProgress) {
        if self.tx.try_send(progress).is_err() {
            tracing::debug!("progress channel full or closed, dropping non-terminal update");
        }
    }

    /// Emission for the terminal (Completed/Failed) update. Still
    /// non-blocking on the channel itself (the channel is not the durability
    /// mechanism) but callers MUST also persist this state through the
    /// Store Contract before returning, which is what actually provides the
    /// "terminal update MUST be delivered" guarantee.
    pub fn emit_terminal(&self, progress: PhaseProgress) {
        if self.tx.try_send(progress).is_err() {
            tracing::warn!(
                "progress channel full or closed while emitting terminal update; \
                 relying on persisted store state for delivery"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::{CampaignId, PhaseKind, PhaseStatus};
    use chrono::Utc;

    fn sample(status: PhaseStatus) -> PhaseProgress {
        PhaseProgress {
            campaign_id: CampaignId::new(),
            phase: PhaseKind::Analysis,
            status,
            progress_pct: 0.0,
            items_total: 10,
            items_processed: 0,
            message: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn emits_are_received_in_order() {
        let (sender, mut rx) = progress_channel();
        sender.emit(sample(PhaseStatus::InProgress));
        sender.emit_terminal(sample(PhaseStatus::Completed));
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.status, PhaseStatus::InProgress);
        assert_eq!(second.status, PhaseStatus::Completed);
    }

    #[tokio::test]
    async fn full_channel_drops_non_terminal_silently_without_panic() {
        let (tx, _rx) = mpsc::channel(1);
        let sender = ProgressSender { tx };
        sender.emit(sample(PhaseStatus::InProgress));
        // second emit hits a full channel (receiver hasn't drained); must not panic
        sender.emit(sample(PhaseStatus::InProgress));
    }
}
