//! Control-Channel Dispatcher: routes an upstream-attached
//! command stream's Pause/Resume/Stop signals into the live execution's
//! internal control channel, with at-most-one attached watcher per
//! `(campaign, phase)` and an exactly-once ack per command.

use crate::cancel::CancellationToken;
use crate::phase::{ControlCommand, ControlSignal, PhaseExecutor};
use campaign_core::{CampaignId, Error as CoreError, PhaseKind, Result as CoreResult};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// One inbound command from the orchestrator's control stream.
pub struct InboundCommand {
    pub signal: ControlSignal,
    pub ack: Option<oneshot::Sender<CoreResult<()>>>,
}

/// Routes commands for attached `(campaign, phase)` pairs. Re-attaching
/// cancels the prior watcher.
///
/// Grounded on this workspace's pervasive `DashMap`-keyed concurrent registry
/// idiom (`dashflow-streaming`'s stream-backend registry, `dashflow`'s
/// module registries) rather than a `Mutex<HashMap<...>>`.
pub struct ControlDispatcher {
    executor: Arc<PhaseExecutor>,
    watchers: DashMap<(CampaignId, PhaseKind), CancellationToken>,
}

impl ControlDispatcher {
    pub fn new(executor: Arc<PhaseExecutor>) -> Self {
        Self {
            executor,
            watchers: DashMap::new(),
        }
    }

    /// Attaches `commands` as the watcher for `(campaign_id, phase)`.
    /// Commands are forwarded FIFO into the live execution's internal
    /// channel via non-blocking send; on backpressure (or if no execution is
    /// live) the command is acked with an error instead of blocking.
    pub fn attach(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
        mut commands: mpsc::Receiver<InboundCommand>,
    ) {
        if let Some(prior) = self.watchers.get(&(campaign_id, phase)) {
            prior.cancel();
        }
        let my_token = CancellationToken::new();
        self.watchers.insert((campaign_id, phase), my_token.clone());

        let executor = self.executor.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = my_token.cancelled() => break,
                    received = commands.recv() => {
                        match received {
                            Some(InboundCommand { signal, ack }) => {
                                let result = forward(&executor, campaign_id, phase, signal).await;
                                if let Some(ack) = ack {
                                    let _ = ack.send(result);
                                }
                            }
                            None => break,
                        }
                    }
                }
            }
        });
    }

    /// Detaches the current watcher for `(campaign_id, phase)`, if any.
    pub fn detach(&self, campaign_id: CampaignId, phase: PhaseKind) {
        if let Some((_, token)) = self.watchers.remove(&(campaign_id, phase)) {
            token.cancel();
        }
    }
}

/// Non-blocking forward into the live execution's internal channel ///: the send itself never blocks, but the ack returned to the caller
/// reflects the actual outcome of applying the signal (status gate,
/// pause/resume/stop result), not merely whether the forward succeeded.
async fn forward(executor: &PhaseExecutor, campaign_id: CampaignId, phase: PhaseKind, signal: ControlSignal) -> CoreResult<()> {
    let runtime = executor
        .runtime_handle(campaign_id, phase)
        .ok_or(CoreError::PhaseExecutionMissing { campaign_id, phase })?;

    let (ack_tx, ack_rx) = oneshot::channel();
    if let Err(_command) = runtime.try_forward(ControlCommand {
        signal,
        ack: Some(ack_tx),
    }) {
        return Err(CoreError::PhaseNotRunning);
    }

    match ack_rx.await {
        Ok(result) => result,
        Err(_) => Err(CoreError::PhaseNotRunning),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::{CorrelationId, PhaseCapabilities, PhaseStatus};
    use campaign_store::InMemoryStore;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::time::Duration;

    fn long_worker(counter: Arc<AtomicU64>) -> crate::phase::PhaseWorkerFn {
        Box::new(move |ctx| {
            Box::pin(async move {
                loop {
                    if !ctx.checkpoint().await {
                        break;
                    }
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                Ok(counter.load(Ordering::SeqCst))
            })
        })
    }

    #[tokio::test]
    async fn stop_signal_delivered_through_dispatcher_stops_the_live_execution() {
        let store = Arc::new(InMemoryStore::new());
        let executor = Arc::new(PhaseExecutor::new(store.clone()));
        let dispatcher = ControlDispatcher::new(executor.clone());
        let campaign_id = CampaignId::new();

        executor
            .configure(campaign_id, PhaseKind::Analysis, serde_json::json!({}), PhaseCapabilities::default())
            .await
            .unwrap();

        let counter = Arc::new(AtomicU64::new(0));
        let mut progress_rx = executor
            .execute(campaign_id, PhaseKind::Analysis, 1_000_000, CorrelationId::new(), long_worker(counter))
            .await
            .unwrap();

        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        dispatcher.attach(campaign_id, PhaseKind::Analysis, cmd_rx);

        tokio::time::sleep(Duration::from_millis(5)).await;
        let (ack_tx, ack_rx) = oneshot::channel();
        cmd_tx
            .send(InboundCommand {
                signal: ControlSignal::Stop,
                ack: Some(ack_tx),
            })
            .await
            .unwrap();
        ack_rx.await.unwrap().unwrap();

        let mut last = None;
        while let Some(progress) = progress_rx.recv().await {
            last = Some(progress);
        }
        assert_eq!(last.unwrap().status, PhaseStatus::Failed);
    }

    #[tokio::test]
    async fn signal_rejected_when_no_execution_is_live() {
        let store = Arc::new(InMemoryStore::new());
        let executor = Arc::new(PhaseExecutor::new(store));
        let dispatcher = ControlDispatcher::new(executor.clone());
        let campaign_id = CampaignId::new();

        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        dispatcher.attach(campaign_id, PhaseKind::Analysis, cmd_rx);

        let (ack_tx, ack_rx) = oneshot::channel();
        cmd_tx
            .send(InboundCommand {
                signal: ControlSignal::Pause,
                ack: Some(ack_tx),
            })
            .await
            .unwrap();
        let result = ack_rx.await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn reattaching_cancels_the_prior_watcher_and_the_new_one_still_serves_commands() {
        let store = Arc::new(InMemoryStore::new());
        let executor = Arc::new(PhaseExecutor::new(store));
        let dispatcher = ControlDispatcher::new(executor.clone());
        let campaign_id = CampaignId::new();

        let (_first_tx, first_rx) = mpsc::channel(8);
        dispatcher.attach(campaign_id, PhaseKind::Analysis, first_rx);
        let (second_tx, second_rx) = mpsc::channel(8);
        dispatcher.attach(campaign_id, PhaseKind::Analysis, second_rx);

        let (ack_tx, ack_rx) = oneshot::channel();
        second_tx
            .send(InboundCommand {
                signal: ControlSignal::Pause,
                ack: Some(ack_tx),
            })
            .await
            .unwrap();
        // No live execution, so this acks an error rather than hanging —
        // proof the *new* watcher (not the cancelled prior one) is serving.
        assert!(ack_rx.await.unwrap().is_err());
    }
}
