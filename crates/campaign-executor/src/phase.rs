//! Phase Execution State Machine: per-`(campaign, phase)`
//! lifecycle, the cooperative pause barrier, cancellation, and progress
//! emission. Generalises `campaign-scoring::engine::ScoringEngine`'s
//! hand-rolled lifecycle management (start/complete/fail-phase calls wrapped
//! around a scoring run) into a reusable driver any phase worker plugs into.

use crate::cancel::CancellationToken;
use crate::pause::PauseBarrier;
use campaign_core::{
    CampaignId, CorrelationId, Error as CoreError, PhaseCapabilities, PhaseKind, PhaseProgress,
    PhaseStatus, Result as CoreResult,
};
use campaign_store::{CampaignStore, FailureContext, FailureDetails};
use campaign_streaming::{progress_channel, ProgressSender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// A command forwarded into a live execution's internal channel.
pub enum ControlSignal {
    Pause,
    Resume,
    Stop,
}

pub struct ControlCommand {
    pub signal: ControlSignal,
    pub ack: Option<oneshot::Sender<CoreResult<()>>>,
}

const CONTROL_CHANNEL_CAPACITY: usize = 8;

/// Context handed to a phase worker closure; the only way a worker observes
/// pause/cancel/stop and reports progress.
#[derive(Clone)]
pub struct PhaseWorkerContext {
    pub campaign_id: CampaignId,
    pub phase: PhaseKind,
    pub correlation_id: CorrelationId,
    runtime: Arc<PhaseRuntime>,
    progress: ProgressSender,
    store: Arc<dyn CampaignStore>,
}

impl PhaseWorkerContext {
    /// Suspension point a worker calls before each batch/per-domain step
    ///. Returns `false` once the worker should stop looping
    /// (cancelled or explicitly stopped) — the worker is responsible for
    /// exiting its loop promptly when this returns `false`.
    pub async fn checkpoint(&self) -> bool {
        if self.runtime.stop_requested.load(Ordering::SeqCst) {
            return false;
        }
        self.runtime
            .pause_barrier
            .wait_while_paused(&self.runtime.stop_requested)
            .await;
        !self.runtime.stop_requested.load(Ordering::SeqCst) && !self.runtime.cancel.lock().is_cancelled()
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.runtime.cancel.lock().clone()
    }

    /// The raw progress sender, for workers (e.g. the scoring engine) that
    /// already own a more granular progress-emission policy than the
    /// generic `report_progress` above.
    pub fn progress_sender(&self) -> &ProgressSender {
        &self.progress
    }

    pub fn store(&self) -> &Arc<dyn CampaignStore> {
        &self.store
    }

    pub fn is_stop_requested(&self) -> bool {
        self.runtime.stop_requested.load(Ordering::SeqCst)
    }

    /// Non-blocking progress emission plus a best-effort store write     /// progress emission.
    pub async fn report_progress(&self, items_processed: u64, items_total: u64, message: Option<String>) {
        if let Err(err) = self
            .store
            .update_phase_progress(self.campaign_id, self.phase, items_processed)
            .await
        {
            warn!(error = %err, "failed to persist phase progress");
        }
        self.progress.emit(PhaseProgress {
            campaign_id: self.campaign_id,
            phase: self.phase,
            status: PhaseStatus::InProgress,
            progress_pct: if items_total == 0 {
                0.0
            } else {
                (items_processed as f64 / items_total as f64 * 100.0).clamp(0.0, 100.0)
            },
            items_total,
            items_processed,
            message,
            error: None,
            timestamp: chrono::Utc::now(),
        });
    }
}

/// A worker's outcome: the final items-processed count on success.
pub type PhaseWorkerResult = CoreResult<u64>;
pub type PhaseWorkerFuture = Pin<Box<dyn Future<Output = PhaseWorkerResult> + Send>>;
pub type PhaseWorkerFn = Box<dyn FnOnce(PhaseWorkerContext) -> PhaseWorkerFuture + Send>;

/// In-process-only concurrency state for one `(campaign, phase)` execution
///. Never persisted — `campaign_core::CampaignPhaseExecution` is
/// the durable record.
pub struct PhaseRuntime {
    campaign_id: CampaignId,
    phase: PhaseKind,
    capabilities: PhaseCapabilities,
    pause_barrier: PauseBarrier,
    // Replaced with a fresh token at the start of every `execute()`: a
    // cancel-induced Paused run leaves this permanently cancelled (there is
    // no "uncancel"), so the next run must not inherit it.
    cancel: parking_lot::Mutex<CancellationToken>,
    stop_requested: AtomicBool,
    control_tx: parking_lot::Mutex<Option<mpsc::Sender<ControlCommand>>>,
    run_generation: AtomicBool, // toggled per Execute() to let a stale control pump exit
}

impl PhaseRuntime {
    fn new(campaign_id: CampaignId, phase: PhaseKind, capabilities: PhaseCapabilities) -> Self {
        Self {
            campaign_id,
            phase,
            capabilities,
            pause_barrier: PauseBarrier::new(),
            cancel: parking_lot::Mutex::new(CancellationToken::new()),
            stop_requested: AtomicBool::new(false),
            control_tx: parking_lot::Mutex::new(None),
            run_generation: AtomicBool::new(false),
        }
    }

    pub fn capabilities(&self) -> PhaseCapabilities {
        self.capabilities
    }

    /// Forwards a command into this execution's internal control channel
    ///: non-blocking; backpressure is reported to the caller so
    /// it can ack the upstream command with an error.
    pub fn try_forward(&self, command: ControlCommand) -> Result<(), ControlCommand> {
        let guard = self.control_tx.lock();
        match guard.as_ref() {
            Some(tx) => tx.try_send(command).map_err(|err| match err {
                mpsc::error::TrySendError::Full(cmd) => cmd,
                mpsc::error::TrySendError::Closed(cmd) => cmd,
            }),
            None => Err(command),
        }
    }
}

/// The Phase Execution State Machine: a registry of `PhaseRuntime`s plus the
/// store-backed lifecycle transitions.
pub struct PhaseExecutor {
    store: Arc<dyn CampaignStore>,
    runtimes: RwLock<HashMap<(CampaignId, PhaseKind), Arc<PhaseRuntime>>>,
}

impl PhaseExecutor {
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        Self {
            store,
            runtimes: RwLock::new(HashMap::new()),
        }
    }

    fn runtime_for(&self, campaign_id: CampaignId, phase: PhaseKind) -> Option<Arc<PhaseRuntime>> {
        self.runtimes.read().get(&(campaign_id, phase)).cloned()
    }

    /// `NotStarted → Configured`. Idempotent: configuring an
    /// already-`Configured` phase with the same or different config leaves
    /// it `Configured`. Rejected while a run is live.
    pub async fn configure(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
        config: serde_json::Value,
        capabilities: PhaseCapabilities,
    ) -> CoreResult<()> {
        let existing = self.store.get_campaign_phase(campaign_id, phase).await.map_err(CoreError::from)?;
        if let Some(exec) = &existing {
            if matches!(exec.status, PhaseStatus::InProgress | PhaseStatus::Paused) {
                return Err(CoreError::PhaseAlreadyRunning { campaign_id, phase });
            }
        }

        self.store
            .update_phase_configuration(campaign_id, phase, config)
            .await
            .map_err(CoreError::from)?;

        self.runtimes
            .write()
            .entry((campaign_id, phase))
            .or_insert_with(|| Arc::new(PhaseRuntime::new(campaign_id, phase, capabilities)));
        Ok(())
    }

    /// `Configured → InProgress`. Fails if already running; starting from
    /// `Completed`/`Failed` begins a new run, closing any stale progress
    /// channel first.
    pub async fn execute(
        self: &Arc<Self>,
        campaign_id: CampaignId,
        phase: PhaseKind,
        items_total: u64,
        correlation_id: CorrelationId,
        worker: PhaseWorkerFn,
    ) -> CoreResult<mpsc::Receiver<PhaseProgress>> {
        let existing = self.store.get_campaign_phase(campaign_id, phase).await.map_err(CoreError::from)?;
        if let Some(exec) = &existing {
            if matches!(exec.status, PhaseStatus::InProgress | PhaseStatus::Paused) {
                return Err(CoreError::PhaseAlreadyRunning { campaign_id, phase });
            }
        }

        let runtime = self
            .runtimes
            .write()
            .entry((campaign_id, phase))
            .or_insert_with(|| Arc::new(PhaseRuntime::new(campaign_id, phase, PhaseCapabilities::default())))
            .clone();

        // Fresh per-run state: a prior terminal run must not leave the next
        // one paused/cancelled/stopped. `cancel` in particular has no
        // "uncancel" operation, so a cancel-induced Paused run requires a
        // new token here rather than inheriting the old, permanently-tripped
        // one.
        runtime.stop_requested.store(false, Ordering::SeqCst);
        *runtime.cancel.lock() = CancellationToken::new();
        runtime.pause_barrier.resume();

        self.store
            .start_phase(campaign_id, phase, items_total)
            .await
            .map_err(CoreError::from)?;

        let (progress_tx, progress_rx) = progress_channel();

        let (control_tx, mut control_rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
        *runtime.control_tx.lock() = Some(control_tx);

        // Control pump: drains the internal channel the dispatcher forwards
        // into, applying pause/resume/stop and acking exactly once. Stops
        // when the worker completes (run_generation flips).
        runtime.run_generation.store(true, Ordering::SeqCst);
        {
            let runtime = runtime.clone();
            let executor = self.clone();
            tokio::spawn(async move {
                while runtime.run_generation.load(Ordering::SeqCst) {
                    match control_rx.recv().await {
                        Some(ControlCommand { signal, ack }) => {
                            let result = match signal {
                                ControlSignal::Pause => executor.pause(campaign_id, phase).await,
                                ControlSignal::Resume => executor.resume(campaign_id, phase).await,
                                ControlSignal::Stop => executor.stop(campaign_id, phase).await,
                            };
                            if let Some(ack) = ack {
                                let _ = ack.send(result);
                            }
                        }
                        None => break,
                    }
                }
            });
        }

        let store = self.store.clone();
        let ctx = PhaseWorkerContext {
            campaign_id,
            phase,
            correlation_id,
            runtime: runtime.clone(),
            progress: progress_tx.clone(),
            store: store.clone(),
        };

        tokio::spawn(async move {
            let outcome = worker(ctx).await;
            runtime.run_generation.store(false, Ordering::SeqCst);

            let stopped = runtime.stop_requested.load(Ordering::SeqCst);
            let cancelled = runtime.cancel.lock().is_cancelled();

            let (final_status, message, last_error) = match outcome {
                Ok(items_processed) if stopped => {
                    (PhaseStatus::Failed, Some("stopped by user".to_string()), Some("stopped by user".to_string()))
                }
                Ok(_items_processed) if cancelled => {
                    (PhaseStatus::Paused, Some("paused by cancellation".to_string()), None)
                }
                Ok(_items_processed) => (PhaseStatus::Completed, None, None),
                Err(_err) if stopped => {
                    (PhaseStatus::Failed, Some("stopped by user".to_string()), Some("stopped by user".to_string()))
                }
                Err(err) => (PhaseStatus::Failed, Some(err.to_string()), Some(err.to_string())),
            };

            let persist_result = match final_status {
                PhaseStatus::Completed => store.complete_phase(campaign_id, phase).await,
                PhaseStatus::Paused => store.pause_phase(campaign_id, phase).await,
                PhaseStatus::Failed => {
                    let exec = store.get_campaign_phase(campaign_id, phase).await.ok().flatten();
                    let (items_processed, items_total) = exec
                        .as_ref()
                        .map(|e| (e.items_processed, e.items_total))
                        .unwrap_or((0, items_total));
                    let progress_pct = exec.as_ref().map(|e| e.progress_pct()).unwrap_or(0.0);
                    store
                        .fail_phase(
                            campaign_id,
                            phase,
                            FailureDetails {
                                phase,
                                status: PhaseStatus::Failed,
                                error_msg: last_error.clone().unwrap_or_default(),
                                context: FailureContext {
                                    items_processed,
                                    items_total,
                                    progress_pct,
                                    config_hash: None,
                                },
                            },
                        )
                        .await
                }
                _ => unreachable!("only Completed/Paused/Failed are terminal-or-paused outcomes here"),
            };
            if let Err(err) = persist_result {
                tracing::error!(error = %err, "failed to persist terminal phase state");
            }

            let exec = store.get_campaign_phase(campaign_id, phase).await.ok().flatten();
            let (items_total_final, items_processed_final) = exec
                .as_ref()
                .map(|e| (e.items_total, e.items_processed))
                .unwrap_or((items_total, 0));
            progress_tx.emit_terminal(PhaseProgress {
                campaign_id,
                phase,
                status: final_status,
                progress_pct: if items_total_final == 0 {
                    0.0
                } else {
                    (items_processed_final as f64 / items_total_final as f64 * 100.0).clamp(0.0, 100.0)
                },
                items_total: items_total_final,
                items_processed: items_processed_final,
                message,
                error: last_error,
                timestamp: chrono::Utc::now(),
            });
        });

        Ok(progress_rx)
    }

    pub async fn get_status(&self, campaign_id: CampaignId, phase: PhaseKind) -> CoreResult<PhaseStatus> {
        let exec = self.store.get_campaign_phase(campaign_id, phase).await.map_err(CoreError::from)?;
        exec.map(|e| e.status)
            .ok_or(CoreError::PhaseExecutionMissing { campaign_id, phase })
    }

    pub fn capabilities(&self, campaign_id: CampaignId, phase: PhaseKind) -> PhaseCapabilities {
        self.runtime_for(campaign_id, phase)
            .map(|r| r.capabilities())
            .unwrap_or_default()
    }

    /// `InProgress → Paused`. `ErrPhaseNotRunning` from any
    /// other status.
    pub async fn pause(&self, campaign_id: CampaignId, phase: PhaseKind) -> CoreResult<()> {
        let status = self.get_status(campaign_id, phase).await?;
        if status != PhaseStatus::InProgress {
            return Err(CoreError::PhaseNotRunning);
        }
        let runtime = self
            .runtime_for(campaign_id, phase)
            .ok_or(CoreError::PhaseExecutionMissing { campaign_id, phase })?;
        if !runtime.capabilities().can_pause {
            return Err(CoreError::PhasePauseUnsupported);
        }
        runtime.pause_barrier.pause();
        self.store.pause_phase(campaign_id, phase).await.map_err(CoreError::from)
    }

    /// `Paused → InProgress`. `ErrPhaseNotPaused` from any other
    /// status. A no-op on `items_processed`.
    pub async fn resume(&self, campaign_id: CampaignId, phase: PhaseKind) -> CoreResult<()> {
        let status = self.get_status(campaign_id, phase).await?;
        if status != PhaseStatus::Paused {
            return Err(CoreError::PhaseNotPaused);
        }
        let runtime = self
            .runtime_for(campaign_id, phase)
            .ok_or(CoreError::PhaseExecutionMissing { campaign_id, phase })?;
        if !runtime.capabilities().can_resume {
            return Err(CoreError::PhaseResumeUnsupported);
        }
        // A `Paused` status reached via the pause barrier still has its
        // worker task alive, blocked in `checkpoint()` — `run_generation`
        // is true for that case. A `Paused` status reached via a graceful
        // `cancel()` has already torn its worker down; there is nothing to
        // wake, and the caller must start a new `execute()` instead (which,
        // for phases with a durable resume protocol such as the domain
        // generator, continues from persisted state rather than redoing
        // work).
        if !runtime.run_generation.load(Ordering::SeqCst) {
            return Err(CoreError::PhaseExecutionMissing { campaign_id, phase });
        }
        runtime.pause_barrier.resume();
        self.store
            .update_phase_status(campaign_id, phase, PhaseStatus::InProgress)
            .await
            .map_err(CoreError::from)
    }

    /// Graceful, resumable cancellation. Requires status ∈ {InProgress, Paused}.
    pub async fn cancel(&self, campaign_id: CampaignId, phase: PhaseKind) -> CoreResult<()> {
        let status = self.get_status(campaign_id, phase).await?;
        if !matches!(status, PhaseStatus::InProgress | PhaseStatus::Paused) {
            return Err(CoreError::PhaseNotRunning);
        }
        let runtime = self
            .runtime_for(campaign_id, phase)
            .ok_or(CoreError::PhaseExecutionMissing { campaign_id, phase })?;
        runtime.cancel.lock().cancel();
        // Wake a paused worker so it can observe the cancellation and exit.
        runtime.pause_barrier.resume();
        Ok(())
    }

    /// Explicit stop. Requires status ∈
    /// {InProgress, Paused}.
    pub async fn stop(&self, campaign_id: CampaignId, phase: PhaseKind) -> CoreResult<()> {
        let status = self.get_status(campaign_id, phase).await?;
        if !matches!(status, PhaseStatus::InProgress | PhaseStatus::Paused) {
            return Err(CoreError::PhaseNotRunning);
        }
        let runtime = self
            .runtime_for(campaign_id, phase)
            .ok_or(CoreError::PhaseExecutionMissing { campaign_id, phase })?;
        runtime.stop_requested.store(true, Ordering::SeqCst);
        runtime.pause_barrier.resume();
        Ok(())
    }

    /// Status gate shared by the Control-Channel Dispatcher and forwarding target for dispatcher commands.
    pub(crate) async fn dispatch_signal(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
        signal: ControlSignal,
    ) -> CoreResult<()> {
        let status = self.get_status(campaign_id, phase).await?;
        if !matches!(status, PhaseStatus::InProgress | PhaseStatus::Paused) {
            return Err(CoreError::PhaseNotRunning);
        }
        match signal {
            ControlSignal::Pause => self.pause(campaign_id, phase).await,
            ControlSignal::Resume => self.resume(campaign_id, phase).await,
            ControlSignal::Stop => self.stop(campaign_id, phase).await,
        }
    }

    pub(crate) fn runtime_handle(&self, campaign_id: CampaignId, phase: PhaseKind) -> Option<Arc<PhaseRuntime>> {
        self.runtime_for(campaign_id, phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_store::InMemoryStore;
    use std::sync::atomic::AtomicU64;

    fn counting_worker(total: u64, observed_pause: Arc<AtomicBool>) -> PhaseWorkerFn {
        Box::new(move |ctx: PhaseWorkerContext| {
            Box::pin(async move {
                let mut processed = 0u64;
                while processed < total {
                    if !ctx.checkpoint().await {
                        if ctx.runtime.pause_barrier.is_paused() {
                            observed_pause.store(true, Ordering::SeqCst);
                        }
                        break;
                    }
                    processed += 1;
                    ctx.report_progress(processed, total, None).await;
                }
                Ok(processed)
            })
        })
    }

    #[tokio::test]
    async fn configure_then_execute_then_completed_round_trip() {
        let store = Arc::new(InMemoryStore::new());
        let executor = Arc::new(PhaseExecutor::new(store.clone()));
        let campaign_id = CampaignId::new();

        executor
            .configure(campaign_id, PhaseKind::Analysis, serde_json::json!({}), PhaseCapabilities::default())
            .await
            .unwrap();
        assert_eq!(
            executor.get_status(campaign_id, PhaseKind::Analysis).await.unwrap(),
            PhaseStatus::Configured
        );

        let worker = counting_worker(5, Arc::new(AtomicBool::new(false)));
        let mut rx = executor
            .execute(campaign_id, PhaseKind::Analysis, 5, CorrelationId::new(), worker)
            .await
            .unwrap();

        let mut last = None;
        while let Some(progress) = rx.recv().await {
            last = Some(progress);
        }
        assert_eq!(last.unwrap().status, PhaseStatus::Completed);
        assert_eq!(
            executor.get_status(campaign_id, PhaseKind::Analysis).await.unwrap(),
            PhaseStatus::Completed
        );
    }

    #[tokio::test]
    async fn execute_from_in_progress_fails() {
        let store = Arc::new(InMemoryStore::new());
        let executor = Arc::new(PhaseExecutor::new(store.clone()));
        let campaign_id = CampaignId::new();
        executor
            .configure(campaign_id, PhaseKind::Analysis, serde_json::json!({}), PhaseCapabilities::default())
            .await
            .unwrap();

        let (tx, _rx_hold) = oneshot::channel::<()>();
        let _ = tx; // keep worker alive until dropped, simulating in-flight execution
        let (gate_tx, gate_rx) = oneshot::channel::<()>();
        let worker: PhaseWorkerFn = Box::new(move |_ctx| {
            Box::pin(async move {
                let _ = gate_rx.await;
                Ok(0)
            })
        });
        let _rx = executor
            .execute(campaign_id, PhaseKind::Analysis, 1, CorrelationId::new(), worker)
            .await
            .unwrap();

        tokio::task::yield_now().await;
        let second = counting_worker(1, Arc::new(AtomicBool::new(false)));
        let result = executor
            .execute(campaign_id, PhaseKind::Analysis, 1, CorrelationId::new(), second)
            .await;
        assert!(matches!(result, Err(CoreError::PhaseAlreadyRunning { .. })));

        let _ = gate_tx.send(());
    }

    #[tokio::test]
    async fn pause_from_non_in_progress_returns_phase_not_running() {
        let store = Arc::new(InMemoryStore::new());
        let executor = Arc::new(PhaseExecutor::new(store));
        let campaign_id = CampaignId::new();
        executor
            .configure(campaign_id, PhaseKind::Analysis, serde_json::json!({}), PhaseCapabilities::default())
            .await
            .unwrap();
        let result = executor.pause(campaign_id, PhaseKind::Analysis).await;
        assert!(matches!(result, Err(CoreError::PhaseNotRunning)));
    }

    #[tokio::test]
    async fn resume_from_non_paused_returns_phase_not_paused() {
        let store = Arc::new(InMemoryStore::new());
        let executor = Arc::new(PhaseExecutor::new(store));
        let campaign_id = CampaignId::new();
        executor
            .configure(campaign_id, PhaseKind::Analysis, serde_json::json!({}), PhaseCapabilities::default())
            .await
            .unwrap();
        let result = executor.resume(campaign_id, PhaseKind::Analysis).await;
        assert!(matches!(result, Err(CoreError::PhaseNotPaused)));
    }

    #[tokio::test]
    async fn stop_transitions_to_failed_with_stopped_by_user_message() {
        let store = Arc::new(InMemoryStore::new());
        let executor = Arc::new(PhaseExecutor::new(store.clone()));
        let campaign_id = CampaignId::new();
        executor
            .configure(campaign_id, PhaseKind::Analysis, serde_json::json!({}), PhaseCapabilities::default())
            .await
            .unwrap();

        let processed_counter = Arc::new(AtomicU64::new(0));
        let counter_clone = processed_counter.clone();
        let worker: PhaseWorkerFn = Box::new(move |ctx: PhaseWorkerContext| {
            Box::pin(async move {
                loop {
                    if !ctx.checkpoint().await {
                        break;
                    }
                    counter_clone.fetch_add(1, Ordering::SeqCst);
                    ctx.report_progress(counter_clone.load(Ordering::SeqCst), 1_000_000, None).await;
                    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                }
                Ok(counter_clone.load(Ordering::SeqCst))
            })
        });

        let mut rx = executor
            .execute(campaign_id, PhaseKind::Analysis, 1_000_000, CorrelationId::new(), worker)
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        executor.stop(campaign_id, PhaseKind::Analysis).await.unwrap();

        let mut last = None;
        while let Some(progress) = rx.recv().await {
            last = Some(progress);
        }
        let last = last.unwrap();
        assert_eq!(last.status, PhaseStatus::Failed);
        assert_eq!(last.message.as_deref(), Some("stopped by user"));
    }

    #[tokio::test]
    async fn cancel_transitions_running_execution_to_paused_not_failed() {
        let store = Arc::new(InMemoryStore::new());
        let executor = Arc::new(PhaseExecutor::new(store.clone()));
        let campaign_id = CampaignId::new();
        executor
            .configure(campaign_id, PhaseKind::Analysis, serde_json::json!({}), PhaseCapabilities::default())
            .await
            .unwrap();

        let worker: PhaseWorkerFn = Box::new(move |ctx: PhaseWorkerContext| {
            Box::pin(async move {
                let mut processed = 0u64;
                loop {
                    if !ctx.checkpoint().await {
                        break;
                    }
                    processed += 1;
                    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                }
                Ok(processed)
            })
        });

        let mut rx = executor
            .execute(campaign_id, PhaseKind::Analysis, 1_000_000, CorrelationId::new(), worker)
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        executor.cancel(campaign_id, PhaseKind::Analysis).await.unwrap();

        let mut last = None;
        while let Some(progress) = rx.recv().await {
            last = Some(progress);
        }
        assert_eq!(last.unwrap().status, PhaseStatus::Paused);
    }

    #[tokio::test]
    async fn pause_then_resume_is_a_no_op_on_items_processed_and_status_returns_to_in_progress() {
        let store = Arc::new(InMemoryStore::new());
        let executor = Arc::new(PhaseExecutor::new(store.clone()));
        let campaign_id = CampaignId::new();
        let capabilities = PhaseCapabilities {
            can_pause: true,
            can_resume: true,
            can_stop: true,
            can_restart: true,
        };
        executor
            .configure(campaign_id, PhaseKind::Analysis, serde_json::json!({}), capabilities)
            .await
            .unwrap();

        let worker: PhaseWorkerFn = Box::new(move |ctx: PhaseWorkerContext| {
            Box::pin(async move {
                let mut processed = 0u64;
                while processed < 3 {
                    if !ctx.checkpoint().await {
                        break;
                    }
                    processed += 1;
                    ctx.report_progress(processed, 3, None).await;
                    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
                }
                Ok(processed)
            })
        });

        let mut rx = executor
            .execute(campaign_id, PhaseKind::Analysis, 3, CorrelationId::new(), worker)
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        executor.pause(campaign_id, PhaseKind::Analysis).await.unwrap();
        assert_eq!(
            executor.get_status(campaign_id, PhaseKind::Analysis).await.unwrap(),
            PhaseStatus::Paused
        );
        let processed_while_paused = store
            .get_campaign_phase(campaign_id, PhaseKind::Analysis)
            .await
            .unwrap()
            .unwrap()
            .items_processed;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let still_same = store
            .get_campaign_phase(campaign_id, PhaseKind::Analysis)
            .await
            .unwrap()
            .unwrap()
            .items_processed;
        assert_eq!(processed_while_paused, still_same);

        executor.resume(campaign_id, PhaseKind::Analysis).await.unwrap();
        assert_eq!(
            executor.get_status(campaign_id, PhaseKind::Analysis).await.unwrap(),
            PhaseStatus::InProgress
        );

        let mut last = None;
        while let Some(progress) = rx.recv().await {
            last = Some(progress);
        }
        assert_eq!(last.unwrap().status, PhaseStatus::Completed);
    }
}
