//! Wires the Scoring Engine into a `PhaseService` driven by the
//! generic Phase Execution State Machine.
//!
//! The engine's own `rescore_campaign` is a fully self-contained
//! lifecycle wrapper (it calls `complete_phase`/`fail_phase` itself) built
//! for direct/test use; here the generic executor owns lifecycle
//! persistence instead, so this phase drives the lower-level
//! `score_domains_inner` and replicates only the metrics/SSE wrapping
//! `rescore_campaign` also does (`rescore_runs_total`,
//! `rescore_runs_v2_total`, `analysis_phase_seconds`, `rescore_completed`).

use crate::error::Result;
use crate::service::PhaseService;
use async_trait::async_trait;
use campaign_cache::FeatureCache;
use campaign_config::FeatureFlags;
use campaign_core::{CampaignId, CorrelationId, PhaseCapabilities, PhaseKind, PhaseProgress, PhaseStatus};
use campaign_executor::{ControlDispatcher, InboundCommand, PhaseExecutor, PhaseWorkerFn};
use campaign_observability::metrics_registry;
use campaign_scoring::ScoringEngine;
use campaign_store::{CampaignStore, ScoringProfileStore};
use campaign_streaming::{RescoreResult, SseBus, SseEvent};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;

/// `PhaseService` for `PhaseKind::Analysis`.
pub struct AnalysisPhaseService {
    executor: Arc<PhaseExecutor>,
    dispatcher: Arc<ControlDispatcher>,
    store: Arc<dyn CampaignStore>,
    scoring_profiles: Arc<dyn ScoringProfileStore>,
    feature_cache: Arc<FeatureCache>,
    sse_bus: Arc<SseBus>,
    flags: FeatureFlags,
    progress_interval: u32,
}

impl AnalysisPhaseService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn CampaignStore>,
        scoring_profiles: Arc<dyn ScoringProfileStore>,
        feature_cache: Arc<FeatureCache>,
        sse_bus: Arc<SseBus>,
        flags: FeatureFlags,
        progress_interval: u32,
        executor: Arc<PhaseExecutor>,
        dispatcher: Arc<ControlDispatcher>,
    ) -> Self {
        Self {
            executor,
            dispatcher,
            store,
            scoring_profiles,
            feature_cache,
            sse_bus,
            flags,
            progress_interval,
        }
    }

    /// The scoring engine has no per-campaign knobs beyond the weights
    /// (loaded separately from `ScoringProfileStore`), so pause/resume are
    /// unsupported: its bulk scoring loop has no cooperative checkpoint.
    /// Stop still works — the dispatcher's stop-requested flag is observed
    /// before and after the bulk call.
    fn capabilities() -> PhaseCapabilities {
        PhaseCapabilities {
            can_pause: false,
            can_resume: false,
            can_stop: true,
            can_restart: true,
        }
    }
}

#[async_trait]
impl PhaseService for AnalysisPhaseService {
    fn phase_kind(&self) -> PhaseKind {
        PhaseKind::Analysis
    }

    fn validate(&self, config: &serde_json::Value) -> Result<()> {
        if config.is_null() || config.is_object() {
            Ok(())
        } else {
            Err(campaign_core::Error::ConfigurationInvalid("analysis phase config must be a JSON object".to_string()).into())
        }
    }

    async fn configure(&self, campaign_id: CampaignId, config: serde_json::Value) -> Result<()> {
        self.validate(&config)?;
        self.store
            .update_phase_configuration(campaign_id, PhaseKind::Analysis, config)
            .await
            .map_err(campaign_core::Error::from)?;
        self.executor
            .configure(campaign_id, PhaseKind::Analysis, serde_json::Value::Null, Self::capabilities())
            .await?;
        Ok(())
    }

    async fn execute(
        &self,
        campaign_id: CampaignId,
        correlation_id: CorrelationId,
    ) -> Result<mpsc::Receiver<PhaseProgress>> {
        let items_total = self
            .store
            .count_feature_rows(campaign_id)
            .await
            .map_err(campaign_core::Error::from)?;

        let store = self.store.clone();
        let scoring_profiles = self.scoring_profiles.clone();
        let feature_cache = self.feature_cache.clone();
        let sse_bus = self.sse_bus.clone();
        let flags = self.flags;
        let progress_interval = self.progress_interval;

        let worker: PhaseWorkerFn = Box::new(move |ctx: campaign_executor::PhaseWorkerContext| {
            Box::pin(async move {
                let engine = ScoringEngine {
                    store: store.as_ref(),
                    scoring_profiles: scoring_profiles.as_ref(),
                    feature_cache: feature_cache.as_ref(),
                    sse_bus: sse_bus.as_ref(),
                    flags,
                    progress_interval,
                };

                metrics_registry().rescore_runs_total.with_label_values(&["default"]).inc();
                let timer = std::time::Instant::now();

                let result = engine
                    .score_domains_inner(campaign_id, correlation_id, Some(ctx.progress_sender()))
                    .await;

                metrics_registry()
                    .analysis_phase_seconds
                    .with_label_values(&[])
                    .observe(timer.elapsed().as_secs_f64());

                match &result {
                    Ok(_) => {
                        metrics_registry()
                            .rescore_runs_v2_total
                            .with_label_values(&["default", "success"])
                            .inc();
                        sse_bus.publish(SseEvent::RescoreCompleted {
                            campaign_id,
                            timestamp: Utc::now(),
                            correlation_id,
                            result: RescoreResult::Success,
                            error: None,
                        });
                    }
                    Err(err) => {
                        metrics_registry()
                            .rescore_runs_v2_total
                            .with_label_values(&["default", "failed"])
                            .inc();
                        sse_bus.publish(SseEvent::RescoreCompleted {
                            campaign_id,
                            timestamp: Utc::now(),
                            correlation_id,
                            result: RescoreResult::Failed,
                            error: Some(err.to_string()),
                        });
                    }
                }

                result.map(|outcome| outcome.rows_updated)
            })
        });

        self.executor
            .execute(campaign_id, PhaseKind::Analysis, items_total, correlation_id, worker)
            .await
            .map_err(Into::into)
    }

    async fn get_status(&self, campaign_id: CampaignId) -> Result<PhaseStatus> {
        self.executor.get_status(campaign_id, PhaseKind::Analysis).await.map_err(Into::into)
    }

    async fn pause(&self, campaign_id: CampaignId) -> Result<()> {
        self.executor.pause(campaign_id, PhaseKind::Analysis).await.map_err(Into::into)
    }

    async fn resume(&self, campaign_id: CampaignId) -> Result<()> {
        self.executor.resume(campaign_id, PhaseKind::Analysis).await.map_err(Into::into)
    }

    async fn cancel(&self, campaign_id: CampaignId) -> Result<()> {
        self.executor.cancel(campaign_id, PhaseKind::Analysis).await.map_err(Into::into)
    }

    fn capabilities(&self, campaign_id: CampaignId) -> PhaseCapabilities {
        self.executor.capabilities(campaign_id, PhaseKind::Analysis)
    }

    fn attach_control_channel(&self, campaign_id: CampaignId, commands: mpsc::Receiver<InboundCommand>) {
        self.dispatcher.attach(campaign_id, PhaseKind::Analysis, commands);
    }
}
