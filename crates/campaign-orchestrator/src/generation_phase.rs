//! Wires the Deterministic Domain Generator and Offset/Resume
//! Manager into a `PhaseService` driven by the generic Phase
//! Execution State Machine.

use crate::error::{Error, Result};
use crate::service::PhaseService;
use async_trait::async_trait;
use campaign_core::generation::{GeneratorConfig, GeneratorConfigInput};
use campaign_core::{CampaignId, CorrelationId, PhaseCapabilities, PhaseKind, PhaseProgress, PhaseStatus};
use campaign_executor::{ControlDispatcher, InboundCommand, PhaseExecutor, PhaseWorkerFn};
use campaign_generator::{build_generated_domains, config_hash, generate_batch, normalise, persist_batch_with_global_offset};
use campaign_store::{CampaignStore, FailureContext, FailureDetails, Transactor};
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Number of domain names generated and persisted per batch iteration —
/// the unit of cooperative cancellation (a checkpoint precedes each one).
const BATCH_SIZE: u64 = 500;

/// Raw Configure payload: the generator's input parameters plus the
/// caller-requested starting offset and run size.
#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    #[serde(flatten)]
    generator: GeneratorConfigInput,
    #[serde(default)]
    offset_start: u64,
    requested_total: u64,
}

#[derive(Clone)]
struct ResolvedConfig {
    generator: GeneratorConfig,
    config_hash: String,
    offset_start: u64,
    requested_total: u64,
}

fn resolve(config: &serde_json::Value) -> Result<ResolvedConfig> {
    let raw: RawConfig = serde_json::from_value(config.clone())
        .map_err(|err| campaign_core::Error::ConfigurationInvalid(err.to_string()))?;
    let generator = normalise(&raw.generator).map_err(campaign_core::Error::from)?;
    let hash = config_hash(&generator);
    Ok(ResolvedConfig {
        generator,
        config_hash: hash,
        offset_start: raw.offset_start,
        requested_total: raw.requested_total,
    })
}

/// `PhaseService` for `PhaseKind::DomainGeneration`.
///
/// Holds the resolved config per campaign in-process (the Store Contract's
/// `UpdatePhaseConfiguration` is fire-and-forget — it has no corresponding
/// getter — so the orchestrator is the source of truth for "what Configure
/// was last called with", the same way `campaign-executor::control`'s
/// dispatcher keeps its watcher registry in a `DashMap` rather than asking
/// the store).
pub struct DomainGenerationPhaseService {
    executor: Arc<PhaseExecutor>,
    dispatcher: Arc<ControlDispatcher>,
    store: Arc<dyn CampaignStore>,
    transactor: Arc<dyn Transactor>,
    configs: DashMap<CampaignId, ResolvedConfig>,
}

impl DomainGenerationPhaseService {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        transactor: Arc<dyn Transactor>,
        executor: Arc<PhaseExecutor>,
        dispatcher: Arc<ControlDispatcher>,
    ) -> Self {
        Self {
            executor,
            dispatcher,
            store,
            transactor,
            configs: DashMap::new(),
        }
    }

    fn capabilities() -> PhaseCapabilities {
        PhaseCapabilities {
            can_pause: true,
            can_resume: true,
            can_stop: true,
            can_restart: true,
        }
    }
}

#[async_trait]
impl PhaseService for DomainGenerationPhaseService {
    fn phase_kind(&self) -> PhaseKind {
        PhaseKind::DomainGeneration
    }

    fn validate(&self, config: &serde_json::Value) -> Result<()> {
        resolve(config).map(|_| ())
    }

    async fn configure(&self, campaign_id: CampaignId, config: serde_json::Value) -> Result<()> {
        let resolved = resolve(&config)?;
        self.store
            .update_phase_configuration(campaign_id, PhaseKind::DomainGeneration, config)
            .await
            .map_err(campaign_core::Error::from)?;
        self.executor
            .configure(campaign_id, PhaseKind::DomainGeneration, serde_json::Value::Null, Self::capabilities())
            .await?;
        self.configs.insert(campaign_id, resolved);
        Ok(())
    }

    async fn execute(
        &self,
        campaign_id: CampaignId,
        correlation_id: CorrelationId,
    ) -> Result<mpsc::Receiver<PhaseProgress>> {
        let resolved = self
            .configs
            .get(&campaign_id)
            .map(|entry| entry.clone())
            .ok_or(Error::NotConfigured {
                campaign_id,
                phase: PhaseKind::DomainGeneration,
            })?;

        let prepared = campaign_generator::prepare_resume(
            self.store.as_ref(),
            campaign_id,
            &resolved.generator,
            &resolved.config_hash,
            resolved.offset_start,
            resolved.requested_total,
        )
        .await;

        let prepared = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                // step 3: "fail phase with 'offset exceeds total
                // combinations'" — this is a phase-level failure, not a bare
                // validation error, so the terminal status is persisted.
                self.store
                    .start_phase(campaign_id, PhaseKind::DomainGeneration, resolved.requested_total)
                    .await
                    .map_err(campaign_core::Error::from)?;
                self.store
                    .fail_phase(
                        campaign_id,
                        PhaseKind::DomainGeneration,
                        FailureDetails {
                            phase: PhaseKind::DomainGeneration,
                            status: PhaseStatus::Failed,
                            error_msg: err.to_string(),
                            context: FailureContext {
                                items_processed: 0,
                                items_total: resolved.requested_total,
                                progress_pct: 0.0,
                                config_hash: Some(resolved.config_hash.clone()),
                            },
                        },
                    )
                    .await
                    .map_err(campaign_core::Error::from)?;
                return Err(err.into());
            }
        };

        let generator_config = resolved.generator.clone();
        let config_hash = resolved.config_hash.clone();
        let normalised_params = prepared.normalised_params.clone();
        let effective_start = prepared.effective_start;
        let effective_total = prepared.effective_total;
        let store = self.store.clone();
        let transactor = self.transactor.clone();

        let worker: PhaseWorkerFn = Box::new(move |ctx: campaign_executor::PhaseWorkerContext| {
            Box::pin(async move {
                let end = effective_start.saturating_add(effective_total);
                let mut offset = effective_start;
                let mut processed: u64 = 0;
                while offset < end {
                    if !ctx.checkpoint().await {
                        break;
                    }
                    let count = BATCH_SIZE.min(end - offset);
                    let (names, next_offset) = generate_batch(&generator_config, offset, count);
                    if names.is_empty() {
                        break;
                    }
                    let domains = build_generated_domains(campaign_id, &names, offset);
                    persist_batch_with_global_offset(
                        store.as_ref(),
                        Some(transactor.as_ref()),
                        &domains,
                        &config_hash,
                        normalised_params.clone(),
                        next_offset,
                    )
                    .await?;
                    store
                        .update_campaign_discovery_lineage(campaign_id, &config_hash, effective_start, next_offset - 1)
                        .await
                        .map_err(campaign_core::Error::from)?;

                    processed += names.len() as u64;
                    offset = next_offset;
                    ctx.report_progress(processed, effective_total, None).await;
                }
                Ok(processed)
            })
        });

        self.executor
            .execute(campaign_id, PhaseKind::DomainGeneration, effective_total, correlation_id, worker)
            .await
            .map_err(Into::into)
    }

    async fn get_status(&self, campaign_id: CampaignId) -> Result<PhaseStatus> {
        self.executor
            .get_status(campaign_id, PhaseKind::DomainGeneration)
            .await
            .map_err(Into::into)
    }

    async fn pause(&self, campaign_id: CampaignId) -> Result<()> {
        self.executor.pause(campaign_id, PhaseKind::DomainGeneration).await.map_err(Into::into)
    }

    async fn resume(&self, campaign_id: CampaignId) -> Result<()> {
        self.executor.resume(campaign_id, PhaseKind::DomainGeneration).await.map_err(Into::into)
    }

    async fn cancel(&self, campaign_id: CampaignId) -> Result<()> {
        self.executor.cancel(campaign_id, PhaseKind::DomainGeneration).await.map_err(Into::into)
    }

    fn capabilities(&self, campaign_id: CampaignId) -> PhaseCapabilities {
        self.executor.capabilities(campaign_id, PhaseKind::DomainGeneration)
    }

    fn attach_control_channel(&self, campaign_id: CampaignId, commands: mpsc::Receiver<InboundCommand>) {
        self.dispatcher.attach(campaign_id, PhaseKind::DomainGeneration, commands);
    }
}
