//! Phase Service Contract: `GetPhaseKind(); Configure(campaign,
//! cfg)→error; Validate(cfg)→error; Execute(campaign)→progress-stream|error;
//! GetStatus(campaign)→status; Pause/Resume/Cancel(campaign)→error;
//! Capabilities()→{...}; optional AttachControlChannel(...)`.
//!
//! Mirrors this workspace's one-trait-per-external-seam shape
//! (`#[async_trait] pub trait Node<S>` / `pub trait Checkpointer<S>`):
//! object-safe, `async_trait`-annotated, consumed by the orchestrator
//! without it knowing the concrete phase implementation.

use crate::error::Result;
use async_trait::async_trait;
use campaign_core::{CampaignId, CorrelationId, PhaseCapabilities, PhaseKind, PhaseProgress, PhaseStatus};
use campaign_executor::InboundCommand;
use tokio::sync::mpsc;

#[async_trait]
pub trait PhaseService: Send + Sync {
    fn phase_kind(&self) -> PhaseKind;

    /// Validates `config` without touching any persisted or in-process
    /// state.
    fn validate(&self, config: &serde_json::Value) -> Result<()>;

    /// `NotStarted/Configured → Configured`. Idempotent.
    async fn configure(&self, campaign_id: CampaignId, config: serde_json::Value) -> Result<()>;

    /// `Configured → InProgress`. Returns the phase's progress
    /// stream; `correlation_id` ties every SSE/tracing emission of this run
    /// together.
    async fn execute(
        &self,
        campaign_id: CampaignId,
        correlation_id: CorrelationId,
    ) -> Result<mpsc::Receiver<PhaseProgress>>;

    async fn get_status(&self, campaign_id: CampaignId) -> Result<PhaseStatus>;

    async fn pause(&self, campaign_id: CampaignId) -> Result<()>;

    async fn resume(&self, campaign_id: CampaignId) -> Result<()>;

    async fn cancel(&self, campaign_id: CampaignId) -> Result<()>;

    fn capabilities(&self, campaign_id: CampaignId) -> PhaseCapabilities;

    /// Optional: attaches an upstream control-command stream for this
    /// `(campaign, phase_kind())` pair.
    /// Default implementation is a no-op for phases that don't route
    /// through the Control-Channel Dispatcher.
    fn attach_control_channel(&self, _campaign_id: CampaignId, _commands: mpsc::Receiver<InboundCommand>) {}
}
