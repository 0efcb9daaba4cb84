use crate::error::Result;
use crate::types::{
    DomainScoreUpdate, FailureDetails, HttpKeywordResultFilter, HttpKeywordResultRow,
    UpdateAnalysisResultsOutcome,
};
use async_trait::async_trait;
use campaign_core::generation::{DomainGenerationConfigState, GeneratedDomain};
use campaign_core::scoring::ScoringProfile;
use campaign_core::{CampaignId, CampaignPhaseExecution, PhaseKind};

/// The minimal Store Contract external collaborators implement.
///
/// Mirrors this workspace's one-trait-per-external-seam shape
/// (`#[async_trait] pub trait Checkpointer<S>`): object-safe, `Send + Sync`,
/// so the executor and scoring engine can hold `&dyn CampaignStore` without
/// knowing the concrete backend.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn update_phase_configuration(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
        config: serde_json::Value,
    ) -> Result<()>;

    async fn start_phase(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
        items_total: u64,
    ) -> Result<()>;

    async fn complete_phase(&self, campaign_id: CampaignId, phase: PhaseKind) -> Result<()>;

    async fn fail_phase(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
        details: FailureDetails,
    ) -> Result<()>;

    async fn pause_phase(&self, campaign_id: CampaignId, phase: PhaseKind) -> Result<()>;

    async fn update_phase_status(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
        status: campaign_core::PhaseStatus,
    ) -> Result<()>;

    async fn update_phase_progress(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
        items_processed: u64,
    ) -> Result<()>;

    async fn get_campaign_phase(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
    ) -> Result<Option<CampaignPhaseExecution>>;

    async fn create_generated_domains(&self, batch: &[GeneratedDomain]) -> Result<()>;

    async fn count_generated_domains_by_campaign(&self, campaign_id: CampaignId) -> Result<u64>;

    async fn get_domain_generation_phase_config_state_by_hash(
        &self,
        config_hash: &str,
    ) -> Result<Option<DomainGenerationConfigState>>;

    async fn create_or_update_domain_generation_phase_config_state(
        &self,
        state: &DomainGenerationConfigState,
    ) -> Result<()>;

    async fn delete_domain_generation_phase_config_state(&self, config_hash: &str) -> Result<()>;

    async fn update_campaign_discovery_lineage(
        &self,
        campaign_id: CampaignId,
        config_hash: &str,
        offset_start: u64,
        offset_end: u64,
    ) -> Result<()>;

    async fn get_http_keyword_results_by_campaign(
        &self,
        filter: HttpKeywordResultFilter,
    ) -> Result<Vec<HttpKeywordResultRow>>;

    async fn update_analysis_results(
        &self,
        campaign_id: CampaignId,
        updates: &[DomainScoreUpdate],
    ) -> Result<UpdateAnalysisResultsOutcome>;

    /// Count rows with a non-null feature vector for the campaign, used by
    /// the scoring engine's preflight check.
    async fn count_feature_rows(&self, campaign_id: CampaignId) -> Result<u64>;

    /// Count of ready rows in the new feature table/view
    /// (`analysis_ready_features`), used by the Read-Path Selector.
    async fn count_ready_feature_rows(&self, campaign_id: CampaignId) -> Result<u64>;

    /// Total expected domains for a campaign (the generation phase's
    /// `items_total`), the Read-Path Selector's other coverage input.
    async fn count_expected_domains(&self, campaign_id: CampaignId) -> Result<u64>;
}

/// Capability check + transaction-handle acquisition.
#[async_trait]
pub trait Transactor: Send + Sync {
    fn supports_transactions(&self) -> bool;

    /// Begin a transaction scoped to a single call; the returned handle's
    /// `commit`/`rollback` determine whether generated domains + offset state
    /// (or bulk score updates) land atomically.
    async fn begin_tx(&self) -> Result<Box<dyn Transaction>>;
}

/// A single transactional unit of work.
#[async_trait]
pub trait Transaction: Send + Sync {
    async fn create_generated_domains(&mut self, batch: &[GeneratedDomain]) -> Result<()>;

    async fn create_or_update_domain_generation_phase_config_state(
        &mut self,
        state: &DomainGenerationConfigState,
    ) -> Result<()>;

    async fn update_analysis_results(
        &mut self,
        campaign_id: CampaignId,
        updates: &[DomainScoreUpdate],
    ) -> Result<UpdateAnalysisResultsOutcome>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// The Scoring Weights Registry's storage seam,
/// kept separate from the broader `CampaignStore` so `campaign-scoring`
/// depends on the narrowest contract it needs.
#[async_trait]
pub trait ScoringProfileStore: Send + Sync {
    async fn get_scoring_profile(&self, campaign_id: CampaignId) -> Result<Option<ScoringProfile>>;
}
