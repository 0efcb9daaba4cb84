use crate::aggregates::AggregateQuerySource;
use crate::contract::{CampaignStore, ScoringProfileStore, Transaction, Transactor};
use crate::error::Result;
use crate::types::{
    DomainScoreUpdate, FailureDetails, FunnelAggregate, HttpKeywordResultFilter,
    HttpKeywordResultRow, MetricsAggregate, UpdateAnalysisResultsOutcome,
};
use async_trait::async_trait;
use campaign_config::AggregateThresholds;
use campaign_core::generation::{DomainGenerationConfigState, GeneratedDomain};
use campaign_core::scoring::ScoringProfile;
use campaign_core::{CampaignId, CampaignPhaseExecution, PhaseKind, PhaseStatus};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;

/// In-process, non-durable implementation of the Store Contract.
///
/// Grounded on `dashflow`'s in-memory checkpointer pattern: a single
/// `Mutex`-guarded map per entity, used for unit tests and the demo binary
/// where a live Postgres instance is unavailable. `supports_transactions()`
/// returns `false` — callers fall back to the best-effort, non-transactional
/// path used when no transactor is available.
#[derive(Default)]
pub struct InMemoryStore {
    phases: Mutex<HashMap<(CampaignId, PhaseKind), CampaignPhaseExecution>>,
    domains: Mutex<HashMap<CampaignId, Vec<GeneratedDomain>>>,
    generation_state: Mutex<HashMap<String, DomainGenerationConfigState>>,
    feature_rows: Mutex<HashMap<CampaignId, Vec<HttpKeywordResultRow>>>,
    scoring_profiles: Mutex<HashMap<CampaignId, ScoringProfile>>,
    scores: Mutex<HashMap<(CampaignId, String), (f64, f64)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/demo seam: seed feature rows directly rather than going through
    /// the (out-of-scope) HTTP-validation phase.
    pub fn seed_feature_rows(&self, campaign_id: CampaignId, rows: Vec<HttpKeywordResultRow>) {
        self.feature_rows.lock().insert(campaign_id, rows);
    }

    pub fn seed_scoring_profile(&self, campaign_id: CampaignId, profile: ScoringProfile) {
        self.scoring_profiles.lock().insert(campaign_id, profile);
    }

    pub fn get_score(&self, campaign_id: CampaignId, domain_name: &str) -> Option<(f64, f64)> {
        self.scores
            .lock()
            .get(&(campaign_id, domain_name.to_string()))
            .copied()
    }
}

#[async_trait]
impl CampaignStore for InMemoryStore {
    async fn update_phase_configuration(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
        _config: serde_json::Value,
    ) -> Result<()> {
        let mut phases = self.phases.lock();
        let exec = phases
            .entry((campaign_id, phase))
            .or_insert_with(|| CampaignPhaseExecution::new(campaign_id, phase));
        exec.status = PhaseStatus::Configured;
        Ok(())
    }

    async fn start_phase(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
        items_total: u64,
    ) -> Result<()> {
        let mut phases = self.phases.lock();
        let exec = phases
            .entry((campaign_id, phase))
            .or_insert_with(|| CampaignPhaseExecution::new(campaign_id, phase));
        exec.status = PhaseStatus::InProgress;
        exec.items_total = items_total;
        exec.items_processed = 0;
        exec.started_at = Some(Utc::now());
        exec.completed_at = None;
        exec.last_error = None;
        Ok(())
    }

    async fn complete_phase(&self, campaign_id: CampaignId, phase: PhaseKind) -> Result<()> {
        let mut phases = self.phases.lock();
        if let Some(exec) = phases.get_mut(&(campaign_id, phase)) {
            exec.status = PhaseStatus::Completed;
            exec.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn fail_phase(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
        details: FailureDetails,
    ) -> Result<()> {
        let mut phases = self.phases.lock();
        let exec = phases
            .entry((campaign_id, phase))
            .or_insert_with(|| CampaignPhaseExecution::new(campaign_id, phase));
        exec.status = PhaseStatus::Failed;
        exec.completed_at = Some(Utc::now());
        exec.last_error = Some(details.error_msg);
        Ok(())
    }

    async fn pause_phase(&self, campaign_id: CampaignId, phase: PhaseKind) -> Result<()> {
        let mut phases = self.phases.lock();
        if let Some(exec) = phases.get_mut(&(campaign_id, phase)) {
            exec.status = PhaseStatus::Paused;
        }
        Ok(())
    }

    async fn update_phase_status(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
        status: PhaseStatus,
    ) -> Result<()> {
        let mut phases = self.phases.lock();
        if let Some(exec) = phases.get_mut(&(campaign_id, phase)) {
            exec.status = status;
        }
        Ok(())
    }

    async fn update_phase_progress(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
        items_processed: u64,
    ) -> Result<()> {
        let mut phases = self.phases.lock();
        if let Some(exec) = phases.get_mut(&(campaign_id, phase)) {
            exec.items_processed = items_processed.min(exec.items_total);
        }
        Ok(())
    }

    async fn get_campaign_phase(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
    ) -> Result<Option<CampaignPhaseExecution>> {
        Ok(self.phases.lock().get(&(campaign_id, phase)).cloned())
    }

    async fn create_generated_domains(&self, batch: &[GeneratedDomain]) -> Result<()> {
        let mut domains = self.domains.lock();
        for domain in batch {
            domains.entry(domain.campaign_id).or_default().push(domain.clone());
        }
        Ok(())
    }

    async fn count_generated_domains_by_campaign(&self, campaign_id: CampaignId) -> Result<u64> {
        Ok(self
            .domains
            .lock()
            .get(&campaign_id)
            .map(|v| v.len() as u64)
            .unwrap_or(0))
    }

    async fn get_domain_generation_phase_config_state_by_hash(
        &self,
        config_hash: &str,
    ) -> Result<Option<DomainGenerationConfigState>> {
        Ok(self.generation_state.lock().get(config_hash).cloned())
    }

    async fn create_or_update_domain_generation_phase_config_state(
        &self,
        state: &DomainGenerationConfigState,
    ) -> Result<()> {
        self.generation_state
            .lock()
            .insert(state.config_hash.clone(), state.clone());
        Ok(())
    }

    async fn delete_domain_generation_phase_config_state(&self, config_hash: &str) -> Result<()> {
        self.generation_state.lock().remove(config_hash);
        Ok(())
    }

    async fn update_campaign_discovery_lineage(
        &self,
        _campaign_id: CampaignId,
        _config_hash: &str,
        _offset_start: u64,
        _offset_end: u64,
    ) -> Result<()> {
        Ok(())
    }

    async fn get_http_keyword_results_by_campaign(
        &self,
        filter: HttpKeywordResultFilter,
    ) -> Result<Vec<HttpKeywordResultRow>> {
        let Some(campaign_id) = filter.campaign_id else {
            return Ok(Vec::new());
        };
        let rows = self
            .feature_rows
            .lock()
            .get(&campaign_id)
            .cloned()
            .unwrap_or_default();
        let mut rows: Vec<_> = rows
            .into_iter()
            .filter(|r| !filter.only_with_features || r.feature_vector.is_some())
            .collect();
        if let Some(limit) = filter.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }

    async fn update_analysis_results(
        &self,
        campaign_id: CampaignId,
        updates: &[DomainScoreUpdate],
    ) -> Result<UpdateAnalysisResultsOutcome> {
        let mut scores = self.scores.lock();
        for update in updates {
            scores.insert(
                (campaign_id, update.domain_name.clone()),
                (update.relevance_score, update.domain_score),
            );
        }
        Ok(UpdateAnalysisResultsOutcome {
            rows_updated: updates.len() as u64,
        })
    }

    async fn count_feature_rows(&self, campaign_id: CampaignId) -> Result<u64> {
        Ok(self
            .feature_rows
            .lock()
            .get(&campaign_id)
            .map(|rows| rows.iter().filter(|r| r.feature_vector.is_some()).count() as u64)
            .unwrap_or(0))
    }

    async fn count_ready_feature_rows(&self, campaign_id: CampaignId) -> Result<u64> {
        self.count_feature_rows(campaign_id).await
    }

    async fn count_expected_domains(&self, campaign_id: CampaignId) -> Result<u64> {
        self.count_generated_domains_by_campaign(campaign_id).await
    }
}

#[async_trait]
impl Transactor for InMemoryStore {
    fn supports_transactions(&self) -> bool {
        // Functionally atomic (single process-wide mutex per map) but does
        // not implement the `Transaction` capability; callers must check
        // `supports_transactions()` first and take the documented
        // best-effort fallback path instead of calling
        // `begin_tx`.
        false
    }

    async fn begin_tx(&self) -> Result<Box<dyn Transaction>> {
        Err(crate::error::StoreError::Unavailable(
            "InMemoryStore does not support transactions; check supports_transactions() first"
                .to_string(),
        ))
    }
}

#[async_trait]
impl ScoringProfileStore for InMemoryStore {
    async fn get_scoring_profile(&self, campaign_id: CampaignId) -> Result<Option<ScoringProfile>> {
        Ok(self.scoring_profiles.lock().get(&campaign_id).cloned())
    }
}

#[async_trait]
impl AggregateQuerySource for InMemoryStore {
    async fn query_funnel(
        &self,
        campaign_id: CampaignId,
        _thresholds: &AggregateThresholds,
    ) -> Result<FunnelAggregate> {
        let generated = self.count_generated_domains_by_campaign(campaign_id).await?;
        let feature_rows = self
            .feature_rows
            .lock()
            .get(&campaign_id)
            .cloned()
            .unwrap_or_default();
        let analyzed = feature_rows
            .iter()
            .filter(|r| r.feature_vector.is_some())
            .count() as u64;
        let keyword_hits = feature_rows
            .iter()
            .filter(|r| {
                r.feature_vector
                    .as_ref()
                    .map(|f| !f.kw_top3.is_empty())
                    .unwrap_or(false)
            })
            .count() as u64;
        Ok(FunnelAggregate {
            generated,
            dns_valid: 0,
            http_valid: feature_rows.len() as u64,
            keyword_hits,
            analyzed,
            high_potential: 0,
            leads: 0,
        })
    }

    async fn query_metrics(
        &self,
        campaign_id: CampaignId,
        thresholds: &AggregateThresholds,
    ) -> Result<MetricsAggregate> {
        let feature_rows = self
            .feature_rows
            .lock()
            .get(&campaign_id)
            .cloned()
            .unwrap_or_default();
        let analyzed: Vec<_> = feature_rows
            .iter()
            .filter_map(|r| r.feature_vector.as_ref())
            .collect();

        if analyzed.is_empty() {
            return Ok(MetricsAggregate::default());
        }

        let avg_richness = analyzed.iter().map(|f| f.enrichment_norm).sum::<f64>()
            / analyzed.len() as f64;
        let keyword_coverage_pct = analyzed.iter().filter(|f| !f.kw_top3.is_empty()).count()
            as f64
            / analyzed.len() as f64
            * 100.0;

        let stuffing_warning_count =
            analyzed.iter().filter(|f| f.stuffing_penalty > 0.0).count() as u64;
        let repetition_warning_count = analyzed
            .iter()
            .filter(|f| f.repetition_index > thresholds.repetition_index)
            .count() as u64;
        let anchor_warning_count = analyzed
            .iter()
            .filter(|f| f.anchor_share > thresholds.anchor_share)
            .count() as u64;
        let warning_domains = analyzed
            .iter()
            .filter(|f| {
                f.stuffing_penalty > 0.0
                    || f.repetition_index > thresholds.repetition_index
                    || f.anchor_share > thresholds.anchor_share
            })
            .count() as u64;

        Ok(MetricsAggregate {
            high_potential: 0,
            leads: 0,
            keyword_coverage_pct: Some(keyword_coverage_pct),
            avg_richness: Some(avg_richness),
            warning_rate_pct: Some(warning_domains as f64 / analyzed.len() as f64 * 100.0),
            median_gain: None,
            stuffing_warning_count,
            repetition_warning_count,
            anchor_warning_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_then_complete_phase_round_trips_through_get() {
        let store = InMemoryStore::new();
        let campaign_id = CampaignId::new();
        store
            .start_phase(campaign_id, PhaseKind::Analysis, 10)
            .await
            .unwrap();
        store.complete_phase(campaign_id, PhaseKind::Analysis).await.unwrap();
        let exec = store
            .get_campaign_phase(campaign_id, PhaseKind::Analysis)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exec.status, PhaseStatus::Completed);
        assert!(exec.completed_at.is_some());
    }

    #[tokio::test]
    async fn progress_is_clamped_to_items_total() {
        let store = InMemoryStore::new();
        let campaign_id = CampaignId::new();
        store
            .start_phase(campaign_id, PhaseKind::Analysis, 10)
            .await
            .unwrap();
        store
            .update_phase_progress(campaign_id, PhaseKind::Analysis, 999)
            .await
            .unwrap();
        let exec = store
            .get_campaign_phase(campaign_id, PhaseKind::Analysis)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exec.items_processed, 10);
    }

    #[tokio::test]
    async fn in_memory_store_does_not_support_transactions() {
        let store = InMemoryStore::new();
        assert!(!store.supports_transactions());
    }
}
