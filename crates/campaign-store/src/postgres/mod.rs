//! `PostgreSQL`-backed implementation of the Store Contract,
//! grounded directly on `dashflow-postgres-checkpointer`'s connection
//! lifecycle: `tokio_postgres::connect` + a spawned connection-driver task,
//! `validate_identifier` guarding any caller-influenced identifier, and an
//! idempotent `CREATE TABLE IF NOT EXISTS` schema bootstrap on connect.

mod identifier;
mod schema;
mod transaction;

pub use identifier::validate_identifier;
pub use transaction::PostgresTransaction;

use crate::aggregates::AggregateQuerySource;
use crate::contract::{CampaignStore, ScoringProfileStore, Transaction, Transactor};
use crate::error::Result;
use crate::types::{
    DomainScoreUpdate, FailureDetails, FunnelAggregate, HttpKeywordResultFilter,
    HttpKeywordResultRow, MetricsAggregate, UpdateAnalysisResultsOutcome,
};
use async_trait::async_trait;
use campaign_config::AggregateThresholds;
use campaign_core::feature::FeatureVector;
use campaign_core::generation::{DomainGenerationConfigState, GeneratedDomain};
use campaign_core::scoring::{NormalisedWeights, ScoringProfile};
use campaign_core::{CampaignId, CampaignPhaseExecution, PhaseKind, PhaseStatus};
use tokio_postgres::{Client, NoTls, Row};
use tracing::{error, info};

fn phase_to_str(phase: PhaseKind) -> &'static str {
    phase.as_str()
}

fn phase_from_str(raw: &str) -> Option<PhaseKind> {
    match raw {
        "domain_generation" => Some(PhaseKind::DomainGeneration),
        "dns_validation" => Some(PhaseKind::DnsValidation),
        "http_keyword_validation" => Some(PhaseKind::HttpKeywordValidation),
        "analysis" => Some(PhaseKind::Analysis),
        _ => None,
    }
}

fn status_to_str(status: PhaseStatus) -> &'static str {
    match status {
        PhaseStatus::NotStarted => "not_started",
        PhaseStatus::Configured => "configured",
        PhaseStatus::InProgress => "in_progress",
        PhaseStatus::Paused => "paused",
        PhaseStatus::Completed => "completed",
        PhaseStatus::Failed => "failed",
    }
}

fn status_from_str(raw: &str) -> PhaseStatus {
    match raw {
        "configured" => PhaseStatus::Configured,
        "in_progress" => PhaseStatus::InProgress,
        "paused" => PhaseStatus::Paused,
        "completed" => PhaseStatus::Completed,
        "failed" => PhaseStatus::Failed,
        _ => PhaseStatus::NotStarted,
    }
}

fn row_to_phase_execution(row: &Row) -> CampaignPhaseExecution {
    let phase_str: String = row.get("phase");
    CampaignPhaseExecution {
        campaign_id: CampaignId::from_uuid(row.get("campaign_id")),
        phase: phase_from_str(&phase_str).unwrap_or(PhaseKind::Analysis),
        status: status_from_str(row.get::<_, String>("status").as_str()),
        items_total: row.get::<_, i64>("items_total") as u64,
        items_processed: row.get::<_, i64>("items_processed") as u64,
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        last_error: row.get("last_error"),
        correlation_id: None,
    }
}

fn row_to_generated_domain(row: &Row) -> GeneratedDomain {
    GeneratedDomain {
        id: row.get("id"),
        campaign_id: CampaignId::from_uuid(row.get("campaign_id")),
        domain_name: row.get("domain_name"),
        offset_index: row.get::<_, i64>("offset_index") as u64,
        generated_at: row.get("generated_at"),
        created_at: row.get("created_at"),
    }
}

fn row_to_config_state(row: &Row) -> DomainGenerationConfigState {
    DomainGenerationConfigState {
        config_hash: row.get("config_hash"),
        last_offset: row.get::<_, i64>("last_offset") as u64,
        normalised_params_json: row.get("normalised_params_json"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_feature_vector(value: Option<serde_json::Value>) -> Option<FeatureVector> {
    value.and_then(|v| serde_json::from_value(v).ok())
}

/// `PostgreSQL`-backed campaign store.
///
/// Stores phase executions, generated domains, global offset state, scoring
/// profiles, and HTTP-keyword-validation rows across the tables created by
/// [`schema::SCHEMA_DDL`].
pub struct PostgresCampaignStore {
    client: Client,
    connection_string: String,
}

impl PostgresCampaignStore {
    /// Connect and bootstrap the schema. The connection is driven by a
    /// spawned background task, exactly as
    /// `dashflow-postgres-checkpointer::PostgresCheckpointer::with_table_name`
    /// does.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls).await?;

        tokio::spawn(async move {
            if let Err(err) = connection.await {
                error!(%err, "PostgreSQL connection error");
            }
        });

        info!("connected to PostgreSQL campaign store");
        let store = Self {
            client,
            connection_string: connection_string.to_string(),
        };
        store.client.batch_execute(schema::SCHEMA_DDL).await?;
        Ok(store)
    }
}

#[async_trait]
impl CampaignStore for PostgresCampaignStore {
    async fn update_phase_configuration(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
        config: serde_json::Value,
    ) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO campaign_phase_executions \
                    (campaign_id, phase, status, config) \
                 VALUES ($1, $2, 'configured', $3) \
                 ON CONFLICT (campaign_id, phase) DO UPDATE \
                    SET status = 'configured', config = EXCLUDED.config",
                &[&campaign_id.0, &phase_to_str(phase), &config],
            )
            .await?;
        Ok(())
    }

    async fn start_phase(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
        items_total: u64,
    ) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO campaign_phase_executions \
                    (campaign_id, phase, status, items_total, items_processed, \
                     started_at, completed_at, last_error) \
                 VALUES ($1, $2, 'in_progress', $3, 0, now(), NULL, NULL) \
                 ON CONFLICT (campaign_id, phase) DO UPDATE SET \
                    status = 'in_progress', items_total = EXCLUDED.items_total, \
                    items_processed = 0, started_at = now(), completed_at = NULL, \
                    last_error = NULL",
                &[&campaign_id.0, &phase_to_str(phase), &(items_total as i64)],
            )
            .await?;
        Ok(())
    }

    async fn complete_phase(&self, campaign_id: CampaignId, phase: PhaseKind) -> Result<()> {
        self.client
            .execute(
                "UPDATE campaign_phase_executions SET status = 'completed', completed_at = now() \
                 WHERE campaign_id = $1 AND phase = $2",
                &[&campaign_id.0, &phase_to_str(phase)],
            )
            .await?;
        Ok(())
    }

    async fn fail_phase(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
        details: FailureDetails,
    ) -> Result<()> {
        let details_json = serde_json::to_value(&details)?;
        self.client
            .execute(
                "UPDATE campaign_phase_executions SET status = 'failed', completed_at = now(), \
                    last_error = $3, last_error_details = $4 \
                 WHERE campaign_id = $1 AND phase = $2",
                &[
                    &campaign_id.0,
                    &phase_to_str(phase),
                    &details.error_msg,
                    &details_json,
                ],
            )
            .await?;
        Ok(())
    }

    async fn pause_phase(&self, campaign_id: CampaignId, phase: PhaseKind) -> Result<()> {
        self.client
            .execute(
                "UPDATE campaign_phase_executions SET status = 'paused' \
                 WHERE campaign_id = $1 AND phase = $2",
                &[&campaign_id.0, &phase_to_str(phase)],
            )
            .await?;
        Ok(())
    }

    async fn update_phase_status(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
        status: PhaseStatus,
    ) -> Result<()> {
        self.client
            .execute(
                "UPDATE campaign_phase_executions SET status = $3 \
                 WHERE campaign_id = $1 AND phase = $2",
                &[&campaign_id.0, &phase_to_str(phase), &status_to_str(status)],
            )
            .await?;
        Ok(())
    }

    async fn update_phase_progress(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
        items_processed: u64,
    ) -> Result<()> {
        self.client
            .execute(
                "UPDATE campaign_phase_executions \
                 SET items_processed = LEAST($3, items_total) \
                 WHERE campaign_id = $1 AND phase = $2",
                &[&campaign_id.0, &phase_to_str(phase), &(items_processed as i64)],
            )
            .await?;
        Ok(())
    }

    async fn get_campaign_phase(
        &self,
        campaign_id: CampaignId,
        phase: PhaseKind,
    ) -> Result<Option<CampaignPhaseExecution>> {
        let row = self
            .client
            .query_opt(
                "SELECT campaign_id, phase, status, items_total, items_processed, \
                    started_at, completed_at, last_error \
                 FROM campaign_phase_executions WHERE campaign_id = $1 AND phase = $2",
                &[&campaign_id.0, &phase_to_str(phase)],
            )
            .await?;
        Ok(row.as_ref().map(row_to_phase_execution))
    }

    async fn create_generated_domains(&self, batch: &[GeneratedDomain]) -> Result<()> {
        for domain in batch {
            self.client
                .execute(
                    "INSERT INTO generated_domains \
                        (id, campaign_id, domain_name, offset_index, generated_at, created_at) \
                     VALUES ($1, $2, $3, $4, $5, $6) \
                     ON CONFLICT (campaign_id, domain_name) DO NOTHING",
                    &[
                        &domain.id,
                        &domain.campaign_id.0,
                        &domain.domain_name,
                        &(domain.offset_index as i64),
                        &domain.generated_at,
                        &domain.created_at,
                    ],
                )
                .await?;
        }
        Ok(())
    }

    async fn count_generated_domains_by_campaign(&self, campaign_id: CampaignId) -> Result<u64> {
        let row = self
            .client
            .query_one(
                "SELECT COUNT(*) AS n FROM generated_domains WHERE campaign_id = $1",
                &[&campaign_id.0],
            )
            .await?;
        Ok(row.get::<_, i64>("n") as u64)
    }

    async fn get_domain_generation_phase_config_state_by_hash(
        &self,
        config_hash: &str,
    ) -> Result<Option<DomainGenerationConfigState>> {
        let row = self
            .client
            .query_opt(
                "SELECT config_hash, last_offset, normalised_params_json, updated_at \
                 FROM domain_generation_phase_config_state WHERE config_hash = $1",
                &[&config_hash],
            )
            .await?;
        Ok(row.as_ref().map(row_to_config_state))
    }

    async fn create_or_update_domain_generation_phase_config_state(
        &self,
        state: &DomainGenerationConfigState,
    ) -> Result<()> {
        self.client
            .execute(
                "INSERT INTO domain_generation_phase_config_state \
                    (config_hash, last_offset, normalised_params_json, updated_at) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (config_hash) DO UPDATE SET \
                    last_offset = EXCLUDED.last_offset, \
                    normalised_params_json = EXCLUDED.normalised_params_json, \
                    updated_at = EXCLUDED.updated_at",
                &[
                    &state.config_hash,
                    &(state.last_offset as i64),
                    &state.normalised_params_json,
                    &state.updated_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn delete_domain_generation_phase_config_state(&self, config_hash: &str) -> Result<()> {
        self.client
            .execute(
                "DELETE FROM domain_generation_phase_config_state WHERE config_hash = $1",
                &[&config_hash],
            )
            .await?;
        Ok(())
    }

    async fn update_campaign_discovery_lineage(
        &self,
        campaign_id: CampaignId,
        config_hash: &str,
        offset_start: u64,
        offset_end: u64,
    ) -> Result<()> {
        // Discovery lineage is a denormalised audit trail on the phase
        // configuration row; folded into `config` rather than a dedicated
        // table since no other operation reads it back structurally.
        self.client
            .execute(
                "UPDATE campaign_phase_executions SET config = \
                    COALESCE(config, '{}'::jsonb) || jsonb_build_object( \
                        'config_hash', $2::text, 'offset_start', $3::bigint, \
                        'offset_end', $4::bigint) \
                 WHERE campaign_id = $1 AND phase = 'domain_generation'",
                &[
                    &campaign_id.0,
                    &config_hash,
                    &(offset_start as i64),
                    &(offset_end as i64),
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_http_keyword_results_by_campaign(
        &self,
        filter: HttpKeywordResultFilter,
    ) -> Result<Vec<HttpKeywordResultRow>> {
        let Some(campaign_id) = filter.campaign_id else {
            return Ok(Vec::new());
        };
        let limit = filter.limit.unwrap_or(u64::MAX) as i64;
        let rows = if filter.only_with_features {
            self.client
                .query(
                    "SELECT domain_name, feature_vector FROM http_keyword_results \
                     WHERE campaign_id = $1 AND feature_vector IS NOT NULL LIMIT $2",
                    &[&campaign_id.0, &limit],
                )
                .await?
        } else {
            self.client
                .query(
                    "SELECT domain_name, feature_vector FROM http_keyword_results \
                     WHERE campaign_id = $1 LIMIT $2",
                    &[&campaign_id.0, &limit],
                )
                .await?
        };
        Ok(rows
            .into_iter()
            .map(|row| HttpKeywordResultRow {
                domain_name: row.get("domain_name"),
                feature_vector: row_to_feature_vector(row.get("feature_vector")),
            })
            .collect())
    }

    async fn update_analysis_results(
        &self,
        campaign_id: CampaignId,
        updates: &[DomainScoreUpdate],
    ) -> Result<UpdateAnalysisResultsOutcome> {
        transaction::bulk_update_analysis_results(&self.client, campaign_id, updates).await
    }

    async fn count_feature_rows(&self, campaign_id: CampaignId) -> Result<u64> {
        let row = self
            .client
            .query_one(
                "SELECT COUNT(*) AS n FROM http_keyword_results \
                 WHERE campaign_id = $1 AND feature_vector IS NOT NULL",
                &[&campaign_id.0],
            )
            .await?;
        Ok(row.get::<_, i64>("n") as u64)
    }

    async fn count_ready_feature_rows(&self, campaign_id: CampaignId) -> Result<u64> {
        let row = self
            .client
            .query_one(
                "SELECT COUNT(*) AS n FROM analysis_ready_features WHERE campaign_id = $1",
                &[&campaign_id.0],
            )
            .await?;
        Ok(row.get::<_, i64>("n") as u64)
    }

    async fn count_expected_domains(&self, campaign_id: CampaignId) -> Result<u64> {
        self.count_generated_domains_by_campaign(campaign_id).await
    }
}

#[async_trait]
impl Transactor for PostgresCampaignStore {
    fn supports_transactions(&self) -> bool {
        true
    }

    async fn begin_tx(&self) -> Result<Box<dyn Transaction>> {
        // A transaction needs exclusive ownership of a connection for its
        // duration; rather than taking `&mut self` on the shared client
        // (which would serialise every caller behind one lock), a dedicated
        // connection is opened for the transaction's lifetime and dropped on
        // commit/rollback, keeping long-running transactional work off the
        // connection other callers share.
        PostgresTransaction::begin(&self.connection_string).await
    }
}

#[async_trait]
impl ScoringProfileStore for PostgresCampaignStore {
    async fn get_scoring_profile(&self, campaign_id: CampaignId) -> Result<Option<ScoringProfile>> {
        let row = self
            .client
            .query_opt(
                "SELECT weights, parked_penalty_factor FROM scoring_profiles \
                 WHERE campaign_id = $1",
                &[&campaign_id.0],
            )
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let weights_json: serde_json::Value = row.get("weights");
        let weights_map: std::collections::HashMap<String, f64> =
            serde_json::from_value(weights_json)?;
        Ok(Some(ScoringProfile {
            weights: NormalisedWeights::from_validated(weights_map),
            parked_penalty_factor: row.get("parked_penalty_factor"),
        }))
    }
}

#[async_trait]
impl AggregateQuerySource for PostgresCampaignStore {
    async fn query_funnel(
        &self,
        campaign_id: CampaignId,
        thresholds: &AggregateThresholds,
    ) -> Result<FunnelAggregate> {
        let row = self
            .client
            .query_one(
                "SELECT \
                    (SELECT COUNT(*) FROM generated_domains WHERE campaign_id = $1) AS generated, \
                    (SELECT COUNT(*) FROM http_keyword_results \
                        WHERE campaign_id = $1 AND dns_status = 'ok') AS dns_valid, \
                    (SELECT COUNT(*) FROM http_keyword_results WHERE campaign_id = $1) AS http_valid, \
                    (SELECT COUNT(*) FROM http_keyword_results \
                        WHERE campaign_id = $1 AND feature_vector IS NOT NULL \
                        AND jsonb_array_length(COALESCE(feature_vector->'kw_top3', '[]'::jsonb)) > 0 \
                    ) AS keyword_hits, \
                    (SELECT COUNT(*) FROM http_keyword_results \
                        WHERE campaign_id = $1 AND content_richness_score IS NOT NULL) AS analyzed, \
                    (SELECT COUNT(*) FROM http_keyword_results \
                        WHERE campaign_id = $1 AND content_richness_score IS NOT NULL \
                        AND domain_score >= $2) AS high_potential, \
                    (SELECT COUNT(*) FROM http_keyword_results \
                        WHERE campaign_id = $1 AND lead_status = 'match') AS leads",
                &[&campaign_id.0, &thresholds.high_potential_score],
            )
            .await?;
        Ok(FunnelAggregate {
            generated: row.get::<_, i64>("generated") as u64,
            dns_valid: row.get::<_, i64>("dns_valid") as u64,
            http_valid: row.get::<_, i64>("http_valid") as u64,
            keyword_hits: row.get::<_, i64>("keyword_hits") as u64,
            analyzed: row.get::<_, i64>("analyzed") as u64,
            high_potential: row.get::<_, i64>("high_potential") as u64,
            leads: row.get::<_, i64>("leads") as u64,
        })
    }

    async fn query_metrics(
        &self,
        campaign_id: CampaignId,
        thresholds: &AggregateThresholds,
    ) -> Result<MetricsAggregate> {
        let row = self
            .client
            .query_one(
                "SELECT \
                    (SELECT COUNT(*) FROM http_keyword_results \
                        WHERE campaign_id = $1 AND content_richness_score IS NOT NULL \
                        AND domain_score >= $2) AS high_potential, \
                    (SELECT COUNT(*) FROM http_keyword_results \
                        WHERE campaign_id = $1 AND lead_status = 'match') AS leads, \
                    (SELECT COUNT(*) FROM http_keyword_results \
                        WHERE campaign_id = $1 AND content_richness_score IS NOT NULL) AS analyzed, \
                    (SELECT COUNT(*) FROM http_keyword_results \
                        WHERE campaign_id = $1 AND feature_vector IS NOT NULL \
                        AND jsonb_array_length(COALESCE(feature_vector->'kw_top3', '[]'::jsonb)) > 0 \
                    ) AS keyword_hit_rows, \
                    (SELECT AVG(content_richness_score) FROM http_keyword_results \
                        WHERE campaign_id = $1 AND content_richness_score IS NOT NULL) AS avg_richness, \
                    (SELECT COUNT(*) FROM http_keyword_results \
                        WHERE campaign_id = $1 AND content_richness_score IS NOT NULL \
                        AND stuffing_penalty > 0) AS stuffing_warnings, \
                    (SELECT COUNT(*) FROM http_keyword_results \
                        WHERE campaign_id = $1 AND content_richness_score IS NOT NULL \
                        AND repetition_index > $3) AS repetition_warnings, \
                    (SELECT COUNT(*) FROM http_keyword_results \
                        WHERE campaign_id = $1 AND content_richness_score IS NOT NULL \
                        AND anchor_share > $4) AS anchor_warnings, \
                    (SELECT COUNT(*) FROM http_keyword_results \
                        WHERE campaign_id = $1 AND content_richness_score IS NOT NULL \
                        AND (stuffing_penalty > 0 OR repetition_index > $3 OR anchor_share > $4) \
                    ) AS warning_rows, \
                    (SELECT PERCENTILE_DISC(0.5) WITHIN GROUP (ORDER BY microcrawl_gain_ratio) \
                        FROM http_keyword_results \
                        WHERE campaign_id = $1 AND microcrawl_gain_ratio IS NOT NULL) AS median_gain",
                &[
                    &campaign_id.0,
                    &thresholds.high_potential_score,
                    &thresholds.repetition_index,
                    &thresholds.anchor_share,
                ],
            )
            .await?;

        let analyzed: i64 = row.get("analyzed");
        if analyzed == 0 {
            return Ok(MetricsAggregate::default());
        }

        let stuffing_warning_count = row.get::<_, i64>("stuffing_warnings") as u64;
        let repetition_warning_count = row.get::<_, i64>("repetition_warnings") as u64;
        let anchor_warning_count = row.get::<_, i64>("anchor_warnings") as u64;
        // Distinct-row count straight from SQL (single OR predicate), not a
        // sum of the three per-condition counts: a row tripping more than one
        // condition (e.g. stuffing and high anchor_share) must only count
        // once against `analyzed`.
        let warning_rows = row.get::<_, i64>("warning_rows") as u64;

        Ok(MetricsAggregate {
            high_potential: row.get::<_, i64>("high_potential") as u64,
            leads: row.get::<_, i64>("leads") as u64,
            keyword_coverage_pct: Some(
                row.get::<_, i64>("keyword_hit_rows") as f64 / analyzed as f64 * 100.0,
            ),
            avg_richness: row.get("avg_richness"),
            warning_rate_pct: Some(warning_rows as f64 / analyzed as f64 * 100.0),
            median_gain: row.get("median_gain"),
            stuffing_warning_count,
            repetition_warning_count,
            anchor_warning_count,
        })
    }
}
