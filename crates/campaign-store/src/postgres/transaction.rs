//! The `Transaction` implementation over a dedicated `PostgreSQL` connection,
//! and the shared bulk-update SQL used by both the plain and transactional
//! `UpdateAnalysisResults` paths.

use crate::contract::Transaction;
use crate::error::Result;
use crate::types::{DomainScoreUpdate, UpdateAnalysisResultsOutcome};
use async_trait::async_trait;
use campaign_core::generation::{DomainGenerationConfigState, GeneratedDomain};
use campaign_core::CampaignId;
use tokio_postgres::{Client, NoTls};
use tracing::error;

/// Bulk-persist scored domains via a single `WITH incoming(...) AS (VALUES
/// …) UPDATE ... FROM incoming` statement, rather than one
/// `UPDATE` per domain. `tokio_postgres` has no array-of-tuples bind, so the
/// VALUES list is built with positional parameters.
pub(super) async fn bulk_update_analysis_results(
    client: &Client,
    campaign_id: CampaignId,
    updates: &[DomainScoreUpdate],
) -> Result<UpdateAnalysisResultsOutcome> {
    if updates.is_empty() {
        return Ok(UpdateAnalysisResultsOutcome { rows_updated: 0 });
    }

    let mut values_sql = String::new();
    let mut params: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> = Vec::new();
    params.push(&campaign_id.0);

    for (i, update) in updates.iter().enumerate() {
        if i > 0 {
            values_sql.push(',');
        }
        let base = i * 2 + 2;
        values_sql.push_str(&format!("(${}::text, ${}::double precision)", base, base + 1));
        params.push(&update.domain_name);
        params.push(&update.relevance_score);
    }

    let sql = format!(
        "WITH incoming(domain_name, relevance_score) AS (VALUES {values_sql}) \
         UPDATE http_keyword_results AS h \
         SET relevance_score = incoming.relevance_score, \
             domain_score = incoming.relevance_score \
         FROM incoming \
         WHERE h.campaign_id = $1 AND h.domain_name = incoming.domain_name"
    );

    let rows_updated = client.execute(sql.as_str(), &params[..]).await?;
    Ok(UpdateAnalysisResultsOutcome { rows_updated })
}

/// A transaction scoped to its own dedicated connection: opened fresh in
/// `begin()`, `BEGIN`-ed immediately, and torn down on `commit`/`rollback`.
/// This avoids requiring `&mut self` on the shared store client, which would
/// otherwise serialise every concurrent caller behind a single connection.
pub struct PostgresTransaction {
    client: Client,
    finished: bool,
}

impl PostgresTransaction {
    pub(super) async fn begin(connection_string: &str) -> Result<Box<dyn Transaction>> {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls).await?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                error!(%err, "PostgreSQL transaction connection error");
            }
        });
        client.batch_execute("BEGIN").await?;
        Ok(Box::new(PostgresTransaction {
            client,
            finished: false,
        }))
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn create_generated_domains(&mut self, batch: &[GeneratedDomain]) -> Result<()> {
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

    async fn create_or_update_domain_generation_phase_config_state(
        &mut self,
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

    async fn update_analysis_results(
        &mut self,
        campaign_id: CampaignId,
        updates: &[DomainScoreUpdate],
    ) -> Result<UpdateAnalysisResultsOutcome> {
        bulk_update_analysis_results(&self.client, campaign_id, updates).await
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        self.client.batch_execute("COMMIT").await?;
        self.finished = true;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        self.client.batch_execute("ROLLBACK").await?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for PostgresTransaction {
    fn drop(&mut self) {
        if !self.finished {
            // Best-effort: the dedicated connection is closed without an
            // explicit ROLLBACK. PostgreSQL rolls back any open transaction
            // when the backend connection terminates, so this is safe, just
            // silent — callers are expected to call commit()/rollback().
        }
    }
}
