//! Offset/Resume Manager: the global, config-hash-keyed offset
//! state that makes domain generation resumable and at-most-once across
//! restarts and campaigns sharing a configuration.

use crate::generator::total_combinations;
use campaign_core::generation::{DomainGenerationConfigState, DomainGenerationExecution, GeneratedDomain, GeneratorConfig};
use campaign_core::{CampaignId, Error as CoreError, Result as CoreResult};
use campaign_store::{CampaignStore, Transactor};
use chrono::Utc;
use tracing::warn;

/// Runs the "Protocol at phase start" and returns the
/// effective execution parameters for a batch of generation, or
/// `Error::OffsetExhausted` if no combinations remain.
pub async fn prepare_resume(
    store: &dyn CampaignStore,
    campaign_id: CampaignId,
    config: &GeneratorConfig,
    config_hash: &str,
    offset_start: u64,
    requested_total: u64,
) -> CoreResult<DomainGenerationExecution> {
    let total = total_combinations(config);

    let existing = store
        .get_domain_generation_phase_config_state_by_hash(config_hash)
        .await
        .map_err(CoreError::from)?;

    // Step 1: candidate = max(configOffsetStart, state.last-offset+1).
    let resume_floor = existing.as_ref().map(|s| s.last_offset + 1).unwrap_or(0);
    let candidate = offset_start.max(resume_floor);
    let global_applied = candidate > offset_start;

    let effective_start = if candidate >= total {
        // Step 2: global offset has run past the space — reset if the
        // caller's own requested start would still have room.
        if global_applied && offset_start < total {
            warn!(
                config_hash,
                candidate,
                total,
                "global offset exceeds combinatorial space; resetting to requested offset_start"
            );
            store
                .delete_domain_generation_phase_config_state(config_hash)
                .await
                .map_err(CoreError::from)?;
            offset_start
        } else {
            // Step 3: otherwise the phase fails outright.
            return Err(CoreError::OffsetExhausted);
        }
    } else {
        candidate
    };

    // Step 4.
    let available = total.saturating_sub(effective_start);
    let effective_total = requested_total.min(available);
    if effective_total == 0 {
        return Err(CoreError::OffsetExhausted);
    }

    Ok(DomainGenerationExecution {
        campaign_id,
        config_hash: config_hash.to_string(),
        normalised_params: serde_json::to_value(config).unwrap_or(serde_json::Value::Null),
        offset_start,
        effective_start,
        effective_total,
    })
}

/// Persists one generated-domain batch and the global offset advance in a
/// single atomic unit when the store supports transactions; falls back to a
/// best-effort sequential write otherwise, behind the store's own
/// capability check.
pub async fn persist_batch_with_global_offset(
    store: &dyn CampaignStore,
    transactor: Option<&dyn Transactor>,
    domains: &[GeneratedDomain],
    config_hash: &str,
    normalised_params: serde_json::Value,
    next_offset: u64,
) -> CoreResult<()> {
    let state = DomainGenerationConfigState {
        config_hash: config_hash.to_string(),
        last_offset: next_offset.saturating_sub(1),
        normalised_params_json: normalised_params,
        updated_at: Utc::now(),
    };

    match transactor {
        Some(transactor) if transactor.supports_transactions() => {
            let mut tx = transactor.begin_tx().await.map_err(CoreError::from)?;

            if let Err(err) = tx.create_generated_domains(domains).await.map_err(CoreError::from) {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(error = %rollback_err, "rollback failed after domain insert error");
                }
                return Err(err);
            }

            if let Err(err) = tx
                .create_or_update_domain_generation_phase_config_state(&state)
                .await
                .map_err(CoreError::from)
            {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(error = %rollback_err, "rollback failed after offset upsert error");
                }
                return Err(err);
            }

            tx.commit().await.map_err(CoreError::from)
        }
        _ => {
            warn!(
                config_hash,
                "store does not support transactions; batch and offset state persist \
                 non-transactionally (weakened durability)"
            );
            store
                .create_generated_domains(domains)
                .await
                .map_err(CoreError::from)?;
            store
                .create_or_update_domain_generation_phase_config_state(&state)
                .await
                .map_err(CoreError::from)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{build_generated_domains, config_hash as compute_hash, generate_batch, normalise};
    use campaign_core::generation::GeneratorConfigInput;
    use campaign_store::InMemoryStore;

    fn both_config() -> GeneratorConfig {
        normalise(&GeneratorConfigInput {
            pattern: "prefix".to_string(),
            prefix_length: 2,
            suffix_length: 0,
            character_set: "ab".to_string(),
            constant_string: "shop".to_string(),
            tld: "com".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fresh_campaign_with_no_prior_state_starts_at_requested_offset() {
        let store = InMemoryStore::new();
        let config = both_config();
        let hash = compute_hash(&config);
        let exec = prepare_resume(&store, CampaignId::new(), &config, &hash, 0, 4)
            .await
            .unwrap();
        assert_eq!(exec.effective_start, 0);
        assert_eq!(exec.effective_total, 4);
    }

    #[tokio::test]
    async fn generator_resumes_past_global_offset() {
        // last_offset=9, offset_start=5, requested_total=2: the already-
        // persisted offset wins, so the run resumes at 10 rather than 5.
        let store = InMemoryStore::new();
        let config = normalise(&GeneratorConfigInput {
            pattern: "prefix".to_string(),
            prefix_length: 4,
            suffix_length: 0,
            character_set: "ab".to_string(),
            constant_string: "x".to_string(),
            tld: "com".to_string(),
        })
        .unwrap();
        let hash = compute_hash(&config);

        store
            .create_or_update_domain_generation_phase_config_state(&DomainGenerationConfigState {
                config_hash: hash.clone(),
                last_offset: 9,
                normalised_params_json: serde_json::Value::Null,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        let exec = prepare_resume(&store, CampaignId::new(), &config, &hash, 5, 2)
            .await
            .unwrap();
        assert_eq!(exec.effective_start, 10);
        assert_eq!(exec.effective_total, 2);

        let (domains, next) = generate_batch(&config, exec.effective_start, exec.effective_total);
        assert_eq!(next, 12);
        assert_eq!(domains.len(), 2);

        persist_batch_with_global_offset(
            &store,
            None,
            &build_generated_domains(CampaignId::new(), &domains, exec.effective_start),
            &hash,
            exec.normalised_params.clone(),
            next,
        )
        .await
        .unwrap();

        let state = store
            .get_domain_generation_phase_config_state_by_hash(&hash)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.last_offset, 11);
    }

    #[tokio::test]
    async fn offset_at_total_with_global_applied_resets_instead_of_failing() {
        let store = InMemoryStore::new();
        let config = normalise(&GeneratorConfigInput {
            pattern: "prefix".to_string(),
            prefix_length: 2,
            suffix_length: 0,
            character_set: "ab".to_string(),
            constant_string: "x".to_string(),
            tld: "com".to_string(),
        })
        .unwrap(); // total = 4
        let hash = compute_hash(&config);

        store
            .create_or_update_domain_generation_phase_config_state(&DomainGenerationConfigState {
                config_hash: hash.clone(),
                last_offset: 3, // exhausted: next would be 4 == total
                normalised_params_json: serde_json::Value::Null,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        let exec = prepare_resume(&store, CampaignId::new(), &config, &hash, 0, 4)
            .await
            .unwrap();
        assert_eq!(exec.effective_start, 0);
        assert_eq!(exec.effective_total, 4);
        assert!(store
            .get_domain_generation_phase_config_state_by_hash(&hash)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn offset_at_total_without_global_applied_fails() {
        let store = InMemoryStore::new();
        let config = normalise(&GeneratorConfigInput {
            pattern: "prefix".to_string(),
            prefix_length: 2,
            suffix_length: 0,
            character_set: "ab".to_string(),
            constant_string: "x".to_string(),
            tld: "com".to_string(),
        })
        .unwrap(); // total = 4
        let hash = compute_hash(&config);

        let result = prepare_resume(&store, CampaignId::new(), &config, &hash, 4, 1).await;
        assert!(matches!(result, Err(CoreError::OffsetExhausted)));
    }
}
