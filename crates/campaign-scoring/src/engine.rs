//! Scoring Engine: per-domain normalisation, optional TF-lite,
//! weighted sum with parked-domain penalty, transactional bulk persistence,
//! and the progress/SSE streaming around a full campaign rescore.

use crate::weights::load_for_campaign;
use campaign_cache::FeatureCache;
use campaign_config::FeatureFlags;
use campaign_core::feature::FeatureVector;
use campaign_core::scoring::{NormalisedWeights, ScoreBreakdown, ScoringProfile};
use campaign_core::{CampaignId, CorrelationId, Error as CoreError, PhaseKind, PhaseStatus, Result as CoreResult};
use campaign_observability::metrics_registry;
use campaign_store::{
    CampaignStore, DomainScoreUpdate, FailureContext, FailureDetails, HttpKeywordResultFilter,
    ScoringProfileStore, UpdateAnalysisResultsOutcome,
};
use campaign_streaming::{ProgressSender, RescoreResult, ScoredDomainSample, SseBus, SseEvent};
use chrono::{DateTime, Utc};

const DOMAIN_SCORED_SAMPLE_CAP: usize = 25;

/// Components, each normalised to [0,1].
struct Components {
    coverage: f64,
    density: f64,
    non_parked: f64,
    content_len: f64,
    title: f64,
    freshness: f64,
}

fn normalise(fv: &FeatureVector, now: DateTime<Utc>) -> Components {
    let coverage = (fv.kw_unique / 5.0).clamp(0.0, 1.0);

    let density = if fv.content_bytes > 0.0 && fv.kw_hits_total > 0.0 {
        let per_kb = fv.kw_hits_total / (fv.content_bytes / 1024.0);
        (per_kb / 3.0).clamp(0.0, 1.0)
    } else {
        coverage
    };

    let non_parked = if fv.is_parked { 0.0 } else { 1.0 };
    let content_len = (fv.content_bytes / 50_000.0).clamp(0.0, 1.0);
    let title = if fv.title_has_keyword { 1.0 } else { 0.0 };

    let freshness = match fv.last_fetched_at {
        Some(fetched_at) => {
            let age_days = (now - fetched_at).num_milliseconds() as f64
                / (24.0 * 60.0 * 60.0 * 1000.0);
            if age_days <= 1.0 {
                1.0
            } else if age_days < 7.0 {
                0.7
            } else if age_days < 30.0 {
                0.4
            } else {
                0.0
            }
        }
        None => 0.0,
    };

    Components {
        coverage,
        density,
        non_parked,
        content_len,
        title,
        freshness,
    }
}

fn tf_lite(fv: &FeatureVector) -> f64 {
    if fv.content_bytes > 0.0 && fv.kw_hits_total > 0.0 {
        let per_kb = fv.kw_hits_total / (fv.content_bytes / 1024.0);
        let idf = (1.0 + fv.kw_unique).ln();
        let per_kb_n = (per_kb / 5.0).clamp(0.0, 1.0);
        let idf_n = (idf / 2.4).clamp(0.0, 1.0);
        per_kb_n * idf_n
    } else {
        0.0
    }
}

/// Score a single feature vector, independent of
/// persistence. Used by both the pure `score_breakdown` path and the bulk
/// `score_domains` path so the two never drift apart. Public so benches can
/// measure the hot per-domain arithmetic in isolation from store I/O.
pub fn score_one(
    fv: &FeatureVector,
    weights: &NormalisedWeights,
    parked_penalty_factor: f64,
    tf_lite_enabled: bool,
    now: DateTime<Utc>,
) -> ScoreBreakdown {
    let c = normalise(fv, now);
    let tf_lite_value = if tf_lite_enabled { tf_lite(fv) } else { 0.0 };

    let mut rel = c.coverage * weights.get("unique_keyword_coverage_weight")
        + c.density * weights.get("keyword_density_weight")
        + c.non_parked * weights.get("non_parked_weight")
        + c.content_len * weights.get("content_length_quality_weight")
        + c.title * weights.get("title_keyword_weight")
        + c.freshness * weights.get("freshness_weight");

    let tf_lite_weight = weights.get("tf_lite_weight");
    if tf_lite_value > 0.0 && tf_lite_weight > 0.0 {
        rel += tf_lite_value * tf_lite_weight;
    }

    let mut parked_penalty_applied = false;
    if fv.is_parked {
        if let Some(confidence) = fv.parked_confidence {
            if confidence < 0.9 {
                rel *= parked_penalty_factor;
                parked_penalty_applied = true;
            }
        }
    }

    let final_score = (rel * 1000.0).round() / 1000.0;

    ScoreBreakdown {
        coverage: c.coverage,
        density: c.density,
        non_parked: c.non_parked,
        content_len: c.content_len,
        title: c.title,
        freshness: c.freshness,
        tf_lite: tf_lite_value,
        parked_penalty_applied,
        final_score,
    }
}

/// Collaborators the Scoring Engine needs, borrowed for the duration of one
/// call. Kept as a struct of trait-object references (rather than owning
/// `Arc`s) since every caller already holds these for the lifetime of a
/// phase execution.
pub struct ScoringEngine<'a> {
    pub store: &'a dyn CampaignStore,
    pub scoring_profiles: &'a dyn ScoringProfileStore,
    pub feature_cache: &'a FeatureCache,
    pub sse_bus: &'a SseBus,
    pub flags: FeatureFlags,
    pub progress_interval: u32,
}

impl<'a> ScoringEngine<'a> {
    /// Pure recompute for a single domain; does not write to the store.
    pub async fn score_breakdown(
        &self,
        campaign_id: CampaignId,
        domain_name: &str,
    ) -> CoreResult<ScoreBreakdown> {
        let profile = load_for_campaign(self.scoring_profiles, campaign_id).await?;
        let rows = self
            .store
            .get_http_keyword_results_by_campaign(HttpKeywordResultFilter {
                campaign_id: Some(campaign_id),
                only_with_features: true,
                limit: None,
            })
            .await
            .map_err(CoreError::from)?;

        let row = rows.into_iter().find(|r| r.domain_name == domain_name);
        let fv = row
            .and_then(|r| r.feature_vector)
            .ok_or(CoreError::MissingFeatures { campaign_id })?;

        Ok(score_one(
            &fv,
            &profile.weights,
            profile.parked_penalty_factor,
            self.flags.enable_tf_lite,
            Utc::now(),
        ))
    }

    /// Bulk recompute with persistence: preflight,
    /// per-domain scoring, the bulk store update, and the domain-specific SSE
    /// events (`analysis_reuse_enrichment`, `analysis_failed`,
    /// `domain_scored`, periodic `rescore_progress`). Does not itself call
    /// `complete_phase`/`fail_phase` or emit `rescore_completed` — callers
    /// that want the full phase lifecycle either call `rescore_campaign`
    /// (which wraps this) or drive it through a generic phase executor that
    /// owns lifecycle persistence, passing its own progress sender through.
    pub async fn score_domains_inner(
        &self,
        campaign_id: CampaignId,
        correlation_id: CorrelationId,
        progress: Option<&ProgressSender>,
    ) -> CoreResult<UpdateAnalysisResultsOutcome> {
        let feature_count = self
            .store
            .count_feature_rows(campaign_id)
            .await
            .map_err(CoreError::from)?;

        if feature_count == 0 {
            metrics_registry()
                .analysis_preflight_failure_total
                .with_label_values(&[])
                .inc();
            self.sse_bus.publish(SseEvent::AnalysisFailed {
                campaign_id,
                timestamp: Utc::now(),
                error_code: "E_ANALYSIS_MISSING_FEATURES".to_string(),
                message: "no feature vectors available for campaign".to_string(),
            });
            return Err(CoreError::MissingFeatures { campaign_id });
        }

        metrics_registry()
            .analysis_reuse_enrichment_total
            .with_label_values(&[])
            .inc();
        self.sse_bus.publish(SseEvent::AnalysisReuseEnrichment {
            campaign_id,
            timestamp: Utc::now(),
            correlation_id,
        });

        let profile = load_for_campaign(self.scoring_profiles, campaign_id).await?;
        let features = self.load_features(campaign_id, &profile).await?;

        let total = features.len() as u64;
        let now = Utc::now();
        let mut updates = Vec::with_capacity(features.len());
        let mut sample = Vec::new();
        let mut processed: u64 = 0;

        for (domain_name, fv) in &features {
            let breakdown = score_one(
                fv,
                &profile.weights,
                profile.parked_penalty_factor,
                self.flags.enable_tf_lite,
                now,
            );
            metrics_registry()
                .domain_relevance_score
                .with_label_values(&[])
                .observe(breakdown.final_score);

            updates.push(DomainScoreUpdate {
                domain_name: domain_name.clone(),
                relevance_score: breakdown.final_score,
                domain_score: breakdown.final_score,
            });

            if sample.len() < DOMAIN_SCORED_SAMPLE_CAP {
                sample.push(ScoredDomainSample {
                    domain_name: domain_name.clone(),
                    score: breakdown.final_score,
                    components: self.flags.enable_sse_full_components.then(|| {
                        serde_json::json!({
                            "coverage": breakdown.coverage,
                            "density": breakdown.density,
                            "nonParked": breakdown.non_parked,
                            "contentLen": breakdown.content_len,
                            "title": breakdown.title,
                            "freshness": breakdown.freshness,
                            "tfLite": breakdown.tf_lite,
                        })
                    }),
                    structural: self.flags.enable_sse_structural_details.then(|| {
                        serde_json::json!({
                            "h1Count": fv.h1_count,
                            "linkInternalRatio": fv.link_internal_ratio,
                            "primaryLang": fv.primary_lang,
                        })
                    }),
                });
            }

            processed += 1;
            if progress.is_some()
                && self.progress_interval > 0
                && processed % self.progress_interval as u64 == 0
            {
                self.emit_rescore_progress(campaign_id, correlation_id, processed, total, progress);
            }
        }

        if progress.is_some() && (total == 0 || total % self.progress_interval.max(1) as u64 != 0)
        {
            self.emit_rescore_progress(campaign_id, correlation_id, processed, total, progress);
        }

        let outcome = self
            .store
            .update_analysis_results(campaign_id, &updates)
            .await
            .map_err(CoreError::from)?;

        if !sample.is_empty() {
            self.sse_bus.publish(SseEvent::DomainScored {
                campaign_id,
                timestamp: Utc::now(),
                correlation_id,
                sample,
            });
        }

        Ok(outcome)
    }

    /// Public entry point for a full-campaign bulk recompute.
    pub async fn score_domains(
        &self,
        campaign_id: CampaignId,
    ) -> CoreResult<UpdateAnalysisResultsOutcome> {
        self.score_domains_inner(campaign_id, CorrelationId::new(), None)
            .await
    }

    /// Wraps `score_domains` with lifecycle events and progress streaming
    ///: `rescore_progress` every N rows with a
    /// guaranteed final emission, `rescore_completed{result}` at the end.
    pub async fn rescore_campaign(
        &self,
        campaign_id: CampaignId,
        correlation_id: CorrelationId,
        progress: &ProgressSender,
    ) -> CoreResult<UpdateAnalysisResultsOutcome> {
        metrics_registry()
            .rescore_runs_total
            .with_label_values(&["default"])
            .inc();

        let timer = std::time::Instant::now();
        let result = self
            .score_domains_inner(campaign_id, correlation_id, Some(progress))
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
                self.sse_bus.publish(SseEvent::RescoreCompleted {
                    campaign_id,
                    timestamp: Utc::now(),
                    correlation_id,
                    result: RescoreResult::Success,
                    error: None,
                });
                self.store
                    .complete_phase(campaign_id, PhaseKind::Analysis)
                    .await
                    .map_err(CoreError::from)?;
            }
            Err(err) => {
                metrics_registry()
                    .rescore_runs_v2_total
                    .with_label_values(&["default", "failed"])
                    .inc();
                self.sse_bus.publish(SseEvent::RescoreCompleted {
                    campaign_id,
                    timestamp: Utc::now(),
                    correlation_id,
                    result: RescoreResult::Failed,
                    error: Some(err.to_string()),
                });

                let execution = self
                    .store
                    .get_campaign_phase(campaign_id, PhaseKind::Analysis)
                    .await
                    .ok()
                    .flatten();
                let (items_processed, items_total) = execution
                    .as_ref()
                    .map(|e| (e.items_processed, e.items_total))
                    .unwrap_or((0, 0));
                let progress_pct = execution.as_ref().map(|e| e.progress_pct()).unwrap_or(0.0);

                self.store
                    .fail_phase(
                        campaign_id,
                        PhaseKind::Analysis,
                        FailureDetails {
                            phase: PhaseKind::Analysis,
                            status: PhaseStatus::Failed,
                            error_msg: err.to_string(),
                            context: FailureContext {
                                items_processed,
                                items_total,
                                progress_pct,
                                config_hash: None,
                            },
                        },
                    )
                    .await
                    .map_err(CoreError::from)?;
            }
        }

        result
    }

    fn emit_rescore_progress(
        &self,
        campaign_id: CampaignId,
        correlation_id: CorrelationId,
        processed: u64,
        total: u64,
        progress: Option<&ProgressSender>,
    ) {
        let percentage = if total == 0 {
            0.0
        } else {
            (processed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
        };
        self.sse_bus.publish(SseEvent::RescoreProgress {
            campaign_id,
            timestamp: Utc::now(),
            correlation_id,
            processed,
            total,
            percentage,
        });

        if let Some(progress) = progress {
            progress.emit(campaign_core::PhaseProgress {
                campaign_id,
                phase: PhaseKind::Analysis,
                status: PhaseStatus::InProgress,
                progress_pct: percentage,
                items_total: total,
                items_processed: processed,
                message: None,
                error: None,
                timestamp: Utc::now(),
            });
        }
    }

    async fn load_features(
        &self,
        campaign_id: CampaignId,
        _profile: &ScoringProfile,
    ) -> CoreResult<Vec<(String, FeatureVector)>> {
        if let Some(cached) = self.feature_cache.get(campaign_id) {
            return Ok(cached.into_iter().collect());
        }

        let rows = self
            .store
            .get_http_keyword_results_by_campaign(HttpKeywordResultFilter {
                campaign_id: Some(campaign_id),
                only_with_features: true,
                limit: None,
            })
            .await
            .map_err(CoreError::from)?;

        let mut map = std::collections::HashMap::with_capacity(rows.len());
        let mut ordered = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(fv) = row.feature_vector {
                map.insert(row.domain_name.clone(), fv.clone());
                ordered.push((row.domain_name, fv));
            }
        }
        self.feature_cache.put(campaign_id, map);
        Ok(ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::scoring::{default_weights, NormalisedWeights};
    use std::collections::HashMap;

    fn weights(overrides: &[(&str, f64)]) -> NormalisedWeights {
        let mut map: HashMap<String, f64> = default_weights();
        for (k, v) in overrides {
            map.insert((*k).to_string(), *v);
        }
        NormalisedWeights::from_validated(map)
    }

    fn feature(kw_unique: f64, kw_hits_total: f64, content_bytes: f64, title: bool) -> FeatureVector {
        FeatureVector {
            kw_unique,
            kw_hits_total,
            content_bytes,
            title_has_keyword: title,
            last_fetched_at: Some(Utc::now() - chrono::Duration::hours(1)),
            ..Default::default()
        }
    }

    /// Worked example: scoring with a parked penalty applied to one of two
    /// otherwise-similar domains.
    #[test]
    fn parked_penalty_reorders_relative_scores() {
        let w = weights(&[
            ("keyword_density_weight", 0.3),
            ("unique_keyword_coverage_weight", 0.3),
            ("non_parked_weight", 0.1),
            ("content_length_quality_weight", 0.1),
            ("title_keyword_weight", 0.1),
            ("freshness_weight", 0.1),
            ("tf_lite_weight", 0.0),
        ]);
        let now = Utc::now();

        let mut a = feature(5.0, 15.0, 20000.0, true);
        a.is_parked = true;
        a.parked_confidence = Some(0.5);
        a.last_fetched_at = Some(now - chrono::Duration::hours(1));
        let breakdown_a = score_one(&a, &w, 0.5, false, now);
        assert!((breakdown_a.final_score - 0.308).abs() < 1e-9);
        assert!(breakdown_a.parked_penalty_applied);

        let mut b = feature(5.0, 15.0, 18000.0, true);
        b.is_parked = false;
        b.last_fetched_at = Some(now - chrono::Duration::hours(1));
        let breakdown_b = score_one(&b, &w, 0.5, false, now);
        assert!((breakdown_b.final_score - 0.721).abs() < 1e-9);
        assert!(!breakdown_b.parked_penalty_applied);
    }

    /// TF-lite enabled changes the final score relative to the mandatory
    /// components alone.
    #[test]
    fn tf_lite_enabled_increases_final_score_beyond_mandatory_components() {
        let w = weights(&[("tf_lite_weight", 0.1)]);
        let now = Utc::now();
        let fv = feature(6.0, 24.0, 12000.0, true);

        let without_tf_lite = score_one(&fv, &w, 1.0, false, now);
        let with_tf_lite = score_one(&fv, &w, 1.0, true, now);

        assert!(with_tf_lite.tf_lite > 0.0);
        assert!(with_tf_lite.final_score > without_tf_lite.final_score);
    }

    /// Zero content bytes: density falls back to coverage and is never NaN.
    #[test]
    fn zero_content_bytes_falls_back_density_to_coverage() {
        let now = Utc::now();
        let fv = feature(3.0, 0.0, 0.0, false);
        let c = normalise(&fv, now);
        assert_eq!(c.density, c.coverage);
        assert!(!c.density.is_nan());
    }

    /// Zero unique keywords yields zero coverage and zero TF-lite.
    #[test]
    fn zero_kw_unique_yields_zero_coverage_and_tf_lite() {
        let now = Utc::now();
        let fv = feature(0.0, 0.0, 1000.0, false);
        let c = normalise(&fv, now);
        assert_eq!(c.coverage, 0.0);
        assert_eq!(tf_lite(&fv), 0.0);
    }

    /// A parked-confidence of exactly 0.9 falls just outside the penalty range.
    #[test]
    fn parked_confidence_at_exactly_point_nine_is_not_penalised() {
        let now = Utc::now();
        let w = weights(&[]);
        let mut fv = feature(5.0, 10.0, 10000.0, true);
        fv.is_parked = true;
        fv.parked_confidence = Some(0.9);
        let breakdown = score_one(&fv, &w, 0.5, false, now);
        assert!(!breakdown.parked_penalty_applied);
    }

    #[test]
    fn score_is_always_a_multiple_of_one_thousandth() {
        let now = Utc::now();
        let w = weights(&[]);
        for kw in [0.0, 1.0, 3.0, 5.0, 9.0] {
            let fv = feature(kw, kw * 2.0, 25000.0, kw as u32 % 2 == 0);
            let breakdown = score_one(&fv, &w, 0.5, true, now);
            let scaled = breakdown.final_score * 1000.0;
            assert!((scaled - scaled.round()).abs() < 1e-6);
        }
    }

    fn row(domain_name: &str, fv: FeatureVector) -> campaign_store::HttpKeywordResultRow {
        campaign_store::HttpKeywordResultRow {
            domain_name: domain_name.to_string(),
            feature_vector: Some(fv),
        }
    }

    /// Preflight failure when no feature-vector rows exist for the campaign.
    #[tokio::test]
    async fn preflight_fails_phase_and_emits_analysis_failed_when_no_features_exist() {
        let store = campaign_store::InMemoryStore::new();
        let campaign_id = CampaignId::new();
        store
            .start_phase(campaign_id, PhaseKind::Analysis, 0)
            .await
            .unwrap();

        let cache = FeatureCache::new();
        let bus = SseBus::new();
        let mut sse_rx = bus.subscribe(campaign_id);
        let (progress_tx, _progress_rx) = campaign_streaming::progress_channel();

        let engine = ScoringEngine {
            store: &store,
            scoring_profiles: &store,
            feature_cache: &cache,
            sse_bus: &bus,
            flags: FeatureFlags::default(),
            progress_interval: 500,
        };

        let result = engine
            .rescore_campaign(campaign_id, CorrelationId::new(), &progress_tx)
            .await;
        assert!(result.is_err());

        let exec = store
            .get_campaign_phase(campaign_id, PhaseKind::Analysis)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exec.status, PhaseStatus::Failed);
        assert!(exec.last_error.as_deref().unwrap().contains("E_ANALYSIS_MISSING_FEATURES"));

        let event = sse_rx.try_recv().unwrap();
        assert!(matches!(event, SseEvent::AnalysisFailed { .. }));
    }

    /// End-to-end: seeded feature rows score, persist via the bulk update
    /// path, and complete the phase.
    #[tokio::test]
    async fn rescore_campaign_persists_scores_and_completes_phase() {
        let store = campaign_store::InMemoryStore::new();
        let campaign_id = CampaignId::new();
        store
            .start_phase(campaign_id, PhaseKind::Analysis, 1)
            .await
            .unwrap();
        store.seed_feature_rows(
            campaign_id,
            vec![row("example.com", feature(5.0, 15.0, 20000.0, true))],
        );

        let cache = FeatureCache::new();
        let bus = SseBus::new();
        let (progress_tx, _progress_rx) = campaign_streaming::progress_channel();

        let engine = ScoringEngine {
            store: &store,
            scoring_profiles: &store,
            feature_cache: &cache,
            sse_bus: &bus,
            flags: FeatureFlags::default(),
            progress_interval: 500,
        };

        let outcome = engine
            .rescore_campaign(campaign_id, CorrelationId::new(), &progress_tx)
            .await
            .unwrap();
        assert_eq!(outcome.rows_updated, 1);

        let (relevance, domain) = store.get_score(campaign_id, "example.com").unwrap();
        assert_eq!(relevance, domain);
        assert!(relevance > 0.0);

        let exec = store
            .get_campaign_phase(campaign_id, PhaseKind::Analysis)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exec.status, PhaseStatus::Completed);
    }
}
