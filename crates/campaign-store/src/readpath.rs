use campaign_config::ReadPathConfig;
use campaign_core::CampaignId;
use campaign_observability::metrics_registry;
use serde::Serialize;

/// Outcome of the five-rule read-path decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReadPathDecision {
    pub use_new: bool,
    pub reason: &'static str,
    pub coverage: f64,
}

/// Evaluated in order: flag check, small-sample override, coverage threshold,
/// else fallback. `ready`/`expected` come from the caller (typically
/// `CampaignStore::count_ready_feature_rows` / `count_expected_domains`).
///
/// Observability: records the coverage-ratio gauge and counts fallbacks by
/// reason / primary reads, as specified.
pub fn decide(
    campaign_id: CampaignId,
    flag_enabled: bool,
    ready: u64,
    expected: u64,
    config: &ReadPathConfig,
) -> ReadPathDecision {
    let metrics = metrics_registry();
    let coverage = if expected > 0 {
        ready as f64 / expected as f64
    } else {
        0.0
    };
    metrics
        .analysis_feature_table_coverage_ratio
        .with_label_values(&[&campaign_id.to_string()])
        .set(coverage);

    let decision = if !flag_enabled {
        ReadPathDecision {
            use_new: false,
            reason: "flag_disabled",
            coverage,
        }
    } else if expected < config.small_sample_cutoff && ready > 0 {
        ReadPathDecision {
            use_new: true,
            reason: "small_sample_override",
            coverage,
        }
    } else if coverage >= config.coverage_threshold {
        ReadPathDecision {
            use_new: true,
            reason: "coverage_sufficient",
            coverage,
        }
    } else {
        ReadPathDecision {
            use_new: false,
            reason: "below_coverage",
            coverage,
        }
    };

    if decision.use_new {
        metrics
            .analysis_feature_table_primary_reads_total
            .with_label_values(&[])
            .inc();
    } else if decision.reason != "flag_disabled" {
        metrics
            .analysis_feature_table_fallbacks_total
            .with_label_values(&[decision.reason])
            .inc();
    }

    decision
}

/// Records a DB-unavailable fallback (rule 2: "DB unavailable → error").
/// Callers that catch a store error before `decide` can still account for it
/// in the fallback-by-reason counter.
pub fn record_error_fallback() {
    metrics_registry()
        .analysis_feature_table_fallbacks_total
        .with_label_values(&["error"])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ReadPathConfig {
        ReadPathConfig {
            coverage_threshold: 0.75,
            small_sample_cutoff: 5,
        }
    }

    #[test]
    fn flag_disabled_wins_over_everything() {
        let d = decide(CampaignId::new(), false, 100, 100, &cfg());
        assert!(!d.use_new);
        assert_eq!(d.reason, "flag_disabled");
    }

    #[test]
    fn small_sample_override_when_expected_below_cutoff() {
        let d = decide(CampaignId::new(), true, 2, 3, &cfg());
        assert!(d.use_new);
        assert_eq!(d.reason, "small_sample_override");
    }

    #[test]
    fn coverage_sufficient_at_threshold() {
        let d = decide(CampaignId::new(), true, 80, 100, &cfg());
        assert!(d.use_new);
        assert_eq!(d.reason, "coverage_sufficient");
    }

    #[test]
    fn below_coverage_falls_back() {
        let d = decide(CampaignId::new(), true, 60, 100, &cfg());
        assert!(!d.use_new);
        assert_eq!(d.reason, "below_coverage");
    }

    #[test]
    fn zero_expected_does_not_divide_by_zero() {
        let d = decide(CampaignId::new(), true, 0, 0, &cfg());
        assert_eq!(d.coverage, 0.0);
    }
}
