use prometheus::{HistogramVec, IntCounterVec, Registry};
use std::sync::OnceLock;

/// Process-global metrics registry, guarded by a one-shot initialiser to
/// avoid duplicate-registration panics.
///
/// Uses `std::sync::OnceLock` rather than `once_cell`, matching this
/// codebase's other global-singleton registries.
pub struct MetricsRegistry {
    pub registry: Registry,

    pub domain_relevance_score: HistogramVec,
    pub rescore_runs_total: IntCounterVec,
    pub rescore_runs_v2_total: IntCounterVec,
    pub analysis_phase_seconds: HistogramVec,
    pub analysis_reuse_enrichment_total: IntCounterVec,
    pub analysis_preflight_failure_total: IntCounterVec,
    pub analysis_feature_fetch_duration_seconds: HistogramVec,
    pub analysis_feature_fetch_domain_count: HistogramVec,
    pub analysis_feature_cache_hits_total: IntCounterVec,
    pub analysis_feature_cache_misses_total: IntCounterVec,
    pub analysis_feature_cache_invalidations_total: IntCounterVec,
    pub analysis_feature_table_coverage_ratio: prometheus::GaugeVec,
    pub analysis_feature_table_fallbacks_total: IntCounterVec,
    pub analysis_feature_table_primary_reads_total: IntCounterVec,
    pub campaign_aggregation_latency_seconds: HistogramVec,
    pub campaign_aggregation_cache_hits_total: IntCounterVec,
}

fn register_or_log<T>(
    registry: &Registry,
    collector: T,
) -> T
where
    T: prometheus::core::Collector + Clone + 'static,
{
    match registry.register(Box::new(collector.clone())) {
        Ok(()) => {}
        Err(prometheus::Error::AlreadyReg) => {
            tracing::debug!("metric already registered, skipping re-registration");
        }
        Err(err) => {
            tracing::debug!(error = %err, "metric registration failed, continuing without it");
        }
    }
    collector
}

impl MetricsRegistry {
    fn new() -> Self {
        let registry = Registry::new();

        let domain_relevance_score = register_or_log(
            &registry,
            HistogramVec::new(
                prometheus::HistogramOpts::new(
                    "domain_relevance_score",
                    "Distribution of computed domain relevance scores",
                ),
                &[],
            )
            .expect("static histogram opts are valid"),
        );

        let rescore_runs_total = register_or_log(
            &registry,
            IntCounterVec::new(
                prometheus::Opts::new("rescore_runs_total", "Count of rescore runs started"),
                &["profile"],
            )
            .expect("static opts are valid"),
        );

        let rescore_runs_v2_total = register_or_log(
            &registry,
            IntCounterVec::new(
                prometheus::Opts::new(
                    "rescore_runs_v2_total",
                    "Count of rescore runs by profile and outcome",
                ),
                &["profile", "result"],
            )
            .expect("static opts are valid"),
        );

        let analysis_phase_seconds = register_or_log(
            &registry,
            HistogramVec::new(
                prometheus::HistogramOpts::new(
                    "analysis_phase_seconds",
                    "Wall-clock duration of the analysis phase",
                ),
                &[],
            )
            .expect("static histogram opts are valid"),
        );

        let analysis_reuse_enrichment_total = register_or_log(
            &registry,
            IntCounterVec::new(
                prometheus::Opts::new(
                    "analysis_reuse_enrichment_total",
                    "Count of analysis runs that reused prior enrichment",
                ),
                &[],
            )
            .expect("static opts are valid"),
        );

        let analysis_preflight_failure_total = register_or_log(
            &registry,
            IntCounterVec::new(
                prometheus::Opts::new(
                    "analysis_preflight_failure_total",
                    "Count of analysis preflight failures (missing features)",
                ),
                &[],
            )
            .expect("static opts are valid"),
        );

        let analysis_feature_fetch_duration_seconds = register_or_log(
            &registry,
            HistogramVec::new(
                prometheus::HistogramOpts::new(
                    "analysis_feature_fetch_duration_seconds",
                    "Duration of feature-vector fetches",
                ),
                &[],
            )
            .expect("static histogram opts are valid"),
        );

        let analysis_feature_fetch_domain_count = register_or_log(
            &registry,
            HistogramVec::new(
                prometheus::HistogramOpts::new(
                    "analysis_feature_fetch_domain_count",
                    "Number of domains returned per feature-vector fetch",
                ),
                &[],
            )
            .expect("static histogram opts are valid"),
        );

        let analysis_feature_cache_hits_total = register_or_log(
            &registry,
            IntCounterVec::new(
                prometheus::Opts::new("analysis_feature_cache_hits_total", "Feature cache hits"),
                &[],
            )
            .expect("static opts are valid"),
        );

        let analysis_feature_cache_misses_total = register_or_log(
            &registry,
            IntCounterVec::new(
                prometheus::Opts::new(
                    "analysis_feature_cache_misses_total",
                    "Feature cache misses",
                ),
                &[],
            )
            .expect("static opts are valid"),
        );

        let analysis_feature_cache_invalidations_total = register_or_log(
            &registry,
            IntCounterVec::new(
                prometheus::Opts::new(
                    "analysis_feature_cache_invalidations_total",
                    "Feature cache explicit invalidations",
                ),
                &[],
            )
            .expect("static opts are valid"),
        );

        let analysis_feature_table_coverage_ratio = register_or_log(
            &registry,
            prometheus::GaugeVec::new(
                prometheus::Opts::new(
                    "analysis_feature_table_coverage_ratio",
                    "Ratio of ready feature-table rows to expected domains",
                ),
                &["campaign_id"],
            )
            .expect("static opts are valid"),
        );

        let analysis_feature_table_fallbacks_total = register_or_log(
            &registry,
            IntCounterVec::new(
                prometheus::Opts::new(
                    "analysis_feature_table_fallbacks_total",
                    "Count of read-path fallbacks to the legacy column, by reason",
                ),
                &["reason"],
            )
            .expect("static opts are valid"),
        );

        let analysis_feature_table_primary_reads_total = register_or_log(
            &registry,
            IntCounterVec::new(
                prometheus::Opts::new(
                    "analysis_feature_table_primary_reads_total",
                    "Count of reads served from the primary feature table",
                ),
                &[],
            )
            .expect("static opts are valid"),
        );

        let campaign_aggregation_latency_seconds = register_or_log(
            &registry,
            HistogramVec::new(
                prometheus::HistogramOpts::new(
                    "campaign_aggregation_latency_seconds",
                    "Latency of campaign aggregate queries",
                ),
                &["endpoint"],
            )
            .expect("static histogram opts are valid"),
        );

        let campaign_aggregation_cache_hits_total = register_or_log(
            &registry,
            IntCounterVec::new(
                prometheus::Opts::new(
                    "campaign_aggregation_cache_hits_total",
                    "Campaign aggregate cache hits/misses by endpoint and result",
                ),
                &["endpoint", "result"],
            )
            .expect("static opts are valid"),
        );

        Self {
            registry,
            domain_relevance_score,
            rescore_runs_total,
            rescore_runs_v2_total,
            analysis_phase_seconds,
            analysis_reuse_enrichment_total,
            analysis_preflight_failure_total,
            analysis_feature_fetch_duration_seconds,
            analysis_feature_fetch_domain_count,
            analysis_feature_cache_hits_total,
            analysis_feature_cache_misses_total,
            analysis_feature_cache_invalidations_total,
            analysis_feature_table_coverage_ratio,
            analysis_feature_table_fallbacks_total,
            analysis_feature_table_primary_reads_total,
            campaign_aggregation_latency_seconds,
            campaign_aggregation_cache_hits_total,
        }
    }
}

static REGISTRY: OnceLock<MetricsRegistry> = OnceLock::new();

/// Returns the process-global registry, initialising it on first call.
pub fn metrics_registry() -> &'static MetricsRegistry {
    REGISTRY.get_or_init(MetricsRegistry::new)
}

/// Render the registry in the Prometheus text exposition format.
pub fn export_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let families = metrics_registry().registry.gather();
    let mut buf = Vec::new();
    if let Err(err) = encoder.encode(&families, &mut buf) {
        tracing::warn!(error = %err, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_registry_is_idempotent() {
        let a = metrics_registry() as *const MetricsRegistry;
        let b = metrics_registry() as *const MetricsRegistry;
        assert_eq!(a, b);
    }

    #[test]
    fn export_includes_known_metric_names() {
        metrics_registry()
            .rescore_runs_total
            .with_label_values(&["default"])
            .inc();
        let text = export_metrics();
        assert!(text.contains("rescore_runs_total"));
    }
}
