use campaign_core::{CampaignId, PhaseKind, PhaseStatus};
use serde::{Deserialize, Serialize};

/// Structured failure payload persisted alongside a phase's `last_error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureDetails {
    pub phase: PhaseKind,
    pub status: PhaseStatus,
    pub error_msg: String,
    pub context: FailureContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    pub items_processed: u64,
    pub items_total: u64,
    pub progress_pct: f64,
    pub config_hash: Option<String>,
}

/// Filter passed to `GetHTTPKeywordResultsByCampaign`.
#[derive(Debug, Clone, Default)]
pub struct HttpKeywordResultFilter {
    pub campaign_id: Option<CampaignId>,
    pub only_with_features: bool,
    pub limit: Option<u64>,
}

/// A single persisted HTTP-keyword-validation result row, the input the
/// scoring engine reads feature vectors and parked-domain fields from.
#[derive(Debug, Clone)]
pub struct HttpKeywordResultRow {
    pub domain_name: String,
    pub feature_vector: Option<campaign_core::feature::FeatureVector>,
}

/// One row of the bulk `UPDATE ... FROM incoming` scoring persistence ///: `WITH incoming(domain_name, relevance_score, domain_score) AS
/// (VALUES …)`. Both sinks receive the same computed value.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainScoreUpdate {
    pub domain_name: String,
    pub relevance_score: f64,
    pub domain_score: f64,
}

/// Result of `UpdateAnalysisResults`: how many domain rows matched and were
/// updated by the bulk statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateAnalysisResultsOutcome {
    pub rows_updated: u64,
}

/// Funnel aggregate.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FunnelAggregate {
    pub generated: u64,
    pub dns_valid: u64,
    pub http_valid: u64,
    pub keyword_hits: u64,
    pub analyzed: u64,
    pub high_potential: u64,
    pub leads: u64,
}

/// Metrics aggregate. Ratios are `None` rather than `0.0` when
/// the denominator (`analyzed`) is zero — "ratios are null-distinguishable
/// from zero".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MetricsAggregate {
    pub high_potential: u64,
    pub leads: u64,
    pub keyword_coverage_pct: Option<f64>,
    pub avg_richness: Option<f64>,
    pub warning_rate_pct: Option<f64>,
    pub median_gain: Option<f64>,
    pub stuffing_warning_count: u64,
    pub repetition_warning_count: u64,
    pub anchor_warning_count: u64,
}
