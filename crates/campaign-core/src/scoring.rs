use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Closed set of weight keys accepted by the Scoring Weights Registry.
pub const WEIGHT_KEYS: &[&str] = &[
    "keyword_density_weight",
    "unique_keyword_coverage_weight",
    "non_parked_weight",
    "content_length_quality_weight",
    "title_keyword_weight",
    "freshness_weight",
    "tf_lite_weight",
];

/// A validated, normalised set of scoring weights: every key present, every
/// value in [0,1], and Σvalues = 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalisedWeights(HashMap<String, f64>);

impl NormalisedWeights {
    /// Construct directly from an already-normalised map. Only
    /// `campaign_scoring::weights::validate` should call this; it is `pub`
    /// so other crates can deserialise a previously-validated profile.
    pub fn from_validated(map: HashMap<String, f64>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> f64 {
        self.0.get(key).copied().unwrap_or(0.0)
    }

    pub fn as_map(&self) -> &HashMap<String, f64> {
        &self.0
    }
}

/// Defaults used to backfill missing weight keys.
pub fn default_weights() -> HashMap<String, f64> {
    HashMap::from([
        ("keyword_density_weight".to_string(), 0.2),
        ("unique_keyword_coverage_weight".to_string(), 0.2),
        ("non_parked_weight".to_string(), 0.15),
        ("content_length_quality_weight".to_string(), 0.15),
        ("title_keyword_weight".to_string(), 0.1),
        ("freshness_weight".to_string(), 0.1),
        ("tf_lite_weight".to_string(), 0.1),
    ])
}

/// (campaign-id → weights-map, parked-penalty-factor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringProfile {
    pub weights: NormalisedWeights,
    pub parked_penalty_factor: f64,
}

impl ScoringProfile {
    pub fn defaults() -> Self {
        // A nil/absent profile normalises to the registry defaults, which
        // already sum to 1.0, with no parked penalty applied.
        Self {
            weights: NormalisedWeights::from_validated(default_weights()),
            parked_penalty_factor: 1.0,
        }
    }
}

/// Breakdown of a single domain's score, returned by the pure
/// (non-persisting) scoring path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub coverage: f64,
    pub density: f64,
    pub non_parked: f64,
    pub content_len: f64,
    pub title: f64,
    pub freshness: f64,
    pub tf_lite: f64,
    pub parked_penalty_applied: bool,
    pub final_score: f64,
}
