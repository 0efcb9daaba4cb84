use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A tagged-variant coercion wrapper around loosely-typed feature values:
/// floats arriving as ints, strings, or JSON numbers all coerce to a single
/// numeric representation.
///
/// Unknown/unrepresentable shapes fall back to zero/false rather than erroring,
/// preserving the property that a single odd row cannot abort scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Bool(bool),
    Str(String),
    Array(Vec<String>),
    Null,
}

impl FeatureValue {
    pub fn as_f64_or_zero(&self) -> f64 {
        match self {
            FeatureValue::Number(n) => *n,
            FeatureValue::Str(s) => s.parse().unwrap_or(0.0),
            FeatureValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            FeatureValue::Array(_) | FeatureValue::Null => 0.0,
        }
    }

    pub fn as_bool_or_false(&self) -> bool {
        match self {
            FeatureValue::Bool(b) => *b,
            FeatureValue::Number(n) => *n != 0.0,
            FeatureValue::Str(s) => s == "true" || s == "1",
            FeatureValue::Array(a) => !a.is_empty(),
            FeatureValue::Null => false,
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => FeatureValue::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::Bool(b) => FeatureValue::Bool(*b),
            serde_json::Value::String(s) => FeatureValue::Str(s.clone()),
            serde_json::Value::Array(items) => FeatureValue::Array(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_owned))
                    .collect(),
            ),
            _ => FeatureValue::Null,
        }
    }
}

/// Per-domain feature vector produced by the HTTP-validation phase and read
/// by scoring. Owned by that phase; read-only to scoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub kw_unique: f64,
    pub kw_hits_total: f64,
    pub content_bytes: f64,
    pub title_has_keyword: bool,
    pub kw_top3: Vec<String>,
    pub kw_signal_distribution: HashMap<String, u64>,

    // Richness sub-fields.
    pub prominence_norm: f64,
    pub diversity_norm: f64,
    pub enrichment_norm: f64,
    pub applied_bonus: f64,
    pub applied_deductions_total: f64,
    pub stuffing_penalty: f64,
    pub repetition_index: f64,
    pub anchor_share: f64,

    // Structural fields.
    pub h1_count: u32,
    pub link_internal_ratio: f64,
    pub primary_lang: String,

    // Parked-domain fields consumed directly by the scoring engine.
    pub is_parked: bool,
    pub parked_confidence: Option<f64>,
    pub last_fetched_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Forward-compatible fields the legacy JSON column may carry that this
    /// typed struct does not model explicitly.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_json_shapes_coerce_to_zero() {
        let v = FeatureValue::from_json(&serde_json::Value::Null);
        assert_eq!(v.as_f64_or_zero(), 0.0);
        assert!(!v.as_bool_or_false());
    }

    #[test]
    fn numeric_strings_coerce() {
        let v = FeatureValue::Str("42".to_string());
        assert_eq!(v.as_f64_or_zero(), 42.0);
    }

    #[test]
    fn array_truthiness_follows_non_empty() {
        let empty = FeatureValue::Array(vec![]);
        let full = FeatureValue::Array(vec!["kw".to_string()]);
        assert!(!empty.as_bool_or_false());
        assert!(full.as_bool_or_false());
    }
}
